//! Line commands read from stdin, mapped onto session events.

use std::path::PathBuf;

use chrono::Utc;
use session_core::{ExtensionMessage, SessionEvent};
use shared::{domain::AxisInput, error::InputError};
use thiserror::Error;

pub const HELP: &str = "\
commands:
  press <key>      hold a direction (w a s d move, i j k l look)
  release <key>    let go of a direction
  tap <key>        press then release
  prompt <text>    schedule a prompt
  set-prompt <text> replace the prompt (models without scheduling)
  start [text]     set the prompt and start (models without scheduling)
  steps <csv>      set the denoising step list, e.g. 700,500,200
  image <path>     use an image file (or a data: url) as the starting frame
  reset            restart generation
  help             show this text
  quit             leave";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleCommand {
    Session(Vec<SessionEvent>),
    LoadImage(PathBuf),
    Help,
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("unknown command '{0}', try 'help'")]
    Unknown(String),
    #[error("'{0}' needs an argument")]
    MissingArgument(&'static str),
    #[error("expected a single key, got '{0}'")]
    NotAKey(String),
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Returns `Ok(None)` for blank lines.
pub fn parse_command(line: &str) -> Result<Option<ConsoleCommand>, CommandError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let command = match verb.to_ascii_lowercase().as_str() {
        "press" => ConsoleCommand::Session(vec![SessionEvent::Press(parse_key(rest, "press")?)]),
        "release" => {
            ConsoleCommand::Session(vec![SessionEvent::Release(parse_key(rest, "release")?)])
        }
        "tap" => {
            let input = parse_key(rest, "tap")?;
            ConsoleCommand::Session(vec![SessionEvent::Press(input), SessionEvent::Release(input)])
        }
        "prompt" => {
            if rest.is_empty() {
                return Err(InputError::EmptyPrompt.into());
            }
            ConsoleCommand::Session(vec![SessionEvent::SubmitPrompt(rest.to_string())])
        }
        "set-prompt" => ConsoleCommand::Session(vec![SessionEvent::Extension(
            ExtensionMessage::set_prompt(rest)?,
        )]),
        "start" => ConsoleCommand::Session(vec![SessionEvent::StartDirect(
            (!rest.is_empty()).then(|| rest.to_string()),
        )]),
        "steps" => ConsoleCommand::Session(vec![SessionEvent::Extension(
            ExtensionMessage::denoising_steps(rest)?,
        )]),
        "image" => {
            if rest.is_empty() {
                return Err(CommandError::MissingArgument("image"));
            }
            if rest.starts_with("data:") {
                ConsoleCommand::Session(vec![SessionEvent::Extension(
                    ExtensionMessage::starting_image_from_data_url(rest, Utc::now())?,
                )])
            } else {
                ConsoleCommand::LoadImage(PathBuf::from(rest))
            }
        }
        "reset" => ConsoleCommand::Session(vec![SessionEvent::Reset]),
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(CommandError::Unknown(other.to_string())),
    };
    Ok(Some(command))
}

fn parse_key(arg: &str, verb: &'static str) -> Result<AxisInput, CommandError> {
    let mut chars = arg.chars();
    match (chars.next(), chars.next()) {
        (None, _) => Err(CommandError::MissingArgument(verb)),
        (Some(key), None) => Ok(AxisInput::from_key(key)?),
        _ => Err(CommandError::NotAKey(arg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::domain::{MovementKey, ViewKey};

    #[test]
    fn parses_key_commands() {
        assert_eq!(
            parse_command("press W").expect("parse"),
            Some(ConsoleCommand::Session(vec![SessionEvent::Press(
                AxisInput::Movement(MovementKey::Forward)
            )]))
        );
        assert_eq!(
            parse_command("tap l").expect("parse"),
            Some(ConsoleCommand::Session(vec![
                SessionEvent::Press(AxisInput::View(ViewKey::Right)),
                SessionEvent::Release(AxisInput::View(ViewKey::Right)),
            ]))
        );
    }

    #[test]
    fn rejects_bad_keys_before_the_session() {
        assert_eq!(
            parse_command("press x"),
            Err(CommandError::Input(InputError::UnknownKey('x')))
        );
        assert_eq!(
            parse_command("press wa"),
            Err(CommandError::NotAKey("wa".into()))
        );
        assert_eq!(
            parse_command("release"),
            Err(CommandError::MissingArgument("release"))
        );
    }

    #[test]
    fn prompt_keeps_the_full_text() {
        assert_eq!(
            parse_command("prompt  a dragon lands   at the temple ").expect("parse"),
            Some(ConsoleCommand::Session(vec![SessionEvent::SubmitPrompt(
                "a dragon lands   at the temple".into()
            )]))
        );
        assert_eq!(
            parse_command("prompt"),
            Err(CommandError::Input(InputError::EmptyPrompt))
        );
    }

    #[test]
    fn extension_commands_are_validated() {
        assert_eq!(
            parse_command("steps 700, 500, 200").expect("parse"),
            Some(ConsoleCommand::Session(vec![SessionEvent::Extension(
                ExtensionMessage::DenoisingSteps(vec![700, 500, 200])
            )]))
        );
        assert!(matches!(
            parse_command("steps 2000"),
            Err(CommandError::Input(InputError::InvalidDenoisingSteps(_)))
        ));
        assert_eq!(
            parse_command("image ./frames/start.png").expect("parse"),
            Some(ConsoleCommand::LoadImage(PathBuf::from("./frames/start.png")))
        );
    }

    #[test]
    fn start_takes_an_optional_prompt() {
        assert_eq!(
            parse_command("start").expect("parse"),
            Some(ConsoleCommand::Session(vec![SessionEvent::StartDirect(None)]))
        );
        assert_eq!(
            parse_command("start  moss temple ").expect("parse"),
            Some(ConsoleCommand::Session(vec![SessionEvent::StartDirect(Some(
                "moss temple".into()
            ))]))
        );
    }

    #[test]
    fn inline_data_url_image() {
        let Ok(Some(ConsoleCommand::Session(events))) =
            parse_command("image data:image/png;base64,iVBORw0KGgo=")
        else {
            panic!("expected a session command");
        };
        let [SessionEvent::Extension(ExtensionMessage::StartingImage {
            base64_image,
            image_id,
        })] = events.as_slice()
        else {
            panic!("expected a starting image");
        };
        assert_eq!(base64_image, "iVBORw0KGgo=");
        assert!(image_id.starts_with("upload_"));

        assert_eq!(
            parse_command("image data:image/png;base64,"),
            Err(CommandError::Input(InputError::EmptyImage))
        );
    }

    #[test]
    fn blank_and_unknown_lines() {
        assert_eq!(parse_command("   ").expect("blank"), None);
        assert_eq!(
            parse_command("jump"),
            Err(CommandError::Unknown("jump".into()))
        );
        assert_eq!(parse_command("QUIT").expect("quit"), Some(ConsoleCommand::Quit));
    }
}
