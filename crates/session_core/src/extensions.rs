//! Model-specific messages that pass through the session without touching
//! control, progress, or scheduling state.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use shared::{error::InputError, protocol::OutboundMessage};

const MAX_DENOISING_STEPS: usize = 5;
const MAX_DENOISING_STEP_VALUE: u16 = 1000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionMessage {
    SetPrompt(String),
    DenoisingSteps(Vec<u16>),
    StartingImage {
        base64_image: String,
        image_id: String,
    },
}

impl ExtensionMessage {
    pub fn set_prompt(text: &str) -> Result<Self, InputError> {
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(InputError::EmptyPrompt);
        }
        Ok(Self::SetPrompt(prompt.to_string()))
    }

    pub fn denoising_steps(input: &str) -> Result<Self, InputError> {
        parse_denoising_steps(input).map(Self::DenoisingSteps)
    }

    /// Accepts either a `data:<mime>;base64,<payload>` URL or a bare base64
    /// payload.
    pub fn starting_image_from_data_url(
        data_url: &str,
        now: DateTime<Utc>,
    ) -> Result<Self, InputError> {
        let payload = match data_url.split_once(',') {
            Some((header, payload)) if header.starts_with("data:") => payload,
            _ => data_url,
        };
        let payload = payload.trim();
        if payload.is_empty() {
            return Err(InputError::EmptyImage);
        }
        Ok(Self::StartingImage {
            base64_image: payload.to_string(),
            image_id: upload_image_id(now),
        })
    }

    pub fn starting_image_from_bytes(bytes: &[u8], now: DateTime<Utc>) -> Result<Self, InputError> {
        if bytes.is_empty() {
            return Err(InputError::EmptyImage);
        }
        Ok(Self::StartingImage {
            base64_image: STANDARD.encode(bytes),
            image_id: upload_image_id(now),
        })
    }
}

impl From<ExtensionMessage> for OutboundMessage {
    fn from(value: ExtensionMessage) -> Self {
        match value {
            ExtensionMessage::SetPrompt(prompt) => OutboundMessage::SetPrompt { prompt },
            ExtensionMessage::DenoisingSteps(denoising_step_list) => {
                OutboundMessage::SetDenoisingStepList {
                    denoising_step_list,
                }
            }
            ExtensionMessage::StartingImage {
                base64_image,
                image_id,
            } => OutboundMessage::SetStartingImage {
                base64_image,
                image_id,
            },
        }
    }
}

/// Parses a comma separated list such as `"700, 500, 200"`. Blank entries are
/// skipped, so an empty input yields an empty list.
pub fn parse_denoising_steps(input: &str) -> Result<Vec<u16>, InputError> {
    let steps = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let value: i64 = s
                .parse()
                .map_err(|_| InputError::InvalidDenoisingSteps(format!("invalid number: {s}")))?;
            u16::try_from(value)
                .ok()
                .filter(|v| *v <= MAX_DENOISING_STEP_VALUE)
                .ok_or_else(|| {
                    InputError::InvalidDenoisingSteps(format!(
                        "value {value} must be between 0 and {MAX_DENOISING_STEP_VALUE}"
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if steps.len() > MAX_DENOISING_STEPS {
        return Err(InputError::InvalidDenoisingSteps(format!(
            "maximum {MAX_DENOISING_STEPS} denoising steps allowed"
        )));
    }
    Ok(steps)
}

fn upload_image_id(now: DateTime<Utc>) -> String {
    format!("upload_{}", now.timestamp_millis())
}
