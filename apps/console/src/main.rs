use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use session_core::{
    forward_phase_changes, run_session, ControlSession, ExtensionMessage, SessionConnector,
    SessionEvent, SessionUpdate, WebSocketConnector,
};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::{broadcast, mpsc},
};
use tracing::{info, warn};

mod commands;
mod config;

use commands::{parse_command, ConsoleCommand, HELP};
use config::{load_settings, normalize_session_url};

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "console.toml")]
    config: PathBuf,
    #[arg(long)]
    session_url: Option<String>,
    #[arg(long)]
    log_filter: Option<String>,
    /// Start models without prompt scheduling as soon as the session is ready.
    #[arg(long)]
    auto_start: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mut settings = load_settings(&args.config);
    if let Some(session_url) = args.session_url {
        settings.session_url = session_url;
    }
    if let Some(log_filter) = args.log_filter {
        settings.log_filter = log_filter;
    }
    if args.auto_start {
        settings.auto_start = true;
    }
    tracing_subscriber::fmt()
        .with_env_filter(settings.log_filter.as_str())
        .init();

    let session_url = normalize_session_url(&settings.session_url)?;
    let (events_tx, events_rx) = mpsc::channel(settings.event_queue_capacity);

    let link = WebSocketConnector
        .connect(&session_url, events_tx.clone())
        .await?;
    info!(session_url = %session_url, "console: connected");

    let session =
        ControlSession::new(Arc::clone(&link.sink)).with_auto_start_direct(settings.auto_start);
    let printer = tokio::spawn(print_updates(session.subscribe_updates()));
    let phase_forwarder = forward_phase_changes(link.phase.clone(), events_tx.clone());
    let session_task = tokio::spawn(run_session(session, events_rx));

    println!("{HELP}");
    read_commands(&events_tx).await?;
    let _ = events_tx.send(SessionEvent::Shutdown).await;

    let session = session_task.await.context("session task failed")?;
    info!(
        frame = session.current_frame(),
        resets = session.resets_performed(),
        "console: session finished"
    );
    drop(session);

    phase_forwarder.abort();
    link.close().await;
    let _ = printer.await;
    Ok(())
}

/// Reads stdin until `quit` or end of input, enqueueing session events.
async fn read_commands(events: &mpsc::Sender<SessionEvent>) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        let command = match parse_command(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("! {err}");
                continue;
            }
        };

        let batch = match command {
            ConsoleCommand::Session(batch) => batch,
            ConsoleCommand::LoadImage(path) => match load_starting_image(&path).await {
                Ok(extension) => vec![SessionEvent::Extension(extension)],
                Err(err) => {
                    println!("! {err:#}");
                    continue;
                }
            },
            ConsoleCommand::Help => {
                println!("{HELP}");
                continue;
            }
            ConsoleCommand::Quit => break,
        };

        for event in batch {
            if events.send(event).await.is_err() {
                warn!("console: session loop is gone");
                return Ok(());
            }
        }
    }
    Ok(())
}

async fn load_starting_image(path: &Path) -> Result<ExtensionMessage> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read image '{}'", path.display()))?;
    Ok(ExtensionMessage::starting_image_from_bytes(&bytes, Utc::now())?)
}

async fn print_updates(mut updates: broadcast::Receiver<SessionUpdate>) {
    loop {
        match updates.recv().await {
            Ok(update) => println!("{}", describe(&update)),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "console: update printer lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

fn describe(update: &SessionUpdate) -> String {
    match update {
        SessionUpdate::ControlChanged(state) => {
            format!("control move={:?} look={:?}", state.movement, state.view)
        }
        SessionUpdate::FrameReported(frame) => format!("frame {frame}"),
        SessionUpdate::PromptScheduled(request) => {
            format!("scheduled at frame {}: {}", request.timestamp, request.new_prompt)
        }
        SessionUpdate::Started => "generation started".to_string(),
        SessionUpdate::Reset { explicit: true } => "reset".to_string(),
        SessionUpdate::Reset { explicit: false } => "reset (disconnected)".to_string(),
        SessionUpdate::GeneratorStatus(status) => format!("status: {status}"),
        SessionUpdate::PhaseChanged(phase) => format!("phase: {}", phase.as_str()),
        SessionUpdate::InputRejected(err) => format!("! {err}"),
    }
}
