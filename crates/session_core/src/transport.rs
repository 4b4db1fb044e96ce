use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use shared::{domain::SessionPhase, error::TransportError, protocol::OutboundMessage};
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::session::SessionEvent;

const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Outbound half of the session channel.
///
/// `send` must not block: it hands the message off and returns. Implementations
/// keep dispatch order on the wire.
pub trait MessageSink: Send + Sync {
    fn send(&self, message: OutboundMessage) -> Result<(), TransportError>;
}

#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// Opens the session channel. Inbound text frames are forwarded to
    /// `events`; the returned link carries the outbound sink and the phase.
    async fn connect(&self, url: &str, events: mpsc::Sender<SessionEvent>) -> Result<SessionLink>;
}

pub struct SessionLink {
    pub sink: Arc<dyn MessageSink>,
    pub phase: watch::Receiver<SessionPhase>,
    shutdown: Option<oneshot::Sender<()>>,
    tasks: Vec<JoinHandle<()>>,
}

impl SessionLink {
    pub fn new(
        sink: Arc<dyn MessageSink>,
        phase: watch::Receiver<SessionPhase>,
        shutdown: Option<oneshot::Sender<()>>,
        tasks: Vec<JoinHandle<()>>,
    ) -> Self {
        Self {
            sink,
            phase,
            shutdown,
            tasks,
        }
    }

    /// Asks the writer to send a close frame, then gives the transport tasks a
    /// short grace period before aborting them.
    pub async fn close(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        for mut task in self.tasks.drain(..) {
            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                task.abort();
            }
        }
    }
}

/// Serializes onto an unbounded queue drained by a single writer task, so
/// `send` never waits on the socket and ordering is preserved.
pub struct WebSocketSink {
    outbound: mpsc::UnboundedSender<String>,
}

impl MessageSink for WebSocketSink {
    fn send(&self, message: OutboundMessage) -> Result<(), TransportError> {
        let text = serde_json::to_string(&message)?;
        self.outbound
            .send(text)
            .map_err(|_| TransportError::Closed)
    }
}

pub struct WebSocketConnector;

#[async_trait]
impl SessionConnector for WebSocketConnector {
    async fn connect(&self, url: &str, events: mpsc::Sender<SessionEvent>) -> Result<SessionLink> {
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Connecting);
        let phase_tx = Arc::new(phase_tx);

        let (ws_stream, _) = connect_async(url)
            .await
            .map_err(|err| TransportError::Connect(err.to_string()))
            .with_context(|| format!("failed to connect session websocket: {url}"))?;
        let (mut ws_writer, mut ws_reader) = ws_stream.split();
        info!(url, "transport: session websocket connected");
        // This transport has no queueing handshake, so an open socket is ready.
        phase_tx.send_replace(SessionPhase::Ready);

        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

        let writer_phase = Arc::clone(&phase_tx);
        let writer = tokio::spawn(async move {
            loop {
                tokio::select! {
                    next = outbound_rx.recv() => {
                        let Some(text) = next else { break };
                        if let Err(err) = ws_writer.send(Message::Text(text)).await {
                            warn!(error = %err, "transport: websocket write failed");
                            writer_phase.send_replace(SessionPhase::Disconnected);
                            return;
                        }
                    }
                    // A dropped link counts as a shutdown request. The receiver
                    // is polled to completion at most once.
                    _ = &mut shutdown_rx => break,
                }
            }
            let _ = ws_writer.send(Message::Close(None)).await;
            let _ = ws_writer.close().await;
            writer_phase.send_replace(SessionPhase::Disconnected);
        });

        let reader_phase = Arc::clone(&phase_tx);
        let reader = tokio::spawn(async move {
            while let Some(msg) = ws_reader.next().await {
                match msg {
                    Ok(Message::Text(text)) => {
                        if events.send(SessionEvent::Inbound(text)).await.is_err() {
                            debug!("transport: session event queue closed");
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(err) => {
                        warn!(error = %err, "transport: websocket read failed");
                        break;
                    }
                }
            }
            reader_phase.send_replace(SessionPhase::Disconnected);
            info!("transport: session websocket closed");
        });

        Ok(SessionLink::new(
            Arc::new(WebSocketSink {
                outbound: outbound_tx,
            }),
            phase_rx,
            Some(shutdown_tx),
            vec![writer, reader],
        ))
    }
}

/// Forwards every phase change into the session event queue until either side
/// goes away.
pub fn forward_phase_changes(
    mut phase: watch::Receiver<SessionPhase>,
    events: mpsc::Sender<SessionEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let initial = *phase.borrow_and_update();
        if events.send(SessionEvent::Phase(initial)).await.is_err() {
            return;
        }
        while phase.changed().await.is_ok() {
            let next = *phase.borrow_and_update();
            if events.send(SessionEvent::Phase(next)).await.is_err() {
                return;
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
