use std::{ops::ControlFlow, sync::Arc};

use shared::{
    domain::{AxisInput, ControlState, FramePosition, SessionPhase},
    error::{InputError, ProtocolError},
    protocol::{InboundMessage, OutboundMessage, PromptScheduleRequest},
};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::{
    control::ControlStateTracker,
    extensions::ExtensionMessage,
    progress::ProgressTracker,
    prompt::PromptScheduler,
    reset::{ResetCause, ResetCoordinator},
    transport::MessageSink,
};

const UPDATE_CHANNEL_CAPACITY: usize = 256;

/// Everything that can change session state. Producers only enqueue these;
/// a single consumer applies them in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    Press(AxisInput),
    Release(AxisInput),
    SubmitPrompt(String),
    /// `set_prompt` then `start` for models without scheduling.
    StartDirect(Option<String>),
    Extension(ExtensionMessage),
    Inbound(String),
    Phase(SessionPhase),
    Reset,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionUpdate {
    ControlChanged(ControlState),
    FrameReported(FramePosition),
    PromptScheduled(PromptScheduleRequest),
    Started,
    Reset { explicit: bool },
    GeneratorStatus(String),
    PhaseChanged(SessionPhase),
    InputRejected(InputError),
}

/// One connected lifetime of the control and prompt core.
pub struct ControlSession {
    sink: Arc<dyn MessageSink>,
    control: ControlStateTracker,
    progress: ProgressTracker,
    prompts: PromptScheduler,
    resets: ResetCoordinator,
    phase: SessionPhase,
    generator_status: Option<String>,
    auto_start_direct: bool,
    updates: broadcast::Sender<SessionUpdate>,
}

impl ControlSession {
    pub fn new(sink: Arc<dyn MessageSink>) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            sink,
            control: ControlStateTracker::new(),
            progress: ProgressTracker::new(),
            prompts: PromptScheduler::new(),
            resets: ResetCoordinator::new(),
            phase: SessionPhase::Disconnected,
            generator_status: None,
            auto_start_direct: false,
            updates,
        }
    }

    /// Issues a direct start each time the phase becomes `Ready` while the
    /// session is not started.
    pub fn with_auto_start_direct(mut self, enabled: bool) -> Self {
        self.auto_start_direct = enabled;
        self
    }

    pub fn subscribe_updates(&self) -> broadcast::Receiver<SessionUpdate> {
        self.updates.subscribe()
    }

    pub fn control_state(&self) -> ControlState {
        self.control.state()
    }

    pub fn current_frame(&self) -> FramePosition {
        self.progress.current_frame()
    }

    pub fn is_started(&self) -> bool {
        self.prompts.is_started()
    }

    pub fn active_prompt(&self) -> Option<&str> {
        self.prompts.active_prompt()
    }

    pub fn generator_status(&self) -> Option<&str> {
        self.generator_status.as_deref()
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn resets_performed(&self) -> u64 {
        self.resets.resets_performed()
    }

    pub fn press(&mut self, input: AxisInput) {
        if let Some(message) = self.control.press(input) {
            self.publish(SessionUpdate::ControlChanged(self.control.state()));
            self.dispatch(message);
        }
    }

    pub fn release(&mut self, input: AxisInput) {
        if let Some(message) = self.control.release(input) {
            self.publish(SessionUpdate::ControlChanged(self.control.state()));
            self.dispatch(message);
        }
    }

    pub fn submit_prompt(&mut self, prompt_text: &str) -> Result<(), InputError> {
        let submission = self.prompts.submit(prompt_text, &self.progress)?;
        debug!(
            timestamp = submission.request.timestamp,
            starts_session = submission.starts_session,
            "session: prompt scheduled"
        );
        self.publish(SessionUpdate::PromptScheduled(submission.request.clone()));
        if submission.starts_session {
            info!("session: starting generation");
            self.publish(SessionUpdate::Started);
        }
        for message in submission.into_messages() {
            self.dispatch(message);
        }
        Ok(())
    }

    /// Returns `Ok(false)` when the session had already started.
    pub fn start_direct(&mut self, prompt_text: Option<&str>) -> Result<bool, InputError> {
        let Some(messages) = self.prompts.start_direct(prompt_text)? else {
            debug!("session: direct start skipped, already started");
            return Ok(false);
        };
        info!("session: starting generation with direct prompt");
        self.publish(SessionUpdate::Started);
        for message in messages {
            self.dispatch(message);
        }
        Ok(true)
    }

    pub fn send_extension(&mut self, extension: ExtensionMessage) {
        self.dispatch(extension.into());
    }

    pub fn handle_inbound_text(&mut self, text: &str) {
        match InboundMessage::parse(text) {
            Ok(message) => self.handle_inbound(message),
            Err(err @ ProtocolError::InvalidJson(_)) => {
                warn!(error = %err, "session: ignoring inbound message")
            }
            Err(err) => debug!(error = %err, "session: ignoring inbound message"),
        }
    }

    pub fn handle_inbound(&mut self, message: InboundMessage) {
        match message {
            InboundMessage::Progress {
                current_start_frame,
            } => {
                self.progress.on_progress(current_start_frame);
                self.publish(SessionUpdate::FrameReported(current_start_frame));
            }
            InboundMessage::Status { status } => {
                debug!(status = %status, "session: generator status");
                self.generator_status = Some(status.clone());
                self.publish(SessionUpdate::GeneratorStatus(status));
            }
            InboundMessage::Ignored { kind } => {
                debug!(kind = kind.as_deref().unwrap_or("<none>"), "session: unhandled inbound type");
            }
        }
    }

    /// A transition into `Disconnected` resets; a transition into `Ready` may
    /// auto-start.
    pub fn on_phase_change(&mut self, phase: SessionPhase) {
        let previous = std::mem::replace(&mut self.phase, phase);
        if previous == phase {
            return;
        }
        info!(from = previous.as_str(), to = phase.as_str(), "session: phase changed");
        self.publish(SessionUpdate::PhaseChanged(phase));
        match phase {
            SessionPhase::Disconnected => self.reset(ResetCause::Disconnected),
            SessionPhase::Ready if self.auto_start_direct => {
                if let Err(err) = self.start_direct(None) {
                    warn!(error = %err, "session: auto start failed");
                }
            }
            _ => {}
        }
    }

    pub fn reset(&mut self, cause: ResetCause) {
        let message = self.resets.reset(
            cause,
            &mut [&mut self.control, &mut self.progress, &mut self.prompts],
        );
        self.publish(SessionUpdate::Reset {
            explicit: cause.is_explicit(),
        });
        if let Some(message) = message {
            self.dispatch(message);
        }
    }

    pub fn apply(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Press(input) => self.press(input),
            SessionEvent::Release(input) => self.release(input),
            SessionEvent::SubmitPrompt(text) => {
                if let Err(err) = self.submit_prompt(&text) {
                    debug!(error = %err, "session: prompt rejected");
                    self.publish(SessionUpdate::InputRejected(err));
                }
            }
            SessionEvent::StartDirect(text) => {
                if let Err(err) = self.start_direct(text.as_deref()) {
                    debug!(error = %err, "session: direct start rejected");
                    self.publish(SessionUpdate::InputRejected(err));
                }
            }
            SessionEvent::Extension(extension) => self.send_extension(extension),
            SessionEvent::Inbound(text) => self.handle_inbound_text(&text),
            SessionEvent::Phase(phase) => self.on_phase_change(phase),
            SessionEvent::Reset => self.reset(ResetCause::Explicit),
            SessionEvent::Shutdown => return ControlFlow::Break(()),
        }
        ControlFlow::Continue(())
    }

    /// Fire-and-forget: a failed send is logged and the local change stands.
    fn dispatch(&self, message: OutboundMessage) {
        let kind = message.kind();
        match self.sink.send(message) {
            Ok(()) => debug!(kind, "session: dispatched"),
            Err(err) => warn!(kind, error = %err, "session: dispatch failed"),
        }
    }

    fn publish(&self, update: SessionUpdate) {
        let _ = self.updates.send(update);
    }
}

/// Drains `events` on the calling task until the queue closes or a
/// `Shutdown` arrives, then hands the session back.
pub async fn run_session(
    mut session: ControlSession,
    mut events: mpsc::Receiver<SessionEvent>,
) -> ControlSession {
    while let Some(event) = events.recv().await {
        if session.apply(event).is_break() {
            break;
        }
    }
    info!(
        resets_performed = session.resets_performed(),
        "session: event loop stopped"
    );
    session
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
