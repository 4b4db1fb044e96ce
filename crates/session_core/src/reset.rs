use shared::protocol::OutboundMessage;
use tracing::info;

/// Per-session state that returns to its initial value on reset.
pub trait Resettable {
    fn reset(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetCause {
    /// The user asked the backend to restart generation.
    Explicit,
    /// The transport left the session; only local state is cleared.
    Disconnected,
}

impl ResetCause {
    pub fn is_explicit(&self) -> bool {
        matches!(self, Self::Explicit)
    }
}

#[derive(Debug, Default)]
pub struct ResetCoordinator {
    resets_performed: u64,
}

impl ResetCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resets_performed(&self) -> u64 {
        self.resets_performed
    }

    /// Clears every target, then returns the `reset` message to dispatch for
    /// an explicit reset. Local state is cleared whether or not that message
    /// is ever delivered; there is no acknowledgment to wait for.
    pub fn reset(
        &mut self,
        cause: ResetCause,
        targets: &mut [&mut dyn Resettable],
    ) -> Option<OutboundMessage> {
        for target in targets.iter_mut() {
            target.reset();
        }
        self.resets_performed += 1;
        info!(
            explicit = cause.is_explicit(),
            resets_performed = self.resets_performed,
            "session: local state reset"
        );

        cause.is_explicit().then_some(OutboundMessage::Reset)
    }
}
