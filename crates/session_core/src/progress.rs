use shared::domain::FramePosition;

use crate::reset::Resettable;

/// Latest frame position reported by the backend. Values are taken as-is,
/// including ones that move backwards when the engine loops or seeks.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    current_frame: FramePosition,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_progress(&mut self, frame: FramePosition) {
        self.current_frame = frame;
    }

    pub fn current_frame(&self) -> FramePosition {
        self.current_frame
    }
}

impl Resettable for ProgressTracker {
    fn reset(&mut self) {
        self.current_frame = 0;
    }
}
