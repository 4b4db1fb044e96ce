pub mod control;
pub mod extensions;
pub mod progress;
pub mod prompt;
pub mod reset;
pub mod session;
pub mod transport;

pub use control::ControlStateTracker;
pub use extensions::{parse_denoising_steps, ExtensionMessage};
pub use progress::ProgressTracker;
pub use prompt::{PromptScheduler, Submission, DEFAULT_DIRECT_PROMPT, SCHEDULE_OFFSET};
pub use reset::{ResetCause, ResetCoordinator, Resettable};
pub use session::{run_session, ControlSession, SessionEvent, SessionUpdate};
pub use transport::{
    forward_phase_changes, MessageSink, SessionConnector, SessionLink,
    WebSocketConnector,
};
