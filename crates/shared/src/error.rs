use thiserror::Error;

/// Local input rejected before anything reaches the session channel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("prompt is empty")]
    EmptyPrompt,
    #[error("key {0:?} is not mapped to a control axis")]
    UnknownKey(char),
    #[error("invalid denoising steps: {0}")]
    InvalidDenoisingSteps(String),
    #[error("starting image is empty")]
    EmptyImage,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("session channel closed")]
    Closed,
    #[error("failed to encode outbound message: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("failed to connect session channel: {0}")]
    Connect(String),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("inbound message is not valid json: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("progress message without a usable current_start_frame")]
    MalformedProgress,
    #[error("status message without a status string")]
    MalformedStatus,
}
