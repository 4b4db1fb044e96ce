use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
    domain::{ControlState, FramePosition},
    error::ProtocolError,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptScheduleRequest {
    pub new_prompt: String,
    pub timestamp: FramePosition,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutboundMessage {
    Control(ControlState),
    SchedulePrompt(PromptScheduleRequest),
    Start,
    Reset,
    SetPrompt {
        prompt: String,
    },
    SetDenoisingStepList {
        denoising_step_list: Vec<u16>,
    },
    SetStartingImage {
        base64_image: String,
        image_id: String,
    },
}

impl OutboundMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Control(_) => "control",
            Self::SchedulePrompt(_) => "schedule_prompt",
            Self::Start => "start",
            Self::Reset => "reset",
            Self::SetPrompt { .. } => "set_prompt",
            Self::SetDenoisingStepList { .. } => "set_denoising_step_list",
            Self::SetStartingImage { .. } => "set_starting_image",
        }
    }
}

/// Inbound messages the session reacts to. Unknown types are kept as
/// `Ignored` so callers can log them without treating them as errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Progress { current_start_frame: FramePosition },
    Status { status: String },
    Ignored { kind: Option<String> },
}

impl InboundMessage {
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text).map_err(ProtocolError::InvalidJson)?;
        match value.get("type").and_then(Value::as_str) {
            Some("progress") => value
                .pointer("/data/current_start_frame")
                .and_then(Value::as_u64)
                .map(|current_start_frame| Self::Progress {
                    current_start_frame,
                })
                .ok_or(ProtocolError::MalformedProgress),
            Some("status") => value
                .pointer("/data/status")
                .and_then(Value::as_str)
                .map(|status| Self::Status {
                    status: status.to_string(),
                })
                .ok_or(ProtocolError::MalformedStatus),
            other => Ok(Self::Ignored {
                kind: other.map(str::to_string),
            }),
        }
    }
}
