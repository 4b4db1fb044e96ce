use serde::{Deserialize, Serialize};

use crate::error::InputError;

/// Frame index reported by the generation engine.
pub type FramePosition = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAxis {
    Movement,
    View,
}

/// Player movement axis. Serialized as the WASD symbol the backend expects,
/// with `Q` standing for no movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum MovementKey {
    #[default]
    #[serde(rename = "Q")]
    Neutral,
    #[serde(rename = "W")]
    Forward,
    #[serde(rename = "A")]
    Left,
    #[serde(rename = "S")]
    Back,
    #[serde(rename = "D")]
    Right,
}

/// Camera axis. Serialized as the IJKL symbol the backend expects, with `U`
/// standing for a still camera.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ViewKey {
    #[default]
    #[serde(rename = "U")]
    Neutral,
    #[serde(rename = "I")]
    Up,
    #[serde(rename = "J")]
    Left,
    #[serde(rename = "K")]
    Down,
    #[serde(rename = "L")]
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AxisInput {
    Movement(MovementKey),
    View(ViewKey),
}

impl AxisInput {
    /// Maps a physical key to an axis symbol. Only the directional keys are
    /// accepted; the neutral symbols are reached by releasing.
    pub fn from_key(key: char) -> Result<Self, InputError> {
        let input = match key.to_ascii_lowercase() {
            'w' => Self::Movement(MovementKey::Forward),
            'a' => Self::Movement(MovementKey::Left),
            's' => Self::Movement(MovementKey::Back),
            'd' => Self::Movement(MovementKey::Right),
            'i' => Self::View(ViewKey::Up),
            'j' => Self::View(ViewKey::Left),
            'k' => Self::View(ViewKey::Down),
            'l' => Self::View(ViewKey::Right),
            _ => return Err(InputError::UnknownKey(key)),
        };
        Ok(input)
    }

    pub fn axis(&self) -> ControlAxis {
        match self {
            Self::Movement(_) => ControlAxis::Movement,
            Self::View(_) => ControlAxis::View,
        }
    }
}

/// Complete control snapshot. Every control message carries both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ControlState {
    #[serde(rename = "keyboard_key")]
    pub movement: MovementKey,
    #[serde(rename = "mouse_key")]
    pub view: ViewKey,
}

impl ControlState {
    pub const NEUTRAL: Self = Self {
        movement: MovementKey::Neutral,
        view: ViewKey::Neutral,
    };

    pub fn is_neutral(&self) -> bool {
        *self == Self::NEUTRAL
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Disconnected,
    Connecting,
    Waiting,
    Ready,
}

impl SessionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Waiting => "waiting",
            Self::Ready => "ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_directional_keys_case_insensitively() {
        assert_eq!(
            AxisInput::from_key('W').expect("w"),
            AxisInput::Movement(MovementKey::Forward)
        );
        assert_eq!(
            AxisInput::from_key('k').expect("k"),
            AxisInput::View(ViewKey::Down)
        );
        assert_eq!(AxisInput::from_key('j').expect("j").axis(), ControlAxis::View);
    }

    #[test]
    fn rejects_unmapped_keys() {
        assert_eq!(AxisInput::from_key('q'), Err(InputError::UnknownKey('q')));
        assert_eq!(AxisInput::from_key('x'), Err(InputError::UnknownKey('x')));
    }

    #[test]
    fn default_state_is_neutral() {
        assert!(ControlState::default().is_neutral());
        assert_eq!(SessionPhase::default(), SessionPhase::Disconnected);
    }
}
