//! Edge-triggered merge of the movement and view axes.

use shared::{
    domain::{AxisInput, ControlAxis, ControlState, MovementKey, ViewKey},
    protocol::OutboundMessage,
};

use crate::reset::Resettable;

/// Tracks the currently intended direction on each axis and yields a control
/// message only when the merged snapshot changes.
///
/// Each axis models a single intended direction, not a set of held keys:
/// pressing a second key on an axis overrides the first, and releasing any
/// key on an axis returns it to neutral.
#[derive(Debug, Default)]
pub struct ControlStateTracker {
    state: ControlState,
}

impl ControlStateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ControlState {
        self.state
    }

    pub fn press(&mut self, input: AxisInput) -> Option<OutboundMessage> {
        let mut next = self.state;
        match input {
            AxisInput::Movement(key) => next.movement = key,
            AxisInput::View(key) => next.view = key,
        }
        self.transition(next)
    }

    /// The released symbol does not have to match the active one.
    pub fn release(&mut self, input: AxisInput) -> Option<OutboundMessage> {
        let mut next = self.state;
        match input.axis() {
            ControlAxis::Movement => next.movement = MovementKey::Neutral,
            ControlAxis::View => next.view = ViewKey::Neutral,
        }
        self.transition(next)
    }

    fn transition(&mut self, next: ControlState) -> Option<OutboundMessage> {
        if next == self.state {
            return None;
        }
        self.state = next;
        Some(OutboundMessage::Control(next))
    }
}

impl Resettable for ControlStateTracker {
    fn reset(&mut self) {
        self.state = ControlState::NEUTRAL;
    }
}
