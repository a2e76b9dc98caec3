//! Live joystick input via `gilrs`.
//!
//! Readings are reported in the SDL layout the controller mappings are
//! written for: axes `[LX, LY, LT, RX, RY, RT]` with stick "up" negative,
//! buttons `[A, B, X, Y, LB, RB, Back, Start]`. The guide button quits.

use gilrs::{Axis, Button, GamepadId, Gilrs};
use tracing::{info, warn};

use super::{InputError, InputSnapshot, InputSource};

const AXES: [(Axis, f32); 6] = [
    (Axis::LeftStickX, 1.0),
    (Axis::LeftStickY, -1.0),
    (Axis::LeftZ, 1.0),
    (Axis::RightStickX, 1.0),
    (Axis::RightStickY, -1.0),
    (Axis::RightZ, 1.0),
];

const BUTTONS: [Button; 8] = [
    Button::South,
    Button::East,
    Button::West,
    Button::North,
    Button::LeftTrigger,
    Button::RightTrigger,
    Button::Select,
    Button::Start,
];

/// First connected gamepad whose name contains a filter string.
pub struct GamepadInput {
    gilrs: Gilrs,
    name_filter: String,
    active: Option<GamepadId>,
    device_count: usize,
}

impl GamepadInput {
    /// Initialize the gamepad backend.
    pub fn new(name_filter: &str) -> Result<Self, InputError> {
        let gilrs = Gilrs::new().map_err(|e| InputError::Unavailable(e.to_string()))?;
        Ok(Self {
            gilrs,
            name_filter: name_filter.to_string(),
            active: None,
            device_count: usize::MAX,
        })
    }

    /// Re-select the gamepad when the number of connected devices changes.
    fn rescan(&mut self) {
        let count = self.gilrs.gamepads().count();
        if count == self.device_count {
            return;
        }
        self.device_count = count;
        self.active = self
            .gilrs
            .gamepads()
            .find(|(_, pad)| pad.name().contains(self.name_filter.as_str()))
            .map(|(id, _)| id);

        match self.active {
            Some(id) => info!(
                "Using gamepad '{}' ({} connected)",
                self.gilrs.gamepad(id).name(),
                count
            ),
            None => warn!(
                "No gamepad matching '{}' ({} connected)",
                self.name_filter, count
            ),
        }
    }
}

impl InputSource for GamepadInput {
    fn name(&self) -> &'static str {
        "gamepad"
    }

    fn poll(&mut self) -> Result<InputSnapshot, InputError> {
        // Drain events so gilrs updates its cached state.
        while self.gilrs.next_event().is_some() {}
        self.rescan();

        let Some(id) = self.active else {
            return Ok(InputSnapshot::disconnected(self.device_count));
        };
        let pad = self.gilrs.gamepad(id);
        if !pad.is_connected() {
            return Ok(InputSnapshot::disconnected(self.device_count));
        }

        let mut snapshot = InputSnapshot {
            device: Some(pad.name().to_string()),
            device_count: self.device_count,
            quit: pad.is_pressed(Button::Mode),
            ..InputSnapshot::default()
        };
        for (slot, (axis, sign)) in snapshot.axes.iter_mut().zip(AXES) {
            *slot = sign * pad.value(axis);
        }
        for (slot, button) in snapshot.buttons.iter_mut().zip(BUTTONS) {
            *slot = pad.is_pressed(button);
        }
        Ok(snapshot)
    }
}
