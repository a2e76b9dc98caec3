//! Joystick input layer.
//!
//! - [`InputSource`] - polled once per tick for a raw [`InputSnapshot`]
//! - [`Sampler`] - deadzone quantization, controller mapping and button
//!   edge filtering, producing the tick's [`Intent`]
//!
//! Edge filtering lives here, above `ArmState`: a held button yields one
//! pulse, and `ArmState` only ever sees levels.
//!
//! # Sources
//!
//! - [`scripted::ScriptedInput`] - replays frames from a TOML file
//! - `gamepad::GamepadInput` - live joystick via `gilrs` (`gamepad` feature)

#[cfg(feature = "gamepad")]
pub mod gamepad;
pub mod scripted;

use thiserror::Error;

use dexjoy_common::arm::{EdgeFilter, Intent};
use dexjoy_common::config::{AxisBinding, ControllerMapping};
use dexjoy_common::consts::{MAX_INPUT_AXES, MAX_INPUT_BUTTONS};

pub use scripted::ScriptedInput;

/// Error types for input sources.
#[derive(Debug, Clone, Error)]
pub enum InputError {
    /// The input backend could not be initialized.
    #[error("Input backend unavailable: {0}")]
    Unavailable(String),

    /// Invalid input script.
    #[error("Invalid input script: {0}")]
    Script(String),
}

/// Raw joystick state of one tick.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InputSnapshot {
    /// Name of the selected device, `None` when no device is selected.
    pub device: Option<String>,
    /// Number of connected input devices.
    pub device_count: usize,
    /// Continuous axis readings in [-1.0, 1.0].
    pub axes: [f32; MAX_INPUT_AXES],
    /// Button levels.
    pub buttons: [bool; MAX_INPUT_BUTTONS],
    /// Operator asked to quit.
    pub quit: bool,
}

impl InputSnapshot {
    /// Snapshot with no device selected.
    pub fn disconnected(device_count: usize) -> Self {
        Self {
            device_count,
            ..Self::default()
        }
    }

    /// Whether a device is selected.
    pub fn is_connected(&self) -> bool {
        self.device.is_some()
    }
}

/// Polled joystick backend.
pub trait InputSource {
    /// Backend identifier (e.g., "script", "gamepad").
    fn name(&self) -> &'static str;

    /// Sample the device once.
    fn poll(&mut self) -> Result<InputSnapshot, InputError>;
}

impl InputSource for Box<dyn InputSource> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn poll(&mut self) -> Result<InputSnapshot, InputError> {
        (**self).poll()
    }
}

/// Map a stick reading to -1, 0 or 1.
///
/// Readings whose magnitude does not exceed `deadzone` (and NaN) read as 0.
#[inline]
pub fn quantize(value: f32, deadzone: f32) -> i32 {
    if value > deadzone {
        1
    } else if value < -deadzone {
        -1
    } else {
        0
    }
}

/// Turns raw snapshots into per-tick intents.
#[derive(Debug, Clone)]
pub struct Sampler {
    mapping: ControllerMapping,
    deadzone: f32,
    grab: EdgeFilter,
    push: EdgeFilter,
    release: EdgeFilter,
}

impl Sampler {
    /// Create a sampler for a controller layout.
    pub fn new(mapping: ControllerMapping, deadzone: f32) -> Self {
        Self {
            mapping,
            deadzone,
            grab: EdgeFilter::new(),
            push: EdgeFilter::new(),
            release: EdgeFilter::new(),
        }
    }

    fn axis(&self, snapshot: &InputSnapshot, binding: AxisBinding) -> i32 {
        let value = snapshot.axes.get(binding.index).copied().unwrap_or(0.0);
        let action = quantize(value, self.deadzone);
        if binding.inverted { -action } else { action }
    }

    fn button(snapshot: &InputSnapshot, index: usize) -> bool {
        snapshot.buttons.get(index).copied().unwrap_or(false)
    }

    /// Quantize one snapshot.
    ///
    /// A disconnected snapshot reads as centered sticks and released
    /// buttons. The edge filters are fed on every call.
    pub fn sample(&mut self, snapshot: &InputSnapshot) -> Intent {
        let connected = snapshot.is_connected();
        let m = self.mapping;

        let (dx, dy, dz, dr) = if connected {
            (
                self.axis(snapshot, m.x),
                self.axis(snapshot, m.y),
                self.axis(snapshot, m.z),
                self.axis(snapshot, m.r),
            )
        } else {
            (0, 0, 0, 0)
        };

        let level = |index| connected && Self::button(snapshot, index);
        let grab = self.grab.sample(level(m.grab));
        let push = self.push.sample(level(m.push));
        let release = self.release.sample(level(m.release));

        Intent {
            dx,
            dy,
            dz,
            dr,
            grab,
            push,
            release,
        }
    }
}
