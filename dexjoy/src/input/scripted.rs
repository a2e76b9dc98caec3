//! Scripted input replay.
//!
//! # TOML Example
//!
//! ```toml
//! # Push the left stick right for 10 ticks, then tap A.
//! [[frame]]
//! axes = [1.0]
//! repeat = 10
//!
//! [[frame]]
//! buttons = [true]
//!
//! [[frame]]
//! connected = false
//! repeat = 5
//! ```
//!
//! Missing axes read 0.0, missing buttons read released. Once every frame
//! has been replayed the source reports `quit`.

use serde::Deserialize;
use std::path::Path;
use tracing::info;

use super::{InputError, InputSnapshot, InputSource};
use dexjoy_common::config::{ConfigError, ConfigLoader};
use dexjoy_common::consts::{MAX_INPUT_AXES, MAX_INPUT_BUTTONS};

const SCRIPT_DEVICE_NAME: &str = "Scripted Xbox Controller";

fn default_repeat() -> u32 {
    1
}

fn default_true() -> bool {
    true
}

/// One scripted input state, held for `repeat` ticks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Frame {
    /// Axis readings, padded with 0.0.
    #[serde(default)]
    pub axes: Vec<f32>,
    /// Button levels, padded with `false`.
    #[serde(default)]
    pub buttons: Vec<bool>,
    /// Ticks to hold this frame.
    #[serde(default = "default_repeat")]
    pub repeat: u32,
    /// Whether the device is plugged in during this frame.
    #[serde(default = "default_true")]
    pub connected: bool,
}

impl Frame {
    /// Connected frame with the given axes and buttons, held one tick.
    pub fn new(axes: &[f32], buttons: &[bool]) -> Self {
        Self {
            axes: axes.to_vec(),
            buttons: buttons.to_vec(),
            repeat: 1,
            connected: true,
        }
    }

    /// Hold this frame for `repeat` ticks.
    pub fn times(mut self, repeat: u32) -> Self {
        self.repeat = repeat;
        self
    }

    /// Frame with the device unplugged.
    pub fn unplugged() -> Self {
        Self {
            connected: false,
            ..Self::new(&[], &[])
        }
    }

    fn snapshot(&self) -> InputSnapshot {
        if !self.connected {
            return InputSnapshot::disconnected(0);
        }
        let mut snapshot = InputSnapshot {
            device: Some(SCRIPT_DEVICE_NAME.to_string()),
            device_count: 1,
            ..InputSnapshot::default()
        };
        for (slot, &value) in snapshot.axes.iter_mut().zip(&self.axes) {
            *slot = value.clamp(-1.0, 1.0);
        }
        for (slot, &level) in snapshot.buttons.iter_mut().zip(&self.buttons) {
            *slot = level;
        }
        snapshot
    }
}

#[derive(Debug, Deserialize)]
struct Script {
    #[serde(default)]
    frame: Vec<Frame>,
}

/// Input source replaying a fixed list of frames.
#[derive(Debug, Clone)]
pub struct ScriptedInput {
    frames: Vec<Frame>,
    index: usize,
    remaining: u32,
}

impl ScriptedInput {
    /// Build from frames.
    pub fn new(frames: Vec<Frame>) -> Result<Self, InputError> {
        for (i, frame) in frames.iter().enumerate() {
            if frame.axes.len() > MAX_INPUT_AXES {
                return Err(InputError::Script(format!(
                    "frame {i}: {} axes (max {MAX_INPUT_AXES})",
                    frame.axes.len()
                )));
            }
            if frame.buttons.len() > MAX_INPUT_BUTTONS {
                return Err(InputError::Script(format!(
                    "frame {i}: {} buttons (max {MAX_INPUT_BUTTONS})",
                    frame.buttons.len()
                )));
            }
        }
        let remaining = frames.first().map_or(0, |f| f.repeat);
        Ok(Self {
            frames,
            index: 0,
            remaining,
        })
    }

    /// Load frames from a TOML script.
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let script = Script::load(path).map_err(|e| match e {
            ConfigError::FileNotFound => {
                InputError::Script(format!("{} not found", path.display()))
            }
            other => InputError::Script(other.to_string()),
        })?;
        info!(
            "Loaded {} input frames from {}",
            script.frame.len(),
            path.display()
        );
        Self::new(script.frame)
    }

    /// Total ticks the script lasts.
    pub fn total_ticks(&self) -> u64 {
        self.frames.iter().map(|f| u64::from(f.repeat)).sum()
    }
}

impl InputSource for ScriptedInput {
    fn name(&self) -> &'static str {
        "script"
    }

    fn poll(&mut self) -> Result<InputSnapshot, InputError> {
        while self.remaining == 0 {
            self.index += 1;
            match self.frames.get(self.index) {
                Some(frame) => self.remaining = frame.repeat,
                None => {
                    return Ok(InputSnapshot {
                        quit: true,
                        ..InputSnapshot::disconnected(0)
                    });
                }
            }
        }
        self.remaining -= 1;
        Ok(self.frames[self.index].snapshot())
    }
}
