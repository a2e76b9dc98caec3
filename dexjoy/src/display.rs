//! Operator status display.
//!
//! Called once per tick with the raw input and the resulting arm state.
//! Purely observational: nothing flows back into the control logic.

use tracing::debug;

use crate::input::InputSnapshot;
use dexjoy_common::arm::{ArmSnapshot, Intent};

/// Per-tick status sink.
pub trait StatusDisplay {
    /// Render the current tick.
    fn render(&mut self, input: &InputSnapshot, intent: &Intent, arm: &ArmSnapshot);
}

/// Display writing one DEBUG line whenever the shown state changes.
#[derive(Debug, Default)]
pub struct LogDisplay {
    last: Option<(Option<String>, Intent, ArmSnapshot)>,
    lines: u64,
}

impl LogDisplay {
    /// Create an empty display.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of status lines emitted.
    pub fn lines(&self) -> u64 {
        self.lines
    }
}

impl StatusDisplay for LogDisplay {
    fn render(&mut self, input: &InputSnapshot, intent: &Intent, arm: &ArmSnapshot) {
        let current = (input.device.clone(), *intent, *arm);
        if self.last.as_ref() == Some(&current) {
            return;
        }

        debug!(
            device = input.device.as_deref().unwrap_or("Not detected"),
            "Input: X {} Y {} Z {} R {} Grab {} Push {} Release {} | \
             Arm: X {} Y {} Z {} R {} Grab {} Push {} Release {} | Modified {}",
            intent.dx,
            intent.dy,
            intent.dz,
            intent.dr,
            intent.grab,
            intent.push,
            intent.release,
            arm.x,
            arm.y,
            arm.z,
            arm.r,
            arm.grab,
            arm.push,
            arm.release,
            arm.dirty,
        );
        self.lines += 1;
        self.last = Some(current);
    }
}
