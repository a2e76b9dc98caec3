//! Aggregated arm pose and tool-action flags.
//!
//! `ArmState` is mutated exactly once per control tick:
//!
//! ```text
//! update(intent) → dispatch (reads dirty/tool flags) → invalidate()
//! ```
//!
//! The aggregate `dirty` flag only covers X/Y/Z. Rotation is dispatched on
//! its own dirty flag, whose clearing point is selected by
//! [`RotationClear`]. Tool flags are levels re-evaluated on every update;
//! edge detection happens above this layer.

use crate::arm::axis::{Axis, AxisMode};
use crate::config::{ArmConfig, RotationClear};

/// Quantized per-tick request coming from the input layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Intent {
    /// X direction (-1, 0, 1).
    pub dx: i32,
    /// Y direction (-1, 0, 1).
    pub dy: i32,
    /// Z direction (-1, 0, 1).
    pub dz: i32,
    /// Rotation direction (-1, 0, 1).
    pub dr: i32,
    /// Grab requested this tick.
    pub grab: bool,
    /// Push requested this tick.
    pub push: bool,
    /// Release requested this tick.
    pub release: bool,
}

impl Intent {
    /// Whether the intent requests nothing.
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// Copyable view of `ArmState` for display and logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ArmSnapshot {
    /// X position.
    pub x: i32,
    /// Y position.
    pub y: i32,
    /// Z position.
    pub z: i32,
    /// Rotation target.
    pub r: i32,
    /// Grab flag.
    pub grab: bool,
    /// Push flag.
    pub push: bool,
    /// Release flag.
    pub release: bool,
    /// Aggregate X/Y/Z dirty flag.
    pub dirty: bool,
}

/// Device-facing pose: three absolute axes, one relative rotation,
/// three tool flags and the aggregate dirty flag.
#[derive(Debug, Clone)]
pub struct ArmState {
    /// Translation X (absolute).
    pub x: Axis,
    /// Translation Y (absolute).
    pub y: Axis,
    /// Elevation Z (absolute).
    pub z: Axis,
    /// Rotation R (relative).
    pub r: Axis,
    /// Grab requested.
    pub grab: bool,
    /// Push requested.
    pub push: bool,
    /// Release requested (never true together with a grab request).
    pub release: bool,
    /// OR of the X/Y/Z dirty flags.
    pub dirty: bool,
    rotation_clear: RotationClear,
}

impl ArmState {
    /// Create the state at the configured home position.
    pub fn from_config(config: &ArmConfig) -> Self {
        let [hx, hy, hz] = config.home;
        Self {
            x: Axis::from_config(AxisMode::Absolute, hx, &config.x),
            y: Axis::from_config(AxisMode::Absolute, hy, &config.y),
            z: Axis::from_config(AxisMode::Absolute, hz, &config.z),
            r: Axis::from_config(AxisMode::Relative, 0, &config.r),
            grab: false,
            push: false,
            release: false,
            dirty: false,
            rotation_clear: config.rotation_clear,
        }
    }

    /// Apply one tick of input.
    ///
    /// Release is suppressed while grab is requested (gripper interlock).
    pub fn update(&mut self, intent: Intent) {
        self.x.update(intent.dx);
        self.y.update(intent.dy);
        self.z.update(intent.dz);
        self.r.update(intent.dr);
        self.dirty = self.x.is_dirty() || self.y.is_dirty() || self.z.is_dirty();
        self.grab = intent.grab;
        self.push = intent.push;
        self.release = intent.release && !intent.grab;
    }

    /// End-of-tick reset of all flags.
    ///
    /// Clears R as well under [`RotationClear::Tick`].
    pub fn invalidate(&mut self) {
        self.grab = false;
        self.push = false;
        self.release = false;
        self.dirty = false;
        self.x.invalidate();
        self.y.invalidate();
        self.z.invalidate();
        if self.rotation_clear == RotationClear::Tick {
            self.r.invalidate();
        }
    }

    /// Called by the dispatch step once ROTATE has been sent.
    ///
    /// Clears R under [`RotationClear::Dispatch`].
    pub fn rotation_dispatched(&mut self) {
        if self.rotation_clear == RotationClear::Dispatch {
            self.r.invalidate();
        }
    }

    /// Rotation clearing policy.
    pub fn rotation_clear(&self) -> RotationClear {
        self.rotation_clear
    }

    /// Current position [X, Y, Z].
    pub fn position(&self) -> [i32; 3] {
        [self.x.value(), self.y.value(), self.z.value()]
    }

    /// Copyable view of the current state.
    pub fn snapshot(&self) -> ArmSnapshot {
        ArmSnapshot {
            x: self.x.value(),
            y: self.y.value(),
            z: self.z.value(),
            r: self.r.value(),
            grab: self.grab,
            push: self.push,
            release: self.release,
            dirty: self.dirty,
        }
    }
}

impl Default for ArmState {
    fn default() -> Self {
        Self::from_config(&ArmConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arm_with(rotation_clear: RotationClear) -> ArmState {
        ArmState::from_config(&ArmConfig {
            rotation_clear,
            ..ArmConfig::default()
        })
    }

    #[test]
    fn fresh_state_is_home_and_clean() {
        let arm = ArmState::default();
        assert_eq!(
            arm.snapshot(),
            ArmSnapshot {
                x: 0,
                y: 300,
                z: 0,
                r: 0,
                grab: false,
                push: false,
                release: false,
                dirty: false,
            }
        );
        assert!(!arm.r.is_dirty());
    }

    #[test]
    fn x_step_sets_aggregate_dirty() {
        let mut arm = ArmState::default();
        arm.update(Intent {
            dx: 1,
            ..Intent::default()
        });
        assert_eq!(arm.position(), [10, 300, 0]);
        assert!(arm.dirty);
    }

    #[test]
    fn rotation_does_not_set_aggregate_dirty() {
        let mut arm = ArmState::default();
        arm.update(Intent {
            dr: -1,
            ..Intent::default()
        });
        assert!(!arm.dirty);
        assert!(arm.r.is_dirty());
        assert_eq!(arm.r.value(), -10);
    }

    #[test]
    fn grab_suppresses_release_for_all_inputs() {
        for grab in [false, true] {
            for release in [false, true] {
                for push in [false, true] {
                    let mut arm = ArmState::default();
                    arm.update(Intent {
                        grab,
                        push,
                        release,
                        ..Intent::default()
                    });
                    assert_eq!(arm.grab, grab);
                    assert_eq!(arm.push, push);
                    assert_eq!(arm.release, release && !grab);
                    if grab {
                        assert!(!arm.release);
                    }
                }
            }
        }
    }

    #[test]
    fn tool_flags_are_levels() {
        let mut arm = ArmState::default();
        let held = Intent {
            grab: true,
            ..Intent::default()
        };
        arm.update(held);
        assert!(arm.grab);
        arm.invalidate();
        arm.update(held);
        assert!(arm.grab);
    }

    #[test]
    fn invalidate_clears_xyz_and_flags() {
        let mut arm = ArmState::default();
        arm.update(Intent {
            dx: 1,
            dy: -1,
            dz: 1,
            dr: 0,
            grab: false,
            push: true,
            release: true,
        });
        arm.invalidate();
        assert!(!arm.dirty);
        assert!(!arm.x.is_dirty() && !arm.y.is_dirty() && !arm.z.is_dirty());
        assert!(!arm.grab && !arm.push && !arm.release);
        // Positions survive invalidation.
        assert_eq!(arm.position(), [10, 290, 5]);
    }

    #[test]
    fn tick_policy_clears_rotation_in_invalidate() {
        let mut arm = arm_with(RotationClear::Tick);
        arm.update(Intent {
            dr: 1,
            ..Intent::default()
        });
        arm.rotation_dispatched();
        assert!(arm.r.is_dirty());
        arm.invalidate();
        assert!(!arm.r.is_dirty());
    }

    #[test]
    fn dispatch_policy_clears_rotation_on_dispatch_only() {
        let mut arm = arm_with(RotationClear::Dispatch);
        arm.update(Intent {
            dr: 1,
            ..Intent::default()
        });
        arm.invalidate();
        assert!(arm.r.is_dirty());
        arm.rotation_dispatched();
        assert!(!arm.r.is_dirty());
    }

    #[test]
    fn idle_intent() {
        assert!(Intent::default().is_idle());
        assert!(
            !Intent {
                release: true,
                ..Intent::default()
            }
            .is_idle()
        );
    }
}
