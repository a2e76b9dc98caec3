//! Clamped per-axis integrator.
//!
//! An [`Axis`] turns a directional action (normally -1, 0 or 1) into a
//! bounded integer position in device units. Two integration modes share
//! the same clamp and dirty contract:
//!
//! | Mode       | update(action)                          |
//! |------------|-----------------------------------------|
//! | `Absolute` | `value = clamp(value + action * coeff)` |
//! | `Relative` | `value = clamp(action * coeff)`         |
//!
//! `dirty` is true iff the last action was non-zero and is cleared by
//! [`Axis::invalidate`].

use serde::{Deserialize, Serialize};

use crate::config::AxisConfig;

/// Integration mode of an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisMode {
    /// Accumulates every action into the running position.
    Absolute,
    /// Replaces the value with the scaled action (instantaneous target).
    Relative,
}

/// One controlled degree of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Axis {
    mode: AxisMode,
    value: i32,
    coefficient: i32,
    min: i32,
    max: i32,
    dirty: bool,
}

impl Axis {
    /// Create an axis. `start` is clamped into `[min, max]`.
    ///
    /// Bounds are expected to satisfy `min <= max`; swapped bounds are
    /// reordered rather than rejected.
    pub fn new(mode: AxisMode, start: i32, coefficient: i32, min: i32, max: i32) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self {
            mode,
            value: start.clamp(min, max),
            coefficient,
            min,
            max,
            dirty: false,
        }
    }

    /// Absolute axis starting at `start`.
    pub fn absolute(start: i32, coefficient: i32, min: i32, max: i32) -> Self {
        Self::new(AxisMode::Absolute, start, coefficient, min, max)
    }

    /// Relative axis starting at `start`.
    pub fn relative(start: i32, coefficient: i32, min: i32, max: i32) -> Self {
        Self::new(AxisMode::Relative, start, coefficient, min, max)
    }

    /// Build from configuration.
    pub fn from_config(mode: AxisMode, start: i32, config: &AxisConfig) -> Self {
        Self::new(mode, start, config.coefficient, config.min, config.max)
    }

    /// Apply one action.
    ///
    /// Values outside {-1, 0, 1} are scaled like any other; arithmetic
    /// saturates before clamping.
    pub fn update(&mut self, action: i32) {
        let step = action.saturating_mul(self.coefficient);
        let raw = match self.mode {
            AxisMode::Absolute => self.value.saturating_add(step),
            AxisMode::Relative => step,
        };
        self.value = raw.clamp(self.min, self.max);
        self.dirty = action != 0;
    }

    /// Clear the dirty flag unconditionally.
    #[inline]
    pub fn invalidate(&mut self) {
        self.dirty = false;
    }

    /// Current position [device units].
    #[inline]
    pub fn value(&self) -> i32 {
        self.value
    }

    /// Whether the last action was non-zero and not yet invalidated.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Integration mode.
    #[inline]
    pub fn mode(&self) -> AxisMode {
        self.mode
    }

    /// Step coefficient.
    #[inline]
    pub fn coefficient(&self) -> i32 {
        self.coefficient
    }

    /// Inclusive bounds `(min, max)`.
    #[inline]
    pub fn bounds(&self) -> (i32, i32) {
        (self.min, self.max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_integrates() {
        let mut ax = Axis::absolute(0, 10, -1000, 1000);
        ax.update(1);
        assert_eq!(ax.value(), 10);
        ax.update(1);
        assert_eq!(ax.value(), 20);
        ax.update(-1);
        assert_eq!(ax.value(), 10);
        ax.update(0);
        assert_eq!(ax.value(), 10);
    }

    #[test]
    fn relative_replaces() {
        let mut ax = Axis::relative(0, 10, -1000, 1000);
        ax.update(1);
        assert_eq!(ax.value(), 10);
        ax.update(1);
        assert_eq!(ax.value(), 10);
        ax.update(-1);
        assert_eq!(ax.value(), -10);
        ax.update(0);
        assert_eq!(ax.value(), 0);
    }

    #[test]
    fn absolute_clamps_at_both_bounds() {
        let mut ax = Axis::absolute(95, 10, -100, 100);
        ax.update(1);
        assert_eq!(ax.value(), 100);
        ax.update(1);
        assert_eq!(ax.value(), 100);
        assert!(ax.is_dirty());

        let mut ax = Axis::absolute(-95, 10, -100, 100);
        ax.update(-1);
        assert_eq!(ax.value(), -100);
    }

    #[test]
    fn relative_clamps() {
        let mut ax = Axis::relative(0, 50, -20, 20);
        ax.update(1);
        assert_eq!(ax.value(), 20);
        ax.update(-1);
        assert_eq!(ax.value(), -20);
    }

    #[test]
    fn value_stays_in_bounds_for_any_action_sequence() {
        // Deterministic LCG over {-1, 0, 1}.
        let mut seed: u32 = 0x2545_f491;
        for mode in [AxisMode::Absolute, AxisMode::Relative] {
            let mut ax = Axis::new(mode, 0, 7, -30, 45);
            for _ in 0..10_000 {
                seed = seed.wrapping_mul(1_103_515_245).wrapping_add(12_345);
                let action = (seed >> 16) as i32 % 3 - 1;
                let before = ax.value();
                ax.update(action);
                let (min, max) = ax.bounds();
                assert!((min..=max).contains(&ax.value()));
                let expected = match mode {
                    AxisMode::Absolute => (before + action * 7).clamp(min, max),
                    AxisMode::Relative => (action * 7).clamp(min, max),
                };
                assert_eq!(ax.value(), expected);
            }
        }
    }

    #[test]
    fn dirty_tracks_last_action() {
        let mut ax = Axis::absolute(0, 10, -1000, 1000);
        assert!(!ax.is_dirty());
        ax.update(1);
        assert!(ax.is_dirty());
        ax.update(0);
        assert!(!ax.is_dirty());
        ax.update(-1);
        assert!(ax.is_dirty());
        ax.invalidate();
        assert!(!ax.is_dirty());
        ax.invalidate();
        assert!(!ax.is_dirty());
    }

    #[test]
    fn out_of_domain_action_is_scaled() {
        let mut ax = Axis::absolute(0, 10, -1000, 1000);
        ax.update(3);
        assert_eq!(ax.value(), 30);
        ax.update(i32::MAX);
        assert_eq!(ax.value(), 1000);
        ax.update(i32::MIN);
        assert_eq!(ax.value(), -1000);
    }

    #[test]
    fn start_is_clamped() {
        let ax = Axis::absolute(5000, 10, -1000, 1000);
        assert_eq!(ax.value(), 1000);
    }

    #[test]
    fn from_config_uses_bounds() {
        let config = AxisConfig {
            coefficient: 5,
            min: 0,
            max: 50,
        };
        let ax = Axis::from_config(AxisMode::Absolute, 20, &config);
        assert_eq!(ax.coefficient(), 5);
        assert_eq!(ax.bounds(), (0, 50));
        assert_eq!(ax.mode(), AxisMode::Absolute);
        assert_eq!(ax.value(), 20);
    }
}
