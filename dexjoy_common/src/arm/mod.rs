//! Arm state model.
//!
//! - [`axis`] - Clamped per-axis integrator (absolute or relative)
//! - [`edge`] - Level-to-pulse button filter
//! - [`state`] - Aggregated `ArmState` with dirty tracking and tool interlock

pub mod axis;
pub mod edge;
pub mod state;

pub use axis::{Axis, AxisMode};
pub use edge::EdgeFilter;
pub use state::{ArmSnapshot, ArmState, Intent};
