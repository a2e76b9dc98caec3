//! Prelude module for common re-exports.
//!
//! ```rust
//! use dexjoy_common::prelude::*;
//! ```

// ─── Arm State ──────────────────────────────────────────────────────
pub use crate::arm::{ArmSnapshot, ArmState, Axis, AxisMode, EdgeFilter, Intent};

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{
    ArmConfig, AxisConfig, ConfigError, ConfigLoader, ControlConfig, ControllerMapping,
    DexjoyConfig, LogLevel, ProtocolConfig, RotationClear, SerialConfig, SharedConfig,
};

// ─── Constants ──────────────────────────────────────────────────────
pub use crate::consts::{ACK_TOKEN, DEFAULT_BAUD, LINE_TERMINATOR, UNKNOWN_COMMAND_TOKEN};
