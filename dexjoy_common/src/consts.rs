//! Device and session constants.
//!
//! Defaults for the DexArm serial link, the command protocol and the
//! joystick control loop. Every value here can be overridden from
//! `dexjoy.toml`.

/// Canonical service name (used for logging).
pub const SERVICE_NAME: &str = "dexjoy";

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "dexjoy.toml";

// ─── Serial Link ────────────────────────────────────────────────────

/// DexArm serial baud rate.
pub const DEFAULT_BAUD: u32 = 115_200;

/// Per-read timeout on the serial link [ms].
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 3000;

// ─── Protocol ───────────────────────────────────────────────────────

/// Line terminator appended to every command.
pub const LINE_TERMINATOR: &str = "\r\n";

/// Substring marking a successful acknowledgment.
pub const ACK_TOKEN: &str = "ok";

/// Substring marking a command the firmware failed to parse.
pub const UNKNOWN_COMMAND_TOKEN: &str = "Unknown command";

/// Feed rate used for absolute XYZ moves [mm/min].
pub const DEFAULT_FEED_RATE: u32 = 10_000;

/// Device maximum-height pose [X, Y, Z] in millimetres.
pub const DEVICE_HOME: [i32; 3] = [0, 295, 167];

// ─── Arm State ──────────────────────────────────────────────────────

/// Session home position [X, Y, Z] used at initialization.
pub const DEFAULT_HOME: [i32; 3] = [0, 300, 0];

/// Default lower bound of every axis.
pub const DEFAULT_AXIS_MIN: i32 = -1000;

/// Default upper bound of every axis.
pub const DEFAULT_AXIS_MAX: i32 = 1000;

/// Per-tick step of the X axis.
pub const DEFAULT_X_COEFFICIENT: i32 = 10;

/// Per-tick step of the Y axis.
pub const DEFAULT_Y_COEFFICIENT: i32 = 10;

/// Per-tick step of the Z axis.
pub const DEFAULT_Z_COEFFICIENT: i32 = 5;

/// Rotation magnitude issued while the rotation stick is deflected.
pub const DEFAULT_R_COEFFICIENT: i32 = 10;

// ─── Control Loop ───────────────────────────────────────────────────

/// Control loop rate [ticks/s].
pub const DEFAULT_TICK_HZ: u32 = 20;

/// Stick deflection magnitude above which an axis reads as pressed.
pub const DEFAULT_DEADZONE: f32 = 0.6;

/// Substring selecting the joystick among connected devices.
pub const DEFAULT_DEVICE_NAME_FILTER: &str = "Xbox";

/// Number of raw axes carried by an input snapshot.
pub const MAX_INPUT_AXES: usize = 6;

/// Number of raw buttons carried by an input snapshot.
pub const MAX_INPUT_BUTTONS: usize = 8;
