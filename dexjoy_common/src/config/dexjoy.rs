//! Session configuration tree loaded from `dexjoy.toml`.
//!
//! Every field has a default matching the DexArm + Xbox controller setup,
//! so an empty file is a valid configuration.
//!
//! # TOML Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyACM0"
//!
//! [protocol]
//! max_retries = 50
//!
//! [arm]
//! home = [0, 300, 0]
//! rotation_clear = "dispatch"
//!
//! [arm.z]
//! coefficient = 5
//! min = -100
//! max = 200
//!
//! [control]
//! tick_hz = 20
//! deadzone = 0.6
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ConfigError, SharedConfig};
use crate::consts::{
    ACK_TOKEN, DEFAULT_AXIS_MAX, DEFAULT_AXIS_MIN, DEFAULT_BAUD, DEFAULT_DEADZONE,
    DEFAULT_DEVICE_NAME_FILTER, DEFAULT_FEED_RATE, DEFAULT_HOME, DEFAULT_R_COEFFICIENT,
    DEFAULT_READ_TIMEOUT_MS, DEFAULT_TICK_HZ, DEFAULT_X_COEFFICIENT, DEFAULT_Y_COEFFICIENT,
    DEFAULT_Z_COEFFICIENT, MAX_INPUT_AXES, MAX_INPUT_BUTTONS, UNKNOWN_COMMAND_TOKEN,
};

fn default_baud() -> u32 {
    DEFAULT_BAUD
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT_MS
}

fn default_feed_rate() -> u32 {
    DEFAULT_FEED_RATE
}

fn default_ack_token() -> String {
    ACK_TOKEN.to_string()
}

fn default_unknown_token() -> String {
    UNKNOWN_COMMAND_TOKEN.to_string()
}

fn default_home() -> [i32; 3] {
    DEFAULT_HOME
}

fn default_x_axis() -> AxisConfig {
    AxisConfig::with_coefficient(DEFAULT_X_COEFFICIENT)
}

fn default_y_axis() -> AxisConfig {
    AxisConfig::with_coefficient(DEFAULT_Y_COEFFICIENT)
}

fn default_z_axis() -> AxisConfig {
    AxisConfig::with_coefficient(DEFAULT_Z_COEFFICIENT)
}

fn default_r_axis() -> AxisConfig {
    AxisConfig::with_coefficient(DEFAULT_R_COEFFICIENT)
}

fn default_tick_hz() -> u32 {
    DEFAULT_TICK_HZ
}

fn default_deadzone() -> f32 {
    DEFAULT_DEADZONE
}

fn default_device_name_filter() -> String {
    DEFAULT_DEVICE_NAME_FILTER.to_string()
}

/// Root configuration of a dexjoy session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DexjoyConfig {
    /// Logging and instance naming.
    #[serde(default)]
    pub shared: SharedConfig,

    /// Serial link parameters.
    #[serde(default)]
    pub serial: SerialConfig,

    /// Command protocol parameters.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Arm axes and home position.
    #[serde(default)]
    pub arm: ArmConfig,

    /// Control loop and joystick parameters.
    #[serde(default)]
    pub control: ControlConfig,
}

impl DexjoyConfig {
    /// Validate the whole configuration tree.
    ///
    /// # Validation Rules
    /// 1. `shared.service_name` not empty
    /// 2. `serial.baud` > 0, `serial.read_timeout_ms` > 0
    /// 3. protocol tokens not empty
    /// 4. every axis has `min <= max` and a non-zero coefficient
    /// 5. `arm.home` lies inside the X/Y/Z bounds
    /// 6. `control.tick_hz` > 0, `control.deadzone` in [0, 1)
    /// 7. controller mapping indices inside the input snapshot
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.serial.validate()?;
        self.protocol.validate()?;
        self.arm.validate()?;
        self.control.validate()?;
        Ok(())
    }
}

/// Serial link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialConfig {
    /// Serial port identifier (e.g. `/dev/ttyACM0`, `COM3`).
    /// Usually supplied on the command line.
    #[serde(default)]
    pub port: Option<String>,

    /// Baud rate.
    #[serde(default = "default_baud")]
    pub baud: u32,

    /// Timeout of a single line read [ms].
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: None,
            baud: default_baud(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl SerialConfig {
    /// Per-read timeout as a `Duration`.
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.baud == 0 {
            return Err(ConfigError::ValidationError(
                "serial.baud must be greater than 0".to_string(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "serial.read_timeout_ms must be greater than 0".to_string(),
            ));
        }
        if matches!(&self.port, Some(p) if p.is_empty()) {
            return Err(ConfigError::ValidationError(
                "serial.port cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Command protocol configuration.
///
/// `max_retries` and `max_wait_ms` default to unset, which keeps the
/// device's retry-forever / wait-forever acknowledgment behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Feed rate appended to absolute XYZ moves [mm/min].
    #[serde(default = "default_feed_rate")]
    pub feed_rate: u32,

    /// Substring that acknowledges a command.
    #[serde(default = "default_ack_token")]
    pub ack_token: String,

    /// Substring that triggers retransmission.
    #[serde(default = "default_unknown_token")]
    pub unknown_token: String,

    /// Maximum retransmissions of one command (unset = unbounded).
    #[serde(default)]
    pub max_retries: Option<u32>,

    /// Maximum total wait for one acknowledgment [ms] (unset = unbounded).
    #[serde(default)]
    pub max_wait_ms: Option<u64>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            feed_rate: default_feed_rate(),
            ack_token: default_ack_token(),
            unknown_token: default_unknown_token(),
            max_retries: None,
            max_wait_ms: None,
        }
    }
}

impl ProtocolConfig {
    /// Total acknowledgment wait bound, if configured.
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.ack_token.is_empty() || self.unknown_token.is_empty() {
            return Err(ConfigError::ValidationError(
                "protocol tokens cannot be empty".to_string(),
            ));
        }
        if self.unknown_token.contains(&self.ack_token) {
            return Err(ConfigError::ValidationError(format!(
                "protocol.unknown_token {:?} contains protocol.ack_token {:?}",
                self.unknown_token, self.ack_token
            )));
        }
        if self.feed_rate == 0 {
            return Err(ConfigError::ValidationError(
                "protocol.feed_rate must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Step coefficient and inclusive bounds of one axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Position change per unit of stick action.
    pub coefficient: i32,

    /// Lower bound (inclusive).
    #[serde(default = "default_axis_min")]
    pub min: i32,

    /// Upper bound (inclusive).
    #[serde(default = "default_axis_max")]
    pub max: i32,
}

fn default_axis_min() -> i32 {
    DEFAULT_AXIS_MIN
}

fn default_axis_max() -> i32 {
    DEFAULT_AXIS_MAX
}

impl AxisConfig {
    /// Axis with the default ±1000 bounds.
    pub const fn with_coefficient(coefficient: i32) -> Self {
        Self {
            coefficient,
            min: DEFAULT_AXIS_MIN,
            max: DEFAULT_AXIS_MAX,
        }
    }

    /// Whether `value` lies inside the bounds.
    pub fn contains(&self, value: i32) -> bool {
        (self.min..=self.max).contains(&value)
    }

    fn validate(&self, name: &str) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::ValidationError(format!(
                "arm.{name}: min {} greater than max {}",
                self.min, self.max
            )));
        }
        if self.coefficient == 0 {
            return Err(ConfigError::ValidationError(format!(
                "arm.{name}: coefficient cannot be 0"
            )));
        }
        Ok(())
    }
}

/// When the rotation axis dirty flag is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RotationClear {
    /// Cleared by `ArmState::invalidate` together with X/Y/Z.
    #[default]
    Tick,
    /// Cleared by the dispatch step right after ROTATE is sent.
    Dispatch,
}

/// Arm axes and home position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmConfig {
    /// Home position [X, Y, Z] used at session start.
    #[serde(default = "default_home")]
    pub home: [i32; 3],

    /// X axis (absolute).
    #[serde(default = "default_x_axis")]
    pub x: AxisConfig,

    /// Y axis (absolute).
    #[serde(default = "default_y_axis")]
    pub y: AxisConfig,

    /// Z axis (absolute).
    #[serde(default = "default_z_axis")]
    pub z: AxisConfig,

    /// Rotation axis (relative).
    #[serde(default = "default_r_axis")]
    pub r: AxisConfig,

    /// Rotation dirty-flag clearing policy.
    #[serde(default)]
    pub rotation_clear: RotationClear,
}

impl Default for ArmConfig {
    fn default() -> Self {
        Self {
            home: default_home(),
            x: default_x_axis(),
            y: default_y_axis(),
            z: default_z_axis(),
            r: default_r_axis(),
            rotation_clear: RotationClear::default(),
        }
    }
}

impl ArmConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.x.validate("x")?;
        self.y.validate("y")?;
        self.z.validate("z")?;
        self.r.validate("r")?;

        for ((name, axis), value) in [("x", &self.x), ("y", &self.y), ("z", &self.z)]
            .into_iter()
            .zip(self.home)
        {
            if !axis.contains(value) {
                return Err(ConfigError::ValidationError(format!(
                    "arm.home {name}={value} outside [{}, {}]",
                    axis.min, axis.max
                )));
            }
        }
        Ok(())
    }
}

/// Known joystick layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ControllerKind {
    /// Xbox-style pad: left stick X/Y, right stick vertical Z,
    /// right stick horizontal R, A grab, Y push, B release.
    #[default]
    Xbox,
    /// Layout taken from `control.mapping`.
    Custom,
}

/// Raw axis index plus sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBinding {
    /// Index into the input snapshot axes.
    pub index: usize,
    /// Negate the reading (stick "up" is negative on most pads).
    #[serde(default)]
    pub inverted: bool,
}

impl AxisBinding {
    /// Non-inverted binding.
    pub const fn direct(index: usize) -> Self {
        Self {
            index,
            inverted: false,
        }
    }

    /// Inverted binding.
    pub const fn inverted(index: usize) -> Self {
        Self {
            index,
            inverted: true,
        }
    }
}

/// Logical axis and button indices for one controller type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControllerMapping {
    /// Translation X.
    pub x: AxisBinding,
    /// Translation Y.
    pub y: AxisBinding,
    /// Elevation Z.
    pub z: AxisBinding,
    /// Rotation R.
    pub r: AxisBinding,
    /// Grab button index.
    pub grab: usize,
    /// Push button index.
    pub push: usize,
    /// Release button index.
    pub release: usize,
}

impl ControllerMapping {
    /// Xbox layout.
    pub const XBOX: Self = Self {
        x: AxisBinding::direct(0),
        y: AxisBinding::inverted(1),
        z: AxisBinding::inverted(4),
        r: AxisBinding::direct(3),
        grab: 0,
        push: 3,
        release: 1,
    };

    fn validate(&self) -> Result<(), ConfigError> {
        for (name, binding) in [("x", self.x), ("y", self.y), ("z", self.z), ("r", self.r)] {
            if binding.index >= MAX_INPUT_AXES {
                return Err(ConfigError::ValidationError(format!(
                    "control.mapping.{name}: axis index {} out of range (max {})",
                    binding.index,
                    MAX_INPUT_AXES - 1
                )));
            }
        }
        for (name, index) in [
            ("grab", self.grab),
            ("push", self.push),
            ("release", self.release),
        ] {
            if index >= MAX_INPUT_BUTTONS {
                return Err(ConfigError::ValidationError(format!(
                    "control.mapping.{name}: button index {index} out of range (max {})",
                    MAX_INPUT_BUTTONS - 1
                )));
            }
        }
        Ok(())
    }
}

/// Control loop and joystick configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlConfig {
    /// Loop rate [ticks/s].
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Stick deflection magnitude that must be exceeded to register.
    #[serde(default = "default_deadzone")]
    pub deadzone: f32,

    /// Controller layout.
    #[serde(default)]
    pub controller: ControllerKind,

    /// Explicit layout, required for `controller = "custom"`.
    #[serde(default)]
    pub mapping: Option<ControllerMapping>,

    /// Substring selecting the joystick among connected devices.
    #[serde(default = "default_device_name_filter")]
    pub device_name_filter: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            deadzone: default_deadzone(),
            controller: ControllerKind::default(),
            mapping: None,
            device_name_filter: default_device_name_filter(),
        }
    }
}

impl ControlConfig {
    /// Tick period derived from `tick_hz`.
    pub fn period(&self) -> Duration {
        Duration::from_secs(1) / self.tick_hz.max(1)
    }

    /// Resolve the effective controller mapping.
    ///
    /// An explicit `mapping` always wins over the preset.
    pub fn resolved_mapping(&self) -> Result<ControllerMapping, ConfigError> {
        match (self.controller, self.mapping) {
            (_, Some(mapping)) => Ok(mapping),
            (ControllerKind::Xbox, None) => Ok(ControllerMapping::XBOX),
            (ControllerKind::Custom, None) => Err(ConfigError::ValidationError(
                "control.controller = \"custom\" requires a [control.mapping] table".to_string(),
            )),
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::ValidationError(
                "control.tick_hz must be greater than 0".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.deadzone) {
            return Err(ConfigError::ValidationError(format!(
                "control.deadzone {} outside [0, 1)",
                self.deadzone
            )));
        }
        self.resolved_mapping()?.validate()
    }
}
