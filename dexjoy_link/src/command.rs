//! DexArm wire commands.
//!
//! Each [`Command`] renders to one G-code line (without terminator) via
//! `Display` and parses back with `FromStr`. The protocol appends
//! `\r\n` before transmission.
//!
//! | Command                 | Wire                  |
//! |-------------------------|-----------------------|
//! | `Init`                  | `M1112`               |
//! | `RotaryMode`            | `M888 P6`             |
//! | `RotaryEnable`          | `M2100`               |
//! | `Move { x, y, z, feed }`| `G0X{x}Y{y}Z{z}F{f}`  |
//! | `MoveXy { x, y }`       | `G0X{x}Y{y}`          |
//! | `MoveZ(z)`              | `G0Z{z}`              |
//! | `Rotate(r)`             | `M2101 R{r}`          |
//! | `Tool(action)`          | `M1000`/`M1001`/`M1002` |
//! | `Wait`                  | `M400`                |
//! | `Speed(f)`              | `G0F{f}`              |

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use dexjoy_common::consts::LINE_TERMINATOR;

/// Gripper / suction tool actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ToolAction {
    /// Close the gripper.
    Grab = 0,
    /// Push (blow) with the pneumatic module.
    Push = 1,
    /// Open the gripper / stop the pump.
    Release = 2,
}

impl ToolAction {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::Grab),
            1 => Some(Self::Push),
            2 => Some(Self::Release),
            _ => None,
        }
    }
}

/// One device command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Firmware initialization.
    Init,
    /// Select the rotary module as end effector.
    RotaryMode,
    /// Initialize the rotary module.
    RotaryEnable,
    /// Absolute XYZ move at a feed rate.
    Move {
        /// X target.
        x: i32,
        /// Y target.
        y: i32,
        /// Z target.
        z: i32,
        /// Feed rate [mm/min].
        feed: u32,
    },
    /// Absolute XY move at the current feed rate.
    MoveXy {
        /// X target.
        x: i32,
        /// Y target.
        y: i32,
    },
    /// Absolute Z move at the current feed rate.
    MoveZ(i32),
    /// Rotary module move.
    Rotate(i32),
    /// Tool action.
    Tool(ToolAction),
    /// Block until all queued motion has completed.
    Wait,
    /// Set the default feed rate.
    Speed(u32),
}

impl Command {
    /// Full wire line including the terminator.
    pub fn line(&self) -> String {
        format!("{self}{LINE_TERMINATOR}")
    }

    /// Whether the command moves the arm.
    pub fn is_motion(&self) -> bool {
        matches!(
            self,
            Self::Move { .. } | Self::MoveXy { .. } | Self::MoveZ(_) | Self::Rotate(_)
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => f.write_str("M1112"),
            Self::RotaryMode => f.write_str("M888 P6"),
            Self::RotaryEnable => f.write_str("M2100"),
            Self::Move { x, y, z, feed } => write!(f, "G0X{x}Y{y}Z{z}F{feed}"),
            Self::MoveXy { x, y } => write!(f, "G0X{x}Y{y}"),
            Self::MoveZ(z) => write!(f, "G0Z{z}"),
            Self::Rotate(r) => write!(f, "M2101 R{r}"),
            Self::Tool(action) => write!(f, "M100{}", *action as u8),
            Self::Wait => f.write_str("M400"),
            Self::Speed(feed) => write!(f, "G0F{feed}"),
        }
    }
}

/// Error returned when a line is not a known command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown command: {0:?}")]
pub struct ParseCommandError(pub String);

/// Parameter words of a `G0` line.
#[derive(Default)]
struct G0Words {
    x: Option<i32>,
    y: Option<i32>,
    z: Option<i32>,
    f: Option<u32>,
}

fn parse_g0(words: &str) -> Option<G0Words> {
    let mut parsed = G0Words::default();
    let mut rest = words.trim();
    while !rest.is_empty() {
        let letter = rest.chars().next()?;
        rest = &rest[letter.len_utf8()..];
        let end = rest
            .find(|c: char| c.is_ascii_alphabetic() || c.is_whitespace())
            .unwrap_or(rest.len());
        let number = &rest[..end];
        rest = rest[end..].trim_start();
        match letter.to_ascii_uppercase() {
            'X' => parsed.x = Some(number.parse().ok()?),
            'Y' => parsed.y = Some(number.parse().ok()?),
            'Z' => parsed.z = Some(number.parse().ok()?),
            'F' => parsed.f = Some(number.parse().ok()?),
            _ => return None,
        }
    }
    Some(parsed)
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let line = s.trim();
        let unknown = || ParseCommandError(line.to_string());

        match line {
            "M1112" => return Ok(Self::Init),
            "M888 P6" => return Ok(Self::RotaryMode),
            "M2100" => return Ok(Self::RotaryEnable),
            "M400" => return Ok(Self::Wait),
            _ => {}
        }

        if let Some(r) = line.strip_prefix("M2101 R") {
            return r.trim().parse().map(Self::Rotate).map_err(|_| unknown());
        }

        if let Some(code) = line.strip_prefix("M100") {
            return code
                .parse::<u8>()
                .ok()
                .and_then(ToolAction::from_code)
                .map(Self::Tool)
                .ok_or_else(unknown);
        }

        if let Some(words) = line.strip_prefix("G0") {
            let w = parse_g0(words).ok_or_else(unknown)?;
            return match (w.x, w.y, w.z, w.f) {
                (Some(x), Some(y), Some(z), Some(feed)) => Ok(Self::Move { x, y, z, feed }),
                (Some(x), Some(y), None, None) => Ok(Self::MoveXy { x, y }),
                (None, None, Some(z), None) => Ok(Self::MoveZ(z)),
                (None, None, None, Some(feed)) => Ok(Self::Speed(feed)),
                _ => Err(unknown()),
            };
        }

        Err(unknown())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_literals() {
        assert_eq!(Command::Init.to_string(), "M1112");
        assert_eq!(Command::RotaryMode.to_string(), "M888 P6");
        assert_eq!(Command::RotaryEnable.to_string(), "M2100");
        assert_eq!(
            Command::Move {
                x: 10,
                y: 300,
                z: -5,
                feed: 10_000
            }
            .to_string(),
            "G0X10Y300Z-5F10000"
        );
        assert_eq!(Command::MoveXy { x: 1, y: 2 }.to_string(), "G0X1Y2");
        assert_eq!(Command::MoveZ(167).to_string(), "G0Z167");
        assert_eq!(Command::Rotate(-10).to_string(), "M2101 R-10");
        assert_eq!(Command::Tool(ToolAction::Grab).to_string(), "M1000");
        assert_eq!(Command::Tool(ToolAction::Push).to_string(), "M1001");
        assert_eq!(Command::Tool(ToolAction::Release).to_string(), "M1002");
        assert_eq!(Command::Wait.to_string(), "M400");
        assert_eq!(Command::Speed(3000).to_string(), "G0F3000");
    }

    #[test]
    fn line_is_crlf_terminated() {
        assert_eq!(Command::Wait.line(), "M400\r\n");
    }

    #[test]
    fn parses_every_rendered_command() {
        let commands = [
            Command::Init,
            Command::RotaryMode,
            Command::RotaryEnable,
            Command::Move {
                x: -40,
                y: 295,
                z: 167,
                feed: 10_000,
            },
            Command::MoveXy { x: 0, y: -3 },
            Command::MoveZ(-12),
            Command::Rotate(10),
            Command::Tool(ToolAction::Release),
            Command::Wait,
            Command::Speed(2000),
        ];
        for command in commands {
            assert_eq!(command.line().parse::<Command>(), Ok(command));
        }
    }

    #[test]
    fn rejects_garbage() {
        for line in ["", "G1X0", "M1003", "M2101 Rx", "G0X1", "G0Q5", "G0X1Y2Z3", "M9999"] {
            assert!(line.parse::<Command>().is_err(), "{line:?} should not parse");
        }
    }

    #[test]
    fn motion_classification() {
        assert!(Command::Rotate(1).is_motion());
        assert!(Command::MoveZ(1).is_motion());
        assert!(!Command::Wait.is_motion());
        assert!(!Command::Tool(ToolAction::Grab).is_motion());
    }
}
