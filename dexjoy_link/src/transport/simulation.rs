//! Simulated DexArm.
//!
//! Parses every written line as a [`Command`], applies it to an in-memory
//! device model and queues the firmware reply. Used by `--simulate` dry runs
//! and by the integration tests.
//!
//! Replies:
//! - parsed command → `ok`
//! - unparseable line, or an injected fault → `echo:Unknown command: "<line>"`

use std::collections::VecDeque;
use std::time::Duration;
use tracing::{debug, trace};

use super::{Transport, TransportError};
use crate::command::{Command, ToolAction};
use dexjoy_common::consts::{ACK_TOKEN, UNKNOWN_COMMAND_TOKEN};

/// Registry name.
pub const TRANSPORT_NAME: &str = "simulation";

/// Factory function for the registry.
pub fn create_transport() -> Box<dyn Transport> {
    Box::new(SimulatedArm::new())
}

/// Device model state visible to tests and dry-run reports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimulatedDevice {
    /// Firmware initialized (`M1112` seen).
    pub initialized: bool,
    /// Rotary module selected as end effector (`M888 P6`).
    pub rotary_selected: bool,
    /// Rotary module selected and initialized (`M2100`).
    pub rotary_ready: bool,
    /// Current XYZ position.
    pub position: [i32; 3],
    /// Accumulated rotary position.
    pub rotation: i32,
    /// Current feed rate.
    pub feed_rate: u32,
    /// Last tool action.
    pub tool: Option<ToolAction>,
    /// Every accepted command, in order.
    pub history: Vec<Command>,
    /// Every raw line received, in order (including rejected ones).
    pub received: Vec<String>,
}

/// In-process arm answering the DexArm protocol.
#[derive(Debug, Default)]
pub struct SimulatedArm {
    open: bool,
    port: Option<String>,
    device: SimulatedDevice,
    replies: VecDeque<Vec<u8>>,
    faults: u32,
}

impl SimulatedArm {
    /// Create a closed simulated arm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject the next `count` lines with the unknown-command reply.
    pub fn inject_faults(&mut self, count: u32) {
        self.faults = self.faults.saturating_add(count);
    }

    /// Device model state.
    pub fn device(&self) -> &SimulatedDevice {
        &self.device
    }

    fn queue(&mut self, reply: String) {
        self.replies.push_back(format!("{reply}\n").into_bytes());
    }

    fn apply(&mut self, command: Command) {
        let device = &mut self.device;
        match command {
            Command::Init => device.initialized = true,
            Command::RotaryMode => device.rotary_selected = true,
            Command::RotaryEnable => device.rotary_ready = device.rotary_selected,
            Command::Move { x, y, z, feed } => {
                device.position = [x, y, z];
                device.feed_rate = feed;
            }
            Command::MoveXy { x, y } => {
                device.position[0] = x;
                device.position[1] = y;
            }
            Command::MoveZ(z) => device.position[2] = z,
            Command::Rotate(r) => device.rotation = device.rotation.saturating_add(r),
            Command::Tool(action) => device.tool = Some(action),
            Command::Wait => {}
            Command::Speed(feed) => device.feed_rate = feed,
        }
        device.history.push(command);
    }
}

impl Transport for SimulatedArm {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn open(&mut self, port: &str, baud: u32) -> Result<(), TransportError> {
        debug!("Simulated arm opened on {} ({} baud)", port, baud);
        self.open = true;
        self.port = Some(port.to_string());
        self.replies.clear();
        Ok(())
    }

    fn close(&mut self) {
        self.open = false;
        self.replies.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        let text = line.trim_end().to_string();
        self.device.received.push(text.clone());

        if self.faults > 0 {
            self.faults -= 1;
            trace!("Injected fault for {:?}", text);
            self.queue(format!("echo:{UNKNOWN_COMMAND_TOKEN}: \"{text}\""));
            return Ok(());
        }

        match text.parse::<Command>() {
            Ok(command) => {
                self.apply(command);
                self.queue(ACK_TOKEN.to_string());
            }
            Err(_) => self.queue(format!("echo:{UNKNOWN_COMMAND_TOKEN}: \"{text}\"")),
        }
        Ok(())
    }

    fn read_line(&mut self, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        Ok(self.replies.pop_front().unwrap_or_default())
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        if !self.open {
            return Err(TransportError::NotOpen);
        }
        self.replies.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> SimulatedArm {
        let mut arm = SimulatedArm::new();
        arm.open("sim0", 115_200).unwrap();
        arm
    }

    #[test]
    fn closed_arm_rejects_writes() {
        let mut arm = SimulatedArm::new();
        assert!(matches!(
            arm.write_line("M400\r\n"),
            Err(TransportError::NotOpen)
        ));
    }

    #[test]
    fn acknowledges_known_commands() {
        let mut arm = opened();
        arm.write_line("G0X10Y300Z0F10000\r\n").unwrap();
        assert_eq!(arm.read_line(Duration::ZERO).unwrap(), b"ok\n");
        assert_eq!(arm.device().position, [10, 300, 0]);
        assert_eq!(arm.device().feed_rate, 10_000);
    }

    #[test]
    fn rejects_unknown_commands() {
        let mut arm = opened();
        arm.write_line("G28\r\n").unwrap();
        let reply = String::from_utf8(arm.read_line(Duration::ZERO).unwrap()).unwrap();
        assert!(reply.contains(UNKNOWN_COMMAND_TOKEN));
        assert!(arm.device().history.is_empty());
        assert_eq!(arm.device().received, vec!["G28".to_string()]);
    }

    #[test]
    fn injected_faults_then_recovers() {
        let mut arm = opened();
        arm.inject_faults(2);
        for _ in 0..2 {
            arm.write_line("M400\r\n").unwrap();
            let reply = arm.read_line(Duration::ZERO).unwrap();
            assert!(String::from_utf8_lossy(&reply).contains(UNKNOWN_COMMAND_TOKEN));
        }
        arm.write_line("M400\r\n").unwrap();
        assert_eq!(arm.read_line(Duration::ZERO).unwrap(), b"ok\n");
        assert_eq!(arm.device().history, vec![Command::Wait]);
    }

    #[test]
    fn empty_read_when_idle() {
        let mut arm = opened();
        assert!(arm.read_line(Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn rotation_accumulates() {
        let mut arm = opened();
        arm.write_line("M2101 R10\r\n").unwrap();
        arm.write_line("M2101 R10\r\n").unwrap();
        arm.write_line("M2101 R-5\r\n").unwrap();
        assert_eq!(arm.device().rotation, 15);
    }

    #[test]
    fn discard_drops_replies() {
        let mut arm = opened();
        arm.write_line("M1112\r\n").unwrap();
        arm.discard_pending_input().unwrap();
        assert!(arm.read_line(Duration::ZERO).unwrap().is_empty());
        assert!(arm.device().initialized);
    }
}
