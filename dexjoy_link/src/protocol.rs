//! Command protocol driver.
//!
//! `CommandProtocol` owns the transport and runs the DexArm
//! request/acknowledge cycle:
//!
//! ```text
//! discard stale input → write line → read lines until:
//!     contains ack token      → success
//!     contains unknown token  → rewrite the identical line, keep reading
//!     anything else / nothing → keep reading
//! ```
//!
//! With `max_retries` / `max_wait` unset the cycle never gives up, which
//! matches the firmware's expectations but stalls the caller on a dead
//! device. Setting either bound turns the stall into a `ProtocolError`.
//!
//! Every line sent (`==>`), received (`<==`) and retransmitted (`=!>`) is
//! logged.

use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::command::{Command, ToolAction};
use crate::transport::{Transport, TransportError};
use dexjoy_common::arm::ArmState;
use dexjoy_common::config::{ProtocolConfig, SerialConfig};
use dexjoy_common::consts::DEVICE_HOME;

/// Error types for protocol operations.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Underlying transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The device kept rejecting the command.
    #[error("No acknowledgment for {command:?} after {retries} retransmissions")]
    RetriesExhausted {
        /// Rejected command line (terminator stripped).
        command: String,
        /// Retransmissions performed.
        retries: u32,
    },

    /// No acknowledgment within the configured total wait.
    #[error("No acknowledgment for {command:?} within {waited:?}")]
    AckTimeout {
        /// Pending command line (terminator stripped).
        command: String,
        /// Time spent waiting.
        waited: Duration,
    },
}

/// Outcome of one acknowledged command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Exchange {
    /// Retransmissions needed before the acknowledgment.
    pub retries: u32,
    /// Response lines read, acknowledgment included.
    pub responses: u32,
}

/// Counters over the protocol session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProtocolStats {
    /// Commands acknowledged.
    pub acknowledged: u64,
    /// Lines written, retransmissions included.
    pub lines_sent: u64,
    /// Non-empty lines received.
    pub lines_received: u64,
    /// Retransmissions after an unknown-command reply.
    pub retransmissions: u64,
    /// Reads that returned nothing.
    pub empty_reads: u64,
}

/// Request/acknowledge driver over an exclusively owned transport.
pub struct CommandProtocol<T: Transport> {
    transport: T,
    read_timeout: Duration,
    feed_rate: u32,
    ack_token: String,
    unknown_token: String,
    max_retries: Option<u32>,
    max_wait: Option<Duration>,
    stats: ProtocolStats,
}

impl<T: Transport> CommandProtocol<T> {
    /// Wrap a transport with the configured protocol parameters.
    pub fn new(transport: T, serial: &SerialConfig, protocol: &ProtocolConfig) -> Self {
        Self {
            transport,
            read_timeout: serial.read_timeout(),
            feed_rate: protocol.feed_rate,
            ack_token: protocol.ack_token.clone(),
            unknown_token: protocol.unknown_token.clone(),
            max_retries: protocol.max_retries,
            max_wait: protocol.max_wait(),
            stats: ProtocolStats::default(),
        }
    }

    /// Open the underlying transport.
    pub fn open(&mut self, port: &str, baud: u32) -> Result<(), ProtocolError> {
        self.transport.open(port, baud)?;
        info!(
            "Link '{}' open on {} at {} baud",
            self.transport.name(),
            port,
            baud
        );
        Ok(())
    }

    /// Close the underlying transport.
    pub fn close(&mut self) {
        self.transport.close();
    }

    /// Whether the transport is open.
    pub fn is_open(&self) -> bool {
        self.transport.is_open()
    }

    /// Initialization sequence: firmware init, rotary init, move to `home`.
    pub fn start(&mut self, home: [i32; 3]) -> Result<(), ProtocolError> {
        info!("Initializing arm, home = {:?}", home);
        self.init()?;
        self.init_rotary()?;
        self.move_to(home)?;
        Ok(())
    }

    /// Emit the commands implied by this tick's `ArmState`.
    ///
    /// Order: ROTATE, MOVE + WAIT, GRAB or PUSH, RELEASE. Returns the
    /// number of commands acknowledged.
    pub fn dispatch(&mut self, arm: &mut ArmState) -> Result<usize, ProtocolError> {
        let mut sent = 0;

        if arm.r.is_dirty() {
            self.rotate(arm.r.value())?;
            arm.rotation_dispatched();
            sent += 1;
        }

        if arm.dirty {
            self.move_to(arm.position())?;
            self.wait()?;
            sent += 2;
        }

        if arm.grab {
            self.tool(ToolAction::Grab)?;
            sent += 1;
        } else if arm.push {
            self.tool(ToolAction::Push)?;
            sent += 1;
        }

        if arm.release && !arm.grab {
            self.tool(ToolAction::Release)?;
            sent += 1;
        }

        Ok(sent)
    }

    /// Send one command and wait for its acknowledgment.
    pub fn send(&mut self, command: &Command) -> Result<Exchange, ProtocolError> {
        if !self.transport.is_open() {
            return Err(TransportError::NotOpen.into());
        }

        let line = command.line();
        let shown = line.trim_end();

        self.transport.discard_pending_input()?;
        self.transport.write_line(&line)?;
        self.stats.lines_sent += 1;
        debug!("==> {}", shown);

        let started = Instant::now();
        let mut exchange = Exchange {
            retries: 0,
            responses: 0,
        };

        loop {
            let response = self.transport.read_line(self.read_timeout)?;

            if response.is_empty() {
                self.stats.empty_reads += 1;
                trace!("No response to {} yet ({:?})", shown, started.elapsed());
            } else {
                self.stats.lines_received += 1;
                exchange.responses += 1;
                let text = String::from_utf8_lossy(&response);
                let text = text.trim_end();
                debug!("<== {}", text);

                if text.contains(self.ack_token.as_str()) {
                    self.stats.acknowledged += 1;
                    return Ok(exchange);
                }

                if text.contains(self.unknown_token.as_str()) {
                    if self.max_retries.is_some_and(|max| exchange.retries >= max) {
                        return Err(ProtocolError::RetriesExhausted {
                            command: shown.to_string(),
                            retries: exchange.retries,
                        });
                    }
                    warn!("=!= {} (send error)", text);
                    self.transport.write_line(&line)?;
                    exchange.retries += 1;
                    self.stats.lines_sent += 1;
                    self.stats.retransmissions += 1;
                    warn!("=!> {} (retry #{})", shown, exchange.retries);
                }
            }

            if let Some(max_wait) = self.max_wait {
                let waited = started.elapsed();
                if waited >= max_wait {
                    return Err(ProtocolError::AckTimeout {
                        command: shown.to_string(),
                        waited,
                    });
                }
            }
        }
    }

    /// Firmware initialization.
    pub fn init(&mut self) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Init)
    }

    /// Select and initialize the rotary module.
    pub fn init_rotary(&mut self) -> Result<Exchange, ProtocolError> {
        self.send(&Command::RotaryMode)?;
        self.send(&Command::RotaryEnable)
    }

    /// Absolute XYZ move at the configured feed rate.
    pub fn move_to(&mut self, [x, y, z]: [i32; 3]) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Move {
            x,
            y,
            z,
            feed: self.feed_rate,
        })
    }

    /// Absolute XY move.
    pub fn move_xy(&mut self, x: i32, y: i32) -> Result<Exchange, ProtocolError> {
        self.send(&Command::MoveXy { x, y })
    }

    /// Absolute Z move.
    pub fn move_z(&mut self, z: i32) -> Result<Exchange, ProtocolError> {
        self.send(&Command::MoveZ(z))
    }

    /// Device maximum-height pose.
    pub fn home(&mut self) -> Result<Exchange, ProtocolError> {
        self.move_to(DEVICE_HOME)
    }

    /// Rotary module move.
    pub fn rotate(&mut self, r: i32) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Rotate(r))
    }

    /// Tool action.
    pub fn tool(&mut self, action: ToolAction) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Tool(action))
    }

    /// Block until queued motion completes.
    pub fn wait(&mut self) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Wait)
    }

    /// Set the default feed rate.
    pub fn speed(&mut self, feed: u32) -> Result<Exchange, ProtocolError> {
        self.send(&Command::Speed(feed))
    }

    /// Session counters.
    pub fn stats(&self) -> ProtocolStats {
        self.stats
    }

    /// Feed rate used by `move_to`.
    pub fn feed_rate(&self) -> u32 {
        self.feed_rate
    }

    /// Borrow the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the transport.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dexjoy_common::arm::Intent;
    use dexjoy_common::config::{ArmConfig, RotationClear};
    use std::collections::VecDeque;

    /// Transport replaying canned responses and recording writes.
    #[derive(Default)]
    struct CannedTransport {
        open: bool,
        written: Vec<String>,
        responses: VecDeque<&'static str>,
        discards: u32,
    }

    impl CannedTransport {
        fn opened(responses: &[&'static str]) -> Self {
            Self {
                open: true,
                responses: responses.iter().copied().collect(),
                ..Self::default()
            }
        }
    }

    impl Transport for CannedTransport {
        fn name(&self) -> &'static str {
            "canned"
        }
        fn open(&mut self, _port: &str, _baud: u32) -> Result<(), TransportError> {
            self.open = true;
            Ok(())
        }
        fn close(&mut self) {
            self.open = false;
        }
        fn is_open(&self) -> bool {
            self.open
        }
        fn port(&self) -> Option<&str> {
            None
        }
        fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
            self.written.push(line.to_string());
            Ok(())
        }
        fn read_line(&mut self, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
            Ok(self
                .responses
                .pop_front()
                .map(|r| r.as_bytes().to_vec())
                .unwrap_or_default())
        }
        fn discard_pending_input(&mut self) -> Result<(), TransportError> {
            self.discards += 1;
            Ok(())
        }
    }

    fn protocol(responses: &[&'static str]) -> CommandProtocol<CannedTransport> {
        CommandProtocol::new(
            CannedTransport::opened(responses),
            &SerialConfig::default(),
            &ProtocolConfig::default(),
        )
    }

    #[test]
    fn ack_on_first_line() {
        let mut p = protocol(&["ok\n"]);
        let exchange = p.wait().unwrap();
        assert_eq!(
            exchange,
            Exchange {
                retries: 0,
                responses: 1
            }
        );
        assert_eq!(p.transport().written, vec!["M400\r\n"]);
        assert_eq!(p.transport().discards, 1);
    }

    #[test]
    fn retransmits_identical_line_on_unknown_command() {
        let mut p = protocol(&[
            "echo:Unknown command: \"G0X\"\n",
            "echo:Unknown command: \"G0X\"\n",
            "echo:Unknown command: \"G0X\"\n",
            "ok\n",
        ]);
        let exchange = p.move_to([10, 300, 0]).unwrap();
        assert_eq!(exchange.retries, 3);
        let written = &p.transport().written;
        assert_eq!(written.len(), 4);
        assert!(written.iter().all(|l| l == "G0X10Y300Z0F10000\r\n"));
        assert_eq!(p.stats().retransmissions, 3);
        assert_eq!(p.stats().lines_sent, 4);
        assert_eq!(p.stats().acknowledged, 1);
        // Stale input is discarded once, before the first write only.
        assert_eq!(p.transport().discards, 1);
    }

    #[test]
    fn other_responses_do_not_retransmit() {
        let mut p = protocol(&[
            "",
            "busy: processing\n",
            "echo:  M400\n",
            "",
            "ok\n",
        ]);
        let exchange = p.wait().unwrap();
        assert_eq!(exchange.retries, 0);
        assert_eq!(exchange.responses, 3);
        assert_eq!(p.transport().written.len(), 1);
        assert_eq!(p.stats().empty_reads, 2);
    }

    #[test]
    fn partial_line_keeps_waiting() {
        let mut p = protocol(&["o", "", "ok\r\n"]);
        assert!(p.wait().is_ok());
        assert_eq!(p.transport().written.len(), 1);
    }

    #[test]
    fn retry_bound_surfaces_error() {
        let mut config = ProtocolConfig::default();
        config.max_retries = Some(2);
        let mut p = CommandProtocol::new(
            CannedTransport::opened(&["Unknown command\n"; 5]),
            &SerialConfig::default(),
            &config,
        );
        let err = p.rotate(10).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::RetriesExhausted { retries: 2, .. }
        ));
        assert_eq!(p.transport().written.len(), 3);
    }

    #[test]
    fn wait_bound_surfaces_error() {
        let mut config = ProtocolConfig::default();
        config.max_wait_ms = Some(0);
        let mut p = CommandProtocol::new(
            CannedTransport::opened(&[]),
            &SerialConfig::default(),
            &config,
        );
        assert!(matches!(p.wait(), Err(ProtocolError::AckTimeout { .. })));
    }

    #[test]
    fn closed_transport_sends_nothing() {
        let mut p = CommandProtocol::new(
            CannedTransport::default(),
            &SerialConfig::default(),
            &ProtocolConfig::default(),
        );
        assert!(matches!(
            p.init(),
            Err(ProtocolError::Transport(TransportError::NotOpen))
        ));
        assert!(p.transport().written.is_empty());
    }

    #[test]
    fn start_sequence() {
        let mut p = protocol(&["ok\n"; 4]);
        p.start([0, 300, 0]).unwrap();
        assert_eq!(
            p.transport().written,
            vec![
                "M1112\r\n",
                "M888 P6\r\n",
                "M2100\r\n",
                "G0X0Y300Z0F10000\r\n"
            ]
        );
    }

    #[test]
    fn helpers_render_expected_lines() {
        let mut p = protocol(&["ok\n"; 5]);
        p.home().unwrap();
        p.move_xy(1, 2).unwrap();
        p.move_z(3).unwrap();
        p.speed(2500).unwrap();
        p.tool(ToolAction::Push).unwrap();
        assert_eq!(
            p.transport().written,
            vec![
                "G0X0Y295Z167F10000\r\n",
                "G0X1Y2\r\n",
                "G0Z3\r\n",
                "G0F2500\r\n",
                "M1001\r\n"
            ]
        );
    }

    #[test]
    fn dispatch_move_then_wait() {
        let mut p = protocol(&["ok\n"; 8]);
        let mut arm = ArmState::default();
        arm.update(Intent {
            dx: 1,
            ..Intent::default()
        });
        assert_eq!(p.dispatch(&mut arm).unwrap(), 2);
        assert_eq!(
            p.transport().written,
            vec!["G0X10Y300Z0F10000\r\n", "M400\r\n"]
        );
    }

    #[test]
    fn dispatch_full_order() {
        let mut p = protocol(&["ok\n"; 8]);
        let mut arm = ArmState::default();
        arm.update(Intent {
            dx: 0,
            dy: 1,
            dz: 0,
            dr: -1,
            grab: false,
            push: true,
            release: true,
        });
        assert_eq!(p.dispatch(&mut arm).unwrap(), 5);
        assert_eq!(
            p.transport().written,
            vec![
                "M2101 R-10\r\n",
                "G0X0Y310Z0F10000\r\n",
                "M400\r\n",
                "M1001\r\n",
                "M1002\r\n"
            ]
        );
    }

    #[test]
    fn dispatch_grab_wins_over_push_and_release() {
        let mut p = protocol(&["ok\n"; 4]);
        let mut arm = ArmState::default();
        arm.grab = true;
        arm.push = true;
        arm.release = true;
        assert_eq!(p.dispatch(&mut arm).unwrap(), 1);
        assert_eq!(p.transport().written, vec!["M1000\r\n"]);
    }

    #[test]
    fn dispatch_idle_sends_nothing() {
        let mut p = protocol(&[]);
        let mut arm = ArmState::default();
        arm.update(Intent::default());
        assert_eq!(p.dispatch(&mut arm).unwrap(), 0);
        assert!(p.transport().written.is_empty());
    }

    #[test]
    fn dispatch_clears_rotation_under_dispatch_policy() {
        let mut p = protocol(&["ok\n"; 2]);
        let mut arm = ArmState::from_config(&ArmConfig {
            rotation_clear: RotationClear::Dispatch,
            ..ArmConfig::default()
        });
        arm.update(Intent {
            dr: 1,
            ..Intent::default()
        });
        p.dispatch(&mut arm).unwrap();
        assert!(!arm.r.is_dirty());
        // A second dispatch in the same tick must not resend.
        assert_eq!(p.dispatch(&mut arm).unwrap(), 0);
        assert_eq!(p.transport().written, vec!["M2101 R10\r\n"]);
    }
}
