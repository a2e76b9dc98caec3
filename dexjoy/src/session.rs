//! Arm session context.
//!
//! A `Session` bundles everything that lives for one connection to the
//! arm: the configuration, the protocol driver (which exclusively owns the
//! transport) and the `ArmState`. It is constructed once and passed
//! through the control loop.

use thiserror::Error;
use tracing::{info, warn};

use crate::input::InputError;
use dexjoy_common::arm::{ArmSnapshot, ArmState, Intent};
use dexjoy_common::config::{ConfigError, DexjoyConfig};
use dexjoy_link::{CommandProtocol, ProtocolError, ProtocolStats, Transport};

/// Error types for a dexjoy session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Link or protocol failure.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Input backend failure.
    #[error(transparent)]
    Input(#[from] InputError),

    /// No serial port given on the command line or in the configuration.
    #[error("No serial port configured (pass PORT or set serial.port)")]
    NoPort,
}

/// Result of one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Commands acknowledged during this tick.
    pub sent: usize,
    /// Arm state after dispatch, before invalidation.
    pub snapshot: ArmSnapshot,
}

/// One connection to the arm.
pub struct Session<T: Transport> {
    config: DexjoyConfig,
    protocol: CommandProtocol<T>,
    arm: ArmState,
}

impl<T: Transport> Session<T> {
    /// Build a session; the configuration is validated first.
    pub fn new(transport: T, config: DexjoyConfig) -> Result<Self, SessionError> {
        config.validate()?;
        let protocol = CommandProtocol::new(transport, &config.serial, &config.protocol);
        let arm = ArmState::from_config(&config.arm);
        if config.protocol.max_retries.is_none() && config.protocol.max_wait_ms.is_none() {
            warn!("Acknowledgment wait is unbounded: an unresponsive arm will stall the loop");
        }
        Ok(Self {
            config,
            protocol,
            arm,
        })
    }

    /// Open the link and run the initialization sequence.
    ///
    /// If the link cannot be opened nothing is sent.
    pub fn open(&mut self, port: &str) -> Result<(), SessionError> {
        self.protocol.open(port, self.config.serial.baud)?;
        self.protocol.start(self.arm.position())?;
        info!("Session ready at {:?}", self.arm.position());
        Ok(())
    }

    /// Run one tick: update, dispatch, invalidate.
    ///
    /// The arm state is invalidated even when dispatch fails.
    pub fn tick(&mut self, intent: Intent) -> Result<TickReport, SessionError> {
        self.arm.update(intent);
        let dispatched = self.protocol.dispatch(&mut self.arm);
        let snapshot = self.arm.snapshot();
        self.arm.invalidate();
        Ok(TickReport {
            sent: dispatched?,
            snapshot,
        })
    }

    /// Close the link.
    pub fn close(&mut self) {
        if self.protocol.is_open() {
            let stats = self.protocol.stats();
            info!(
                "Closing session: {} commands acknowledged, {} retransmissions",
                stats.acknowledged, stats.retransmissions
            );
        }
        self.protocol.close();
    }

    /// Current arm state.
    pub fn arm(&self) -> &ArmState {
        &self.arm
    }

    /// Session configuration.
    pub fn config(&self) -> &DexjoyConfig {
        &self.config
    }

    /// Protocol driver.
    pub fn protocol(&self) -> &CommandProtocol<T> {
        &self.protocol
    }

    /// Mutable protocol driver.
    pub fn protocol_mut(&mut self) -> &mut CommandProtocol<T> {
        &mut self.protocol
    }

    /// Protocol counters.
    pub fn stats(&self) -> ProtocolStats {
        self.protocol.stats()
    }
}
