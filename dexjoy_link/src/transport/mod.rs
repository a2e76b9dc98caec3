//! Line-oriented transports to the arm.
//!
//! This module defines:
//! - `Transport` trait - Interface for the byte link carrying command lines
//! - `TransportError` enum - Error types for transport operations
//! - `TransportRegistry` - Name → factory lookup for the built-in transports
//!
//! # Implementations
//!
//! - [`serial::SerialTransport`] - Physical serial port (`serialport` crate)
//! - [`simulation::SimulatedArm`] - In-process device model for dry runs and tests

pub mod serial;
pub mod simulation;

use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

pub use serial::SerialTransport;
pub use simulation::SimulatedArm;

/// Error types for transport operations.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The link could not be opened.
    #[error("Failed to open {port} at {baud} baud: {reason}")]
    Open {
        /// Port identifier.
        port: String,
        /// Requested baud rate.
        baud: u32,
        /// Underlying cause.
        reason: String,
    },

    /// Operation attempted on a closed link.
    #[error("Transport not open")]
    NotOpen,

    /// Read or write failure.
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serial port configuration failure.
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// No transport registered under the requested name.
    #[error("Transport not found: {0}")]
    UnknownTransport(String),
}

/// Factory function type for creating transport instances.
pub type TransportFactory = fn() -> Box<dyn Transport>;

/// Half-duplex, line-oriented byte link.
///
/// # Lifecycle
///
/// 1. `open()` - Once per session; failure is reported, never fatal
/// 2. `discard_pending_input()` / `write_line()` / `read_line()` - Per command
/// 3. `close()` - At session end
///
/// `read_line` blocks at most `timeout` and returns whatever arrived,
/// which may be a partial line or nothing at all.
pub trait Transport: Send {
    /// Returns the transport's identifier (e.g., "serial", "simulation").
    fn name(&self) -> &'static str;

    /// Open the link.
    fn open(&mut self, port: &str, baud: u32) -> Result<(), TransportError>;

    /// Close the link. Closing a closed link is a no-op.
    fn close(&mut self);

    /// Whether the link is open.
    fn is_open(&self) -> bool;

    /// Last port identifier passed to a successful `open`.
    fn port(&self) -> Option<&str>;

    /// Write one complete line (terminator included).
    fn write_line(&mut self, line: &str) -> Result<(), TransportError>;

    /// Read up to and including the next `\n`, or whatever arrived before
    /// `timeout` elapsed.
    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// Drop any unread input.
    fn discard_pending_input(&mut self) -> Result<(), TransportError>;
}

impl Transport for Box<dyn Transport> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn open(&mut self, port: &str, baud: u32) -> Result<(), TransportError> {
        (**self).open(port, baud)
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }

    fn port(&self) -> Option<&str> {
        (**self).port()
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        (**self).write_line(line)
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).read_line(timeout)
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        (**self).discard_pending_input()
    }
}

/// Registry of available transports.
///
/// Constructed at startup and passed by value; no global state.
pub struct TransportRegistry {
    factories: HashMap<&'static str, TransportFactory>,
}

impl TransportRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry holding the built-in "serial" and "simulation" transports.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(serial::TRANSPORT_NAME, serial::create_transport);
        registry.register(simulation::TRANSPORT_NAME, simulation::create_transport);
        registry
    }

    /// Register a transport factory.
    ///
    /// # Panics
    /// Panics if a transport with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: TransportFactory) {
        if self.factories.contains_key(name) {
            panic!("Transport '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Create a transport instance by name.
    ///
    /// # Errors
    /// Returns `TransportError::UnknownTransport` if nothing is registered under `name`.
    pub fn create(&self, name: &str) -> Result<Box<dyn Transport>, TransportError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| TransportError::UnknownTransport(name.to_string()))?;
        Ok(factory())
    }

    /// List all registered transport names.
    pub fn list(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for TransportRegistry {
    fn default() -> Self {
        Self::with_builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_lists_both_transports() {
        let mut names = TransportRegistry::with_builtin().list();
        names.sort();
        assert_eq!(names, vec!["serial", "simulation"]);
    }

    #[test]
    fn create_by_name() {
        let registry = TransportRegistry::with_builtin();
        let transport = registry.create("simulation").expect("should create");
        assert_eq!(transport.name(), "simulation");
        assert!(!transport.is_open());
    }

    #[test]
    fn unknown_name() {
        let registry = TransportRegistry::new();
        assert!(matches!(
            registry.create("can"),
            Err(TransportError::UnknownTransport(_))
        ));
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn duplicate_panics() {
        let mut registry = TransportRegistry::with_builtin();
        registry.register("serial", serial::create_transport);
    }

    #[test]
    fn open_error_names_port() {
        let err = TransportError::Open {
            port: "/dev/ttyUSB9".to_string(),
            baud: 115_200,
            reason: "No such file or directory".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("/dev/ttyUSB9"));
        assert!(text.contains("115200"));
    }
}
