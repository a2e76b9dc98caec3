//! Serial port transport.

use serialport::{ClearBuffer, SerialPort};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::{Transport, TransportError};
use dexjoy_common::consts::DEFAULT_READ_TIMEOUT_MS;

/// Registry name.
pub const TRANSPORT_NAME: &str = "serial";

/// Size of a single read from the port.
const READ_CHUNK: usize = 64;

/// Factory function for the registry.
pub fn create_transport() -> Box<dyn Transport> {
    Box::new(SerialTransport::new())
}

/// List the serial ports present on this machine.
pub fn available_ports() -> Result<Vec<String>, TransportError> {
    Ok(serialport::available_ports()?
        .into_iter()
        .map(|p| p.port_name)
        .collect())
}

/// Transport over a physical serial port.
///
/// Bytes past the first `\n` of a read, and a line cut short by a read
/// timeout, are kept for the next `read_line`.
pub struct SerialTransport {
    port: Option<Box<dyn SerialPort>>,
    port_name: Option<String>,
    baud: u32,
    pending: Vec<u8>,
}

impl SerialTransport {
    /// Create a closed transport.
    pub fn new() -> Self {
        Self {
            port: None,
            port_name: None,
            baud: 0,
            pending: Vec::with_capacity(READ_CHUNK * 2),
        }
    }

    /// Baud rate of the last successful open.
    pub fn baud(&self) -> u32 {
        self.baud
    }

    fn port_mut(&mut self) -> Result<&mut Box<dyn SerialPort>, TransportError> {
        self.port.as_mut().ok_or(TransportError::NotOpen)
    }

    /// Buffer freshly read bytes and return the first complete line.
    fn accept(&mut self, bytes: &[u8]) -> Option<Vec<u8>> {
        self.pending.extend_from_slice(bytes);
        self.take_line()
    }

    /// Split off the first complete line of `pending`, if any.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let rest = self.pending.split_off(end + 1);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}

impl Default for SerialTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for SerialTransport {
    fn name(&self) -> &'static str {
        TRANSPORT_NAME
    }

    fn open(&mut self, port: &str, baud: u32) -> Result<(), TransportError> {
        let handle = serialport::new(port, baud)
            .timeout(Duration::from_millis(DEFAULT_READ_TIMEOUT_MS))
            .open()
            .map_err(|e| TransportError::Open {
                port: port.to_string(),
                baud,
                reason: e.to_string(),
            })?;

        info!("Opened {} at {} baud", port, baud);
        self.port = Some(handle);
        self.port_name = Some(port.to_string());
        self.baud = baud;
        self.pending.clear();
        Ok(())
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            info!(
                "Closing {}",
                self.port_name.as_deref().unwrap_or("<unknown>")
            );
        }
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.port.is_some()
    }

    fn port(&self) -> Option<&str> {
        self.port_name.as_deref()
    }

    fn write_line(&mut self, line: &str) -> Result<(), TransportError> {
        let port = self.port_mut()?;
        port.write_all(line.as_bytes())?;
        port.flush()?;
        Ok(())
    }

    fn read_line(&mut self, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        if let Some(line) = self.take_line() {
            return Ok(line);
        }

        // A timeout returns nothing; partial bytes wait for the rest of the line.
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(Vec::new());
            }

            let port = self.port_mut()?;
            port.set_timeout(remaining)?;
            match port.read(&mut chunk) {
                Ok(n) => {
                    if let Some(line) = self.accept(&chunk[..n]) {
                        return Ok(line);
                    }
                }
                Err(e) if e.kind() == ErrorKind::TimedOut => return Ok(Vec::new()),
                Err(e) if e.kind() == ErrorKind::Interrupted => {}
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn discard_pending_input(&mut self) -> Result<(), TransportError> {
        if !self.pending.is_empty() {
            debug!("Discarding {} buffered bytes", self.pending.len());
            self.pending.clear();
        }
        self.port_mut()?.clear(ClearBuffer::Input)?;
        Ok(())
    }
}
