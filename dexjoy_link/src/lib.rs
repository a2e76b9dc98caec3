//! # dexjoy Link Library
//!
//! Command protocol driver and transports for the DexArm serial link.
//!
//! # Module Structure
//!
//! - [`command`] - Wire commands and their G-code rendering
//! - [`protocol`] - `CommandProtocol`: send/acknowledge/retry cycle and per-tick dispatch
//! - [`transport`] - `Transport` trait, serial and simulated implementations
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────┐ dispatch() ┌──────────────────┐ write/read ┌──────────────┐
//! │    ArmState    │───────────►│ CommandProtocol  │───────────►│  Transport   │
//! │(dexjoy_common) │            │ ack / retry loop │◄───────────│ serial | sim │
//! └────────────────┘            └──────────────────┘            └──────────────┘
//! ```

#![deny(missing_docs)]

pub mod command;
pub mod protocol;
pub mod transport;

pub use crate::command::{Command, ToolAction};
pub use crate::protocol::{CommandProtocol, Exchange, ProtocolError, ProtocolStats};
pub use crate::transport::{SerialTransport, SimulatedArm, Transport, TransportError, TransportRegistry};
