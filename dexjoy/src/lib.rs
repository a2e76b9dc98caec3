//! # dexjoy Library
//!
//! Joystick teleoperation of a DexArm over its serial G-code link.
//!
//! # Module Structure
//!
//! - [`input`] - Input sources and the per-tick sampler (deadzone, edges)
//! - [`session`] - `Session`: configuration, protocol driver and arm state
//! - [`control`] - Fixed-rate control loop
//! - [`display`] - Operator status display
//! - [`monitor`] - Raw joystick monitor (`--joydbg`)
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐ poll ┌──────────────┐ Intent ┌─────────────────────────┐
//! │ InputSource  │─────►│   Sampler    │───────►│ Session                 │
//! │ script|gilrs │      │ deadzone/edge│        │ ArmState → dispatch()   │
//! └──────────────┘      └──────────────┘        └────────────┬────────────┘
//!                                                            │ G-code lines
//!                                                            ▼
//!                                               ┌─────────────────────────┐
//!                                               │ Transport (serial | sim)│
//!                                               └─────────────────────────┘
//! ```

#![deny(missing_docs)]

pub mod control;
pub mod display;
pub mod input;
pub mod monitor;
pub mod session;

pub use crate::control::{ControlLoop, LoopStats};
pub use crate::display::{LogDisplay, StatusDisplay};
pub use crate::input::{InputError, InputSnapshot, InputSource, Sampler, ScriptedInput};
pub use crate::monitor::InputMonitor;
pub use crate::session::{Session, SessionError, TickReport};
