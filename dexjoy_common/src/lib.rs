//! dexjoy Common Library
//!
//! Shared constants, configuration loading and the arm state model used by
//! every crate of the dexjoy workspace.
//!
//! # Module Structure
//!
//! - [`arm`] - Axis integrators, button edge filters and the aggregated `ArmState`
//! - [`config`] - Configuration loading traits and the `DexjoyConfig` tree
//! - [`consts`] - Device and session constants
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use dexjoy_common::prelude::*;
//!
//! let config = DexjoyConfig::default();
//! let mut arm = ArmState::from_config(&config.arm);
//! arm.update(Intent { dx: 1, ..Intent::default() });
//! assert_eq!(arm.x.value(), 10);
//! ```

#![deny(missing_docs)]

pub mod arm;
pub mod config;
pub mod consts;
pub mod prelude;
