//! # SkyStats Common
//!
//! Shared types, utilities, and common functionality for SkyStats.
//!
//! This crate provides the foundational types used across all other crates
//! in the workspace: the actor handle newtype, the error enum, and the
//! logging bootstrap.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod logging;
pub mod types;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod test_utils;

pub use error::{Result, StatsError, INVALID_HANDLE_MESSAGE, LOOKUP_FAILED_MESSAGE};
pub use logging::{init_logging, LogFormat, LoggingConfig, LoggingGuard};
pub use types::*;
pub use utils::*;
