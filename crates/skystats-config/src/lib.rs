//! # SkyStats Config
//!
//! Type-safe configuration management for SkyStats.
//!
//! This crate provides the configuration schema with defaults, TOML loading
//! with environment overrides, and validation.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod defaults;
pub mod loader;
pub mod schema;
pub mod validator;

pub use defaults::*;
pub use loader::*;
pub use schema::*;
pub use validator::*;
