//! # SkyStats Web
//!
//! Web front end for SkyStats.
//!
//! Serves the search page, per-handle stats pages with SVG growth charts,
//! and a small JSON API for stats lookups and the like counter.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod pages;
pub mod routes;
pub mod server;
pub mod state;

pub use error::*;
pub use routes::create_router;
pub use server::SkyStatsServer;
pub use state::AppState;
