//! Window System - Live-window queries for Sightline
//!
//! This crate defines the platform-neutral window identifiers and geometry
//! used by the capture engine, plus the `WindowSystemQueries` capability
//! trait that platform integrations implement. The engine never talks to the
//! OS directly; everything goes through this seam.

mod queries;
mod types;

pub mod testing;

pub use queries::*;
pub use types::*;
