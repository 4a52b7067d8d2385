//! # Shared Types Crate
//!
//! Domain types shared across the Token Launcher crates.
//!
//! ## Design Principles
//!
//! - **Validated at the edge**: keys are checked for prefix, length and the
//!   base58 alphabet when parsed, so downstream code never handles raw strings.
//! - **Opaque to the router**: nothing here is known to the call router; these
//!   types only appear inside operation arguments and results.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
