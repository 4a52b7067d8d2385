//! TL-03 Token Registry - the locally persisted token list.
//!
//! Records keep the browser's `localStorage` shape so a list exported from
//! the web front-end can be dropped into the data directory as-is.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{TokenRegistry, NETWORK_FILE, TOKENS_FILE};
