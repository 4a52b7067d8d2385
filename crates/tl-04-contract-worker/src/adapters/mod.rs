//! Adapters for the outbound ports.
//!
//! - [`GraphqlIndexer`]: nonce lookups over HTTP
//! - [`SimulatedNetwork`]: in-memory library, indexer and broadcast endpoint

pub mod graphql_indexer;
pub mod simulated;

pub use graphql_indexer::{GraphqlIndexer, DEFAULT_INDEXER_TIMEOUT};
pub use simulated::{SimulatedNetwork, ACCOUNT_CREATION_FEE};
