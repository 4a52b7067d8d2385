//! TL-04 Contract Worker - the background side of the call router.
//!
//! Owns the operation registry and the worker state, and drives the external
//! zero-knowledge contract library. The foreground reaches it only through
//! the router, using [`ContractWorkerClient`].
//!
//! # Architecture
//!
//! ```text
//! ContractWorkerClient ──► CallRouter ══ channel ══► Worker<ContractOperation>
//!                                                        │
//!                                                        ▼
//!                                               ContractDispatcher
//!                                               (WorkerState, single owner)
//!                                                │                 │
//!                                                ▼                 ▼
//!                                      ZkContractLibrary      NonceSource
//!                                      (SimulatedNetwork)     (GraphqlIndexer,
//!                                                              SimulatedNetwork)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let network = SimulatedNetwork::new();
//! let dispatcher = ContractDispatcher::new(Arc::new(network.clone()), Arc::new(network));
//! let (router, handle) = spawn_router(dispatcher, &RouterConfig::default())?;
//! let client = ContractWorkerClient::new(router);
//! client.initialize(Network::Devnet).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{GraphqlIndexer, SimulatedNetwork, ACCOUNT_CREATION_FEE, DEFAULT_INDEXER_TIMEOUT};
pub use client::ContractWorkerClient;
pub use domain::{
    Action, AmountArg, ContractKind, ContractOperation, DeployResult, IndexerError, LibraryError,
    NetworkArg, TransactionSpec, DEFAULT_TOKEN_SRC, MINT_CREATED,
};
pub use ports::{NonceSource, ZkContractLibrary, ZkTransaction};
pub use service::ContractDispatcher;
