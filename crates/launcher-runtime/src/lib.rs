//! # Token Launcher Runtime
//!
//! The `token-launcher` command line. Each invocation opens the data
//! directory, starts the contract worker when a backend is available, runs
//! one flow and shuts the worker down.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌──────────────────────┐
//! │ cli::execute │───►│ flows            │───►│ ContractWorkerClient │══► worker
//! └──────────────┘    │ (deploy, mint,   │    └──────────────────────┘
//!                     │  transfer, ...)  │───► WalletProvider
//!                     └──────────────────┘───► TokenRegistry
//! ```
//!
//! Configuration comes from `TL_*` environment variables (see [`config`])
//! with command-line flags applied on top.

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod context;
pub mod flows;

pub use cli::{execute, Cli, Command, TokensCommand};
pub use config::{LauncherConfig, LauncherConfigError, DEFAULT_DATA_DIR};
pub use context::{Backend, ContextError, LauncherContext, DEV_ACCOUNT_FUNDING, DEV_ACCOUNT_SEED};
pub use flows::{
    BalanceReport, Broadcast, DeployParams, DeployReport, MintParams, TokenInfo, TransferParams,
    DEPLOY_TIMEOUT,
};
