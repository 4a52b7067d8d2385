//! TL-02 Wallet Bridge - account discovery and transaction broadcast.
//!
//! The wallet extension is an external collaborator. Flows talk to it
//! through [`WalletProvider`]; [`DevWallet`] implements that port for local
//! development and tests by forwarding to a [`TransactionSink`].

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod adapters;
pub mod domain;
pub mod ports;

pub use adapters::DevWallet;
pub use domain::{
    explorer_link, BroadcastError, FeePayer, SendTransactionArgs, SendTransactionResult,
    WalletError, MAX_MEMO_BYTES,
};
pub use ports::{TransactionSink, WalletProvider};
