//! # Ports
//!
//! - **Inbound**: [`WalletProvider`], the wallet extension as seen by the flows
//! - **Outbound**: [`TransactionSink`], where a wallet sends signed transactions

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{BroadcastError, SendTransactionArgs, SendTransactionResult, WalletError};

/// Browser wallet extension interface.
#[async_trait]
pub trait WalletProvider: Send + Sync {
    /// Accounts already authorised for this site. Empty until connected.
    async fn get_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Ask the user to connect and return the authorised accounts.
    async fn request_accounts(&self) -> Result<Vec<String>, WalletError>;

    /// Pay for, sign and broadcast a proved transaction.
    async fn send_transaction(
        &self,
        args: SendTransactionArgs,
    ) -> Result<SendTransactionResult, WalletError>;

    /// Account-change events. Each event carries the new account list.
    fn subscribe_accounts(&self) -> broadcast::Receiver<Vec<String>>;
}

/// Network submission endpoint used by a wallet.
#[async_trait]
pub trait TransactionSink: Send + Sync {
    /// Submit a transaction and return its hash.
    async fn submit(
        &self,
        transaction: &str,
        fee_nanomina: u64,
        memo: &str,
    ) -> Result<String, BroadcastError>;
}
