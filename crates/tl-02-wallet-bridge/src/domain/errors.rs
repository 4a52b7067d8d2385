use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum WalletError {
    #[error("Wallet not detected")]
    NotDetected,

    #[error("No accounts available in wallet")]
    NoAccounts,

    #[error("Invalid fee: {0}")]
    InvalidFee(f64),

    #[error("Memo is {actual} bytes, at most {max} allowed")]
    MemoTooLong { max: usize, actual: usize },

    #[error("Transaction is empty")]
    EmptyTransaction,

    #[error("Broadcast failed: {0}")]
    Broadcast(#[from] BroadcastError),
}

/// Failure reported by the network when a transaction is submitted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct BroadcastError(pub String);
