use shared_types::KeyError;
use thiserror::Error;
use tl_01_call_router::WorkerFailure;

use super::transaction::ContractKind;

/// Errors raised by the contract library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error("No active network instance")]
    NoActiveNetwork,

    #[error("Contracts not loaded")]
    NotLoaded,

    #[error("{0} is not compiled")]
    NotCompiled(ContractKind),

    #[error("Token contract {0} is not deployed")]
    NotDeployed(String),

    #[error("Token contract {0} is not initialized")]
    NotInitialized(String),

    #[error("Insufficient balance for {account}: has {available}, needs {required}")]
    InsufficientBalance {
        account: String,
        available: u64,
        required: u64,
    },

    #[error("Transaction is not proven")]
    NotProven,

    #[error("{0}")]
    Rejected(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from the network indexer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexerError {
    #[error("Indexer request failed: {0}")]
    Http(String),

    #[error("Indexer returned HTTP {0}")]
    Status(u16),

    #[error("Indexer query failed: {0}")]
    Query(String),

    #[error("Account {0} not found")]
    AccountNotFound(String),

    #[error("Unexpected indexer response: {0}")]
    Malformed(String),
}

impl From<LibraryError> for WorkerFailure {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Key(_) => WorkerFailure::invalid_arguments(err.to_string()),
            LibraryError::NoActiveNetwork | LibraryError::NotLoaded => {
                WorkerFailure::invalid_state(err.to_string())
            }
            _ => WorkerFailure::library(err.to_string()),
        }
    }
}

impl From<IndexerError> for WorkerFailure {
    fn from(err: IndexerError) -> Self {
        WorkerFailure::indexer(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_01_call_router::FailureKind;

    #[test]
    fn test_failure_kinds() {
        let key = LibraryError::Key(KeyError::BadPrefix {
            kind: "public",
            expected: "B62",
        });
        assert_eq!(WorkerFailure::from(key).kind, FailureKind::InvalidArguments);
        assert_eq!(
            WorkerFailure::from(LibraryError::NotLoaded).kind,
            FailureKind::InvalidState
        );
        assert_eq!(
            WorkerFailure::from(LibraryError::NotProven).kind,
            FailureKind::Library
        );
        assert_eq!(
            WorkerFailure::from(IndexerError::Status(502)).kind,
            FailureKind::Indexer
        );
    }

    #[test]
    fn test_failure_keeps_message() {
        let failure = WorkerFailure::from(LibraryError::NotCompiled(ContractKind::FungibleToken));
        assert_eq!(failure.message, "FungibleToken is not compiled");
    }
}
