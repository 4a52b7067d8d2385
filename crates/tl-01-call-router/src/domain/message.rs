//! Wire messages exchanged with the background worker.
//!
//! Outbound: `{"id": 0, "fn": "getBalance", "args": {...}}`
//!
//! Inbound:  `{"id": 0, "data": ...}` or
//!           `{"id": 0, "error": {"kind": "library", "message": "..."}}`

use crate::domain::call_id::CallId;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// A call sent from the foreground to the background worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallMessage {
    pub id: CallId,
    /// Operation name; must be in the worker's registry.
    #[serde(rename = "fn")]
    pub function: String,
    /// Operation-specific payload, passed through unmodified.
    #[serde(default)]
    pub args: Value,
}

/// A response sent by the background worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub id: CallId,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl ResponseMessage {
    pub fn data(id: CallId, data: Value) -> Self {
        Self {
            id,
            outcome: Outcome::Data(data),
        }
    }

    pub fn error(id: CallId, failure: WorkerFailure) -> Self {
        Self {
            id,
            outcome: Outcome::Error(failure),
        }
    }
}

/// Result carried by a response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Outcome {
    Data(Value),
    Error(WorkerFailure),
}

impl From<Result<Value, WorkerFailure>> for Outcome {
    fn from(result: Result<Value, WorkerFailure>) -> Self {
        match result {
            Ok(data) => Outcome::Data(data),
            Err(failure) => Outcome::Error(failure),
        }
    }
}

/// Classification of a background failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureKind {
    /// `fn` is not in the operation registry.
    UnknownOperation,
    /// `args` did not match the operation's payload.
    InvalidArguments,
    /// The worker is not in a state to run the operation (e.g. nothing loaded).
    InvalidState,
    /// The contract library rejected the operation.
    Library,
    /// The network indexer could not be queried.
    Indexer,
    Internal,
}

/// Serialized failure returned by a background handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl WorkerFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_operation(name: &str) -> Self {
        Self::new(
            FailureKind::UnknownOperation,
            format!("Unknown operation: {}", name),
        )
    }

    pub fn invalid_arguments(details: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidArguments, details)
    }

    pub fn invalid_state(details: impl Into<String>) -> Self {
        Self::new(FailureKind::InvalidState, details)
    }

    pub fn library(details: impl Into<String>) -> Self {
        Self::new(FailureKind::Library, details)
    }

    pub fn indexer(details: impl Into<String>) -> Self {
        Self::new(FailureKind::Indexer, details)
    }

    pub fn internal(details: impl Into<String>) -> Self {
        Self::new(FailureKind::Internal, details)
    }
}

/// Displays the handler's message verbatim.
impl fmt::Display for WorkerFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for WorkerFailure {}
