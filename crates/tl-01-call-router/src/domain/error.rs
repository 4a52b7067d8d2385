//! Router error types.

use crate::domain::call_id::CallId;
use crate::domain::message::WorkerFailure;
use std::time::Duration;
use thiserror::Error;

/// Why a call did not produce a value.
#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// The background handler failed; carries its message verbatim.
    #[error("{0}")]
    Worker(WorkerFailure),

    /// No response arrived before the call's deadline.
    #[error("call {id} ({operation}) timed out after {}ms", .after.as_millis())]
    Timeout {
        id: CallId,
        operation: String,
        after: Duration,
    },

    /// The caller cancelled the call.
    #[error("call {id} ({operation}) was cancelled")]
    Cancelled { id: CallId, operation: String },

    /// The outbound channel is closed; the call was never delivered.
    #[error("outbound channel closed")]
    ChannelClosed,

    /// The background worker stopped before responding.
    #[error("background worker stopped before responding")]
    WorkerGone,

    /// The worker answered a call that was never issued.
    #[error("protocol violation: response for unknown call {0}")]
    ProtocolViolation(CallId),

    #[error("failed to encode call: {0}")]
    Encode(String),

    #[error("failed to decode result: {0}")]
    Decode(String),
}

impl RouterError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RouterError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, RouterError::Cancelled { .. })
    }

    /// The background failure, if the handler itself failed.
    pub fn worker_failure(&self) -> Option<&WorkerFailure> {
        match self {
            RouterError::Worker(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<WorkerFailure> for RouterError {
    fn from(failure: WorkerFailure) -> Self {
        RouterError::Worker(failure)
    }
}

/// Errors from a message channel endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("channel closed")]
    Closed,
}
