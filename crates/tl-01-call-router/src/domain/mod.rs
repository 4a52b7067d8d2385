//! Domain types for the call router.
//!
//! Wire messages, identifiers, errors and configuration. The async machinery
//! (pending table, listener, worker loop) lives outside this module.

pub mod call_id;
pub mod config;
pub mod error;
pub mod message;

pub use call_id::{CallId, CallIdAllocator};
pub use config::{ConfigError, RouterConfig, UnknownResponsePolicy};
pub use error::{ChannelError, RouterError};
pub use message::{CallMessage, FailureKind, Outcome, ResponseMessage, WorkerFailure};
