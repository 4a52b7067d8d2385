//! TL-01 Call Router - request/response correlation with the background worker.
//!
//! The foreground issues named operations to a background context that owns
//! the contract library, and awaits their results. Many calls may be in
//! flight at once and responses may arrive in any order; the router pairs
//! them by call id.
//!
//! # Architecture
//!
//! ```text
//!  foreground                                   background
//! ┌──────────────────────────┐                ┌──────────────────────────┐
//! │ CallRouter::invoke       │  {id, fn, args}│ Worker::run              │
//! │   register ─► send ──────┼───────────────►│   decode ─► Dispatcher   │
//! │   await / deadline /     │                │   one frame at a time    │
//! │   cancel                 │ {id, data}     │                          │
//! │ ResponseListener::run ◄──┼────────────────┤   exactly one response   │
//! │   PendingCallTable       │ {id, error}    │   per id                 │
//! └──────────────────────────┘                └──────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! let (router, handle) = spawn_router(dispatcher, &RouterConfig::default())?;
//! let balance: String = router.invoke_as(&ContractOperation::GetDecimals).await?;
//! handle.shutdown().await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::time::Duration;

pub mod channel;
pub mod domain;
pub mod operation;
pub mod pending;
pub mod router;
pub mod runtime;
pub mod worker;

/// Default capacity of each direction of the in-memory channel.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Default deadline for a call. Proving a deploy can take minutes.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(300);

pub use channel::{duplex, Endpoint, FrameReceiver, FrameSender, MemoryReceiver, MemorySender};
pub use domain::{
    CallId, CallIdAllocator, CallMessage, ChannelError, ConfigError, FailureKind, Outcome,
    ResponseMessage, RouterConfig, RouterError, UnknownResponsePolicy, WorkerFailure,
};
pub use operation::{call_parts, decode_call, Operation};
pub use pending::{Completion, PendingCallTable, PendingStats, StatsSnapshot};
pub use router::{CallOptions, CallRouter, CancelToken, Deadline, ListenerExit, ResponseListener};
pub use runtime::{spawn_router, RouterHandle};
pub use worker::{Dispatcher, Worker, WorkerExit};
