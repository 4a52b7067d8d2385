//! Foreground call router and response listener.

use crate::channel::{FrameReceiver, FrameSender};
use crate::domain::{
    CallId, CallMessage, ChannelError, ResponseMessage, RouterError, UnknownResponsePolicy,
};
use crate::operation::{call_parts, Operation};
use crate::pending::{CallResult, Completion, PendingCallTable, StatsSnapshot};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tracing::{debug, error, warn};

/// When a call stops waiting for its response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Deadline {
    /// Use the router's configured call timeout.
    #[default]
    Default,
    After(Duration),
    /// Wait until the response arrives or the worker stops.
    Never,
}

/// Cooperative cancellation signal shared between a caller and its calls.
#[derive(Debug, Clone)]
pub struct CancelToken {
    signal: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (signal, _) = watch::channel(false);
        Self {
            signal: Arc::new(signal),
        }
    }

    pub fn cancel(&self) {
        self.signal.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.signal.borrow()
    }

    /// Resolves once `cancel()` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.signal.subscribe();
        // The sender lives in `self`, so wait_for can only return Ok.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub deadline: Deadline,
    pub cancel: Option<CancelToken>,
}

impl CallOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.deadline = Deadline::After(timeout);
        self
    }

    pub fn without_timeout(mut self) -> Self {
        self.deadline = Deadline::Never;
        self
    }

    pub fn with_cancel(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// Removes the pending entry if the caller stops waiting early.
struct PendingGuard {
    table: Arc<PendingCallTable>,
    id: CallId,
    armed: bool,
}

impl PendingGuard {
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.armed {
            self.table.cancel(self.id);
        }
    }
}

enum Waited {
    Response(Result<CallResult, oneshot::error::RecvError>),
    Deadline(Duration),
    Cancelled,
}

/// Issues calls to the background worker and awaits their responses.
///
/// Cheap to clone; clones share the id sequence and pending table.
#[derive(Clone)]
pub struct CallRouter {
    table: Arc<PendingCallTable>,
    sender: Arc<dyn FrameSender>,
    default_timeout: Option<Duration>,
}

impl CallRouter {
    pub fn new(
        table: Arc<PendingCallTable>,
        sender: Arc<dyn FrameSender>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            table,
            sender,
            default_timeout,
        }
    }

    /// Invoke a typed operation and return its raw result.
    pub async fn invoke<Op: Operation>(&self, op: &Op) -> Result<Value, RouterError> {
        self.invoke_op_with(op, CallOptions::default()).await
    }

    /// Invoke a typed operation and decode its result.
    pub async fn invoke_as<T, Op>(&self, op: &Op) -> Result<T, RouterError>
    where
        T: DeserializeOwned,
        Op: Operation,
    {
        let value = self.invoke(op).await?;
        serde_json::from_value(value).map_err(|e| RouterError::Decode(e.to_string()))
    }

    pub async fn invoke_op_with<Op: Operation>(
        &self,
        op: &Op,
        options: CallOptions,
    ) -> Result<Value, RouterError> {
        let (name, args) = call_parts(op).map_err(|e| RouterError::Encode(e.to_string()))?;
        self.invoke_with(&name, args, options).await
    }

    /// Invoke operation `name` with `args` using the default options.
    pub async fn invoke_raw(&self, name: &str, args: Value) -> Result<Value, RouterError> {
        self.invoke_with(name, args, CallOptions::default()).await
    }

    /// Send one call and wait for its response, deadline or cancellation.
    pub async fn invoke_with(
        &self,
        name: &str,
        args: Value,
        options: CallOptions,
    ) -> Result<Value, RouterError> {
        let (id, mut rx) = self.table.register(name)?;
        let mut guard = PendingGuard {
            table: Arc::clone(&self.table),
            id,
            armed: true,
        };

        let frame = serde_json::to_value(CallMessage {
            id,
            function: name.to_string(),
            args,
        })
        .map_err(|e| RouterError::Encode(e.to_string()))?;

        let timeout = match options.deadline {
            Deadline::Default => self.default_timeout,
            Deadline::After(timeout) => Some(timeout),
            Deadline::Never => None,
        };
        // One deadline covers both the send and the wait for the response.
        let deadline = timeout.map(|after| (tokio::time::Instant::now() + after, after));
        let cancel = options.cancel;

        let expired = async {
            match deadline {
                Some((at, after)) => {
                    tokio::time::sleep_until(at).await;
                    after
                }
                None => std::future::pending().await,
            }
        };
        let cancelled = async {
            match &cancel {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(expired);
        tokio::pin!(cancelled);

        let stopped_before_send = tokio::select! {
            biased;
            _ = &mut cancelled => Some(Waited::Cancelled),
            after = &mut expired => Some(Waited::Deadline(after)),
            sent = self.sender.send(frame) => {
                if let Err(ChannelError::Closed) = sent {
                    guard.disarm();
                    self.table.remove(id);
                    warn!(call_id = %id, operation = name, "Outbound channel closed");
                    return Err(RouterError::ChannelClosed);
                }
                None
            }
        };

        let waited = match stopped_before_send {
            Some(waited) => {
                debug!(call_id = %id, operation = name, "Call stopped before it was sent");
                waited
            }
            None => {
                debug!(call_id = %id, operation = name, "Sent call");
                tokio::select! {
                    biased;
                    result = &mut rx => Waited::Response(result),
                    after = &mut expired => Waited::Deadline(after),
                    _ = &mut cancelled => Waited::Cancelled,
                }
            }
        };
        guard.disarm();

        match waited {
            Waited::Response(result) => settle(result),
            Waited::Deadline(after) => {
                if self.table.expire(id) {
                    Err(RouterError::Timeout {
                        id,
                        operation: name.to_string(),
                        after,
                    })
                } else {
                    // settled concurrently; the result is already in the channel
                    settle(rx.await)
                }
            }
            Waited::Cancelled => {
                if self.table.cancel(id) {
                    Err(RouterError::Cancelled {
                        id,
                        operation: name.to_string(),
                    })
                } else {
                    settle(rx.await)
                }
            }
        }
    }

    pub fn pending_count(&self) -> usize {
        self.table.pending_count()
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.table.snapshot()
    }

    pub fn table(&self) -> &Arc<PendingCallTable> {
        &self.table
    }
}

fn settle(result: Result<CallResult, oneshot::error::RecvError>) -> Result<Value, RouterError> {
    match result {
        Ok(result) => result,
        Err(_) => Err(RouterError::WorkerGone),
    }
}

/// Why the response listener stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerExit {
    /// The worker side closed the channel.
    ChannelClosed,
    /// A response arrived for an id that was never issued.
    ProtocolViolation(CallId),
    /// The listener task was aborted or panicked.
    Aborted,
}

/// Consumes worker responses and settles pending calls.
pub struct ResponseListener {
    table: Arc<PendingCallTable>,
    receiver: Arc<dyn FrameReceiver>,
    policy: UnknownResponsePolicy,
}

impl ResponseListener {
    pub fn new(
        table: Arc<PendingCallTable>,
        receiver: Arc<dyn FrameReceiver>,
        policy: UnknownResponsePolicy,
    ) -> Self {
        Self {
            table,
            receiver,
            policy,
        }
    }

    /// Run until the channel closes or a fatal protocol violation occurs.
    pub async fn run(self) -> ListenerExit {
        loop {
            match self.receiver.receive().await {
                Ok(frame) => {
                    if let Some(id) = self.handle_frame(frame) {
                        let failed = self.table.fail_all(RouterError::ProtocolViolation(id));
                        error!(
                            call_id = %id,
                            failed_calls = failed,
                            "Response for a call that was never issued, stopping listener"
                        );
                        return ListenerExit::ProtocolViolation(id);
                    }
                }
                Err(ChannelError::Closed) => {
                    let failed = self.table.fail_all(RouterError::WorkerGone);
                    warn!(
                        failed_calls = failed,
                        "Worker channel closed, stopping listener"
                    );
                    return ListenerExit::ChannelClosed;
                }
            }
        }
    }

    /// Route one frame. Returns the offending id when the listener must stop.
    fn handle_frame(&self, frame: Value) -> Option<CallId> {
        let response: ResponseMessage = match serde_json::from_value(frame) {
            Ok(response) => response,
            Err(e) => {
                self.table.note_malformed();
                warn!(error = %e, "Dropping malformed response frame");
                return None;
            }
        };

        let id = response.id;
        match self.table.complete(id, response.outcome) {
            Completion::Delivered | Completion::ReceiverDropped => None,
            Completion::Stale => {
                warn!(call_id = %id, "Ignoring late or duplicate response");
                None
            }
            Completion::Unknown => match self.policy {
                UnknownResponsePolicy::LogAndIgnore => {
                    warn!(call_id = %id, "Ignoring response for a call that was never issued");
                    None
                }
                UnknownResponsePolicy::Fatal => Some(id),
            },
        }
    }
}
