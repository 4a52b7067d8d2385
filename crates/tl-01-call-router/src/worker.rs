//! Background worker loop.
//!
//! Receives call frames one at a time, decodes them against an operation
//! registry, runs the handler and sends exactly one response per call id.

use crate::channel::{FrameReceiver, FrameSender};
use crate::domain::{CallId, CallMessage, ChannelError, ResponseMessage, WorkerFailure};
use crate::operation::{decode_call, Operation};
use async_trait::async_trait;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, info_span, warn, Instrument};

/// Executes decoded operations inside the background context.
#[async_trait]
pub trait Dispatcher<Op: Operation>: Send + Sync {
    async fn dispatch(&self, op: Op) -> Result<Value, WorkerFailure>;
}

/// Why the worker loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    Shutdown,
    /// The foreground dropped its end of the channel.
    ChannelClosed,
}

pub struct Worker<Op, D> {
    receiver: Arc<dyn FrameReceiver>,
    sender: Arc<dyn FrameSender>,
    dispatcher: Arc<D>,
    shutdown: watch::Receiver<bool>,
    _registry: PhantomData<fn() -> Op>,
}

impl<Op, D> Worker<Op, D>
where
    Op: Operation,
    D: Dispatcher<Op> + 'static,
{
    pub fn new(
        receiver: Arc<dyn FrameReceiver>,
        sender: Arc<dyn FrameSender>,
        dispatcher: Arc<D>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            receiver,
            sender,
            dispatcher,
            shutdown,
            _registry: PhantomData,
        }
    }

    /// Serve calls until shutdown is signalled or either channel closes.
    pub async fn run(mut self) -> WorkerExit {
        info!("Contract worker started");
        loop {
            let frame = tokio::select! {
                biased;
                _ = self.shutdown.wait_for(|stop| *stop) => {
                    info!("Contract worker shutting down");
                    return WorkerExit::Shutdown;
                }
                frame = self.receiver.receive() => frame,
            };

            let frame = match frame {
                Ok(frame) => frame,
                Err(ChannelError::Closed) => {
                    info!("Call channel closed, contract worker stopping");
                    return WorkerExit::ChannelClosed;
                }
            };

            if let Err(ChannelError::Closed) = self.handle_frame(frame).await {
                warn!("Response channel closed, contract worker stopping");
                return WorkerExit::ChannelClosed;
            }
        }
    }

    async fn handle_frame(&self, frame: Value) -> Result<(), ChannelError> {
        let Some(raw_id) = frame.get("id").and_then(Value::as_u64) else {
            warn!("Dropping call frame without an integer id");
            return Ok(());
        };
        let id = CallId::new(raw_id);

        let call: CallMessage = match serde_json::from_value(frame) {
            Ok(call) => call,
            Err(e) => {
                let failure =
                    WorkerFailure::invalid_arguments(format!("Malformed call frame: {}", e));
                return self.respond(ResponseMessage::error(id, failure)).await;
            }
        };

        let span = info_span!("worker_call", call_id = %id, operation = %call.function);
        let outcome = async {
            match decode_call::<Op>(&call.function, call.args) {
                Ok(op) => {
                    debug!("Dispatching operation");
                    self.dispatcher.dispatch(op).await
                }
                Err(failure) => Err(failure),
            }
        }
        .instrument(span)
        .await;

        if let Err(failure) = &outcome {
            warn!(
                call_id = %id,
                operation = %call.function,
                kind = ?failure.kind,
                error = %failure.message,
                "Operation failed"
            );
        }

        let response = match outcome {
            Ok(data) => ResponseMessage::data(id, data),
            Err(failure) => ResponseMessage::error(id, failure),
        };
        self.respond(response).await
    }

    async fn respond(&self, response: ResponseMessage) -> Result<(), ChannelError> {
        let frame = match serde_json::to_value(&response) {
            Ok(frame) => frame,
            Err(e) => {
                let failure =
                    WorkerFailure::internal(format!("Failed to encode response: {}", e));
                let fallback = ResponseMessage::error(response.id, failure);
                serde_json::to_value(&fallback).map_err(|_| ChannelError::Closed)?
            }
        };
        self.sender.send(frame).await
    }
}
