//! Wiring for an in-process background worker.

use crate::channel::duplex;
use crate::domain::{ConfigError, RouterConfig};
use crate::operation::Operation;
use crate::pending::PendingCallTable;
use crate::router::{CallRouter, ListenerExit, ResponseListener};
use crate::worker::{Dispatcher, Worker, WorkerExit};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Owns the background tasks started by [`spawn_router`].
///
/// Dropping the handle without calling `shutdown` also stops the worker.
pub struct RouterHandle {
    shutdown: watch::Sender<bool>,
    worker: JoinHandle<WorkerExit>,
    listener: JoinHandle<ListenerExit>,
}

impl RouterHandle {
    /// Stop the worker, then wait for both tasks.
    ///
    /// Calls still outstanding are rejected with `WorkerGone`.
    pub async fn shutdown(self) -> ListenerExit {
        self.shutdown.send_replace(true);

        match self.worker.await {
            Ok(exit) => info!(?exit, "Contract worker stopped"),
            Err(e) => error!(error = %e, "Contract worker task failed"),
        }

        match self.listener.await {
            Ok(exit) => exit,
            Err(e) => {
                error!(error = %e, "Response listener task failed");
                ListenerExit::Aborted
            }
        }
    }

    pub fn is_worker_finished(&self) -> bool {
        self.worker.is_finished()
    }
}

/// Start a worker serving `dispatcher` and return a router connected to it.
///
/// Must be called from within a tokio runtime.
pub fn spawn_router<Op, D>(
    dispatcher: D,
    config: &RouterConfig,
) -> Result<(CallRouter, RouterHandle), ConfigError>
where
    Op: Operation,
    D: Dispatcher<Op> + 'static,
{
    config.validate()?;

    let (foreground, background) = duplex(config.channel_capacity);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let worker: Worker<Op, D> = Worker::new(
        Arc::new(background.receiver),
        Arc::new(background.sender),
        Arc::new(dispatcher),
        shutdown_rx,
    );

    let table = Arc::new(PendingCallTable::new());
    let listener = ResponseListener::new(
        Arc::clone(&table),
        Arc::new(foreground.receiver),
        config.unknown_response_policy,
    );
    let router = CallRouter::new(table, Arc::new(foreground.sender), config.call_timeout);

    let handle = RouterHandle {
        shutdown: shutdown_tx,
        worker: tokio::spawn(worker.run()),
        listener: tokio::spawn(listener.run()),
    };

    info!(
        channel_capacity = config.channel_capacity,
        call_timeout_ms = config.call_timeout.map(|t| t.as_millis() as u64),
        policy = ?config.unknown_response_policy,
        "Call router started"
    );

    Ok((router, handle))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RouterError, WorkerFailure};
    use crate::operation::test_ops::TestOp;
    use crate::router::CallOptions;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    struct Ledger;

    #[async_trait]
    impl Dispatcher<TestOp> for Ledger {
        async fn dispatch(&self, op: TestOp) -> Result<Value, WorkerFailure> {
            match op {
                TestOp::GetBalance { .. } => Ok(json!("1000")),
                TestOp::FetchAccount { public_key58 } => Ok(json!({ "publicKey": public_key58 })),
                TestOp::LoadContract => Ok(Value::Null),
                TestOp::DeployToken { .. } => {
                    Err(WorkerFailure::library("Invalid fee payer key"))
                }
                TestOp::Sleep { millis } => {
                    if millis == u64::MAX {
                        panic!("handler crashed");
                    }
                    tokio::time::sleep(Duration::from_millis(millis)).await;
                    Ok(json!(millis))
                }
            }
        }
    }

    #[tokio::test]
    async fn test_rejects_invalid_config() {
        let config = RouterConfig {
            channel_capacity: 0,
            ..RouterConfig::default()
        };
        let result = spawn_router::<TestOp, _>(Ledger, &config);
        assert!(matches!(result, Err(ConfigError::ZeroCapacity)));
    }

    #[tokio::test]
    async fn test_get_balance_resolves() {
        let (router, handle) = spawn_router(Ledger, &RouterConfig::default()).unwrap();

        let balance: String = router
            .invoke_as(&TestOp::GetBalance {
                address58: "B62qA".into(),
            })
            .await
            .unwrap();
        assert_eq!(balance, "1000");
        assert_eq!(router.pending_count(), 0);

        assert_eq!(handle.shutdown().await, ListenerExit::ChannelClosed);
    }

    #[tokio::test]
    async fn test_deploy_failure_carries_message() {
        let (router, _handle) = spawn_router(Ledger, &RouterConfig::default()).unwrap();
        let err = router
            .invoke(&TestOp::DeployToken {
                fee_payer_key58: "EKbad".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid fee payer key");
    }

    #[tokio::test]
    async fn test_concurrent_fetches_resolve_independently() {
        let (router, _handle) = spawn_router(Ledger, &RouterConfig::default()).unwrap();

        let a = TestOp::FetchAccount {
            public_key58: "A".into(),
        };
        let b = TestOp::FetchAccount {
            public_key58: "B".into(),
        };
        let (ra, rb) = tokio::join!(router.invoke(&a), router.invoke(&b));

        assert_eq!(ra.unwrap(), json!({"publicKey": "A"}));
        assert_eq!(rb.unwrap(), json!({"publicKey": "B"}));
    }

    #[tokio::test]
    async fn test_shutdown_finishes_in_flight_and_rejects_queued_call() {
        let (router, handle) = spawn_router(Ledger, &RouterConfig::default()).unwrap();

        let call = |millis: u64| {
            let router = router.clone();
            tokio::spawn(async move {
                router
                    .invoke_with(
                        "sleep",
                        json!({ "millis": millis }),
                        CallOptions::default().without_timeout(),
                    )
                    .await
            })
        };
        let in_flight = call(200);
        // let the worker pick up the first call before queueing the second
        tokio::time::sleep(Duration::from_millis(20)).await;
        let queued = call(1);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(router.pending_count(), 2);

        handle.shutdown().await;

        assert_eq!(in_flight.await.unwrap().unwrap(), json!(200));
        assert!(matches!(
            queued.await.unwrap(),
            Err(RouterError::WorkerGone)
        ));
        assert_eq!(router.pending_count(), 0);

        let err = router.invoke(&TestOp::LoadContract).await.unwrap_err();
        assert!(matches!(err, RouterError::WorkerGone));
    }

    #[tokio::test]
    async fn test_handler_panic_surfaces_as_worker_gone() {
        let (router, handle) = spawn_router(Ledger, &RouterConfig::default()).unwrap();

        let err = router
            .invoke(&TestOp::Sleep { millis: u64::MAX })
            .await
            .unwrap_err();
        assert!(matches!(err, RouterError::WorkerGone));

        assert_eq!(handle.shutdown().await, ListenerExit::ChannelClosed);
    }
}
