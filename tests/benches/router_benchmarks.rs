//! # Call Router Benchmarks
//!
//! | Path | Measures |
//! |------|----------|
//! | single call | one request/response round trip through the channel |
//! | concurrent calls | N callers in flight against one sequential worker |
//! | table | register + complete on the pending-call table alone |

use async_trait::async_trait;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tl_01_call_router::{
    spawn_router, CallRouter, Dispatcher, Operation, Outcome, PendingCallTable, RouterConfig,
    RouterHandle, WorkerFailure,
};
use tokio::runtime::Runtime;

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "fn", content = "args", rename_all = "camelCase")]
enum EchoOp {
    Echo { value: u64 },
}

impl Operation for EchoOp {
    const NAMES: &'static [&'static str] = &["echo"];

    fn name(&self) -> &'static str {
        "echo"
    }
}

struct EchoDispatcher;

#[async_trait]
impl Dispatcher<EchoOp> for EchoDispatcher {
    async fn dispatch(&self, op: EchoOp) -> Result<Value, WorkerFailure> {
        match op {
            EchoOp::Echo { value } => Ok(json!(value)),
        }
    }
}

fn start(rt: &Runtime) -> (CallRouter, RouterHandle) {
    rt.block_on(async {
        let config = RouterConfig::default().with_call_timeout(Some(Duration::from_secs(30)));
        spawn_router(EchoDispatcher, &config).expect("router config is valid")
    })
}

fn bench_single_call(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (router, _handle) = start(&rt);

    let mut group = c.benchmark_group("call-router");
    group.bench_function("single_call", |b| {
        b.to_async(&rt).iter(|| async {
            let value = router
                .invoke(&EchoOp::Echo { value: 7 })
                .await
                .expect("echo");
            black_box(value)
        })
    });
    group.finish();
}

fn bench_concurrent_calls(c: &mut Criterion) {
    let rt = Runtime::new().expect("tokio runtime");
    let (router, _handle) = start(&rt);

    let mut group = c.benchmark_group("call-router");
    for callers in [8u64, 64, 256] {
        group.throughput(Throughput::Elements(callers));
        group.bench_with_input(
            BenchmarkId::new("concurrent_calls", callers),
            &callers,
            |b, &callers| {
                b.to_async(&rt).iter(|| async {
                    let calls = (0..callers).map(|value| {
                        let router = router.clone();
                        async move { router.invoke(&EchoOp::Echo { value }).await }
                    });
                    let results = join_all(calls).await;
                    black_box(results.len())
                })
            },
        );
    }
    group.finish();
}

fn bench_pending_table(c: &mut Criterion) {
    let mut group = c.benchmark_group("pending-table");
    group.bench_function("register_complete", |b| {
        let table = PendingCallTable::new();
        b.iter(|| {
            let (id, _rx) = table.register("echo").expect("table open");
            black_box(table.complete(id, Outcome::Data(json!(1))))
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_single_call,
    bench_concurrent_calls,
    bench_pending_table
);
criterion_main!(benches);
