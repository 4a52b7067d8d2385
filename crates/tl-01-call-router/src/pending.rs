//! Pending Call Table - correlates outstanding calls with their responses.
//!
//! Flow:
//! 1. The router calls `register()` to get a fresh id and a oneshot receiver
//! 2. The router sends the call frame carrying that id
//! 3. The response listener calls `complete()` when a response arrives
//! 4. The router awaits the receiver, or calls `expire()` / `cancel()`
//!
//! Each entry is removed exactly once, by whichever of those paths gets to it
//! first, so a call settles at most once.

use crate::domain::{CallId, CallIdAllocator, Outcome, RouterError};
use dashmap::DashMap;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;
use tokio::sync::oneshot;
use tracing::{debug, warn};

/// What a waiting caller eventually receives.
pub type CallResult = Result<Value, RouterError>;

/// An outstanding call waiting for its response.
struct PendingCall {
    sender: oneshot::Sender<CallResult>,
    created_at: Instant,
    operation: String,
}

/// Result of routing a response to the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Handed to the waiting caller.
    Delivered,
    /// The entry existed but the caller had stopped waiting.
    ReceiverDropped,
    /// The id was issued but is no longer pending (late or duplicate response).
    Stale,
    /// The id was never issued by this table.
    Unknown,
}

/// Counters for the pending-call table.
#[derive(Debug, Default)]
pub struct PendingStats {
    pub total_registered: AtomicU64,
    /// Calls resolved with data.
    pub total_resolved: AtomicU64,
    /// Calls rejected with a worker failure.
    pub total_rejected: AtomicU64,
    pub total_timeouts: AtomicU64,
    pub total_cancelled: AtomicU64,
    /// Calls failed in bulk because the listener stopped.
    pub total_aborted: AtomicU64,
    pub unknown_responses: AtomicU64,
    pub stale_responses: AtomicU64,
    pub malformed_responses: AtomicU64,
}

/// Point-in-time copy of [`PendingStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub registered: u64,
    pub resolved: u64,
    pub rejected: u64,
    pub timeouts: u64,
    pub cancelled: u64,
    pub aborted: u64,
    pub unknown_responses: u64,
    pub stale_responses: u64,
    pub malformed_responses: u64,
    pub pending: u64,
}

/// Map of outstanding calls keyed by id.
pub struct PendingCallTable {
    ids: CallIdAllocator,
    pending: DashMap<CallId, PendingCall>,
    /// Set once the response listener has stopped; later calls fail fast.
    closed: OnceLock<RouterError>,
    stats: PendingStats,
}

impl Default for PendingCallTable {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingCallTable {
    pub fn new() -> Self {
        Self {
            ids: CallIdAllocator::new(),
            pending: DashMap::new(),
            closed: OnceLock::new(),
            stats: PendingStats::default(),
        }
    }

    /// Allocate an id and register a waiting call under it.
    ///
    /// Fails with the error that closed the table if the listener has stopped.
    pub fn register(
        &self,
        operation: &str,
    ) -> Result<(CallId, oneshot::Receiver<CallResult>), RouterError> {
        if let Some(err) = self.closed.get() {
            return Err(err.clone());
        }

        let id = self.ids.next();
        let (tx, rx) = oneshot::channel();

        self.pending.insert(
            id,
            PendingCall {
                sender: tx,
                created_at: Instant::now(),
                operation: operation.to_string(),
            },
        );
        self.stats.total_registered.fetch_add(1, Ordering::Relaxed);

        // fail_all may have drained the map between the check above and the insert
        if let Some(err) = self.closed.get() {
            self.pending.remove(&id);
            return Err(err.clone());
        }

        debug!(call_id = %id, operation = operation, "Registered pending call");

        Ok((id, rx))
    }

    /// Settle the call `id` with a response outcome.
    pub fn complete(&self, id: CallId, outcome: Outcome) -> Completion {
        let Some((_, call)) = self.pending.remove(&id) else {
            return if self.ids.was_issued(id) {
                self.stats.stale_responses.fetch_add(1, Ordering::Relaxed);
                Completion::Stale
            } else {
                self.stats.unknown_responses.fetch_add(1, Ordering::Relaxed);
                Completion::Unknown
            };
        };

        let elapsed = call.created_at.elapsed();
        let (result, counter) = match outcome {
            Outcome::Data(data) => (Ok(data), &self.stats.total_resolved),
            Outcome::Error(failure) => {
                (Err(RouterError::Worker(failure)), &self.stats.total_rejected)
            }
        };

        match call.sender.send(result) {
            Ok(()) => {
                counter.fetch_add(1, Ordering::Relaxed);
                debug!(
                    call_id = %id,
                    operation = call.operation,
                    response_time_ms = elapsed.as_millis(),
                    "Completed pending call"
                );
                Completion::Delivered
            }
            Err(_) => {
                self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
                debug!(
                    call_id = %id,
                    operation = call.operation,
                    "Pending call receiver dropped"
                );
                Completion::ReceiverDropped
            }
        }
    }

    /// Remove a call whose deadline passed. Returns false if it already settled.
    pub fn expire(&self, id: CallId) -> bool {
        match self.pending.remove(&id) {
            Some((_, call)) => {
                self.stats.total_timeouts.fetch_add(1, Ordering::Relaxed);
                warn!(
                    call_id = %id,
                    operation = call.operation,
                    elapsed_ms = call.created_at.elapsed().as_millis(),
                    "Pending call timed out"
                );
                true
            }
            None => false,
        }
    }

    /// Remove a call the caller gave up on. Returns false if it already settled.
    pub fn cancel(&self, id: CallId) -> bool {
        if self.pending.remove(&id).is_some() {
            self.stats.total_cancelled.fetch_add(1, Ordering::Relaxed);
            debug!(call_id = %id, "Cancelled pending call");
            true
        } else {
            false
        }
    }

    /// Remove a call that was never delivered to the worker.
    pub fn remove(&self, id: CallId) -> bool {
        self.pending.remove(&id).is_some()
    }

    /// Close the table and fail every outstanding call with `err`.
    ///
    /// Returns the number of calls failed.
    pub fn fail_all(&self, err: RouterError) -> usize {
        let _ = self.closed.set(err.clone());

        let ids: Vec<CallId> = self.pending.iter().map(|entry| *entry.key()).collect();
        let mut failed = 0;
        for id in ids {
            if let Some((_, call)) = self.pending.remove(&id) {
                let _ = call.sender.send(Err(err.clone()));
                failed += 1;
            }
        }

        self.stats
            .total_aborted
            .fetch_add(failed as u64, Ordering::Relaxed);
        failed
    }

    pub fn note_malformed(&self) {
        self.stats.malformed_responses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_pending(&self, id: CallId) -> bool {
        self.pending.contains_key(&id)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.get().is_some()
    }

    pub fn stats(&self) -> &PendingStats {
        &self.stats
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |counter: &AtomicU64| counter.load(Ordering::Relaxed);
        StatsSnapshot {
            registered: load(&self.stats.total_registered),
            resolved: load(&self.stats.total_resolved),
            rejected: load(&self.stats.total_rejected),
            timeouts: load(&self.stats.total_timeouts),
            cancelled: load(&self.stats.total_cancelled),
            aborted: load(&self.stats.total_aborted),
            unknown_responses: load(&self.stats.unknown_responses),
            stale_responses: load(&self.stats.stale_responses),
            malformed_responses: load(&self.stats.malformed_responses),
            pending: self.pending.len() as u64,
        }
    }
}
