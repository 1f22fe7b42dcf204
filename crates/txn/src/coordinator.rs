//! Transaction coordination (orchestration loop).
//!
//! The [`Coordinator`] runs a caller-supplied unit of work inside a storage
//! transaction: acquire a semaphore permit → open a fresh handle → run the
//! work → commit → flush the commit-scoped queue, retrying classified
//! transient failures with full-jitter backoff up to a configured attempt
//! limit. The permit release is scope-guaranteed (RAII), so no code path —
//! success, terminal failure, exhausted retries, or panic — can leak one.
//!
//! Per attempt the handle moves `Active → Committed` on success, or
//! `Active → Aborted → Closed` on any failure; `Aborted` feeds the next
//! attempt (with a brand-new handle and an empty queue) or terminates the
//! whole call. Events enqueued during a failed attempt never fire.

use std::sync::Arc;

use tracing::{debug, warn};
use uuid::Uuid;

use txngate_events::{Event, EventHandler};
use txngate_storage::{StorageEngine, TransactionHandle};

use crate::classify::is_retryable;
use crate::config::{CoordinatorConfig, RetryConfig};
use crate::error::TxnResult;
use crate::metrics::{TxnMetrics, TxnMetricsSnapshot};
use crate::outbox::CommitQueue;
use crate::semaphore::Semaphore;

/// Execution context handed to a unit of work.
///
/// Bundles the transaction handle (every storage call inside the work is
/// scoped to it) with the commit-scoped event queue. Exclusively owned by
/// one coordinator attempt; a retry gets a fresh context.
#[derive(Debug)]
pub struct TxnContext<H: TransactionHandle> {
    handle: H,
    queue: CommitQueue,
}

impl<H: TransactionHandle> TxnContext<H> {
    /// The in-flight transaction handle.
    pub fn handle(&mut self) -> &mut H {
        &mut self.handle
    }

    /// Queue an event to dispatch after — and only after — this
    /// transaction commits.
    pub fn enqueue<E, EH>(&mut self, event: E, handler: EH)
    where
        E: Event,
        EH: EventHandler<E> + 'static,
    {
        self.queue.enqueue(event, handler);
    }

    /// Number of events queued so far in this attempt.
    pub fn queued_events(&self) -> usize {
        self.queue.len()
    }
}

/// Runs units of work inside transactions with admission control, retry,
/// and commit-scoped event dispatch.
///
/// The coordinator spawns no concurrency of its own; many independent
/// callers invoke it from their own threads, and the semaphore is its only
/// concurrency-facing primitive. The metrics holder is injected so tests
/// can substitute a fresh instance per test.
#[derive(Debug)]
pub struct Coordinator<S: StorageEngine> {
    engine: S,
    semaphore: Semaphore,
    metrics: Arc<TxnMetrics>,
    default_retry: RetryConfig,
}

impl<S: StorageEngine> Coordinator<S> {
    pub fn new(engine: S, config: CoordinatorConfig) -> Self {
        Self::with_metrics(engine, config, Arc::new(TxnMetrics::new()))
    }

    pub fn with_metrics(engine: S, config: CoordinatorConfig, metrics: Arc<TxnMetrics>) -> Self {
        Self {
            engine,
            semaphore: Semaphore::new(config.max_concurrent),
            metrics,
            default_retry: config.retry,
        }
    }

    /// Run `work` inside a transaction with the process-default retry
    /// policy.
    pub fn run_in_transaction<T, W>(&self, work: W) -> TxnResult<T>
    where
        W: FnMut(&mut TxnContext<S::Handle>) -> TxnResult<T>,
    {
        self.run_in_transaction_with(self.default_retry.clone(), work)
    }

    /// Run `work` inside a transaction with a per-call retry policy.
    ///
    /// `work` may run several times (each time with a fresh handle and an
    /// empty event queue), so it must be safe to re-run — including against
    /// state that may already reflect a previous attempt whose commit
    /// outcome was ambiguous.
    pub fn run_in_transaction_with<T, W>(&self, retry: RetryConfig, mut work: W) -> TxnResult<T>
    where
        W: FnMut(&mut TxnContext<S::Handle>) -> TxnResult<T>,
    {
        let _permit = self.semaphore.acquire();
        let txn_id = Uuid::now_v7();

        let mut attempt = 1u32;
        loop {
            self.metrics.record_attempt();

            match self.run_attempt(txn_id, attempt, &mut work) {
                Ok(value) => {
                    self.metrics.record_success(attempt);
                    if attempt > 1 {
                        debug!(%txn_id, attempts = attempt, "transaction committed after retries");
                    }
                    return Ok(value);
                }
                Err(err) if is_retryable(&err) && retry.should_retry(attempt) => {
                    let delay = retry.delay_for_attempt(attempt);
                    debug!(
                        %txn_id,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure; backing off before retry"
                    );
                    std::thread::sleep(delay);
                    attempt += 1;
                }
                Err(err) => {
                    self.metrics.record_failure();
                    if attempt >= retry.max_attempts && is_retryable(&err) {
                        warn!(%txn_id, attempts = attempt, error = %err, "retries exhausted");
                    } else {
                        debug!(%txn_id, attempt, error = %err, "terminal failure");
                    }
                    return Err(err);
                }
            }
        }
    }

    /// One attempt: fresh handle, fresh queue; flush only after a
    /// successful commit, discard and abort on every failure path.
    fn run_attempt<T, W>(&self, txn_id: Uuid, attempt: u32, work: &mut W) -> TxnResult<T>
    where
        W: FnMut(&mut TxnContext<S::Handle>) -> TxnResult<T>,
    {
        debug!(%txn_id, attempt, "opening transaction");
        let handle = self.engine.open_transaction()?;
        let mut ctx = TxnContext {
            handle,
            queue: CommitQueue::new(),
        };

        match work(&mut ctx) {
            Ok(value) => match ctx.handle.commit() {
                Ok(()) => {
                    ctx.handle.close();
                    ctx.queue.flush();
                    Ok(value)
                }
                Err(err) => {
                    // The commit's fate may be ambiguous; the classifier
                    // decides whether the loop tries again.
                    let _ = ctx.handle.abort();
                    ctx.handle.close();
                    ctx.queue.discard();
                    Err(err.into())
                }
            },
            Err(err) => {
                let _ = ctx.handle.abort();
                ctx.handle.close();
                ctx.queue.discard();
                Err(err)
            }
        }
    }

    /// Run `work` with no transaction/retry semantics, but under the same
    /// admission budget as writers — read-heavy callers still count against
    /// the concurrent-transaction limit.
    pub fn run_without_transaction<T, E, W>(&self, work: W) -> Result<T, E>
    where
        W: FnOnce() -> Result<T, E>,
    {
        let _permit = self.semaphore.acquire();
        work()
    }

    /// Read-only metrics snapshot.
    pub fn metrics(&self) -> TxnMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Zero the metrics counters (test/ops only).
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// The admission gate (observability: permits free, queue length).
    pub fn semaphore(&self) -> &Semaphore {
        &self.semaphore
    }
}
