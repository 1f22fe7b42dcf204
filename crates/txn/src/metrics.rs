//! Transaction health counters.
//!
//! An injected holder (not a singleton global): the coordinator takes an
//! `Arc<TxnMetrics>` at construction so tests can substitute a fresh
//! instance per test while production shares one process-wide.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonically updated counters, reset only via [`TxnMetrics::reset`].
#[derive(Debug, Default)]
pub struct TxnMetrics {
    total_attempts: AtomicU64,
    successful_transactions: AtomicU64,
    failed_transactions: AtomicU64,
    retried_transactions: AtomicU64,
    total_retries: AtomicU64,
}

/// Point-in-time snapshot of [`TxnMetrics`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TxnMetricsSnapshot {
    pub total_attempts: u64,
    pub successful_transactions: u64,
    pub failed_transactions: u64,
    pub retried_transactions: u64,
    pub total_retries: u64,
    /// `total_retries / retried_transactions`; 0.0 when nothing retried.
    pub avg_retry_count: f64,
}

impl TxnMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// One attempt started (every loop iteration, including the first).
    pub fn record_attempt(&self) {
        self.total_attempts.fetch_add(1, Ordering::Relaxed);
    }

    /// A call succeeded on `attempts` (1-indexed, the successful one
    /// included).
    pub fn record_success(&self, attempts: u32) {
        self.successful_transactions.fetch_add(1, Ordering::Relaxed);
        if attempts > 1 {
            self.retried_transactions.fetch_add(1, Ordering::Relaxed);
            self.total_retries
                .fetch_add(u64::from(attempts - 1), Ordering::Relaxed);
        }
    }

    /// A call failed terminally (first terminal error or exhausted retries).
    pub fn record_failure(&self) {
        self.failed_transactions.fetch_add(1, Ordering::Relaxed);
    }

    /// Read-only snapshot for observability endpoints.
    pub fn snapshot(&self) -> TxnMetricsSnapshot {
        let retried = self.retried_transactions.load(Ordering::Relaxed);
        let retries = self.total_retries.load(Ordering::Relaxed);

        TxnMetricsSnapshot {
            total_attempts: self.total_attempts.load(Ordering::Relaxed),
            successful_transactions: self.successful_transactions.load(Ordering::Relaxed),
            failed_transactions: self.failed_transactions.load(Ordering::Relaxed),
            retried_transactions: retried,
            total_retries: retries,
            avg_retry_count: if retried == 0 {
                0.0
            } else {
                retries as f64 / retried as f64
            },
        }
    }

    /// Zero all counters (test/ops only).
    pub fn reset(&self) {
        self.total_attempts.store(0, Ordering::Relaxed);
        self.successful_transactions.store(0, Ordering::Relaxed);
        self.failed_transactions.store(0, Ordering::Relaxed);
        self.retried_transactions.store(0, Ordering::Relaxed);
        self.total_retries.store(0, Ordering::Relaxed);
    }
}
