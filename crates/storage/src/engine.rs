//! Storage engine and transaction handle traits.

use crate::error::StorageError;

/// Lifecycle state of a transaction handle.
///
/// Per attempt the coordinator drives:
/// `Active → Committed` on success, or `Active → Aborted → Closed` on any
/// failure path. `Committed` and `Aborted` are terminal for the handle;
/// a retry always opens a fresh one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    /// Open; operations may be bound to it.
    Active,
    /// Commit acknowledged; writes are durable.
    Committed,
    /// Rolled back; staged writes were discarded.
    Aborted,
    /// Session ended (after commit or abort).
    Closed,
}

impl HandleState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HandleState::Active)
    }
}

/// An in-flight storage transaction.
///
/// The handle is **exclusively owned** by one coordinator attempt: every
/// repository call made inside the unit of work is scoped to it, and it is
/// never shared across retries. Implementations must make `abort()` after a
/// failed `commit()` harmless (the coordinator calls it unconditionally on
/// failure paths), and `close()` idempotent.
pub trait TransactionHandle: Send {
    /// Attempt to commit. On success all writes staged through this handle
    /// become visible atomically.
    ///
    /// May fail with a transient error ([`StorageError::is_transient`]) —
    /// including [`StorageError::UnknownCommitResult`] when the outcome is
    /// ambiguous — in which case the coordinator retries with a fresh handle.
    fn commit(&mut self) -> Result<(), StorageError>;

    /// Roll back, discarding all staged writes. A no-op if the handle is
    /// already terminal.
    fn abort(&mut self) -> Result<(), StorageError>;

    /// End the session. Idempotent; aborts first if still active.
    fn close(&mut self);

    /// Current lifecycle state (observability; never required for control flow).
    fn state(&self) -> HandleState;
}

/// Opens transactions. The coordinator's only entry point into storage.
pub trait StorageEngine: Send + Sync {
    type Handle: TransactionHandle;

    /// Open a fresh transaction handle.
    ///
    /// Open failures carry the same taxonomy as commit failures: a
    /// connectivity fault here is transient and the coordinator will retry.
    fn open_transaction(&self) -> Result<Self::Handle, StorageError>;
}

impl<S> StorageEngine for std::sync::Arc<S>
where
    S: StorageEngine + ?Sized,
{
    type Handle = S::Handle;

    fn open_transaction(&self) -> Result<Self::Handle, StorageError> {
        (**self).open_transaction()
    }
}
