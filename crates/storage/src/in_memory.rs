//! In-memory optimistic storage engine.
//!
//! Intended for tests/dev. Documents are versioned JSON values; a
//! transaction stages its writes privately and validates, at commit time,
//! that every document it touched is still at the version it first
//! observed. The losing racer of a concurrent update gets a
//! [`StorageError::WriteConflict`], which is exactly the signal the
//! coordinator's retry loop exists to absorb.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

use serde_json::Value as JsonValue;

use crate::engine::{HandleState, StorageEngine, TransactionHandle};
use crate::error::StorageError;

/// A stored document plus its monotonically increasing version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedDoc {
    pub value: JsonValue,
    pub version: u64,
}

#[derive(Debug, Default)]
struct EngineInner {
    docs: RwLock<HashMap<String, VersionedDoc>>,
    /// Scripted failures, popped one per commit (fault injection for tests).
    commit_faults: Mutex<VecDeque<StorageError>>,
    /// Scripted failures, popped one per open.
    open_faults: Mutex<VecDeque<StorageError>>,
}

/// In-memory versioned-document store with optimistic concurrency.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEngine {
    inner: Arc<EngineInner>,
}

impl InMemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a document directly (test setup; bypasses transactions).
    pub fn seed(&self, key: impl Into<String>, value: JsonValue) {
        let mut docs = self.inner.docs.write().unwrap();
        docs.insert(key.into(), VersionedDoc { value, version: 1 });
    }

    /// Read a document directly (test assertions; bypasses transactions).
    pub fn snapshot(&self, key: &str) -> Option<VersionedDoc> {
        self.inner.docs.read().unwrap().get(key).cloned()
    }

    /// Script the next commit on any handle to fail with `err`.
    ///
    /// Faults queue up: calling this twice fails the next two commits in
    /// order. Staged writes are discarded when the scripted fault fires.
    pub fn fail_next_commit(&self, err: StorageError) {
        self.inner.commit_faults.lock().unwrap().push_back(err);
    }

    /// Script the next `open_transaction` to fail with `err`.
    pub fn fail_next_open(&self, err: StorageError) {
        self.inner.open_faults.lock().unwrap().push_back(err);
    }
}

impl StorageEngine for InMemoryEngine {
    type Handle = MemoryTransaction;

    fn open_transaction(&self) -> Result<Self::Handle, StorageError> {
        if let Some(err) = self.inner.open_faults.lock().unwrap().pop_front() {
            return Err(err);
        }

        Ok(MemoryTransaction {
            inner: Arc::clone(&self.inner),
            observed: HashMap::new(),
            staged: HashMap::new(),
            state: HandleState::Active,
        })
    }
}

/// A single in-flight transaction against [`InMemoryEngine`].
///
/// Reads record the version first observed per key; writes stage privately
/// (`None` stages a delete). Nothing is visible to other transactions until
/// commit.
#[derive(Debug)]
pub struct MemoryTransaction {
    inner: Arc<EngineInner>,
    observed: HashMap<String, u64>,
    staged: HashMap<String, Option<JsonValue>>,
    state: HandleState,
}

impl MemoryTransaction {
    fn ensure_active(&self) -> Result<(), StorageError> {
        if self.state == HandleState::Active {
            Ok(())
        } else {
            Err(StorageError::invalid(format!(
                "operation on {:?} transaction",
                self.state
            )))
        }
    }

    /// Record the version currently visible for `key`, absent = 0.
    /// Only the *first* observation counts; the commit-time check validates
    /// against it.
    fn observe(&mut self, key: &str) -> Result<u64, StorageError> {
        if let Some(v) = self.observed.get(key) {
            return Ok(*v);
        }
        let docs = self
            .inner
            .docs
            .read()
            .map_err(|_| StorageError::backend("lock poisoned"))?;
        let version = docs.get(key).map(|d| d.version).unwrap_or(0);
        self.observed.insert(key.to_string(), version);
        Ok(version)
    }

    /// Read a document through this transaction.
    pub fn get(&mut self, key: &str) -> Result<Option<JsonValue>, StorageError> {
        self.ensure_active()?;
        self.observe(key)?;

        if let Some(staged) = self.staged.get(key) {
            return Ok(staged.clone());
        }

        let docs = self
            .inner
            .docs
            .read()
            .map_err(|_| StorageError::backend("lock poisoned"))?;
        Ok(docs.get(key).map(|d| d.value.clone()))
    }

    /// Stage a write through this transaction.
    pub fn put(&mut self, key: impl Into<String>, value: JsonValue) -> Result<(), StorageError> {
        self.ensure_active()?;
        let key = key.into();
        self.observe(&key)?;
        self.staged.insert(key, Some(value));
        Ok(())
    }

    /// Stage a delete through this transaction.
    pub fn delete(&mut self, key: impl Into<String>) -> Result<(), StorageError> {
        self.ensure_active()?;
        let key = key.into();
        self.observe(&key)?;
        self.staged.insert(key, None);
        Ok(())
    }
}

impl TransactionHandle for MemoryTransaction {
    fn commit(&mut self) -> Result<(), StorageError> {
        self.ensure_active()?;

        if let Some(err) = self.inner.commit_faults.lock().unwrap().pop_front() {
            self.staged.clear();
            self.state = HandleState::Aborted;
            return Err(err);
        }

        let mut docs = self
            .inner
            .docs
            .write()
            .map_err(|_| StorageError::backend("lock poisoned"))?;

        // Validate every touched key against the version first observed.
        for (key, observed) in &self.observed {
            let current = docs.get(key).map(|d| d.version).unwrap_or(0);
            if current != *observed {
                self.staged.clear();
                self.state = HandleState::Aborted;
                return Err(StorageError::write_conflict(key.clone()));
            }
        }

        for (key, staged) in self.staged.drain() {
            match staged {
                Some(value) => {
                    let version = docs.get(&key).map(|d| d.version).unwrap_or(0) + 1;
                    docs.insert(key, VersionedDoc { value, version });
                }
                None => {
                    docs.remove(&key);
                }
            }
        }

        self.state = HandleState::Committed;
        Ok(())
    }

    fn abort(&mut self) -> Result<(), StorageError> {
        if self.state == HandleState::Active {
            self.staged.clear();
            self.observed.clear();
            self.state = HandleState::Aborted;
        }
        Ok(())
    }

    fn close(&mut self) {
        if self.state == HandleState::Active {
            self.staged.clear();
            self.observed.clear();
        }
        self.state = HandleState::Closed;
    }

    fn state(&self) -> HandleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn commit_applies_staged_writes_and_bumps_versions() {
        let engine = InMemoryEngine::new();
        let mut txn = engine.open_transaction().unwrap();

        txn.put("users/1", json!({"name": "ada"})).unwrap();
        txn.commit().unwrap();

        let doc = engine.snapshot("users/1").unwrap();
        assert_eq!(doc.value, json!({"name": "ada"}));
        assert_eq!(doc.version, 1);
        assert_eq!(txn.state(), HandleState::Committed);
    }

    #[test]
    fn staged_writes_are_invisible_until_commit() {
        let engine = InMemoryEngine::new();
        let mut txn = engine.open_transaction().unwrap();

        txn.put("users/1", json!(1)).unwrap();
        assert_eq!(txn.get("users/1").unwrap(), Some(json!(1)));
        assert!(engine.snapshot("users/1").is_none());
    }

    #[test]
    fn losing_racer_gets_write_conflict() {
        let engine = InMemoryEngine::new();
        engine.seed("counter", json!(0));

        let mut a = engine.open_transaction().unwrap();
        let mut b = engine.open_transaction().unwrap();

        a.get("counter").unwrap();
        b.get("counter").unwrap();

        a.put("counter", json!(1)).unwrap();
        a.commit().unwrap();

        b.put("counter", json!(1)).unwrap();
        let err = b.commit().unwrap_err();
        assert_eq!(err, StorageError::write_conflict("counter"));
        assert_eq!(b.state(), HandleState::Aborted);

        // The winner's write stands.
        assert_eq!(engine.snapshot("counter").unwrap().version, 2);
    }

    #[test]
    fn abort_discards_staged_writes() {
        let engine = InMemoryEngine::new();
        let mut txn = engine.open_transaction().unwrap();

        txn.put("users/1", json!(1)).unwrap();
        txn.abort().unwrap();

        assert!(engine.snapshot("users/1").is_none());
        assert_eq!(txn.state(), HandleState::Aborted);

        // Abort on a terminal handle is a no-op.
        txn.abort().unwrap();
    }

    #[test]
    fn operations_after_close_are_rejected() {
        let engine = InMemoryEngine::new();
        let mut txn = engine.open_transaction().unwrap();
        txn.close();

        let err = txn.put("users/1", json!(1)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidOperation(_)));
        assert_eq!(txn.state(), HandleState::Closed);
    }

    #[test]
    fn scripted_commit_faults_fire_in_order() {
        let engine = InMemoryEngine::new();
        engine.fail_next_commit(StorageError::transient("txn aborted"));
        engine.fail_next_commit(StorageError::unknown_commit("timeout"));

        let mut first = engine.open_transaction().unwrap();
        first.put("k", json!(1)).unwrap();
        assert_eq!(
            first.commit().unwrap_err(),
            StorageError::transient("txn aborted")
        );
        assert!(engine.snapshot("k").is_none());

        let mut second = engine.open_transaction().unwrap();
        second.put("k", json!(1)).unwrap();
        assert_eq!(
            second.commit().unwrap_err(),
            StorageError::unknown_commit("timeout")
        );

        let mut third = engine.open_transaction().unwrap();
        third.put("k", json!(1)).unwrap();
        third.commit().unwrap();
        assert_eq!(engine.snapshot("k").unwrap().version, 1);
    }

    #[test]
    fn scripted_open_fault_fires_once() {
        let engine = InMemoryEngine::new();
        engine.fail_next_open(StorageError::ConnectionReset);

        assert_eq!(
            engine.open_transaction().unwrap_err(),
            StorageError::ConnectionReset
        );
        assert!(engine.open_transaction().is_ok());
    }

    #[test]
    fn delete_removes_document_on_commit() {
        let engine = InMemoryEngine::new();
        engine.seed("users/1", json!({"name": "ada"}));

        let mut txn = engine.open_transaction().unwrap();
        txn.delete("users/1").unwrap();
        txn.commit().unwrap();

        assert!(engine.snapshot("users/1").is_none());
    }
}
