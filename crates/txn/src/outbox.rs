//! Commit-scoped event queue (in-memory outbox).
//!
//! An ordered buffer of (event, handler) pairs accumulated during one unit
//! of work. Flushed only after the transaction commits; discarded when it
//! aborts, so side effects never fire for work that was rolled back. The
//! queue is fresh per attempt and exclusively owned by the attempt that
//! created it.
//!
//! Known, accepted gap: there is no durable outbox. A crash between commit
//! and flush drops the queued events (the database stays consistent; the
//! event effect is lost). Flush failures are logged, never rolled back —
//! the storage side effect is final by then.

use tracing::{debug, warn};

use txngate_events::{Event, EventHandler, HandlerError};

/// One queued (event, handler) pairing, type-erased so events of different
/// types share a single buffer. Consumed exactly once by flush, or dropped
/// entirely on discard.
struct QueuedEvent {
    event_type: &'static str,
    dispatch: Box<dyn FnOnce() -> Result<(), HandlerError> + Send>,
}

impl core::fmt::Debug for QueuedEvent {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("QueuedEvent")
            .field("event_type", &self.event_type)
            .finish_non_exhaustive()
    }
}

/// Ordered, per-execution buffer of commit-scoped events.
#[derive(Debug, Default)]
pub struct CommitQueue {
    entries: Vec<QueuedEvent>,
}

impl CommitQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event with the handler that must process it.
    ///
    /// The handler is resolved by the caller; the queue never looks
    /// handlers up.
    pub fn enqueue<E, H>(&mut self, event: E, handler: H)
    where
        E: Event,
        H: EventHandler<E> + 'static,
    {
        let event_type = event.event_type();
        self.entries.push(QueuedEvent {
            event_type,
            dispatch: Box::new(move || handler.handle(&event)),
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invoke every handler sequentially, in enqueue order.
    ///
    /// Called only after a successful commit. A failing handler is logged
    /// and the remaining entries still dispatch; by this point the storage
    /// write is final, so there is nothing to roll back.
    pub fn flush(self) {
        for entry in self.entries {
            if let Err(err) = (entry.dispatch)() {
                warn!(
                    event_type = entry.event_type,
                    error = %err,
                    "commit-scoped event handler failed after commit; event effect lost"
                );
            }
        }
    }

    /// Drop every entry without invoking anything (abort path).
    pub fn discard(self) {
        if !self.entries.is_empty() {
            debug!(dropped = self.entries.len(), "discarding commit-scoped events");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct TestEvent {
        name: &'static str,
        at: DateTime<Utc>,
    }

    impl TestEvent {
        fn new(name: &'static str) -> Self {
            Self {
                name,
                at: Utc::now(),
            }
        }
    }

    impl Event for TestEvent {
        fn event_type(&self) -> &'static str {
            self.name
        }

        fn occurred_at(&self) -> DateTime<Utc> {
            self.at
        }
    }

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<&'static str>>,
        fail_on: Option<&'static str>,
    }

    impl EventHandler<TestEvent> for Recorder {
        fn handle(&self, event: &TestEvent) -> Result<(), HandlerError> {
            self.seen.lock().unwrap().push(event.name);
            if self.fail_on == Some(event.name) {
                return Err(HandlerError::failed("boom"));
            }
            Ok(())
        }
    }

    #[test]
    fn flush_dispatches_in_enqueue_order() {
        let handler = Arc::new(Recorder::default());
        let mut queue = CommitQueue::new();

        queue.enqueue(TestEvent::new("media.uploaded"), Arc::clone(&handler));
        queue.enqueue(TestEvent::new("media.viewed"), Arc::clone(&handler));
        queue.enqueue(TestEvent::new("feed.refreshed"), Arc::clone(&handler));
        assert_eq!(queue.len(), 3);

        queue.flush();

        assert_eq!(
            *handler.seen.lock().unwrap(),
            vec!["media.uploaded", "media.viewed", "feed.refreshed"]
        );
    }

    #[test]
    fn discard_invokes_nothing() {
        let handler = Arc::new(Recorder::default());
        let mut queue = CommitQueue::new();

        queue.enqueue(TestEvent::new("media.uploaded"), Arc::clone(&handler));
        queue.discard();

        assert!(handler.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn a_failing_handler_does_not_stop_the_flush() {
        let handler = Arc::new(Recorder {
            seen: Mutex::new(Vec::new()),
            fail_on: Some("media.viewed"),
        });
        let mut queue = CommitQueue::new();

        queue.enqueue(TestEvent::new("media.uploaded"), Arc::clone(&handler));
        queue.enqueue(TestEvent::new("media.viewed"), Arc::clone(&handler));
        queue.enqueue(TestEvent::new("feed.refreshed"), Arc::clone(&handler));

        queue.flush();

        assert_eq!(
            *handler.seen.lock().unwrap(),
            vec!["media.uploaded", "media.viewed", "feed.refreshed"]
        );
    }

    #[test]
    fn queues_mix_event_types() {
        #[derive(Debug, Clone)]
        struct Other(DateTime<Utc>);
        impl Event for Other {
            fn event_type(&self) -> &'static str {
                "other"
            }
            fn occurred_at(&self) -> DateTime<Utc> {
                self.0
            }
        }

        struct Count(Arc<Mutex<usize>>);
        impl EventHandler<Other> for Count {
            fn handle(&self, _: &Other) -> Result<(), HandlerError> {
                *self.0.lock().unwrap() += 1;
                Ok(())
            }
        }

        let recorder = Arc::new(Recorder::default());
        let count = Arc::new(Mutex::new(0));
        let mut queue = CommitQueue::new();

        queue.enqueue(TestEvent::new("media.uploaded"), Arc::clone(&recorder));
        queue.enqueue(Other(Utc::now()), Count(Arc::clone(&count)));

        queue.flush();

        assert_eq!(*recorder.seen.lock().unwrap(), vec!["media.uploaded"]);
        assert_eq!(*count.lock().unwrap(), 1);
    }
}
