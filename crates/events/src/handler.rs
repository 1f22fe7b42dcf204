use std::sync::Arc;

use thiserror::Error;

use crate::Event;

/// Error returned by an event handler.
///
/// Handlers run *after* the transaction that produced the event has already
/// committed, so a handler failure can never roll storage back. The caller
/// (typically the commit-scoped queue's flush) logs the failure and moves on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The handler ran but could not complete its side effect.
    #[error("handler failed: {0}")]
    Failed(String),
}

impl HandlerError {
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Processes one event instance (side-effecting).
///
/// This is the capability the coordinator's commit-scoped queue invokes
/// during flush. Handlers are resolved by the *caller* before enqueueing;
/// the queue never looks handlers up itself.
///
/// Handlers may have ordering-sensitive side effects (e.g. cache
/// invalidation that expects upload-then-view ordering), which is why the
/// queue dispatches sequentially in enqueue order.
pub trait EventHandler<E: Event>: Send + Sync {
    fn handle(&self, event: &E) -> Result<(), HandlerError>;
}

impl<E, H> EventHandler<E> for Arc<H>
where
    E: Event,
    H: EventHandler<E> + ?Sized,
{
    fn handle(&self, event: &E) -> Result<(), HandlerError> {
        (**self).handle(event)
    }
}
