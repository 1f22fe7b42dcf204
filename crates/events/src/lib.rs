//! `txngate-events` — event abstractions.
//!
//! Defines the domain-agnostic [`Event`] trait, the [`EventHandler`]
//! capability invoked by the commit-scoped queue, and the general
//! publish/subscribe [`EventBus`] used for immediate dispatch (events that
//! must fire regardless of transaction outcome).

pub mod bus;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use event::Event;
pub use handler::{EventHandler, HandlerError};
pub use in_memory_bus::InMemoryEventBus;
