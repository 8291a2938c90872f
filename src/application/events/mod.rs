//! Event emission
//!
//! Booked events travel from the outbox to consumers through an
//! `EventPublisher`: first on the fast path right after commit, then by
//! the dispatcher for anything still pending.

pub mod dispatcher;
pub mod emitter;
pub mod event_bus;
pub mod publisher;

pub use dispatcher::{DispatchReport, DispatcherConfig, OutboxDispatcher};
pub use emitter::EventEmitter;
pub use event_bus::{create_event_bus, EventBus, EventMessage, EventSubscriber, SharedEventBus};
pub use publisher::{
    create_publisher, BusPublisher, EmissionError, EventPublisher, LogPublisher, PublisherKind,
};
