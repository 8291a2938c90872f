pub mod booking;
pub mod events;

pub use booking::{
    BookingCoordinator, ConflictDetector, HotelStatistics, LifecycleService, ReservationQueries,
};
pub use events::{
    create_event_bus, create_publisher, EventBus, EventEmitter, EventMessage, EventPublisher,
    OutboxDispatcher, PublisherKind, SharedEventBus,
};
