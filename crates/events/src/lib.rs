//! `stockledger-events` — event and pub/sub abstractions.
//!
//! Mechanics only: the `Event` trait, the owner-scoped `EventEnvelope`, and the
//! `EventBus` pub/sub seam with an in-memory implementation for tests/dev.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
