//! `gala-events` — lifecycle events and their distribution.
//!
//! Events are published only after the unit of work that produced them has
//! committed. Downstream consumers (notifications, reporting) subscribe to the
//! bus; nothing in the account core reacts to its own events.

pub mod bus;
pub mod envelope;
pub mod event;
pub mod handler;
pub mod in_memory_bus;

pub use bus::{EventBus, Subscription};
pub use envelope::EventEnvelope;
pub use event::Event;
pub use handler::{EventHandler, drain};
pub use in_memory_bus::{InMemoryBusError, InMemoryEventBus};
