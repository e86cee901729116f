//! In-process publish/subscribe for domain events.
//!
//! Handlers are registered per event type tag and invoked inline, in
//! registration order, by [`EventBus::raise`]. There is no persistence, no
//! retry and no cross-process delivery.

pub mod bus;
pub mod error;
pub mod event;

pub use bus::{EventBus, EventHandler, FnHandler};
pub use error::{HandlerError, HandlerFailure, RaiseError};
pub use event::{DomainEvent, EventId};
