//! Telemetry monitoring for orders in delivery.
//!
//! The [`MonitoringCoordinator`] subscribes to each delivering order's
//! telemetry topic, evaluates every reading, opens a negligence report on the
//! transition into a critical alert, and keeps the telemetry history. The
//! [`handlers`] module bridges domain events to the coordinator and to the
//! transport.

pub mod config;
pub mod coordinator;
pub mod error;
pub mod handlers;
pub mod messages;
pub mod topics;
pub mod transport;

pub use config::MonitoringConfig;
pub use coordinator::{MonitoringCoordinator, ProcessOutcome};
pub use error::{MonitoringError, TransportError};
pub use handlers::register_handlers;
pub use messages::{DroneCommand, MovingState};
pub use transport::{InMemoryTransport, Message, MessageHandler, Transport};
