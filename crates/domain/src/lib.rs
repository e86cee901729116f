//! Domain layer for drone delivery monitoring.
//!
//! This crate provides:
//! - value objects validated at construction
//! - the order, issue and negligence report lifecycles as tagged variants
//! - the telemetry evaluator and its threshold configuration
//! - the domain events raised after each committed transition
//! - repository capabilities with in-memory implementations and their
//!   persisted document shapes
//! - application services that persist a transition before raising its event

pub mod command;
pub mod documents;
pub mod error;
pub mod events;
pub mod issue;
pub mod negligence;
pub mod order;
pub mod persistence;
pub mod repository;
pub mod telemetry;
pub mod value_objects;

pub use command::CommandResult;
pub use error::{DomainError, ValidationError};
pub use events::{DroneEvent, event_types};
pub use issue::{Issue, IssueError, IssueService, IssueState, NewIssue};
pub use negligence::{
    NegligenceError, NegligenceReport, NegligenceService, NewReport, ReportQuery, ReportState,
};
pub use order::{
    Client, DeliveryAssignment, Order, OrderError, OrderService, OrderState, Product,
};
pub use repository::RepositoryError;
pub use telemetry::{
    Alert, AlertLevel, AlertType, EvaluatorConfig, TelemetryEvaluator, TelemetryReading,
    TelemetrySnapshot,
};
pub use value_objects::{DroneId, Solution, Subject, Username};
