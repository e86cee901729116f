//! Monitoring error types.

use common::OrderId;
use domain::DomainError;
use domain::repository::RepositoryError;
use domain::telemetry::ConfigError;
use thiserror::Error;

/// Errors reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The broker connection is down.
    #[error("Transport disconnected")]
    Disconnected,

    /// The broker did not acknowledge within the caller's budget.
    #[error("Transport did not answer within {0:?}")]
    TimedOut(std::time::Duration),

    #[error("No subscription for topic {0}")]
    NotSubscribed(String),
}

/// Errors that can occur during monitoring operations.
#[derive(Debug, Error)]
pub enum MonitoringError {
    /// The order already has an active monitor.
    #[error("Order {0} is already being monitored")]
    AlreadyMonitoring(OrderId),

    /// The order has no active monitor.
    #[error("Order {0} is not being monitored")]
    NotMonitoring(OrderId),

    /// Transport error.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Persistence error.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Threshold configuration was rejected.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for monitoring results.
pub type Result<T> = std::result::Result<T, MonitoringError>;
