//! Domain error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::issue::IssueError;
use crate::negligence::NegligenceError;
use crate::order::OrderError;
use crate::repository::RepositoryError;

/// Malformed value construction. Never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// A required text field was empty or blank.
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    /// Usernames may not contain digits.
    #[error("Username {0:?} must not contain digits")]
    UsernameHasDigits(String),

    /// Proximity distances must be finite and non-negative.
    #[error("Proximity must be a non-negative number, got {0}")]
    InvalidProximity(f64),

    /// Orientation angles must lie within [-180, 180] degrees.
    #[error("Angle {0} is outside [-180, 180]")]
    AngleOutOfRange(f64),

    /// Image sizes are byte counts.
    #[error("Image size must be non-negative, got {0}")]
    NegativeImageSize(i64),

    #[error("Estimated arrival {estimated_arrival} precedes placing date {placed_at}")]
    ArrivalBeforePlacing {
        placed_at: DateTime<Utc>,
        estimated_arrival: DateTime<Utc>,
    },

    #[error("New estimated arrival {requested} must be after {current}")]
    RescheduleNotLater {
        current: DateTime<Utc>,
        requested: DateTime<Utc>,
    },

    #[error("Closing instant {closed_at} precedes detection instant {detected_at}")]
    ClosedBeforeDetection {
        detected_at: DateTime<Utc>,
        closed_at: DateTime<Utc>,
    },
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A value could not be constructed.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// An error occurred in the order aggregate.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// An error occurred in the issue aggregate.
    #[error("Issue error: {0}")]
    Issue(#[from] IssueError),

    /// An error occurred in the negligence report aggregate.
    #[error("Negligence report error: {0}")]
    Negligence(#[from] NegligenceError),

    /// The persistence collaborator failed or timed out.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    NotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },
}

impl DomainError {
    pub(crate) fn not_found(aggregate_type: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            aggregate_type,
            aggregate_id: id.to_string(),
        }
    }

    /// Returns true if the underlying cause is a validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            DomainError::Validation(_)
                | DomainError::Order(OrderError::Validation(_))
                | DomainError::Issue(IssueError::Validation(_))
                | DomainError::Negligence(NegligenceError::Validation(_))
                | DomainError::Negligence(NegligenceError::EmptyTelemetry)
        )
    }

    /// Returns true if a concurrent command committed first.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::Repository(RepositoryError::Conflict { .. })
        )
    }

    /// Returns true if the underlying cause is an illegal lifecycle transition.
    pub fn is_illegal_transition(&self) -> bool {
        matches!(
            self,
            DomainError::Order(OrderError::IllegalStateTransition { .. })
                | DomainError::Issue(IssueError::IllegalStateTransition { .. })
                | DomainError::Negligence(NegligenceError::IllegalStateTransition { .. })
        )
    }
}
