//! Negligence reports opened when a courier drives a drone into a critical condition.

mod aggregate;
mod query;
mod service;

pub use aggregate::{NegligenceReport, ReportDetails};
pub use query::ReportQuery;
pub use service::{NegligenceService, NewReport};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;

/// The state of a negligence report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportState {
    Open,
    Closed,
}

impl ReportState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportState::Open => "open",
            ReportState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ReportState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during negligence report operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NegligenceError {
    /// A report needs at least one telemetry dimension.
    #[error("Negligence report requires non-empty telemetry data")]
    EmptyTelemetry,

    #[error("Illegal state transition: cannot {attempted} a {current} report")]
    IllegalStateTransition {
        current: ReportState,
        attempted: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
