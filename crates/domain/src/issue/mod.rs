//! Issue aggregate: problems reported by couriers to their maintainer.

mod aggregate;
mod service;

pub use aggregate::{Issue, IssueDetails};
pub use service::{IssueService, NewIssue};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;

/// The state of an issue in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
    Sending,
    Open,
    Visioned,
    Closed,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Sending => "sending",
            IssueState::Open => "open",
            IssueState::Visioned => "visioned",
            IssueState::Closed => "closed",
        }
    }
}

impl std::fmt::Display for IssueState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Errors that can occur during issue operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum IssueError {
    #[error("Illegal state transition: cannot {attempted} a {current} issue")]
    IllegalStateTransition {
        current: IssueState,
        attempted: &'static str,
    },

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
