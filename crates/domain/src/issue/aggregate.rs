//! Issue aggregate implementation.

use chrono::{DateTime, Utc};
use common::IssueId;

use crate::value_objects::{DroneId, Solution, Subject, Username};

use super::{IssueError, IssueState};

/// Fields carried by an issue from the moment it is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDetails {
    pub subject: Subject,
    pub details: String,
    pub courier: Username,
    pub assignee: Username,
    pub drone_id: DroneId,
    pub created_at: DateTime<Utc>,
}

/// Issue aggregate root, one variant per lifecycle state.
///
/// ```text
/// Sending ──commit──► Open ──vision──► Visioned ──close──► Closed
/// ```
///
/// A `Sending` issue has no identifier yet; the persistence collaborator
/// assigns one when it commits the issue.
#[derive(Debug, Clone)]
pub enum Issue {
    Sending(IssueDetails),
    Open {
        id: IssueId,
        details: IssueDetails,
    },
    Visioned {
        id: IssueId,
        details: IssueDetails,
    },
    Closed {
        id: IssueId,
        details: IssueDetails,
        solution: Solution,
    },
}

impl Issue {
    /// Writes a new issue, not yet sent to the maintainer.
    pub fn create(
        subject: Subject,
        details: impl Into<String>,
        courier: Username,
        assignee: Username,
        drone_id: DroneId,
        created_at: DateTime<Utc>,
    ) -> Self {
        Issue::Sending(IssueDetails {
            subject,
            details: details.into(),
            courier,
            assignee,
            drone_id,
            created_at,
        })
    }

    /// Returns the identifier, or `None` while the issue is still being sent.
    pub fn id(&self) -> Option<IssueId> {
        match self {
            Issue::Sending(_) => None,
            Issue::Open { id, .. } | Issue::Visioned { id, .. } | Issue::Closed { id, .. } => {
                Some(*id)
            }
        }
    }

    pub fn details(&self) -> &IssueDetails {
        match self {
            Issue::Sending(details)
            | Issue::Open { details, .. }
            | Issue::Visioned { details, .. }
            | Issue::Closed { details, .. } => details,
        }
    }

    pub fn state(&self) -> IssueState {
        match self {
            Issue::Sending(_) => IssueState::Sending,
            Issue::Open { .. } => IssueState::Open,
            Issue::Visioned { .. } => IssueState::Visioned,
            Issue::Closed { .. } => IssueState::Closed,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            Issue::Closed { solution, .. } => Some(solution),
            _ => None,
        }
    }

    /// Assigns the identifier. Only the persistence layer calls this.
    pub fn commit(self, id: IssueId) -> Result<Self, IssueError> {
        match self {
            Issue::Sending(details) => Ok(Issue::Open { id, details }),
            other => Err(other.illegal("commit")),
        }
    }

    /// Marks the issue as seen by its assignee.
    pub fn vision(self) -> Result<Self, IssueError> {
        match self {
            Issue::Open { id, details } => Ok(Issue::Visioned { id, details }),
            other => Err(other.illegal("vision")),
        }
    }

    /// Closes a visioned issue with a non-blank solution.
    pub fn close(self, solution: impl Into<String>) -> Result<Self, IssueError> {
        match self {
            Issue::Visioned { id, details } => Ok(Issue::Closed {
                id,
                details,
                solution: Solution::new(solution)?,
            }),
            other => Err(other.illegal("close")),
        }
    }

    fn illegal(&self, attempted: &'static str) -> IssueError {
        IssueError::IllegalStateTransition {
            current: self.state(),
            attempted,
        }
    }
}

impl PartialEq for Issue {
    /// Created issues are equal iff their identifiers match.
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.details() == other.details(),
            _ => false,
        }
    }
}

impl Eq for Issue {}
