//! Negligence report aggregate implementation.

use chrono::{DateTime, Utc};
use common::{OrderId, ReportId};

use crate::error::ValidationError;
use crate::telemetry::TelemetrySnapshot;
use crate::value_objects::{Solution, Username};

use super::{NegligenceError, ReportState};

/// Fields recorded when a critical condition is detected.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportDetails {
    id: ReportId,
    negligent: Username,
    assignee: Username,
    order_id: OrderId,
    data: TelemetrySnapshot,
    detected_at: DateTime<Utc>,
}

impl ReportDetails {
    pub fn id(&self) -> ReportId {
        self.id
    }

    /// Courier held responsible.
    pub fn negligent(&self) -> &Username {
        &self.negligent
    }

    /// Maintainer who reviews the report.
    pub fn assignee(&self) -> &Username {
        &self.assignee
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    /// Snapshot that triggered the report. Never empty.
    pub fn data(&self) -> &TelemetrySnapshot {
        &self.data
    }

    pub fn detected_at(&self) -> DateTime<Utc> {
        self.detected_at
    }
}

/// Negligence report, open until a maintainer closes it with a solution.
#[derive(Debug, Clone, PartialEq)]
pub enum NegligenceReport {
    Open(ReportDetails),
    Closed {
        details: ReportDetails,
        closed_at: DateTime<Utc>,
        solution: Solution,
    },
}

impl NegligenceReport {
    /// Opens a report.
    ///
    /// Fails with [`NegligenceError::EmptyTelemetry`] if no dimension of the
    /// snapshot is populated.
    pub fn open(
        id: ReportId,
        negligent: Username,
        assignee: Username,
        order_id: OrderId,
        data: TelemetrySnapshot,
        detected_at: DateTime<Utc>,
    ) -> Result<Self, NegligenceError> {
        if data.is_empty() {
            return Err(NegligenceError::EmptyTelemetry);
        }
        Ok(NegligenceReport::Open(ReportDetails {
            id,
            negligent,
            assignee,
            order_id,
            data,
            detected_at,
        }))
    }

    /// Closes an open report.
    ///
    /// The solution must be non-blank and the closing instant may not precede
    /// the detection instant.
    pub fn close(
        self,
        solution: impl Into<String>,
        closed_at: DateTime<Utc>,
    ) -> Result<Self, NegligenceError> {
        let details = match self {
            NegligenceReport::Open(details) => details,
            closed @ NegligenceReport::Closed { .. } => {
                return Err(NegligenceError::IllegalStateTransition {
                    current: closed.state(),
                    attempted: "close",
                });
            }
        };
        let solution = Solution::new(solution)?;
        if closed_at < details.detected_at {
            return Err(ValidationError::ClosedBeforeDetection {
                detected_at: details.detected_at,
                closed_at,
            }
            .into());
        }
        Ok(NegligenceReport::Closed {
            details,
            closed_at,
            solution,
        })
    }

    pub fn details(&self) -> &ReportDetails {
        match self {
            NegligenceReport::Open(details) | NegligenceReport::Closed { details, .. } => details,
        }
    }

    pub fn id(&self) -> ReportId {
        self.details().id
    }

    pub fn state(&self) -> ReportState {
        match self {
            NegligenceReport::Open(_) => ReportState::Open,
            NegligenceReport::Closed { .. } => ReportState::Closed,
        }
    }

    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            NegligenceReport::Closed { closed_at, .. } => Some(*closed_at),
            NegligenceReport::Open(_) => None,
        }
    }

    pub fn solution(&self) -> Option<&Solution> {
        match self {
            NegligenceReport::Closed { solution, .. } => Some(solution),
            NegligenceReport::Open(_) => None,
        }
    }
}
