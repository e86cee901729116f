//! Persisted document shapes and their validated decoding into aggregates.
//!
//! Decoding matches exhaustively on the stored state. An unknown status is a
//! serde error, and a document that names a state but lacks the fields that
//! state needs is a [`DocumentError`].

use chrono::{DateTime, Utc};
use common::{IdentifierError, IssueId, OrderId, ReportId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::ValidationError;
use crate::issue::{Issue, IssueDetails, IssueState};
use crate::negligence::{NegligenceError, NegligenceReport};
use crate::order::{Client, Order, OrderDetails, OrderState, Product};
use crate::telemetry::TelemetrySnapshot;
use crate::value_objects::{DroneId, Solution, Subject, Username};

/// Errors raised while converting between aggregates and documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("Order document has an empty events list")]
    MissingEvents,

    #[error("Document in state {state} is missing {field}")]
    MissingField {
        state: &'static str,
        field: &'static str,
    },

    #[error("Issue has not been assigned an identifier yet")]
    Unidentified,

    #[error(transparent)]
    Identifier(#[from] IdentifierError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Stored report is inconsistent: {0}")]
    Report(#[from] NegligenceError),
}

/// Stored order: `{id, client, product, placingDate, estimatedArrival, newEstimatedArrival?, events}`.
///
/// `events` is the list of states the order went through; the last one is current.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderDocument {
    pub id: u64,
    pub client: String,
    pub product: String,
    pub placing_date: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_estimated_arrival: Option<DateTime<Utc>>,
    pub events: Vec<OrderState>,
}

impl OrderDocument {
    /// Builds a fresh document whose history holds only the current state.
    pub fn from_order(order: &Order) -> Self {
        let details = order.details();
        Self {
            id: details.id().as_u64(),
            client: details.client().to_string(),
            product: details.product().to_string(),
            placing_date: details.placed_at(),
            estimated_arrival: details.estimated_arrival(),
            new_estimated_arrival: order.new_estimated_arrival(),
            events: vec![order.state()],
        }
    }

    /// Overwrites the mutable fields with `order` and appends its state.
    pub fn record(&mut self, order: &Order) {
        self.estimated_arrival = order.details().estimated_arrival();
        self.new_estimated_arrival = order.new_estimated_arrival();
        self.events.push(order.state());
    }

    pub fn current_state(&self) -> Option<OrderState> {
        self.events.last().copied()
    }

    pub fn into_order(self) -> Result<Order, DocumentError> {
        let state = self.current_state().ok_or(DocumentError::MissingEvents)?;
        let details = OrderDetails::new(
            OrderId::new(self.id)?,
            Client::new(self.client)?,
            Product::new(self.product)?,
            self.placing_date,
            self.estimated_arrival,
        )?;
        Ok(match state {
            OrderState::Placed => Order::Placed(details),
            OrderState::Delivering => Order::Delivering(details),
            OrderState::Succeeded => Order::Succeeded(details),
            OrderState::Failed => Order::Failed(details),
            OrderState::Rescheduled => Order::Rescheduled {
                details,
                new_estimated_arrival: self.new_estimated_arrival.ok_or(
                    DocumentError::MissingField {
                        state: "RESCHEDULED",
                        field: "newEstimatedArrival",
                    },
                )?,
            },
        })
    }
}

/// Stored issue status. `sending` issues are never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueStatus {
    Open,
    Visioned,
    Closed,
}

/// Stored issue: `{ID, subject, details, courier, assignedTo, sent, status, droneId, solution?}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueDocument {
    #[serde(rename = "ID")]
    pub id: u64,
    pub subject: String,
    pub details: String,
    pub courier: String,
    pub assigned_to: String,
    pub sent: DateTime<Utc>,
    pub status: IssueStatus,
    pub drone_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl IssueDocument {
    pub fn from_issue(issue: &Issue) -> Result<Self, DocumentError> {
        let id = issue.id().ok_or(DocumentError::Unidentified)?;
        let status = match issue.state() {
            IssueState::Sending => return Err(DocumentError::Unidentified),
            IssueState::Open => IssueStatus::Open,
            IssueState::Visioned => IssueStatus::Visioned,
            IssueState::Closed => IssueStatus::Closed,
        };
        let details = issue.details();
        Ok(Self {
            id: id.as_u64(),
            subject: details.subject.to_string(),
            details: details.details.clone(),
            courier: details.courier.to_string(),
            assigned_to: details.assignee.to_string(),
            sent: details.created_at,
            status,
            drone_id: details.drone_id.to_string(),
            solution: issue.solution().map(Solution::to_string),
        })
    }

    pub fn into_issue(self) -> Result<Issue, DocumentError> {
        let id = IssueId::new(self.id)?;
        let details = IssueDetails {
            subject: Subject::new(self.subject)?,
            details: self.details,
            courier: Username::new(self.courier)?,
            assignee: Username::new(self.assigned_to)?,
            drone_id: DroneId::new(self.drone_id)?,
            created_at: self.sent,
        };
        Ok(match self.status {
            IssueStatus::Open => Issue::Open { id, details },
            IssueStatus::Visioned => Issue::Visioned { id, details },
            IssueStatus::Closed => {
                let solution = self.solution.ok_or(DocumentError::MissingField {
                    state: "closed",
                    field: "solution",
                })?;
                Issue::Closed {
                    id,
                    details,
                    solution: Solution::new(solution)?,
                }
            }
        })
    }
}

/// Stored report: `{ID, negligent, assignee, data, orderId, detectionInstant, closingInstant?, solution?}`.
///
/// A report is closed iff `closingInstant` is present.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NegligenceReportDocument {
    #[serde(rename = "ID")]
    pub id: u64,
    pub negligent: String,
    pub assignee: String,
    pub data: TelemetrySnapshot,
    pub order_id: u64,
    pub detection_instant: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closing_instant: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<String>,
}

impl NegligenceReportDocument {
    pub fn from_report(report: &NegligenceReport) -> Self {
        let details = report.details();
        Self {
            id: details.id().as_u64(),
            negligent: details.negligent().to_string(),
            assignee: details.assignee().to_string(),
            data: *details.data(),
            order_id: details.order_id().as_u64(),
            detection_instant: details.detected_at(),
            closing_instant: report.closed_at(),
            solution: report.solution().map(Solution::to_string),
        }
    }

    pub fn into_report(self) -> Result<NegligenceReport, DocumentError> {
        let open = NegligenceReport::open(
            ReportId::new(self.id)?,
            Username::new(self.negligent)?,
            Username::new(self.assignee)?,
            OrderId::new(self.order_id)?,
            self.data,
            self.detection_instant,
        )?;
        match self.closing_instant {
            None => Ok(open),
            Some(closed_at) => {
                let solution = self.solution.ok_or(DocumentError::MissingField {
                    state: "closed",
                    field: "solution",
                })?;
                Ok(open.close(solution, closed_at)?)
            }
        }
    }
}
