use crate::value_objects::Username;

use super::{NegligenceReport, ReportState};

/// Builder for filtering negligence reports.
///
/// Empty filters match every report.
#[derive(Debug, Clone, Default)]
pub struct ReportQuery {
    /// Filter by the courier held responsible.
    pub negligent: Option<Username>,

    /// Filter by the reviewing maintainer.
    pub assignee: Option<Username>,

    /// Filter by open/closed.
    pub state: Option<ReportState>,
}

impl ReportQuery {
    /// Creates a new empty query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a query for reports against a courier.
    pub fn for_negligent(negligent: Username) -> Self {
        Self {
            negligent: Some(negligent),
            ..Default::default()
        }
    }

    /// Creates a query for reports reviewed by a maintainer.
    pub fn for_assignee(assignee: Username) -> Self {
        Self {
            assignee: Some(assignee),
            ..Default::default()
        }
    }

    /// Restricts the query to open reports.
    pub fn open(mut self) -> Self {
        self.state = Some(ReportState::Open);
        self
    }

    /// Restricts the query to closed reports.
    pub fn closed(mut self) -> Self {
        self.state = Some(ReportState::Closed);
        self
    }

    /// Returns true if `report` satisfies every filter.
    pub fn matches(&self, report: &NegligenceReport) -> bool {
        let details = report.details();
        if let Some(ref negligent) = self.negligent
            && details.negligent() != negligent
        {
            return false;
        }
        if let Some(ref assignee) = self.assignee
            && details.assignee() != assignee
        {
            return false;
        }
        if let Some(state) = self.state
            && report.state() != state
        {
            return false;
        }
        true
    }
}
