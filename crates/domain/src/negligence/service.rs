//! Negligence report service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::{OrderId, ReportId};
use event_bus::EventBus;

use crate::command::{CommandResult, commit_and_raise};
use crate::error::DomainError;
use crate::events::DroneEvent;
use crate::persistence::{DEFAULT_PERSISTENCE_BUDGET, bounded};
use crate::repository::NegligenceRepository;
use crate::telemetry::TelemetrySnapshot;
use crate::value_objects::Username;

use super::{NegligenceReport, ReportQuery};

/// Input for opening a report.
#[derive(Debug, Clone)]
pub struct NewReport {
    pub negligent: Username,
    pub assignee: Username,
    pub order_id: OrderId,
    pub data: TelemetrySnapshot,
    pub detected_at: DateTime<Utc>,
}

/// Service for opening and closing negligence reports.
pub struct NegligenceService {
    repository: Arc<dyn NegligenceRepository>,
    bus: Arc<EventBus<DroneEvent>>,
    budget: Duration,
}

impl NegligenceService {
    pub fn new(
        repository: Arc<dyn NegligenceRepository>,
        bus: Arc<EventBus<DroneEvent>>,
    ) -> Self {
        Self {
            repository,
            bus,
            budget: DEFAULT_PERSISTENCE_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Opens a report and raises `NewNegligence`.
    #[tracing::instrument(skip(self, input), fields(order_id = %input.order_id, negligent = %input.negligent))]
    pub async fn open_report(
        &self,
        input: NewReport,
    ) -> Result<CommandResult<NegligenceReport>, DomainError> {
        if input.data.is_empty() {
            return Err(super::NegligenceError::EmptyTelemetry.into());
        }
        let id = bounded(
            "negligence.next_identifier",
            self.budget,
            self.repository.next_identifier(),
        )
        .await?;
        let report = NegligenceReport::open(
            id,
            input.negligent,
            input.assignee,
            input.order_id,
            input.data,
            input.detected_at,
        )?;
        bounded("negligence.create", self.budget, self.repository.create(&report)).await?;

        metrics::counter!("negligence_reports_opened_total").increment(1);
        tracing::info!(report_id = %id, "negligence report opened");
        let event = DroneEvent::NewNegligence {
            report: report.clone(),
        };
        Ok(commit_and_raise(&self.bus, report, event).await)
    }

    /// Closes a report and raises `NegligenceReportClosed`.
    #[tracing::instrument(skip(self, solution))]
    pub async fn close_report(
        &self,
        id: ReportId,
        solution: &str,
        closed_at: DateTime<Utc>,
    ) -> Result<CommandResult<NegligenceReport>, DomainError> {
        let report = self
            .find_report(id)
            .await?
            .ok_or_else(|| DomainError::not_found("NegligenceReport", id))?;
        let expected = report.state();
        let closed = report.close(solution, closed_at)?;
        bounded(
            "negligence.update",
            self.budget,
            self.repository.update(expected, &closed),
        )
        .await?;

        tracing::info!(report_id = %id, "negligence report closed");
        let event = DroneEvent::NegligenceReportClosed {
            report: closed.clone(),
        };
        Ok(commit_and_raise(&self.bus, closed, event).await)
    }

    pub async fn find_report(&self, id: ReportId) -> Result<Option<NegligenceReport>, DomainError> {
        Ok(bounded("negligence.find", self.budget, self.repository.find(id)).await?)
    }

    /// Reports matching `query`.
    pub async fn reports(&self, query: &ReportQuery) -> Result<Vec<NegligenceReport>, DomainError> {
        Ok(bounded("negligence.list", self.budget, self.repository.list(query)).await?)
    }
}
