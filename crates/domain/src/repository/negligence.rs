use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::ReportId;
use tokio::sync::RwLock;

use crate::documents::NegligenceReportDocument;
use crate::negligence::{NegligenceReport, ReportQuery, ReportState};

use super::{RepositoryError, SimulatedFaults};

/// Storage for negligence reports.
#[async_trait]
pub trait NegligenceRepository: Send + Sync {
    async fn next_identifier(&self) -> Result<ReportId, RepositoryError>;

    /// Stores a newly opened report.
    async fn create(&self, report: &NegligenceReport) -> Result<(), RepositoryError>;

    /// Replaces a stored report with its new state.
    ///
    /// Fails with [`RepositoryError::Conflict`] unless the stored report is
    /// still in the `expected` state.
    async fn update(
        &self,
        expected: ReportState,
        report: &NegligenceReport,
    ) -> Result<(), RepositoryError>;

    async fn find(&self, id: ReportId) -> Result<Option<NegligenceReport>, RepositoryError>;

    /// Reports matching `query`, by ascending identifier.
    async fn list(&self, query: &ReportQuery) -> Result<Vec<NegligenceReport>, RepositoryError>;
}

#[derive(Default)]
struct ReportTable {
    last_id: Option<ReportId>,
    documents: BTreeMap<ReportId, NegligenceReportDocument>,
}

/// In-memory negligence report repository.
#[derive(Clone, Default)]
pub struct InMemoryNegligenceRepository {
    table: Arc<RwLock<ReportTable>>,
    faults: SimulatedFaults,
}

impl InMemoryNegligenceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &SimulatedFaults {
        &self.faults
    }

    /// Number of stored reports.
    pub async fn count(&self) -> usize {
        self.table.read().await.documents.len()
    }
}

#[async_trait]
impl NegligenceRepository for InMemoryNegligenceRepository {
    async fn next_identifier(&self) -> Result<ReportId, RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        let id = table.last_id.map_or_else(ReportId::first, |id| id.next());
        table.last_id = Some(id);
        Ok(id)
    }

    async fn create(&self, report: &NegligenceReport) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        if table.documents.contains_key(&report.id()) {
            return Err(RepositoryError::Duplicate {
                kind: "negligence report",
                id: report.id().to_string(),
            });
        }
        table
            .documents
            .insert(report.id(), NegligenceReportDocument::from_report(report));
        Ok(())
    }

    async fn update(
        &self,
        expected: ReportState,
        report: &NegligenceReport,
    ) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        let stored =
            table
                .documents
                .get_mut(&report.id())
                .ok_or_else(|| RepositoryError::Missing {
                    kind: "negligence report",
                    id: report.id().to_string(),
                })?;
        let actual = stored.clone().into_report()?.state();
        if actual != expected {
            return Err(RepositoryError::Conflict {
                kind: "negligence report",
                id: report.id().to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        *stored = NegligenceReportDocument::from_report(report);
        Ok(())
    }

    async fn find(&self, id: ReportId) -> Result<Option<NegligenceReport>, RepositoryError> {
        self.faults.apply().await?;
        let table = self.table.read().await;
        match table.documents.get(&id) {
            Some(document) => Ok(Some(document.clone().into_report()?)),
            None => Ok(None),
        }
    }

    async fn list(&self, query: &ReportQuery) -> Result<Vec<NegligenceReport>, RepositoryError> {
        self.faults.apply().await?;
        let table = self.table.read().await;
        let mut reports = Vec::new();
        for document in table.documents.values() {
            let report = document.clone().into_report()?;
            if query.matches(&report) {
                reports.push(report);
            }
        }
        Ok(reports)
    }
}
