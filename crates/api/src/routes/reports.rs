//! Negligence report queries and closing.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use common::ReportId;
use domain::documents::NegligenceReportDocument;
use domain::{ReportQuery, ReportState, Username};
use serde::Deserialize;

use super::CommandResponse;
use crate::context::AppContext;
use crate::error::ApiError;

/// Every filter is optional; `state` is `open` or `closed`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportFilter {
    pub assignee: Option<String>,
    pub negligent: Option<String>,
    pub state: Option<ReportState>,
}

impl ReportFilter {
    fn into_query(self) -> Result<ReportQuery, ApiError> {
        Ok(ReportQuery {
            negligent: self.negligent.map(Username::new).transpose()?,
            assignee: self.assignee.map(Username::new).transpose()?,
            state: self.state,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseReportRequest {
    pub solution: String,
    /// Defaults to now.
    pub closed_at: Option<DateTime<Utc>>,
}

#[tracing::instrument(skip(context))]
pub async fn list(
    State(context): State<Arc<AppContext>>,
    Query(filter): Query<ReportFilter>,
) -> Result<Json<Vec<NegligenceReportDocument>>, ApiError> {
    let reports = context.negligence.reports(&filter.into_query()?).await?;
    Ok(Json(
        reports
            .iter()
            .map(NegligenceReportDocument::from_report)
            .collect(),
    ))
}

#[tracing::instrument(skip(context, req))]
pub async fn close(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(req): Json<CloseReportRequest>,
) -> Result<Json<CommandResponse<NegligenceReportDocument>>, ApiError> {
    let closed_at = req.closed_at.unwrap_or_else(Utc::now);
    let result = context
        .negligence
        .close_report(ReportId::new(id)?, &req.solution, closed_at)
        .await?;
    let document = NegligenceReportDocument::from_report(&result.aggregate);
    Ok(Json(CommandResponse::new(&result, document)))
}
