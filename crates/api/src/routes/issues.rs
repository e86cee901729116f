//! Issue endpoints: couriers report drone problems to a maintainer.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::IssueId;
use domain::documents::IssueDocument;
use domain::{CommandResult, Issue, NewIssue};
use serde::Deserialize;

use super::CommandResponse;
use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIssueRequest {
    pub subject: String,
    pub details: String,
    pub courier: String,
    pub assignee: String,
    pub drone_id: String,
}

/// Exactly one of the two filters must be given.
#[derive(Debug, Deserialize)]
pub struct IssueFilter {
    pub assignee: Option<String>,
    pub courier: Option<String>,
}

#[derive(Deserialize)]
pub struct CloseIssueRequest {
    pub solution: String,
}

type IssueCommandResponse = Json<CommandResponse<IssueDocument>>;

fn respond(result: &CommandResult<Issue>) -> Result<IssueCommandResponse, ApiError> {
    let document = IssueDocument::from_issue(&result.aggregate)?;
    Ok(Json(CommandResponse::new(result, document)))
}

#[tracing::instrument(skip(context, req), fields(courier = %req.courier, assignee = %req.assignee))]
pub async fn create(
    State(context): State<Arc<AppContext>>,
    Json(req): Json<CreateIssueRequest>,
) -> Result<(StatusCode, IssueCommandResponse), ApiError> {
    let result = context
        .issues
        .create_issue(NewIssue {
            subject: req.subject,
            details: req.details,
            courier: req.courier,
            assignee: req.assignee,
            drone_id: req.drone_id,
        })
        .await?;
    Ok((StatusCode::CREATED, respond(&result)?))
}

/// GET /issues?assignee=... or GET /issues?courier=...
#[tracing::instrument(skip(context))]
pub async fn list(
    State(context): State<Arc<AppContext>>,
    Query(filter): Query<IssueFilter>,
) -> Result<Json<Vec<IssueDocument>>, ApiError> {
    let issues = match (filter.assignee, filter.courier) {
        (Some(assignee), None) => context.issues.issues_for_assignee(&assignee).await?,
        (None, Some(courier)) => context.issues.issues_for_courier(&courier).await?,
        _ => {
            return Err(ApiError::BadRequest(
                "exactly one of assignee or courier is required".to_string(),
            ));
        }
    };
    let documents = issues
        .iter()
        .map(IssueDocument::from_issue)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(documents))
}

#[tracing::instrument(skip(context))]
pub async fn vision(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
) -> Result<IssueCommandResponse, ApiError> {
    let result = context.issues.vision_issue(IssueId::new(id)?).await?;
    respond(&result)
}

#[tracing::instrument(skip(context, req))]
pub async fn close(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(req): Json<CloseIssueRequest>,
) -> Result<IssueCommandResponse, ApiError> {
    let result = context
        .issues
        .close_issue(IssueId::new(id)?, &req.solution)
        .await?;
    respond(&result)
}
