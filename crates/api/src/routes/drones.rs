//! Drone-facing endpoints: telemetry ingress and commands.

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use common::{OrderId, ReportId};
use domain::Alert;
use monitoring::{DroneCommand, ProcessOutcome};
use serde::Serialize;

use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandSent {
    pub order_id: u64,
    pub command: DroneCommand,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryAccepted {
    pub duplicate: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report_id: Option<ReportId>,
}

/// POST /drones/{order_id}/telemetry feeds one reading to the order's monitor,
/// for drones that cannot reach the broker.
#[tracing::instrument(skip(context, payload))]
pub async fn telemetry(
    State(context): State<Arc<AppContext>>,
    Path(order_id): Path<u64>,
    payload: Bytes,
) -> Result<Json<TelemetryAccepted>, ApiError> {
    let order_id = OrderId::new(order_id)?;
    match context.coordinator.ingest(order_id, &payload).await {
        ProcessOutcome::Processed { alert, report } => Ok(Json(TelemetryAccepted {
            duplicate: false,
            alert: Some(alert),
            report_id: report,
        })),
        ProcessOutcome::Duplicate => Ok(Json(TelemetryAccepted {
            duplicate: true,
            alert: None,
            report_id: None,
        })),
        ProcessOutcome::NotMonitored => {
            Err(monitoring::MonitoringError::NotMonitoring(order_id).into())
        }
        ProcessOutcome::Rejected => Err(ApiError::BadRequest(
            "telemetry payload is malformed or addressed to another order".to_string(),
        )),
    }
}

pub async fn halt(
    State(context): State<Arc<AppContext>>,
    Path(order_id): Path<u64>,
) -> Result<(StatusCode, Json<CommandSent>), ApiError> {
    send(&context, order_id, DroneCommand::Halt).await
}

pub async fn proceed(
    State(context): State<Arc<AppContext>>,
    Path(order_id): Path<u64>,
) -> Result<(StatusCode, Json<CommandSent>), ApiError> {
    send(&context, order_id, DroneCommand::Proceed).await
}

async fn send(
    context: &AppContext,
    order_id: u64,
    command: DroneCommand,
) -> Result<(StatusCode, Json<CommandSent>), ApiError> {
    context
        .coordinator
        .send_command(OrderId::new(order_id)?, command)
        .await?;
    Ok((StatusCode::ACCEPTED, Json(CommandSent { order_id, command })))
}
