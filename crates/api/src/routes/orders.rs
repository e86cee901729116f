//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use common::OrderId;
use domain::telemetry::ProcessedReading;
use domain::{CommandResult, DeliveryAssignment, DroneId, Order, OrderState, Username};
use serde::{Deserialize, Serialize};

use super::CommandResponse;
use crate::context::AppContext;
use crate::error::ApiError;

// -- Request types --

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub client: String,
    pub product: String,
    pub estimated_arrival: DateTime<Utc>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliverRequest {
    pub drone_id: String,
    pub courier: String,
    pub supervisor: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub new_estimated_arrival: DateTime<Utc>,
}

// -- Response types --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: u64,
    pub client: String,
    pub product: String,
    pub state: OrderState,
    pub placing_date: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_estimated_arrival: Option<DateTime<Utc>>,
    pub monitored: bool,
}

impl OrderResponse {
    fn new(order: &Order, context: &AppContext) -> Self {
        let details = order.details();
        Self {
            id: order.id().as_u64(),
            client: details.client().to_string(),
            product: details.product().to_string(),
            state: order.state(),
            placing_date: details.placed_at(),
            estimated_arrival: order.estimated_arrival(),
            new_estimated_arrival: order.new_estimated_arrival(),
            monitored: context.coordinator.is_monitoring(order.id()),
        }
    }
}

type OrderCommandResponse = Json<CommandResponse<OrderResponse>>;

fn respond(result: &CommandResult<Order>, context: &AppContext) -> OrderCommandResponse {
    Json(CommandResponse::new(
        result,
        OrderResponse::new(&result.aggregate, context),
    ))
}

// -- Handlers --

/// POST /orders places a new order.
#[tracing::instrument(skip(context, req))]
pub async fn create(
    State(context): State<Arc<AppContext>>,
    Json(req): Json<PlaceOrderRequest>,
) -> Result<(StatusCode, OrderCommandResponse), ApiError> {
    let result = context
        .orders
        .place_order(&req.client, &req.product, req.estimated_arrival)
        .await?;
    Ok((StatusCode::CREATED, respond(&result, &context)))
}

/// GET /orders lists every order.
#[tracing::instrument(skip(context))]
pub async fn list(
    State(context): State<Arc<AppContext>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = context.orders.list_orders().await?;
    Ok(Json(
        orders
            .iter()
            .map(|order| OrderResponse::new(order, &context))
            .collect(),
    ))
}

#[tracing::instrument(skip(context))]
pub async fn get(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order = find(&context, OrderId::new(id)?).await?;
    Ok(Json(OrderResponse::new(&order, &context)))
}

/// POST /orders/{id}/deliver hands the order to a drone; monitoring starts.
#[tracing::instrument(skip(context, req))]
pub async fn deliver(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(req): Json<DeliverRequest>,
) -> Result<OrderCommandResponse, ApiError> {
    let assignment = DeliveryAssignment::new(
        DroneId::new(req.drone_id)?,
        Username::new(req.courier)?,
        Username::new(req.supervisor)?,
    );
    let result = context
        .orders
        .start_delivery(OrderId::new(id)?, assignment)
        .await?;
    Ok(respond(&result, &context))
}

#[tracing::instrument(skip(context))]
pub async fn succeed(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
) -> Result<OrderCommandResponse, ApiError> {
    let result = context.orders.succeed(OrderId::new(id)?).await?;
    Ok(respond(&result, &context))
}

#[tracing::instrument(skip(context))]
pub async fn fail(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
) -> Result<OrderCommandResponse, ApiError> {
    let result = context.orders.fail(OrderId::new(id)?).await?;
    Ok(respond(&result, &context))
}

#[tracing::instrument(skip(context, req))]
pub async fn reschedule(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
    Json(req): Json<RescheduleRequest>,
) -> Result<OrderCommandResponse, ApiError> {
    let result = context
        .orders
        .reschedule(OrderId::new(id)?, req.new_estimated_arrival)
        .await?;
    Ok(respond(&result, &context))
}

/// GET /orders/{id}/telemetry returns every processed reading of the order.
#[tracing::instrument(skip(context))]
pub async fn telemetry(
    State(context): State<Arc<AppContext>>,
    Path(id): Path<u64>,
) -> Result<Json<Vec<ProcessedReading>>, ApiError> {
    let order = find(&context, OrderId::new(id)?).await?;
    let history = context.coordinator.telemetry_history(order.id()).await?;
    Ok(Json(history))
}

async fn find(context: &AppContext, order_id: OrderId) -> Result<Order, ApiError> {
    context
        .orders
        .get_order(order_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {order_id} not found")))
}
