//! Order service: load, transition, persist, then announce.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::OrderId;
use event_bus::EventBus;

use crate::command::{CommandResult, commit_and_raise};
use crate::error::DomainError;
use crate::events::DroneEvent;
use crate::persistence::{DEFAULT_PERSISTENCE_BUDGET, bounded};
use crate::repository::OrderRepository;

use super::{Client, DeliveryAssignment, Order, OrderError, Product};

/// Service for managing orders.
///
/// Each command persists the transition before raising its event, so a failing
/// event handler never undoes the transition.
pub struct OrderService {
    repository: Arc<dyn OrderRepository>,
    bus: Arc<EventBus<DroneEvent>>,
    budget: Duration,
}

impl OrderService {
    pub fn new(repository: Arc<dyn OrderRepository>, bus: Arc<EventBus<DroneEvent>>) -> Self {
        Self {
            repository,
            bus,
            budget: DEFAULT_PERSISTENCE_BUDGET,
        }
    }

    /// Overrides the time budget for each persistence call.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Places a new order, placed now.
    ///
    /// Fails if the product or client is blank, or if the estimated arrival
    /// is already in the past.
    #[tracing::instrument(skip(self))]
    pub async fn place_order(
        &self,
        client: &str,
        product: &str,
        estimated_arrival: DateTime<Utc>,
    ) -> Result<CommandResult<Order>, DomainError> {
        let client = Client::new(client)?;
        let product = Product::new(product)?;
        let id = bounded(
            "order.next_identifier",
            self.budget,
            self.repository.next_identifier(),
        )
        .await?;
        let order = Order::place(id, client, product, Utc::now(), estimated_arrival)?;
        bounded("order.save", self.budget, self.repository.save(&order)).await?;

        tracing::info!(order_id = %id, "order placed");
        let event = DroneEvent::OrderPlaced {
            order: order.clone(),
        };
        Ok(commit_and_raise(&self.bus, order, event).await)
    }

    /// Hands the order to a drone and its courier.
    #[tracing::instrument(skip(self, assignment), fields(drone = %assignment.drone_id))]
    pub async fn start_delivery(
        &self,
        order_id: OrderId,
        assignment: DeliveryAssignment,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order = self.transition(order_id, Order::deliver).await?;
        let event = DroneEvent::OrderDelivering {
            order: order.clone(),
            assignment,
        };
        Ok(commit_and_raise(&self.bus, order, event).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn succeed(&self, order_id: OrderId) -> Result<CommandResult<Order>, DomainError> {
        let order = self.transition(order_id, Order::succeed).await?;
        let event = DroneEvent::OrderSucceeded {
            order: order.clone(),
        };
        Ok(commit_and_raise(&self.bus, order, event).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn fail(&self, order_id: OrderId) -> Result<CommandResult<Order>, DomainError> {
        let order = self.transition(order_id, Order::fail).await?;
        let event = DroneEvent::OrderFailed {
            order: order.clone(),
        };
        Ok(commit_and_raise(&self.bus, order, event).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn reschedule(
        &self,
        order_id: OrderId,
        new_estimated_arrival: DateTime<Utc>,
    ) -> Result<CommandResult<Order>, DomainError> {
        let order = self
            .transition(order_id, |order| order.reschedule(new_estimated_arrival))
            .await?;
        let event = DroneEvent::OrderRescheduled {
            order: order.clone(),
        };
        Ok(commit_and_raise(&self.bus, order, event).await)
    }

    /// Loads an order by ID.
    ///
    /// Returns None if the order doesn't exist.
    #[tracing::instrument(skip(self))]
    pub async fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, DomainError> {
        Ok(bounded("order.find", self.budget, self.repository.find(order_id)).await?)
    }

    /// Lists every order.
    pub async fn list_orders(&self) -> Result<Vec<Order>, DomainError> {
        Ok(bounded("order.list", self.budget, self.repository.list()).await?)
    }

    async fn transition<F>(&self, order_id: OrderId, apply: F) -> Result<Order, DomainError>
    where
        F: FnOnce(Order) -> Result<Order, OrderError>,
    {
        let current = self
            .get_order(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", order_id))?;
        let next = apply(current.clone())?;
        bounded(
            "order.update",
            self.budget,
            self.repository.update(&current, &next),
        )
        .await?;
        tracing::info!(%order_id, state = %next.state(), "order transitioned");
        Ok(next)
    }
}
