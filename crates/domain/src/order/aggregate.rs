//! Order aggregate implementation.

use chrono::{DateTime, Utc};
use common::OrderId;

use crate::error::ValidationError;

use super::{Client, OrderError, OrderState, Product};

/// Fields shared by every order state.
///
/// Only constructed inside the crate, so an [`Order`] in any state can only be
/// reached through the transition functions or a validated document decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderDetails {
    id: OrderId,
    client: Client,
    product: Product,
    placed_at: DateTime<Utc>,
    estimated_arrival: DateTime<Utc>,
}

impl OrderDetails {
    pub(crate) fn new(
        id: OrderId,
        client: Client,
        product: Product,
        placed_at: DateTime<Utc>,
        estimated_arrival: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if estimated_arrival < placed_at {
            return Err(ValidationError::ArrivalBeforePlacing {
                placed_at,
                estimated_arrival,
            });
        }
        Ok(Self {
            id,
            client,
            product,
            placed_at,
            estimated_arrival,
        })
    }

    pub fn id(&self) -> OrderId {
        self.id
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn product(&self) -> &Product {
        &self.product
    }

    pub fn placed_at(&self) -> DateTime<Utc> {
        self.placed_at
    }

    /// Estimated arrival in effect before any pending reschedule.
    pub fn estimated_arrival(&self) -> DateTime<Utc> {
        self.estimated_arrival
    }
}

/// Order aggregate root, one variant per lifecycle state.
///
/// Transitions consume the current value and return the next one. Calling a
/// transition from a state that does not allow it fails with
/// [`OrderError::IllegalStateTransition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Order {
    Placed(OrderDetails),
    Delivering(OrderDetails),
    Succeeded(OrderDetails),
    Failed(OrderDetails),
    Rescheduled {
        details: OrderDetails,
        new_estimated_arrival: DateTime<Utc>,
    },
}

impl Order {
    /// Places a new order.
    ///
    /// Fails if the estimated arrival precedes the placing instant.
    pub fn place(
        id: OrderId,
        client: Client,
        product: Product,
        placed_at: DateTime<Utc>,
        estimated_arrival: DateTime<Utc>,
    ) -> Result<Self, OrderError> {
        let details = OrderDetails::new(id, client, product, placed_at, estimated_arrival)?;
        Ok(Order::Placed(details))
    }

    pub fn id(&self) -> OrderId {
        self.details().id
    }

    pub fn details(&self) -> &OrderDetails {
        match self {
            Order::Placed(details)
            | Order::Delivering(details)
            | Order::Succeeded(details)
            | Order::Failed(details)
            | Order::Rescheduled { details, .. } => details,
        }
    }

    pub fn state(&self) -> OrderState {
        match self {
            Order::Placed(_) => OrderState::Placed,
            Order::Delivering(_) => OrderState::Delivering,
            Order::Succeeded(_) => OrderState::Succeeded,
            Order::Failed(_) => OrderState::Failed,
            Order::Rescheduled { .. } => OrderState::Rescheduled,
        }
    }

    /// The estimated arrival currently in effect, including a pending reschedule.
    pub fn estimated_arrival(&self) -> DateTime<Utc> {
        match self {
            Order::Rescheduled {
                new_estimated_arrival,
                ..
            } => *new_estimated_arrival,
            other => other.details().estimated_arrival,
        }
    }

    /// The rescheduled arrival, if the order is waiting to be re-delivered.
    pub fn new_estimated_arrival(&self) -> Option<DateTime<Utc>> {
        match self {
            Order::Rescheduled {
                new_estimated_arrival,
                ..
            } => Some(*new_estimated_arrival),
            _ => None,
        }
    }

    // Transitions

    /// Starts (or restarts, after a reschedule) the delivery.
    pub fn deliver(self) -> Result<Self, OrderError> {
        match self {
            Order::Placed(details) => Ok(Order::Delivering(details)),
            Order::Rescheduled {
                mut details,
                new_estimated_arrival,
            } => {
                details.estimated_arrival = new_estimated_arrival;
                Ok(Order::Delivering(details))
            }
            other => Err(other.illegal("deliver")),
        }
    }

    pub fn succeed(self) -> Result<Self, OrderError> {
        match self {
            Order::Delivering(details) => Ok(Order::Succeeded(details)),
            other => Err(other.illegal("succeed")),
        }
    }

    pub fn fail(self) -> Result<Self, OrderError> {
        match self {
            Order::Delivering(details) => Ok(Order::Failed(details)),
            other => Err(other.illegal("fail")),
        }
    }

    /// Postpones the delivery. The new estimate must be strictly later than
    /// the current one.
    pub fn reschedule(self, new_estimated_arrival: DateTime<Utc>) -> Result<Self, OrderError> {
        match self {
            Order::Delivering(details) => {
                if new_estimated_arrival <= details.estimated_arrival {
                    return Err(ValidationError::RescheduleNotLater {
                        current: details.estimated_arrival,
                        requested: new_estimated_arrival,
                    }
                    .into());
                }
                Ok(Order::Rescheduled {
                    details,
                    new_estimated_arrival,
                })
            }
            other => Err(other.illegal("reschedule")),
        }
    }

    fn illegal(&self, attempted: &'static str) -> OrderError {
        OrderError::IllegalStateTransition {
            current: self.state(),
            attempted,
        }
    }
}
