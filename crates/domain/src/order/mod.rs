//! Order aggregate and related types.

mod aggregate;
mod service;
mod state;
mod value_objects;

pub use aggregate::{Order, OrderDetails};
pub use service::OrderService;
pub use state::OrderState;
pub use value_objects::{Client, DeliveryAssignment, Product};

use thiserror::Error;

use crate::error::ValidationError;

/// Errors that can occur during order operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// The order is not in a state that allows the attempted transition.
    #[error("Illegal state transition: cannot {attempted} from {current} state")]
    IllegalStateTransition {
        current: OrderState,
        attempted: &'static str,
    },

    /// A value supplied to a transition was invalid.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}
