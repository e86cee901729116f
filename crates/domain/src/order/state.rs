//! Order state machine.

use serde::{Deserialize, Serialize};

/// The state of an order in its lifecycle.
///
/// State transitions:
/// ```text
/// Placed ──► Delivering ──┬──► Succeeded
///               ▲         ├──► Failed
///               │         └──► Rescheduled
///               └────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderState {
    /// Order accepted, waiting for a drone.
    Placed,

    /// A drone is carrying the order.
    Delivering,

    /// Delivered (terminal state).
    Succeeded,

    /// Delivery failed (terminal state).
    Failed,

    /// Delivery postponed to a later estimated arrival.
    Rescheduled,
}

impl OrderState {
    /// Returns the state name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Placed => "PLACED",
            OrderState::Delivering => "DELIVERING",
            OrderState::Succeeded => "SUCCEEDED",
            OrderState::Failed => "FAILED",
            OrderState::Rescheduled => "RESCHEDULED",
        }
    }
}

impl std::fmt::Display for OrderState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
