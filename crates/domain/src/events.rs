//! Domain events raised by the aggregates.

use event_bus::DomainEvent;

use crate::issue::Issue;
use crate::negligence::NegligenceReport;
use crate::order::{DeliveryAssignment, Order};

/// Event type tags, used to register handlers on the bus.
pub mod event_types {
    pub const ORDER_PLACED: &str = "OrderPlaced";
    pub const ORDER_DELIVERING: &str = "OrderDelivering";
    pub const ORDER_SUCCEEDED: &str = "OrderSucceeded";
    pub const ORDER_FAILED: &str = "OrderFailed";
    pub const ORDER_RESCHEDULED: &str = "OrderRescheduled";
    pub const ISSUE_CREATED: &str = "IssueCreated";
    pub const ISSUE_VISIONED: &str = "IssueVisioned";
    pub const ISSUE_CLOSED: &str = "IssueClosed";
    pub const NEW_NEGLIGENCE: &str = "NewNegligence";
    pub const NEGLIGENCE_REPORT_CLOSED: &str = "NegligenceReportClosed";
}

/// Everything the aggregates announce after a committed transition.
///
/// Each variant carries the aggregate value as it is after the transition.
#[derive(Debug, Clone)]
pub enum DroneEvent {
    OrderPlaced { order: Order },
    OrderDelivering {
        order: Order,
        assignment: DeliveryAssignment,
    },
    OrderSucceeded { order: Order },
    OrderFailed { order: Order },
    OrderRescheduled { order: Order },
    IssueCreated { issue: Issue },
    IssueVisioned { issue: Issue },
    IssueClosed { issue: Issue },
    NewNegligence { report: NegligenceReport },
    NegligenceReportClosed { report: NegligenceReport },
}

impl DroneEvent {
    /// Returns the order carried by an order lifecycle event.
    pub fn order(&self) -> Option<&Order> {
        match self {
            DroneEvent::OrderPlaced { order }
            | DroneEvent::OrderDelivering { order, .. }
            | DroneEvent::OrderSucceeded { order }
            | DroneEvent::OrderFailed { order }
            | DroneEvent::OrderRescheduled { order } => Some(order),
            _ => None,
        }
    }
}

impl DomainEvent for DroneEvent {
    fn event_type(&self) -> &'static str {
        use event_types::*;
        match self {
            DroneEvent::OrderPlaced { .. } => ORDER_PLACED,
            DroneEvent::OrderDelivering { .. } => ORDER_DELIVERING,
            DroneEvent::OrderSucceeded { .. } => ORDER_SUCCEEDED,
            DroneEvent::OrderFailed { .. } => ORDER_FAILED,
            DroneEvent::OrderRescheduled { .. } => ORDER_RESCHEDULED,
            DroneEvent::IssueCreated { .. } => ISSUE_CREATED,
            DroneEvent::IssueVisioned { .. } => ISSUE_VISIONED,
            DroneEvent::IssueClosed { .. } => ISSUE_CLOSED,
            DroneEvent::NewNegligence { .. } => NEW_NEGLIGENCE,
            DroneEvent::NegligenceReportClosed { .. } => NEGLIGENCE_REPORT_CLOSED,
        }
    }
}
