//! Transport topic names.

use common::OrderId;
use domain::Username;

/// Topic carrying every newly opened negligence report.
pub const NEGLIGENCE_REPORTS: &str = "negligence/reports";

/// Telemetry readings published by the drone carrying `order_id`.
pub fn data(order_id: OrderId) -> String {
    format!("drone/{order_id}/data")
}

/// Whether the drone carrying `order_id` is moving.
pub fn moving(order_id: OrderId) -> String {
    format!("drone/{order_id}/moving")
}

/// Alert level changes for `order_id`, published by the coordinator.
pub fn alert(order_id: OrderId) -> String {
    format!("drone/{order_id}/alert")
}

/// Commands sent to the drone carrying `order_id`.
pub fn command(order_id: OrderId) -> String {
    format!("drone/{order_id}/command")
}

/// Issues addressed to a maintainer.
pub fn issue(assignee: &Username) -> String {
    format!("issue/{assignee}")
}
