//! Value objects for the order domain.

use serde::{Deserialize, Serialize};

use crate::value_objects::{DroneId, Username, text_value};

text_value!(
    /// Name of the product being shipped.
    Product,
    "product"
);

text_value!(
    /// Reference to the client who placed the order.
    Client,
    "client"
);

/// Who carries an order while it is being delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryAssignment {
    /// Drone carrying the order.
    pub drone_id: DroneId,

    /// Courier operating the drone.
    pub courier: Username,

    /// Maintainer responsible for the courier.
    pub supervisor: Username,
}

impl DeliveryAssignment {
    pub fn new(drone_id: DroneId, courier: Username, supervisor: Username) -> Self {
        Self {
            drone_id,
            courier,
            supervisor,
        }
    }
}
