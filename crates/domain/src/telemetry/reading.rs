//! Wire and history representations of a telemetry message.

use chrono::{DateTime, Utc};
use common::OrderId;
use serde::{Deserialize, Serialize};

use super::evaluator::Alert;
use super::values::TelemetrySnapshot;

/// One telemetry message as published by a drone on `drone/<orderId>/data`.
///
/// ```json
/// {"proximity": 0.42, "accelerometer": {"roll": 1.0, "pitch": -2.5, "yaw": 90.0},
///  "camera": 4096, "detectionInstant": "2024-05-01T09:00:00Z", "orderId": 42}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryReading {
    pub order_id: OrderId,

    #[serde(rename = "detectionInstant")]
    pub detected_at: DateTime<Utc>,

    #[serde(flatten)]
    pub snapshot: TelemetrySnapshot,
}

impl TelemetryReading {
    pub fn new(order_id: OrderId, detected_at: DateTime<Utc>, snapshot: TelemetrySnapshot) -> Self {
        Self {
            order_id,
            detected_at,
            snapshot,
        }
    }

    /// Decodes a message payload, validating every value.
    pub fn from_json(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Returns true if `other` is a re-delivery of this reading.
    pub fn is_duplicate_of(&self, other: &TelemetryReading) -> bool {
        self.order_id == other.order_id
            && self.detected_at == other.detected_at
            && self.snapshot == other.snapshot
    }
}

/// A reading together with the alert it produced, as kept in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedReading {
    #[serde(flatten)]
    pub reading: TelemetryReading,
    pub alert: Alert,
}

impl ProcessedReading {
    pub fn new(reading: TelemetryReading, alert: Alert) -> Self {
        Self { reading, alert }
    }
}
