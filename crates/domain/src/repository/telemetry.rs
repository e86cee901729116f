use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::telemetry::ProcessedReading;

use super::{RepositoryError, SimulatedFaults};

/// Append-only telemetry history per order.
#[async_trait]
pub trait TelemetryRepository: Send + Sync {
    async fn append(&self, reading: &ProcessedReading) -> Result<(), RepositoryError>;

    /// Every reading stored for `order_id`, in append order.
    async fn history(&self, order_id: OrderId) -> Result<Vec<ProcessedReading>, RepositoryError>;
}

/// In-memory telemetry repository.
#[derive(Clone, Default)]
pub struct InMemoryTelemetryRepository {
    readings: Arc<RwLock<HashMap<OrderId, Vec<ProcessedReading>>>>,
    faults: SimulatedFaults,
}

impl InMemoryTelemetryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &SimulatedFaults {
        &self.faults
    }
}

#[async_trait]
impl TelemetryRepository for InMemoryTelemetryRepository {
    async fn append(&self, reading: &ProcessedReading) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        self.readings
            .write()
            .await
            .entry(reading.reading.order_id)
            .or_default()
            .push(reading.clone());
        Ok(())
    }

    async fn history(&self, order_id: OrderId) -> Result<Vec<ProcessedReading>, RepositoryError> {
        self.faults.apply().await?;
        Ok(self
            .readings
            .read()
            .await
            .get(&order_id)
            .cloned()
            .unwrap_or_default())
    }
}
