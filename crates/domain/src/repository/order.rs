use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::OrderId;
use tokio::sync::RwLock;

use crate::documents::OrderDocument;
use crate::order::Order;

use super::{RepositoryError, SimulatedFaults};

/// Storage for orders.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Hands out the next unused order identifier.
    async fn next_identifier(&self) -> Result<OrderId, RepositoryError>;

    /// Stores a newly placed order.
    async fn save(&self, order: &Order) -> Result<(), RepositoryError>;

    /// Records a transition, appending the new state to the order's history.
    ///
    /// `expected` is the order as the caller loaded it. If the stored order no
    /// longer matches it, nothing is written and [`RepositoryError::Conflict`]
    /// is returned.
    async fn update(&self, expected: &Order, order: &Order) -> Result<(), RepositoryError>;

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError>;

    /// Returns every order, by ascending identifier.
    async fn list(&self) -> Result<Vec<Order>, RepositoryError>;
}

#[derive(Default)]
struct OrderTable {
    last_id: Option<OrderId>,
    documents: BTreeMap<OrderId, OrderDocument>,
}

/// In-memory order repository for tests and the demo binary.
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    table: Arc<RwLock<OrderTable>>,
    faults: SimulatedFaults,
}

impl InMemoryOrderRepository {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Latency and outage switches for this repository.
    pub fn faults(&self) -> &SimulatedFaults {
        &self.faults
    }

    /// Returns the stored document, including the state history.
    pub async fn document(&self, id: OrderId) -> Option<OrderDocument> {
        self.table.read().await.documents.get(&id).cloned()
    }
}

#[async_trait]
impl OrderRepository for InMemoryOrderRepository {
    async fn next_identifier(&self) -> Result<OrderId, RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        let id = table.last_id.map_or_else(OrderId::first, |id| id.next());
        table.last_id = Some(id);
        Ok(id)
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        if table.documents.contains_key(&order.id()) {
            return Err(RepositoryError::Duplicate {
                kind: "order",
                id: order.id().to_string(),
            });
        }
        table
            .documents
            .insert(order.id(), OrderDocument::from_order(order));
        Ok(())
    }

    async fn update(&self, expected: &Order, order: &Order) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        let document =
            table
                .documents
                .get_mut(&order.id())
                .ok_or_else(|| RepositoryError::Missing {
                    kind: "order",
                    id: order.id().to_string(),
                })?;
        let stored = document.clone().into_order()?;
        if stored != *expected {
            return Err(RepositoryError::Conflict {
                kind: "order",
                id: order.id().to_string(),
                expected: expected.state().to_string(),
                actual: stored.state().to_string(),
            });
        }
        document.record(order);
        Ok(())
    }

    async fn find(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        self.faults.apply().await?;
        let table = self.table.read().await;
        match table.documents.get(&id) {
            Some(document) => Ok(Some(document.clone().into_order()?)),
            None => Ok(None),
        }
    }

    async fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        self.faults.apply().await?;
        let table = self.table.read().await;
        let mut orders = Vec::with_capacity(table.documents.len());
        for document in table.documents.values() {
            orders.push(document.clone().into_order()?);
        }
        Ok(orders)
    }
}
