//! Persistence capabilities and their in-memory implementations.
//!
//! Every repository is an injected collaborator. The in-memory versions keep
//! the persisted document shapes and can simulate latency and outages, so the
//! bounded-wait behaviour of the callers can be exercised without a database.

mod issue;
mod negligence;
mod order;
mod telemetry;

pub use issue::{InMemoryIssueRepository, IssueRepository};
pub use negligence::{InMemoryNegligenceRepository, NegligenceRepository};
pub use order::{InMemoryOrderRepository, OrderRepository};
pub use telemetry::{InMemoryTelemetryRepository, TelemetryRepository};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use thiserror::Error;

use crate::documents::DocumentError;

/// Errors reported by the persistence collaborator.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The call did not complete within the caller's budget.
    #[error("Persistence did not answer within {0:?}")]
    Timeout(Duration),

    /// The store could not be reached.
    #[error("Persistence unavailable: {0}")]
    Unavailable(String),

    #[error("{kind} {id} already exists")]
    Duplicate { kind: &'static str, id: String },

    #[error("{kind} {id} does not exist")]
    Missing { kind: &'static str, id: String },

    /// The stored aggregate moved on since the caller loaded it.
    #[error("Concurrency conflict on {kind} {id}: expected {expected}, found {actual}")]
    Conflict {
        kind: &'static str,
        id: String,
        expected: String,
        actual: String,
    },

    /// The store refused the write.
    #[error("Write rejected: {0}")]
    Rejected(String),

    /// A stored document could not be decoded.
    #[error(transparent)]
    Document(#[from] DocumentError),
}

impl RepositoryError {
    /// Returns true for failures the caller may treat as transient.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RepositoryError::Timeout(_) | RepositoryError::Unavailable(_)
        )
    }
}

/// Latency and outage switches shared by the in-memory repositories.
///
/// Clones share the same switches.
#[derive(Debug, Clone, Default)]
pub struct SimulatedFaults {
    latency_ms: Arc<AtomicU64>,
    unavailable: Arc<AtomicBool>,
}

impl SimulatedFaults {
    /// Delays every subsequent call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.latency_ms
            .store(latency.as_millis() as u64, Ordering::SeqCst);
    }

    /// Makes every subsequent call fail with [`RepositoryError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub(crate) async fn apply(&self) -> Result<(), RepositoryError> {
        let latency = self.latency_ms.load(Ordering::SeqCst);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepositoryError::Unavailable("simulated outage".into()));
        }
        Ok(())
    }
}
