//! Application context: every service wired once at startup.

use std::sync::Arc;

use domain::repository::{
    InMemoryIssueRepository, InMemoryNegligenceRepository, InMemoryOrderRepository,
    InMemoryTelemetryRepository, IssueRepository, NegligenceRepository, OrderRepository,
    TelemetryRepository,
};
use domain::{DroneEvent, IssueService, NegligenceService, OrderService};
use event_bus::EventBus;
use monitoring::{MonitoringConfig, MonitoringCoordinator, MonitoringError, Transport, register_handlers};

/// Persistence collaborators used by the services.
#[derive(Clone)]
pub struct Repositories {
    pub orders: Arc<dyn OrderRepository>,
    pub issues: Arc<dyn IssueRepository>,
    pub negligence: Arc<dyn NegligenceRepository>,
    pub telemetry: Arc<dyn TelemetryRepository>,
}

impl Repositories {
    pub fn in_memory() -> Self {
        Self {
            orders: Arc::new(InMemoryOrderRepository::new()),
            issues: Arc::new(InMemoryIssueRepository::new()),
            negligence: Arc::new(InMemoryNegligenceRepository::new()),
            telemetry: Arc::new(InMemoryTelemetryRepository::new()),
        }
    }
}

/// Shared application state accessible from all handlers.
pub struct AppContext {
    pub orders: OrderService,
    pub issues: IssueService,
    pub negligence: Arc<NegligenceService>,
    pub coordinator: MonitoringCoordinator,
}

impl AppContext {
    /// Builds every service over `repositories` and registers the monitoring
    /// handlers on a fresh event bus.
    pub fn new(
        config: MonitoringConfig,
        repositories: Repositories,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, MonitoringError> {
        let budget = config.persistence_budget;
        let bus: Arc<EventBus<DroneEvent>> = Arc::new(EventBus::new());

        let negligence = Arc::new(
            NegligenceService::new(repositories.negligence, Arc::clone(&bus)).with_budget(budget),
        );
        let coordinator = MonitoringCoordinator::new(
            Arc::clone(&transport),
            Arc::clone(&negligence),
            repositories.telemetry,
            config,
        )?;
        register_handlers(&bus, &coordinator, transport);

        Ok(Self {
            orders: OrderService::new(repositories.orders, Arc::clone(&bus)).with_budget(budget),
            issues: IssueService::new(repositories.issues, Arc::clone(&bus)).with_budget(budget),
            negligence,
            coordinator,
        })
    }
}
