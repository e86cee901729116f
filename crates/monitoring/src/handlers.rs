//! Event bus handlers bridging domain events to monitoring and the transport.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::documents::{IssueDocument, NegligenceReportDocument};
use domain::{DroneEvent, event_types};
use event_bus::{EventBus, EventHandler, HandlerError};

use crate::coordinator::MonitoringCoordinator;
use crate::error::{MonitoringError, TransportError};
use crate::topics;
use crate::transport::{Transport, publish_within};

impl From<TransportError> for HandlerError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::TimedOut(budget) => HandlerError::TimedOut(budget),
            other => HandlerError::Unavailable(other.to_string()),
        }
    }
}

fn handler_error(err: MonitoringError) -> HandlerError {
    match err {
        MonitoringError::Transport(transport) => transport.into(),
        other => HandlerError::Unavailable(other.to_string()),
    }
}

/// Starts monitoring when an order goes out for delivery.
pub struct StartMonitoring {
    coordinator: MonitoringCoordinator,
}

impl StartMonitoring {
    pub fn new(coordinator: MonitoringCoordinator) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl EventHandler<DroneEvent> for StartMonitoring {
    fn name(&self) -> &str {
        "start-monitoring"
    }

    async fn handle(&self, event: &DroneEvent) -> Result<(), HandlerError> {
        let DroneEvent::OrderDelivering { order, assignment } = event else {
            return Ok(());
        };
        match self
            .coordinator
            .start_order_monitoring(order.id(), assignment.clone())
            .await
        {
            Ok(()) | Err(MonitoringError::AlreadyMonitoring(_)) => Ok(()),
            Err(err) => Err(handler_error(err)),
        }
    }
}

/// Stops monitoring when a delivery succeeds, fails or is rescheduled.
pub struct StopMonitoring {
    coordinator: MonitoringCoordinator,
}

impl StopMonitoring {
    pub fn new(coordinator: MonitoringCoordinator) -> Self {
        Self { coordinator }
    }
}

#[async_trait]
impl EventHandler<DroneEvent> for StopMonitoring {
    fn name(&self) -> &str {
        "stop-monitoring"
    }

    async fn handle(&self, event: &DroneEvent) -> Result<(), HandlerError> {
        let order = match event {
            DroneEvent::OrderSucceeded { order }
            | DroneEvent::OrderFailed { order }
            | DroneEvent::OrderRescheduled { order } => order,
            _ => return Ok(()),
        };
        match self.coordinator.stop_order_monitoring(order.id()).await {
            Ok(()) | Err(MonitoringError::NotMonitoring(_)) => Ok(()),
            Err(err) => Err(handler_error(err)),
        }
    }
}

/// Publishes every new negligence report on `negligence/reports`.
pub struct PublishNegligenceReport {
    transport: Arc<dyn Transport>,
    budget: Duration,
}

impl PublishNegligenceReport {
    pub fn new(transport: Arc<dyn Transport>, budget: Duration) -> Self {
        Self { transport, budget }
    }
}

#[async_trait]
impl EventHandler<DroneEvent> for PublishNegligenceReport {
    fn name(&self) -> &str {
        "publish-negligence-report"
    }

    async fn handle(&self, event: &DroneEvent) -> Result<(), HandlerError> {
        let DroneEvent::NewNegligence { report } = event else {
            return Ok(());
        };
        let document = NegligenceReportDocument::from_report(report);
        let payload =
            serde_json::to_vec(&document).map_err(|err| HandlerError::Rejected(err.to_string()))?;
        publish_within(
            self.transport.as_ref(),
            topics::NEGLIGENCE_REPORTS,
            payload,
            self.budget,
        )
        .await?;
        Ok(())
    }
}

/// Notifies the assignee of a newly created issue on `issue/<assignee>`.
pub struct PublishIssue {
    transport: Arc<dyn Transport>,
    budget: Duration,
}

impl PublishIssue {
    pub fn new(transport: Arc<dyn Transport>, budget: Duration) -> Self {
        Self { transport, budget }
    }
}

#[async_trait]
impl EventHandler<DroneEvent> for PublishIssue {
    fn name(&self) -> &str {
        "publish-issue"
    }

    async fn handle(&self, event: &DroneEvent) -> Result<(), HandlerError> {
        let DroneEvent::IssueCreated { issue } = event else {
            return Ok(());
        };
        let document =
            IssueDocument::from_issue(issue).map_err(|err| HandlerError::Rejected(err.to_string()))?;
        let payload =
            serde_json::to_vec(&document).map_err(|err| HandlerError::Rejected(err.to_string()))?;
        publish_within(
            self.transport.as_ref(),
            &topics::issue(&issue.details().assignee),
            payload,
            self.budget,
        )
        .await?;
        Ok(())
    }
}

/// Registers every monitoring bridge on `bus`.
pub fn register_handlers(
    bus: &EventBus<DroneEvent>,
    coordinator: &MonitoringCoordinator,
    transport: Arc<dyn Transport>,
) {
    let budget = coordinator.config().persistence_budget;

    let start: Arc<dyn EventHandler<DroneEvent>> =
        Arc::new(StartMonitoring::new(coordinator.clone()));
    bus.register(event_types::ORDER_DELIVERING, start);

    let stop: Arc<dyn EventHandler<DroneEvent>> =
        Arc::new(StopMonitoring::new(coordinator.clone()));
    for event_type in [
        event_types::ORDER_SUCCEEDED,
        event_types::ORDER_FAILED,
        event_types::ORDER_RESCHEDULED,
    ] {
        bus.register(event_type, Arc::clone(&stop));
    }

    bus.register(
        event_types::NEW_NEGLIGENCE,
        Arc::new(PublishNegligenceReport::new(Arc::clone(&transport), budget)),
    );
    bus.register(
        event_types::ISSUE_CREATED,
        Arc::new(PublishIssue::new(transport, budget)),
    );
    tracing::debug!("monitoring handlers registered");
}
