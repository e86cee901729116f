//! Per-order telemetry monitoring.
//!
//! Each monitored order owns a slot holding its delivery assignment, the last
//! alert level and a bounded window of recent readings. Readings for one order
//! are processed one at a time under that order's lock; different orders never
//! contend.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::time::Instant;

use common::{OrderId, ReportId};
use domain::persistence::bounded;
use domain::repository::TelemetryRepository;
use domain::telemetry::ProcessedReading;
use domain::{
    Alert, AlertLevel, DeliveryAssignment, NegligenceService, NewReport, TelemetryEvaluator,
    TelemetryReading,
};
use futures_util::FutureExt;
use tokio::sync::Mutex;

use crate::config::MonitoringConfig;
use crate::error::{MonitoringError, Result};
use crate::messages::{CommandMessage, DroneCommand, MovingMessage, MovingState};
use crate::topics;
use crate::transport::{Message, MessageHandler, Transport, publish_within};

/// What happened to one telemetry message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The reading was evaluated and recorded. `report` is set when this
    /// reading opened a negligence report.
    Processed {
        alert: Alert,
        report: Option<ReportId>,
    },

    /// The reading was already seen for this order.
    Duplicate,

    /// The order is not monitored, or monitoring stopped while the message
    /// was waiting.
    NotMonitored,

    /// The payload was malformed or addressed to another order.
    Rejected,
}

struct OrderMonitor {
    assignment: DeliveryAssignment,
    last_level: Option<AlertLevel>,
    recent: VecDeque<TelemetryReading>,
    moving: Option<MovingState>,
}

impl OrderMonitor {
    fn new(assignment: DeliveryAssignment) -> Self {
        Self {
            assignment,
            last_level: None,
            recent: VecDeque::new(),
            moving: None,
        }
    }

    fn has_seen(&self, reading: &TelemetryReading) -> bool {
        self.recent.iter().any(|seen| seen.is_duplicate_of(reading))
    }

    fn remember(&mut self, reading: TelemetryReading, capacity: usize) {
        self.recent.push_back(reading);
        while self.recent.len() > capacity.max(1) {
            self.recent.pop_front();
        }
    }
}

struct OrderSlot {
    stopped: AtomicBool,
    monitor: Mutex<OrderMonitor>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    negligence: Arc<NegligenceService>,
    telemetry: Arc<dyn TelemetryRepository>,
    evaluator: TelemetryEvaluator,
    config: MonitoringConfig,
    orders: RwLock<HashMap<OrderId, Arc<OrderSlot>>>,
}

/// Coordinates telemetry monitoring for every order in delivery.
///
/// Cloning is cheap; clones share the same set of monitored orders.
#[derive(Clone)]
pub struct MonitoringCoordinator {
    inner: Arc<Inner>,
}

impl MonitoringCoordinator {
    /// Creates a coordinator, validating the alert thresholds.
    pub fn new(
        transport: Arc<dyn Transport>,
        negligence: Arc<NegligenceService>,
        telemetry: Arc<dyn TelemetryRepository>,
        config: MonitoringConfig,
    ) -> Result<Self> {
        let evaluator = TelemetryEvaluator::new(config.evaluator)?;
        Ok(Self {
            inner: Arc::new(Inner {
                transport,
                negligence,
                telemetry,
                evaluator,
                config,
                orders: RwLock::new(HashMap::new()),
            }),
        })
    }

    pub fn config(&self) -> &MonitoringConfig {
        &self.inner.config
    }

    /// Subscribes to the order's telemetry and moving topics.
    #[tracing::instrument(skip(self, assignment), fields(order_id = %order_id, drone_id = %assignment.drone_id))]
    pub async fn start_order_monitoring(
        &self,
        order_id: OrderId,
        assignment: DeliveryAssignment,
    ) -> Result<()> {
        {
            let mut orders = self.orders_mut();
            if orders.contains_key(&order_id) {
                return Err(MonitoringError::AlreadyMonitoring(order_id));
            }
            let slot = OrderSlot {
                stopped: AtomicBool::new(false),
                monitor: Mutex::new(OrderMonitor::new(assignment)),
            };
            orders.insert(order_id, Arc::new(slot));
        }

        if let Err(err) = self.subscribe_topics(order_id).await {
            self.orders_mut().remove(&order_id);
            tracing::warn!(error = %err, "could not subscribe to drone topics");
            return Err(err);
        }

        tracing::info!("order monitoring started");
        Ok(())
    }

    /// Unsubscribes from the order's topics and discards its monitor.
    ///
    /// A message already waiting on the order's lock is dropped once it gets
    /// the lock.
    #[tracing::instrument(skip(self), fields(order_id = %order_id))]
    pub async fn stop_order_monitoring(&self, order_id: OrderId) -> Result<()> {
        let slot = self
            .orders_mut()
            .remove(&order_id)
            .ok_or(MonitoringError::NotMonitoring(order_id))?;
        slot.stopped.store(true, Ordering::SeqCst);

        let data = self.inner.transport.unsubscribe(&topics::data(order_id)).await;
        let moving = self.inner.transport.unsubscribe(&topics::moving(order_id)).await;

        tracing::info!("order monitoring stopped");
        Ok(data.and(moving)?)
    }

    pub fn is_monitoring(&self, order_id: OrderId) -> bool {
        self.orders().contains_key(&order_id)
    }

    /// Orders currently monitored, in ascending order.
    pub fn monitored_orders(&self) -> Vec<OrderId> {
        let mut ids: Vec<_> = self.orders().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Processes one telemetry payload received for `order_id`.
    ///
    /// Failures to persist the reading, open a report or publish the alert are
    /// logged and do not change the outcome.
    #[tracing::instrument(skip(self, payload), fields(order_id = %order_id))]
    pub async fn ingest(&self, order_id: OrderId, payload: &[u8]) -> ProcessOutcome {
        let started = Instant::now();
        metrics::counter!("telemetry_messages_total").increment(1);

        let reading = match TelemetryReading::from_json(payload) {
            Ok(reading) if reading.order_id == order_id => reading,
            Ok(reading) => {
                tracing::warn!(payload_order = %reading.order_id, "reading addressed to another order");
                metrics::counter!("telemetry_rejected_total", "reason" => "order_mismatch").increment(1);
                return ProcessOutcome::Rejected;
            }
            Err(err) => {
                tracing::warn!(error = %err, "malformed telemetry payload");
                metrics::counter!("telemetry_rejected_total", "reason" => "malformed").increment(1);
                return ProcessOutcome::Rejected;
            }
        };

        let Some(slot) = self.slot(order_id) else {
            tracing::debug!("reading for unmonitored order dropped");
            return ProcessOutcome::NotMonitored;
        };
        let mut monitor = slot.monitor.lock().await;
        if slot.stopped.load(Ordering::SeqCst) {
            return ProcessOutcome::NotMonitored;
        }

        if monitor.has_seen(&reading) {
            metrics::counter!("telemetry_duplicates_total").increment(1);
            tracing::debug!(detected_at = %reading.detected_at, "duplicate reading suppressed");
            return ProcessOutcome::Duplicate;
        }

        let alert = self.inner.evaluator.evaluate(&reading.snapshot);
        metrics::counter!("alerts_total", "level" => alert.level.as_str()).increment(1);
        let previous = monitor.last_level.replace(alert.level);
        monitor.remember(reading.clone(), self.inner.config.history_capacity);

        let report = if alert.is_critical() && previous != Some(AlertLevel::Critical) {
            self.open_report(&monitor.assignment, &reading).await
        } else {
            None
        };

        let processed = ProcessedReading::new(reading, alert);
        if let Err(err) = bounded(
            "telemetry.append",
            self.inner.config.persistence_budget,
            self.inner.telemetry.append(&processed),
        )
        .await
        {
            tracing::warn!(error = %err, "telemetry reading not persisted");
        }

        if previous != Some(alert.level) {
            self.publish_alert(order_id, alert).await;
        }
        drop(monitor);

        metrics::histogram!("telemetry_processing_seconds").record(started.elapsed().as_secs_f64());
        tracing::debug!(level = %alert.level, alert_type = %alert.alert_type, "reading processed");
        ProcessOutcome::Processed { alert, report }
    }

    /// Records a `{"movingState": ...}` payload for `order_id`.
    pub async fn update_moving(&self, order_id: OrderId, payload: &[u8]) -> Option<MovingState> {
        let message: MovingMessage = match serde_json::from_slice(payload) {
            Ok(message) => message,
            Err(err) => {
                tracing::warn!(order_id = %order_id, error = %err, "malformed moving payload");
                return None;
            }
        };
        let slot = self.slot(order_id)?;
        let mut monitor = slot.monitor.lock().await;
        if slot.stopped.load(Ordering::SeqCst) {
            return None;
        }
        monitor.moving = Some(message.moving_state);
        Some(message.moving_state)
    }

    /// Last reported moving state, if the order is monitored and has sent one.
    pub async fn moving_state(&self, order_id: OrderId) -> Option<MovingState> {
        let slot = self.slot(order_id)?;
        let monitor = slot.monitor.lock().await;
        monitor.moving
    }

    /// Level of the most recent non-duplicate reading.
    pub async fn last_alert_level(&self, order_id: OrderId) -> Option<AlertLevel> {
        let slot = self.slot(order_id)?;
        let monitor = slot.monitor.lock().await;
        monitor.last_level
    }

    /// Every processed reading stored for `order_id`, including after
    /// monitoring stopped.
    pub async fn telemetry_history(&self, order_id: OrderId) -> Result<Vec<ProcessedReading>> {
        Ok(bounded(
            "telemetry.history",
            self.inner.config.persistence_budget,
            self.inner.telemetry.history(order_id),
        )
        .await?)
    }

    /// Sends `command` to the drone carrying a monitored order.
    #[tracing::instrument(skip(self), fields(order_id = %order_id, command = %command))]
    pub async fn send_command(&self, order_id: OrderId, command: DroneCommand) -> Result<()> {
        if !self.is_monitoring(order_id) {
            return Err(MonitoringError::NotMonitoring(order_id));
        }
        let payload = serde_json::to_vec(&CommandMessage { command })?;
        publish_within(
            self.inner.transport.as_ref(),
            &topics::command(order_id),
            payload,
            self.inner.config.persistence_budget,
        )
        .await?;
        tracing::info!("command sent");
        Ok(())
    }

    async fn subscribe_topics(&self, order_id: OrderId) -> Result<()> {
        let transport = &self.inner.transport;
        let weak = Arc::downgrade(&self.inner);
        let on_data: MessageHandler = Arc::new(move |message: Message| {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    MonitoringCoordinator { inner }
                        .ingest(order_id, &message.payload)
                        .await;
                }
            }
            .boxed()
        });
        transport.subscribe(&topics::data(order_id), on_data).await?;

        let weak = Arc::downgrade(&self.inner);
        let on_moving: MessageHandler = Arc::new(move |message: Message| {
            let weak = Weak::clone(&weak);
            async move {
                if let Some(inner) = weak.upgrade() {
                    MonitoringCoordinator { inner }
                        .update_moving(order_id, &message.payload)
                        .await;
                }
            }
            .boxed()
        });
        if let Err(err) = transport.subscribe(&topics::moving(order_id), on_moving).await {
            if let Err(cleanup) = transport.unsubscribe(&topics::data(order_id)).await {
                tracing::warn!(error = %cleanup, "could not release data subscription");
            }
            return Err(err.into());
        }
        Ok(())
    }

    async fn open_report(
        &self,
        assignment: &DeliveryAssignment,
        reading: &TelemetryReading,
    ) -> Option<ReportId> {
        let input = NewReport {
            negligent: assignment.courier.clone(),
            assignee: assignment.supervisor.clone(),
            order_id: reading.order_id,
            data: reading.snapshot,
            detected_at: reading.detected_at,
        };
        match self.inner.negligence.open_report(input).await {
            Ok(opened) => {
                if !opened.is_clean() {
                    tracing::warn!(
                        failures = opened.failures.len(),
                        "negligence report opened but not every handler completed"
                    );
                }
                Some(opened.aggregate.id())
            }
            Err(err) => {
                tracing::error!(error = %err, "could not open negligence report");
                None
            }
        }
    }

    async fn publish_alert(&self, order_id: OrderId, alert: Alert) {
        let payload = match serde_json::to_vec(&alert) {
            Ok(payload) => payload,
            Err(err) => {
                tracing::error!(error = %err, "could not encode alert");
                return;
            }
        };
        if let Err(err) = publish_within(
            self.inner.transport.as_ref(),
            &topics::alert(order_id),
            payload,
            self.inner.config.persistence_budget,
        )
        .await
        {
            tracing::warn!(error = %err, "alert not published");
        }
    }

    fn slot(&self, order_id: OrderId) -> Option<Arc<OrderSlot>> {
        self.orders().get(&order_id).cloned()
    }

    fn orders(&self) -> RwLockReadGuard<'_, HashMap<OrderId, Arc<OrderSlot>>> {
        self.inner.orders.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn orders_mut(&self) -> RwLockWriteGuard<'_, HashMap<OrderId, Arc<OrderSlot>>> {
        self.inner.orders.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domain::telemetry::ImageSize;
    use domain::{DroneId, TelemetrySnapshot, Username};

    fn assignment() -> DeliveryAssignment {
        DeliveryAssignment::new(
            DroneId::new("drone-1").unwrap(),
            Username::new("alice").unwrap(),
            Username::new("mark").unwrap(),
        )
    }

    fn reading(seconds: i64) -> TelemetryReading {
        TelemetryReading::new(
            OrderId::first(),
            Utc::now() + Duration::seconds(seconds),
            TelemetrySnapshot::new().with_camera(ImageSize::new(4096)),
        )
    }

    #[test]
    fn test_recent_window_is_bounded() {
        let mut monitor = OrderMonitor::new(assignment());
        let first = reading(0);
        monitor.remember(first.clone(), 2);
        monitor.remember(reading(1), 2);
        assert!(monitor.has_seen(&first));

        monitor.remember(reading(2), 2);
        assert_eq!(monitor.recent.len(), 2);
        assert!(!monitor.has_seen(&first));
    }

    #[test]
    fn test_zero_capacity_keeps_latest() {
        let mut monitor = OrderMonitor::new(assignment());
        let latest = reading(5);
        monitor.remember(reading(4), 0);
        monitor.remember(latest.clone(), 0);
        assert_eq!(monitor.recent.len(), 1);
        assert!(monitor.has_seen(&latest));
    }
}
