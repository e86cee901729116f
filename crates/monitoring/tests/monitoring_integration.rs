//! Integration tests for order monitoring and its event bridges.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use common::OrderId;
use domain::documents::{IssueDocument, NegligenceReportDocument};
use domain::repository::{
    InMemoryIssueRepository, InMemoryNegligenceRepository, InMemoryOrderRepository,
    InMemoryTelemetryRepository, TelemetryRepository,
};
use domain::{
    AlertLevel, AlertType, DeliveryAssignment, DroneId, IssueService,
    NegligenceService, NewIssue, OrderService, OrderState, ReportQuery, Username,
};
use event_bus::EventBus;
use monitoring::{
    DroneCommand, InMemoryTransport, MonitoringConfig, MonitoringCoordinator, MonitoringError,
    MovingState, ProcessOutcome, Transport, register_handlers, topics,
};
use serde_json::json;

struct TestHarness {
    transport: InMemoryTransport,
    telemetry: InMemoryTelemetryRepository,
    reports: InMemoryNegligenceRepository,
    negligence: Arc<NegligenceService>,
    orders: OrderService,
    issues: IssueService,
    coordinator: MonitoringCoordinator,
}

impl TestHarness {
    fn new() -> Self {
        Self::with_config(MonitoringConfig::default())
    }

    fn with_config(config: MonitoringConfig) -> Self {
        let bus = Arc::new(EventBus::new());
        let transport = InMemoryTransport::new();
        let telemetry = InMemoryTelemetryRepository::new();
        let reports = InMemoryNegligenceRepository::new();
        let negligence = Arc::new(NegligenceService::new(
            Arc::new(reports.clone()),
            Arc::clone(&bus),
        ));
        let coordinator = MonitoringCoordinator::new(
            Arc::new(transport.clone()),
            Arc::clone(&negligence),
            Arc::new(telemetry.clone()),
            config,
        )
        .unwrap();
        register_handlers(&bus, &coordinator, Arc::new(transport.clone()));

        Self {
            orders: OrderService::new(Arc::new(InMemoryOrderRepository::new()), Arc::clone(&bus)),
            issues: IssueService::new(Arc::new(InMemoryIssueRepository::new()), Arc::clone(&bus)),
            transport,
            telemetry,
            reports,
            negligence,
            coordinator,
        }
    }

    async fn delivering_order(&self) -> OrderId {
        let order = self
            .orders
            .place_order("ACME", "Parcel", Utc::now() + Duration::hours(2))
            .await
            .unwrap()
            .aggregate;
        let started = self.orders.start_delivery(order.id(), assignment()).await.unwrap();
        assert!(started.is_clean());
        order.id()
    }

    async fn publish(&self, order_id: OrderId, payload: Vec<u8>) {
        self.transport
            .publish(&topics::data(order_id), payload)
            .await
            .unwrap();
    }

    async fn report_count(&self) -> usize {
        self.negligence.reports(&ReportQuery::new()).await.unwrap().len()
    }
}

fn assignment() -> DeliveryAssignment {
    DeliveryAssignment::new(
        DroneId::new("drone-7").unwrap(),
        Username::new("alice").unwrap(),
        Username::new("mark").unwrap(),
    )
}

fn order_42() -> OrderId {
    OrderId::new(42).unwrap()
}

fn proximity_reading(order_id: OrderId, proximity: f64, at: DateTime<Utc>) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "proximity": proximity,
        "detectionInstant": at,
        "orderId": order_id.as_u64(),
    }))
    .unwrap()
}

mod negligence_detection {
    use super::*;

    #[tokio::test]
    async fn critical_edge_opens_single_report() {
        let harness = TestHarness::new();
        harness
            .coordinator
            .start_order_monitoring(order_42(), assignment())
            .await
            .unwrap();

        let detected_at = Utc::now();
        harness
            .publish(order_42(), proximity_reading(order_42(), 0.1, detected_at))
            .await;

        let reports = harness.negligence.reports(&ReportQuery::new()).await.unwrap();
        assert_eq!(reports.len(), 1);
        let details = reports[0].details();
        assert_eq!(details.negligent().as_str(), "alice");
        assert_eq!(details.assignee().as_str(), "mark");
        assert_eq!(details.order_id(), order_42());
        assert_eq!(details.detected_at(), detected_at);

        let published = harness.transport.published(topics::NEGLIGENCE_REPORTS);
        assert_eq!(published.len(), 1);
        let document: NegligenceReportDocument = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(document.order_id, 42);
        assert_eq!(document.negligent, "alice");

        // Same snapshot a second later: still critical, no new edge.
        harness
            .publish(
                order_42(),
                proximity_reading(order_42(), 0.1, detected_at + Duration::seconds(1)),
            )
            .await;
        assert_eq!(harness.report_count().await, 1);
    }

    #[tokio::test]
    async fn redelivered_reading_is_suppressed() {
        let harness = TestHarness::new();
        harness
            .coordinator
            .start_order_monitoring(order_42(), assignment())
            .await
            .unwrap();
        let payload = proximity_reading(order_42(), 0.1, Utc::now());

        let first = harness.coordinator.ingest(order_42(), &payload).await;
        let second = harness.coordinator.ingest(order_42(), &payload).await;

        assert!(matches!(
            first,
            ProcessOutcome::Processed {
                report: Some(_),
                ..
            }
        ));
        assert_eq!(second, ProcessOutcome::Duplicate);
        assert_eq!(harness.report_count().await, 1);
        assert_eq!(
            harness.coordinator.telemetry_history(order_42()).await.unwrap().len(),
            1
        );
    }

    #[tokio::test]
    async fn recovery_rearms_detection() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        let start = Utc::now();

        harness.publish(order_id, proximity_reading(order_id, 0.2, start)).await;
        harness
            .publish(order_id, proximity_reading(order_id, 1.5, start + Duration::seconds(1)))
            .await;
        harness
            .publish(order_id, proximity_reading(order_id, 0.2, start + Duration::seconds(2)))
            .await;

        assert_eq!(harness.report_count().await, 2);
    }

    #[tokio::test]
    async fn warning_does_not_open_report() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        let outcome = harness
            .coordinator
            .ingest(order_id, &proximity_reading(order_id, 0.8, Utc::now()))
            .await;

        match outcome {
            ProcessOutcome::Processed { alert, report } => {
                assert_eq!(alert.level, AlertLevel::Warning);
                assert_eq!(alert.alert_type, AlertType::Distance);
                assert!(report.is_none());
            }
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(harness.report_count().await, 0);
    }

    #[tokio::test]
    async fn report_failure_does_not_block_processing() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        harness.reports.faults().set_unavailable(true);

        let outcome = harness
            .coordinator
            .ingest(order_id, &proximity_reading(order_id, 0.1, Utc::now()))
            .await;

        assert!(matches!(
            outcome,
            ProcessOutcome::Processed { report: None, .. }
        ));
        assert_eq!(
            harness.coordinator.last_alert_level(order_id).await,
            Some(AlertLevel::Critical)
        );
        assert_eq!(harness.telemetry.history(order_id).await.unwrap().len(), 1);
    }
}

mod lifecycle {
    use super::*;

    #[tokio::test]
    async fn delivery_starts_and_success_stops_monitoring() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        assert!(harness.coordinator.is_monitoring(order_id));
        assert!(harness.transport.is_subscribed(&topics::data(order_id)));
        assert!(harness.transport.is_subscribed(&topics::moving(order_id)));

        harness.publish(order_id, proximity_reading(order_id, 1.5, Utc::now())).await;
        let succeeded = harness.orders.succeed(order_id).await.unwrap();
        assert!(succeeded.is_clean());
        assert!(!harness.coordinator.is_monitoring(order_id));
        assert!(!harness.transport.is_subscribed(&topics::data(order_id)));

        harness.publish(order_id, proximity_reading(order_id, 0.1, Utc::now())).await;
        assert_eq!(harness.report_count().await, 0);
        assert_eq!(harness.telemetry.history(order_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn reschedule_stops_and_redelivery_restarts() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        harness
            .orders
            .reschedule(order_id, Utc::now() + Duration::hours(5))
            .await
            .unwrap();
        assert!(!harness.coordinator.is_monitoring(order_id));

        let redelivered = harness.orders.start_delivery(order_id, assignment()).await.unwrap();
        assert_eq!(redelivered.aggregate.state(), OrderState::Delivering);
        assert!(harness.coordinator.is_monitoring(order_id));
    }

    #[tokio::test]
    async fn failure_stops_monitoring() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        harness.orders.fail(order_id).await.unwrap();

        assert!(harness.coordinator.monitored_orders().is_empty());
        assert_eq!(
            harness
                .coordinator
                .ingest(order_id, &proximity_reading(order_id, 0.1, Utc::now()))
                .await,
            ProcessOutcome::NotMonitored
        );
    }

    #[tokio::test]
    async fn double_start_is_rejected() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        let err = harness
            .coordinator
            .start_order_monitoring(order_id, assignment())
            .await
            .unwrap_err();
        assert!(matches!(err, MonitoringError::AlreadyMonitoring(id) if id == order_id));
        assert!(matches!(
            harness.coordinator.stop_order_monitoring(OrderId::new(99).unwrap()).await,
            Err(MonitoringError::NotMonitoring(_))
        ));
    }

    #[tokio::test]
    async fn disconnected_transport_is_a_handler_failure() {
        let harness = TestHarness::new();
        let order = harness
            .orders
            .place_order("ACME", "Parcel", Utc::now() + Duration::hours(1))
            .await
            .unwrap()
            .aggregate;
        harness.transport.set_disconnected(true);

        let started = harness.orders.start_delivery(order.id(), assignment()).await.unwrap();

        assert_eq!(started.aggregate.state(), OrderState::Delivering);
        assert_eq!(started.failures.len(), 1);
        assert_eq!(started.failures[0].handler, "start-monitoring");
        assert!(!harness.coordinator.is_monitoring(order.id()));
    }
}

mod telemetry_handling {
    use super::*;

    #[tokio::test]
    async fn malformed_and_misaddressed_payloads_are_rejected() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        assert_eq!(
            harness.coordinator.ingest(order_id, b"{not json").await,
            ProcessOutcome::Rejected
        );
        assert_eq!(
            harness
                .coordinator
                .ingest(order_id, &proximity_reading(order_42(), 0.1, Utc::now()))
                .await,
            ProcessOutcome::Rejected
        );
        assert_eq!(
            harness
                .coordinator
                .ingest(order_id, &proximity_reading(order_id, -1.0, Utc::now()))
                .await,
            ProcessOutcome::Rejected
        );
        assert!(harness.coordinator.telemetry_history(order_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn alerts_are_published_on_level_change() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        let start = Utc::now();

        for (offset, proximity) in [(0, 1.5), (1, 1.4), (2, 0.8), (3, 0.9)] {
            harness
                .publish(
                    order_id,
                    proximity_reading(order_id, proximity, start + Duration::seconds(offset)),
                )
                .await;
        }

        let alerts: Vec<serde_json::Value> = harness
            .transport
            .published(&topics::alert(order_id))
            .iter()
            .map(|payload| serde_json::from_slice(payload).unwrap())
            .collect();
        assert_eq!(
            alerts,
            vec![
                json!({"level": "STABLE", "type": "DISTANCE"}),
                json!({"level": "WARNING", "type": "DISTANCE"}),
            ]
        );
    }

    #[tokio::test]
    async fn history_keeps_every_processed_reading() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        let start = Utc::now();

        harness.publish(order_id, proximity_reading(order_id, 1.5, start)).await;
        harness
            .publish(order_id, proximity_reading(order_id, 0.2, start + Duration::seconds(1)))
            .await;

        let history = harness.coordinator.telemetry_history(order_id).await.unwrap();
        let levels: Vec<_> = history.iter().map(|entry| entry.alert.level).collect();
        assert_eq!(levels, vec![AlertLevel::Stable, AlertLevel::Critical]);
        assert_eq!(history[1].reading.detected_at, start + Duration::seconds(1));
    }

    #[tokio::test]
    async fn persistence_failure_is_logged_not_fatal() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        harness.telemetry.faults().set_unavailable(true);

        let outcome = harness
            .coordinator
            .ingest(order_id, &proximity_reading(order_id, 0.1, Utc::now()))
            .await;

        assert!(matches!(
            outcome,
            ProcessOutcome::Processed {
                report: Some(_),
                ..
            }
        ));
        assert!(harness.coordinator.telemetry_history(order_id).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_persistence_is_bounded() {
        let harness = TestHarness::with_config(
            MonitoringConfig::default().with_persistence_budget(StdDuration::from_millis(100)),
        );
        let order_id = harness.delivering_order().await;
        harness.telemetry.faults().set_latency(StdDuration::from_secs(30));

        let outcome = harness
            .coordinator
            .ingest(order_id, &proximity_reading(order_id, 1.5, Utc::now()))
            .await;

        assert!(matches!(outcome, ProcessOutcome::Processed { .. }));
        harness.telemetry.faults().set_latency(StdDuration::ZERO);
        assert!(harness.coordinator.telemetry_history(order_id).await.unwrap().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn orders_are_processed_independently() {
        let harness = Arc::new(TestHarness::new());
        let first = harness.delivering_order().await;
        let second = harness.delivering_order().await;
        let start = Utc::now();

        let mut tasks = Vec::new();
        for order_id in [first, second] {
            for step in 0..20_i64 {
                let harness = Arc::clone(&harness);
                tasks.push(tokio::spawn(async move {
                    let proximity = if step == 10 { 0.1 } else { 0.1 + step as f64 };
                    harness
                        .coordinator
                        .ingest(
                            order_id,
                            &proximity_reading(order_id, proximity, start + Duration::seconds(step)),
                        )
                        .await
                }));
            }
        }
        for task in tasks {
            task.await.unwrap();
        }

        for order_id in [first, second] {
            let history = harness.coordinator.telemetry_history(order_id).await.unwrap();
            assert_eq!(history.len(), 20);
            let reports = harness
                .negligence
                .reports(&ReportQuery::new())
                .await
                .unwrap()
                .into_iter()
                .filter(|report| report.details().order_id() == order_id)
                .count();
            assert!(reports >= 1);
        }
    }
}

mod per_order_sequencing {
    use super::*;

    // Lets every spawned task run until it blocks on a lock or a timer.
    async fn settle() {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_in_flight_reading_finish() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        harness.telemetry.faults().set_latency(StdDuration::from_secs(1));
        let start = Utc::now();

        let in_flight = {
            let coordinator = harness.coordinator.clone();
            let payload = proximity_reading(order_id, 0.1, start);
            tokio::spawn(async move { coordinator.ingest(order_id, &payload).await })
        };
        settle().await;
        let queued = {
            let coordinator = harness.coordinator.clone();
            let payload = proximity_reading(order_id, 1.5, start + Duration::seconds(1));
            tokio::spawn(async move { coordinator.ingest(order_id, &payload).await })
        };
        settle().await;

        harness.coordinator.stop_order_monitoring(order_id).await.unwrap();
        assert!(!harness.coordinator.is_monitoring(order_id));

        assert!(matches!(
            in_flight.await.unwrap(),
            ProcessOutcome::Processed {
                report: Some(_),
                ..
            }
        ));
        assert_eq!(queued.await.unwrap(), ProcessOutcome::NotMonitored);

        harness.telemetry.faults().set_latency(StdDuration::ZERO);
        let history = harness.coordinator.telemetry_history(order_id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].reading.detected_at, start);
    }

    #[tokio::test(start_paused = true)]
    async fn readings_of_one_order_are_processed_in_arrival_order() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        harness.telemetry.faults().set_latency(StdDuration::from_millis(10));
        let start = Utc::now();
        // Detection instants are out of order; processing must follow arrival.
        let arrivals = [(3, 1.5), (0, 0.8), (4, 1.5), (1, 0.2), (2, 0.8)];

        let mut tasks = Vec::new();
        for (offset, proximity) in arrivals {
            let coordinator = harness.coordinator.clone();
            let payload = proximity_reading(order_id, proximity, start + Duration::seconds(offset));
            tasks.push(tokio::spawn(async move {
                coordinator.ingest(order_id, &payload).await
            }));
            settle().await;
        }
        for task in tasks {
            assert!(matches!(task.await.unwrap(), ProcessOutcome::Processed { .. }));
        }

        harness.telemetry.faults().set_latency(StdDuration::ZERO);
        let history = harness.coordinator.telemetry_history(order_id).await.unwrap();
        let processed: Vec<_> = history.iter().map(|entry| entry.reading.detected_at).collect();
        let expected: Vec<_> = arrivals
            .iter()
            .map(|(offset, _)| start + Duration::seconds(*offset))
            .collect();
        assert_eq!(processed, expected);
        assert_eq!(
            harness.coordinator.last_alert_level(order_id).await,
            Some(AlertLevel::Warning)
        );
        assert_eq!(harness.report_count().await, 1);
    }
}

mod drone_messages {
    use super::*;

    #[tokio::test]
    async fn moving_state_follows_drone() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;
        assert_eq!(harness.coordinator.moving_state(order_id).await, None);

        harness
            .transport
            .publish(&topics::moving(order_id), br#"{"movingState":"moving"}"#.to_vec())
            .await
            .unwrap();
        assert_eq!(
            harness.coordinator.moving_state(order_id).await,
            Some(MovingState::Moving)
        );

        harness
            .transport
            .publish(&topics::moving(order_id), br#"{"movingState":"sideways"}"#.to_vec())
            .await
            .unwrap();
        assert_eq!(
            harness.coordinator.moving_state(order_id).await,
            Some(MovingState::Moving)
        );
    }

    #[tokio::test]
    async fn commands_reach_the_drone_topic() {
        let harness = TestHarness::new();
        let order_id = harness.delivering_order().await;

        harness
            .coordinator
            .send_command(order_id, DroneCommand::Halt)
            .await
            .unwrap();
        harness
            .coordinator
            .send_command(order_id, DroneCommand::Proceed)
            .await
            .unwrap();

        assert_eq!(
            harness.transport.published(&topics::command(order_id)),
            vec![
                br#"{"command":"halt"}"#.to_vec(),
                br#"{"command":"proceed"}"#.to_vec(),
            ]
        );
        assert!(matches!(
            harness
                .coordinator
                .send_command(order_42(), DroneCommand::Halt)
                .await,
            Err(MonitoringError::NotMonitoring(_))
        ));
    }

    #[tokio::test]
    async fn new_issue_is_sent_to_assignee() {
        let harness = TestHarness::new();

        let created = harness
            .issues
            .create_issue(NewIssue {
                subject: "Propeller noise".into(),
                details: "rattles above 20 km/h".into(),
                courier: "alice".into(),
                assignee: "mark".into(),
                drone_id: "drone-7".into(),
            })
            .await
            .unwrap();
        assert!(created.is_clean());

        let published = harness
            .transport
            .published(&topics::issue(&Username::new("mark").unwrap()));
        assert_eq!(published.len(), 1);
        let document: IssueDocument = serde_json::from_slice(&published[0]).unwrap();
        assert_eq!(document.courier, "alice");
        assert_eq!(document.subject, "Propeller noise");
    }

    #[tokio::test]
    async fn unreachable_broker_marks_event_failures() {
        let harness = TestHarness::new();
        harness.transport.set_disconnected(true);

        let created = harness
            .issues
            .create_issue(NewIssue {
                subject: "Battery".into(),
                details: "drains fast".into(),
                courier: "alice".into(),
                assignee: "mark".into(),
                drone_id: "drone-7".into(),
            })
            .await
            .unwrap();

        assert!(!created.is_clean());
        assert_eq!(created.failures[0].handler, "publish-issue");
    }
}
