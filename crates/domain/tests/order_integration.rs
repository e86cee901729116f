//! Integration tests for the order service.
//!
//! These tests verify the full order lifecycle including persistence of the
//! state history, event publication and the failure semantics of handlers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use common::OrderId;
use domain::repository::{InMemoryOrderRepository, OrderRepository};
use domain::{
    DeliveryAssignment, DomainError, DroneEvent, DroneId, OrderError, OrderService, OrderState,
    RepositoryError, Username, ValidationError, event_types,
};
use event_bus::{EventBus, HandlerError};

struct Fixture {
    repository: InMemoryOrderRepository,
    bus: Arc<EventBus<DroneEvent>>,
    service: OrderService,
}

fn fixture() -> Fixture {
    let repository = InMemoryOrderRepository::new();
    let bus = Arc::new(EventBus::new());
    let service = OrderService::new(Arc::new(repository.clone()), Arc::clone(&bus));
    Fixture {
        repository,
        bus,
        service,
    }
}

fn assignment() -> DeliveryAssignment {
    DeliveryAssignment::new(
        DroneId::new("drone-1").unwrap(),
        Username::new("alice").unwrap(),
        Username::new("mark").unwrap(),
    )
}

fn record_events(bus: &EventBus<DroneEvent>) -> Arc<Mutex<Vec<&'static str>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    for event_type in [
        event_types::ORDER_PLACED,
        event_types::ORDER_DELIVERING,
        event_types::ORDER_SUCCEEDED,
        event_types::ORDER_FAILED,
        event_types::ORDER_RESCHEDULED,
    ] {
        let seen = Arc::clone(&seen);
        bus.register_fn(event_type, "recorder", move |event: &DroneEvent| {
            seen.lock()
                .unwrap()
                .push(event_bus::DomainEvent::event_type(event));
            Ok(())
        });
    }
    seen
}

mod order_lifecycle {
    use super::*;

    #[tokio::test]
    async fn complete_order_lifecycle() {
        let f = fixture();
        let seen = record_events(&f.bus);

        let placed = f
            .service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(2))
            .await
            .unwrap();
        let id = placed.aggregate.id();
        assert_eq!(id, OrderId::first());
        assert_eq!(placed.aggregate.state(), OrderState::Placed);
        assert!(placed.is_clean());

        let delivering = f.service.start_delivery(id, assignment()).await.unwrap();
        assert_eq!(delivering.aggregate.state(), OrderState::Delivering);
        match &delivering.event {
            DroneEvent::OrderDelivering { assignment, .. } => {
                assert_eq!(assignment.courier.as_str(), "alice")
            }
            other => panic!("unexpected event {other:?}"),
        }

        let succeeded = f.service.succeed(id).await.unwrap();
        assert_eq!(succeeded.aggregate.state(), OrderState::Succeeded);

        assert_eq!(
            *seen.lock().unwrap(),
            vec!["OrderPlaced", "OrderDelivering", "OrderSucceeded"]
        );
        let document = f.repository.document(id).await.unwrap();
        assert_eq!(
            document.events,
            vec![
                OrderState::Placed,
                OrderState::Delivering,
                OrderState::Succeeded
            ]
        );
    }

    #[tokio::test]
    async fn reschedule_and_redeliver() {
        let f = fixture();
        let id = f
            .service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap()
            .aggregate
            .id();
        f.service.start_delivery(id, assignment()).await.unwrap();

        let later = Utc::now() + chrono::Duration::days(1);
        let rescheduled = f.service.reschedule(id, later).await.unwrap();
        assert_eq!(rescheduled.aggregate.new_estimated_arrival(), Some(later));

        let redelivering = f.service.start_delivery(id, assignment()).await.unwrap();
        assert_eq!(redelivering.aggregate.estimated_arrival(), later);

        let failed = f.service.fail(id).await.unwrap();
        assert_eq!(failed.aggregate.state(), OrderState::Failed);
    }

    #[tokio::test]
    async fn identifiers_are_monotonic() {
        let f = fixture();
        let arrival = Utc::now() + chrono::Duration::hours(1);
        let a = f.service.place_order("A", "x", arrival).await.unwrap();
        let b = f.service.place_order("B", "y", arrival).await.unwrap();
        assert!(b.aggregate.id() > a.aggregate.id());
        assert_eq!(f.service.list_orders().await.unwrap().len(), 2);
    }
}

mod order_failures {
    use super::*;

    #[tokio::test]
    async fn deliver_succeeded_order_fails() {
        let f = fixture();
        let id = f
            .service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap()
            .aggregate
            .id();
        f.service.start_delivery(id, assignment()).await.unwrap();
        f.service.succeed(id).await.unwrap();

        let err = f.service.start_delivery(id, assignment()).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Order(OrderError::IllegalStateTransition {
                current: OrderState::Succeeded,
                attempted: "deliver"
            })
        ));
        assert!(err.is_illegal_transition());
    }

    #[tokio::test]
    async fn empty_product_is_rejected() {
        let f = fixture();
        let err = f
            .service
            .place_order("ACME", "", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Validation(ValidationError::Empty { field: "product" })
        ));
        assert!(f.service.list_orders().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn arrival_in_the_past_is_rejected() {
        let f = fixture();
        let err = f
            .service
            .place_order("ACME", "Parcel", Utc::now() - chrono::Duration::minutes(5))
            .await
            .unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn unknown_order_is_not_found() {
        let f = fixture();
        let err = f.service.succeed(OrderId::new(99).unwrap()).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn handler_failure_does_not_roll_back() {
        let f = fixture();
        f.bus
            .register_fn(event_types::ORDER_PLACED, "flaky", |_: &DroneEvent| {
                Err(HandlerError::Unavailable("broker down".into()))
            });

        let result = f
            .service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(result.failures.len(), 1);
        assert_eq!(result.failures[0].handler, "flaky");
        let stored = f.repository.find(result.aggregate.id()).await.unwrap();
        assert_eq!(stored, Some(result.aggregate));
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_conclusions_commit_only_once() {
        let f = fixture();
        let seen = record_events(&f.bus);
        let id = f
            .service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap()
            .aggregate
            .id();
        f.service.start_delivery(id, assignment()).await.unwrap();
        f.repository.faults().set_latency(Duration::from_millis(50));

        let (succeeded, failed) = tokio::join!(f.service.succeed(id), f.service.fail(id));

        let err = match (succeeded, failed) {
            (Ok(_), Err(err)) | (Err(err), Ok(_)) => err,
            (succeeded, failed) => panic!(
                "exactly one conclusion must commit: succeed={:?} fail={:?}",
                succeeded.map(|r| r.aggregate.state()),
                failed.map(|r| r.aggregate.state())
            ),
        };
        assert!(err.is_conflict());
        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::Conflict { kind: "order", .. })
        ));

        let document = f.repository.document(id).await.unwrap();
        assert_eq!(document.events.len(), 3);
        assert!(matches!(
            document.events[2],
            OrderState::Succeeded | OrderState::Failed
        ));
        assert_eq!(seen.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_persistence_times_out() {
        let f = fixture();
        let service = OrderService::new(Arc::new(f.repository.clone()), Arc::clone(&f.bus))
            .with_budget(Duration::from_millis(100));
        f.repository.faults().set_latency(Duration::from_secs(30));

        let err = service
            .place_order("ACME", "Parcel", Utc::now() + chrono::Duration::hours(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Repository(RepositoryError::Timeout(_))
        ));
    }
}
