use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;

use crate::{DomainEvent, EventId, HandlerError, HandlerFailure, RaiseError};

/// A reaction to domain events of one type.
#[async_trait]
pub trait EventHandler<E: DomainEvent>: Send + Sync {
    /// Name used in logs and in [`HandlerFailure`].
    fn name(&self) -> &str;

    /// Handles one event. Must not block indefinitely.
    async fn handle(&self, event: &E) -> Result<(), HandlerError>;
}

/// Adapts a synchronous closure into an [`EventHandler`].
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F> FnHandler<F> {
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<E, F> EventHandler<E> for FnHandler<F>
where
    E: DomainEvent,
    F: Fn(&E) -> Result<(), HandlerError> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn handle(&self, event: &E) -> Result<(), HandlerError> {
        (self.f)(event)
    }
}

type Registry<E> = HashMap<&'static str, Vec<Arc<dyn EventHandler<E>>>>;

/// In-process registry dispatching events to handlers by type tag.
///
/// `raise` runs every handler registered for the event's tag, in registration
/// order, on the caller's task, and returns only once all of them finished.
/// The handler list is snapshotted when `raise` starts, so handlers registered
/// while an event is being dispatched never see that event.
pub struct EventBus<E: DomainEvent> {
    handlers: RwLock<Registry<E>>,
}

impl<E: DomainEvent> Default for EventBus<E> {
    fn default() -> Self {
        Self {
            handlers: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: DomainEvent> EventBus<E> {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for events tagged `event_type`.
    pub fn register(&self, event_type: &'static str, handler: Arc<dyn EventHandler<E>>) {
        tracing::debug!(event_type, handler = handler.name(), "registering event handler");
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(event_type)
            .or_default()
            .push(handler);
    }

    /// Registers a synchronous closure for events tagged `event_type`.
    pub fn register_fn<F>(&self, event_type: &'static str, name: impl Into<String>, f: F)
    where
        F: Fn(&E) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(event_type, Arc::new(FnHandler::new(name, f)));
    }

    /// Dispatches `event` to its handlers.
    ///
    /// Returns the number of handlers invoked. A failing handler does not
    /// stop the remaining ones; all failures are collected into the error.
    pub async fn raise(&self, event: &E) -> Result<usize, RaiseError> {
        let event_type = event.event_type();
        let handlers: Vec<Arc<dyn EventHandler<E>>> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(event_type)
            .cloned()
            .unwrap_or_default();

        let event_id = EventId::new();
        tracing::debug!(%event_id, event_type, handlers = handlers.len(), "raising event");

        let mut failures = Vec::new();
        for handler in &handlers {
            if let Err(error) = handler.handle(event).await {
                tracing::warn!(
                    %event_id,
                    event_type,
                    handler = handler.name(),
                    %error,
                    "event handler failed"
                );
                metrics::counter!("event_handler_failures_total", "event_type" => event_type)
                    .increment(1);
                failures.push(HandlerFailure {
                    handler: handler.name().to_string(),
                    error,
                });
            }
        }

        if failures.is_empty() {
            Ok(handlers.len())
        } else {
            Err(RaiseError {
                event_type,
                failures,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum TestEvent {
        Placed(u32),
        Closed,
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            match self {
                TestEvent::Placed(_) => "Placed",
                TestEvent::Closed => "Closed",
            }
        }
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        label: &'static str,
    ) -> impl Fn(&TestEvent) -> Result<(), HandlerError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        move |event| {
            log.lock().unwrap().push(format!("{label}:{event:?}"));
            Ok(())
        }
    }

    #[tokio::test]
    async fn handlers_run_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register_fn("Placed", "h1", recorder(&log, "h1"));
        bus.register_fn("Placed", "h2", recorder(&log, "h2"));

        let invoked = bus.raise(&TestEvent::Placed(1)).await.unwrap();

        assert_eq!(invoked, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["h1:Placed(1)".to_string(), "h2:Placed(1)".to_string()]
        );
    }

    #[tokio::test]
    async fn late_handler_does_not_see_earlier_event() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        bus.raise(&TestEvent::Placed(1)).await.unwrap();
        bus.register_fn("Placed", "late", recorder(&log, "late"));
        bus.raise(&TestEvent::Placed(2)).await.unwrap();

        assert_eq!(*log.lock().unwrap(), vec!["late:Placed(2)".to_string()]);
    }

    #[tokio::test]
    async fn handlers_only_see_their_event_type() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register_fn("Closed", "closer", recorder(&log, "closer"));

        assert_eq!(bus.raise(&TestEvent::Placed(1)).await.unwrap(), 0);
        assert_eq!(bus.raise(&TestEvent::Closed).await.unwrap(), 1);
        assert_eq!(*log.lock().unwrap(), vec!["closer:Closed".to_string()]);
    }

    #[tokio::test]
    async fn failures_are_collected_and_do_not_stop_dispatch() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        bus.register_fn("Placed", "broken", |_: &TestEvent| {
            Err(HandlerError::Rejected("nope".into()))
        });
        bus.register_fn("Placed", "after", recorder(&log, "after"));

        let err = bus.raise(&TestEvent::Placed(3)).await.unwrap_err();

        assert_eq!(err.event_type, "Placed");
        assert_eq!(err.failed_handlers().collect::<Vec<_>>(), vec!["broken"]);
        assert_eq!(*log.lock().unwrap(), vec!["after:Placed(3)".to_string()]);
    }

    #[tokio::test]
    async fn concurrent_registration_is_safe() {
        let bus = Arc::new(EventBus::<TestEvent>::new());
        let mut tasks = Vec::new();
        for i in 0..16 {
            let bus = Arc::clone(&bus);
            tasks.push(tokio::spawn(async move {
                bus.register_fn("Placed", format!("h{i}"), |_: &TestEvent| Ok(()));
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(bus.raise(&TestEvent::Placed(0)).await.unwrap(), 16);
    }
}
