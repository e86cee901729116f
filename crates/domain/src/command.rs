//! Command results and event publication shared by the application services.

use event_bus::{EventBus, HandlerFailure};

use crate::events::DroneEvent;

/// Result of a committed command.
///
/// The transition is persisted before the event is raised, so handler
/// failures are reported here instead of failing the command.
#[derive(Debug)]
pub struct CommandResult<A> {
    /// The aggregate after the transition.
    pub aggregate: A,

    /// The event that was raised.
    pub event: DroneEvent,

    /// Handlers that did not complete their reaction.
    pub failures: Vec<HandlerFailure>,
}

impl<A> CommandResult<A> {
    /// Returns true if every handler completed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Raises `event` and packages the outcome.
pub(crate) async fn commit_and_raise<A>(
    bus: &EventBus<DroneEvent>,
    aggregate: A,
    event: DroneEvent,
) -> CommandResult<A> {
    let failures = match bus.raise(&event).await {
        Ok(_) => Vec::new(),
        Err(err) => {
            tracing::warn!(%err, "event handlers failed after commit");
            err.failures
        }
    };
    CommandResult {
        aggregate,
        event,
        failures,
    }
}
