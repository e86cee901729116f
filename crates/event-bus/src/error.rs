use std::time::Duration;

use thiserror::Error;

/// Errors a handler can report back to the bus.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The handler refused the event.
    #[error("Handler rejected event: {0}")]
    Rejected(String),

    /// A collaborator did not answer within the handler's bounded wait.
    #[error("Collaborator did not answer within {0:?}")]
    TimedOut(Duration),

    /// A collaborator was reachable but failed.
    #[error("Collaborator unavailable: {0}")]
    Unavailable(String),
}

/// A single handler failure collected during dispatch.
#[derive(Debug, Error)]
#[error("{handler}: {error}")]
pub struct HandlerFailure {
    /// Name the handler was registered with.
    pub handler: String,

    /// What went wrong.
    #[source]
    pub error: HandlerError,
}

/// Aggregated handler failures for one raised event.
///
/// The transition that produced the event is already committed when this is
/// returned; it only reports which reactions did not complete.
#[derive(Debug, Error)]
#[error("{} handler(s) failed for {event_type}", .failures.len())]
pub struct RaiseError {
    pub event_type: &'static str,
    pub failures: Vec<HandlerFailure>,
}

impl RaiseError {
    /// Returns the names of the handlers that failed.
    pub fn failed_handlers(&self) -> impl Iterator<Item = &str> {
        self.failures.iter().map(|f| f.handler.as_str())
    }
}
