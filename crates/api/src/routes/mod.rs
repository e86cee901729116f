//! Route handlers grouped by resource.

pub mod drones;
pub mod issues;
pub mod orders;
pub mod reports;
pub mod system;

use domain::CommandResult;
use event_bus::DomainEvent;
use serde::Serialize;

/// Body returned by every command endpoint.
///
/// The command is committed even when some event handlers failed; their
/// names are listed in `failedHandlers`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandResponse<T> {
    #[serde(flatten)]
    pub resource: T,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed_handlers: Vec<String>,
}

impl<T> CommandResponse<T> {
    pub fn new<A>(result: &CommandResult<A>, resource: T) -> Self {
        if !result.is_clean() {
            tracing::warn!(
                event_type = result.event.event_type(),
                failures = result.failures.len(),
                "command committed with handler failures"
            );
        }
        Self {
            resource,
            failed_handlers: result
                .failures
                .iter()
                .map(|failure| failure.handler.clone())
                .collect(),
        }
    }
}
