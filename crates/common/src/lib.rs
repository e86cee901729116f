//! Shared identifier types.

mod types;

pub use types::{IdentifierError, IssueId, OrderId, ReportId};
