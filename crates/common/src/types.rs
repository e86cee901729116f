use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Raised when a raw integer cannot be used as an identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("identifiers start at 1, got {0}")]
pub struct IdentifierError(pub u64);

/// Unique identifier for an order.
///
/// Assigned monotonically by the order repository, starting at 1,
/// and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct OrderId(u64);

impl OrderId {
    /// Creates an order ID, rejecting zero.
    pub fn new(value: u64) -> Result<Self, IdentifierError> {
        if value == 0 {
            return Err(IdentifierError(value));
        }
        Ok(Self(value))
    }

    /// Returns the first identifier handed out by a repository.
    pub fn first() -> Self {
        Self(1)
    }

    /// Returns the identifier following this one.
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    /// Returns the raw value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for OrderId {
    type Error = IdentifierError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<OrderId> for u64 {
    fn from(id: OrderId) -> Self {
        id.0
    }
}

/// Unique identifier for an issue, assigned when the issue is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct IssueId(u64);

impl IssueId {
    /// Creates an issue ID, rejecting zero.
    pub fn new(value: u64) -> Result<Self, IdentifierError> {
        if value == 0 {
            return Err(IdentifierError(value));
        }
        Ok(Self(value))
    }

    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for IssueId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl TryFrom<u64> for IssueId {
    type Error = IdentifierError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<IssueId> for u64 {
    fn from(id: IssueId) -> Self {
        id.0
    }
}

/// Unique identifier for a negligence report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct ReportId(u64);

impl ReportId {
    /// Creates a report ID, rejecting zero.
    pub fn new(value: u64) -> Result<Self, IdentifierError> {
        if value == 0 {
            return Err(IdentifierError(value));
        }
        Ok(Self(value))
    }

    pub fn first() -> Self {
        Self(1)
    }

    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ReportId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u64> for ReportId {
    type Error = IdentifierError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ReportId> for u64 {
    fn from(id: ReportId) -> Self {
        id.0
    }
}
