//! Issue service.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use common::IssueId;
use event_bus::EventBus;

use crate::command::{CommandResult, commit_and_raise};
use crate::error::DomainError;
use crate::events::DroneEvent;
use crate::persistence::{DEFAULT_PERSISTENCE_BUDGET, bounded};
use crate::repository::IssueRepository;
use crate::value_objects::{DroneId, Subject, Username};

use super::{Issue, IssueError};

/// Raw input for a new issue, validated by [`IssueService::create_issue`].
#[derive(Debug, Clone)]
pub struct NewIssue {
    pub subject: String,
    pub details: String,
    pub courier: String,
    pub assignee: String,
    pub drone_id: String,
}

/// Service for couriers reporting issues and maintainers handling them.
pub struct IssueService {
    repository: Arc<dyn IssueRepository>,
    bus: Arc<EventBus<DroneEvent>>,
    budget: Duration,
}

impl IssueService {
    pub fn new(repository: Arc<dyn IssueRepository>, bus: Arc<EventBus<DroneEvent>>) -> Self {
        Self {
            repository,
            bus,
            budget: DEFAULT_PERSISTENCE_BUDGET,
        }
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    /// Validates and sends a new issue. The stored issue comes back `Open`.
    #[tracing::instrument(skip(self, input), fields(courier = %input.courier, assignee = %input.assignee))]
    pub async fn create_issue(&self, input: NewIssue) -> Result<CommandResult<Issue>, DomainError> {
        let issue = Issue::create(
            Subject::new(input.subject)?,
            input.details,
            Username::new(input.courier)?,
            Username::new(input.assignee)?,
            DroneId::new(input.drone_id)?,
            Utc::now(),
        );
        let issue = bounded("issue.commit", self.budget, self.repository.commit(issue)).await?;
        tracing::info!(issue_id = ?issue.id(), "issue created");

        let event = DroneEvent::IssueCreated {
            issue: issue.clone(),
        };
        Ok(commit_and_raise(&self.bus, issue, event).await)
    }

    #[tracing::instrument(skip(self))]
    pub async fn vision_issue(&self, id: IssueId) -> Result<CommandResult<Issue>, DomainError> {
        let issue = self.transition(id, Issue::vision).await?;
        let event = DroneEvent::IssueVisioned {
            issue: issue.clone(),
        };
        Ok(commit_and_raise(&self.bus, issue, event).await)
    }

    #[tracing::instrument(skip(self, solution))]
    pub async fn close_issue(
        &self,
        id: IssueId,
        solution: &str,
    ) -> Result<CommandResult<Issue>, DomainError> {
        let issue = self
            .transition(id, |issue| issue.close(solution))
            .await?;
        let event = DroneEvent::IssueClosed {
            issue: issue.clone(),
        };
        Ok(commit_and_raise(&self.bus, issue, event).await)
    }

    pub async fn find_issue(&self, id: IssueId) -> Result<Option<Issue>, DomainError> {
        Ok(bounded("issue.find", self.budget, self.repository.find(id)).await?)
    }

    /// Issues assigned to a maintainer.
    pub async fn issues_for_assignee(&self, assignee: &str) -> Result<Vec<Issue>, DomainError> {
        let assignee = Username::new(assignee)?;
        Ok(bounded(
            "issue.list_for_assignee",
            self.budget,
            self.repository.list_for_assignee(&assignee),
        )
        .await?)
    }

    /// Issues written by a courier.
    pub async fn issues_for_courier(&self, courier: &str) -> Result<Vec<Issue>, DomainError> {
        let courier = Username::new(courier)?;
        Ok(bounded(
            "issue.list_for_courier",
            self.budget,
            self.repository.list_for_courier(&courier),
        )
        .await?)
    }

    async fn transition<F>(&self, id: IssueId, apply: F) -> Result<Issue, DomainError>
    where
        F: FnOnce(Issue) -> Result<Issue, IssueError>,
    {
        let current = self
            .find_issue(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Issue", id))?;
        let expected = current.state();
        let next = apply(current)?;
        bounded(
            "issue.update",
            self.budget,
            self.repository.update(expected, &next),
        )
        .await?;
        tracing::info!(issue_id = %id, state = %next.state(), "issue transitioned");
        Ok(next)
    }
}
