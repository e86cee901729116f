use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::IssueId;
use tokio::sync::RwLock;

use crate::documents::{DocumentError, IssueDocument};
use crate::issue::{Issue, IssueState};
use crate::value_objects::Username;

use super::{RepositoryError, SimulatedFaults};

/// Storage for issues.
#[async_trait]
pub trait IssueRepository: Send + Sync {
    /// Stores a `Sending` issue, assigning its identifier.
    ///
    /// Returns the issue in the `Open` state.
    async fn commit(&self, issue: Issue) -> Result<Issue, RepositoryError>;

    /// Replaces a stored issue with its new state.
    ///
    /// Fails with [`RepositoryError::Conflict`] unless the stored issue is
    /// still in the `expected` state.
    async fn update(&self, expected: IssueState, issue: &Issue) -> Result<(), RepositoryError>;

    async fn find(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError>;

    /// Issues assigned to a maintainer.
    async fn list_for_assignee(&self, assignee: &Username) -> Result<Vec<Issue>, RepositoryError>;

    /// Issues written by a courier.
    async fn list_for_courier(&self, courier: &Username) -> Result<Vec<Issue>, RepositoryError>;
}

#[derive(Default)]
struct IssueTable {
    last_id: Option<IssueId>,
    documents: BTreeMap<IssueId, IssueDocument>,
}

impl IssueTable {
    fn select(
        &self,
        predicate: impl Fn(&IssueDocument) -> bool,
    ) -> Result<Vec<Issue>, RepositoryError> {
        let mut issues = Vec::new();
        for document in self.documents.values().filter(|d| predicate(d)) {
            issues.push(document.clone().into_issue()?);
        }
        Ok(issues)
    }
}

/// In-memory issue repository.
#[derive(Clone, Default)]
pub struct InMemoryIssueRepository {
    table: Arc<RwLock<IssueTable>>,
    faults: SimulatedFaults,
}

impl InMemoryIssueRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn faults(&self) -> &SimulatedFaults {
        &self.faults
    }
}

#[async_trait]
impl IssueRepository for InMemoryIssueRepository {
    async fn commit(&self, issue: Issue) -> Result<Issue, RepositoryError> {
        self.faults.apply().await?;
        let mut table = self.table.write().await;
        let id = table.last_id.map_or_else(IssueId::first, |id| id.next());
        let open = issue
            .commit(id)
            .map_err(|e| RepositoryError::Rejected(e.to_string()))?;
        let document = IssueDocument::from_issue(&open)?;
        table.last_id = Some(id);
        table.documents.insert(id, document);
        Ok(open)
    }

    async fn update(&self, expected: IssueState, issue: &Issue) -> Result<(), RepositoryError> {
        self.faults.apply().await?;
        let document = IssueDocument::from_issue(issue)?;
        let Some(id) = issue.id() else {
            return Err(DocumentError::Unidentified.into());
        };
        let mut table = self.table.write().await;
        let stored = table
            .documents
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::Missing {
                kind: "issue",
                id: id.to_string(),
            })?;
        let actual = stored.clone().into_issue()?.state();
        if actual != expected {
            return Err(RepositoryError::Conflict {
                kind: "issue",
                id: id.to_string(),
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        *stored = document;
        Ok(())
    }

    async fn find(&self, id: IssueId) -> Result<Option<Issue>, RepositoryError> {
        self.faults.apply().await?;
        let table = self.table.read().await;
        match table.documents.get(&id) {
            Some(document) => Ok(Some(document.clone().into_issue()?)),
            None => Ok(None),
        }
    }

    async fn list_for_assignee(&self, assignee: &Username) -> Result<Vec<Issue>, RepositoryError> {
        self.faults.apply().await?;
        self.table
            .read()
            .await
            .select(|d| d.assigned_to == assignee.as_str())
    }

    async fn list_for_courier(&self, courier: &Username) -> Result<Vec<Issue>, RepositoryError> {
        self.faults.apply().await?;
        self.table
            .read()
            .await
            .select(|d| d.courier == courier.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::IssueState;
    use crate::value_objects::{DroneId, Subject};
    use chrono::Utc;

    fn sending(courier: &str, assignee: &str) -> Issue {
        Issue::create(
            Subject::new("Low battery").unwrap(),
            "battery drains fast",
            Username::new(courier).unwrap(),
            Username::new(assignee).unwrap(),
            DroneId::new("drone-1").unwrap(),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_commit_assigns_sequential_identifiers() {
        let repo = InMemoryIssueRepository::new();
        let first = repo.commit(sending("alice", "mark")).await.unwrap();
        let second = repo.commit(sending("alice", "mark")).await.unwrap();

        assert_eq!(first.state(), IssueState::Open);
        assert_eq!(first.id().map(|id| id.as_u64()), Some(1));
        assert_eq!(second.id().map(|id| id.as_u64()), Some(2));
    }

    #[tokio::test]
    async fn test_commit_of_open_issue_is_rejected() {
        let repo = InMemoryIssueRepository::new();
        let open = repo.commit(sending("alice", "mark")).await.unwrap();
        assert!(matches!(
            repo.commit(open).await,
            Err(RepositoryError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn test_update_and_find() {
        let repo = InMemoryIssueRepository::new();
        let open = repo.commit(sending("alice", "mark")).await.unwrap();
        let id = open.id().unwrap();
        let visioned = open.vision().unwrap();
        repo.update(IssueState::Open, &visioned).await.unwrap();

        let found = repo.find(id).await.unwrap().unwrap();
        assert_eq!(found.state(), IssueState::Visioned);
    }

    #[tokio::test]
    async fn test_update_from_stale_state_is_a_conflict() {
        let repo = InMemoryIssueRepository::new();
        let open = repo.commit(sending("alice", "mark")).await.unwrap();
        let id = open.id().unwrap();
        let visioned = open.vision().unwrap();
        repo.update(IssueState::Open, &visioned).await.unwrap();

        let first = visioned.clone().close("replaced rotor").unwrap();
        let second = visioned.close("tightened screws").unwrap();
        repo.update(IssueState::Visioned, &first).await.unwrap();
        let err = repo.update(IssueState::Visioned, &second).await.unwrap_err();

        assert!(matches!(err, RepositoryError::Conflict { kind: "issue", .. }));
        let found = repo.find(id).await.unwrap().unwrap();
        assert_eq!(found.solution().map(|s| s.as_str()), Some("replaced rotor"));
    }

    #[tokio::test]
    async fn test_lists_by_assignee_and_courier() {
        let repo = InMemoryIssueRepository::new();
        repo.commit(sending("alice", "mark")).await.unwrap();
        repo.commit(sending("bob", "mark")).await.unwrap();
        repo.commit(sending("alice", "nina")).await.unwrap();

        let mark = Username::new("mark").unwrap();
        let alice = Username::new("alice").unwrap();
        assert_eq!(repo.list_for_assignee(&mark).await.unwrap().len(), 2);
        assert_eq!(repo.list_for_courier(&alice).await.unwrap().len(), 2);
    }
}
