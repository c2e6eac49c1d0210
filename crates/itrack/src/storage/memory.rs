//! In-memory storage implementation for testing.
//!
//! Keeps issues and users in a single mutex-guarded state. Each instance is
//! isolated, which makes it a good fit for parallel tests; clones share data.

use crate::domain::{
    Issue, IssueFilter, IssueId, IssuePatch, IssueQuery, NewIssue, OrderBy, Removal,
    StatusSummary, User,
};
use crate::storage::{IssueStore, UserDirectory};
use anyhow::{anyhow, bail, Result};
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryState {
    issues: BTreeMap<IssueId, Issue>,
    users: Vec<User>,
    last_id: IssueId,
}

/// In-memory storage backend.
///
/// All data is lost when the last clone is dropped.
///
/// # Examples
///
/// ```
/// use itrack::domain::{NewIssue, User};
/// use itrack::storage::{InMemoryStorage, IssueStore, UserDirectory};
///
/// let storage = InMemoryStorage::with_users(vec![User {
///     id: "u7".to_string(),
///     name: "Ada".to_string(),
///     email: "ada@example.com".to_string(),
/// }])
/// .unwrap();
/// let issue = storage.create_issue(&NewIssue::new("Test", "Description")).unwrap();
///
/// assert_eq!(storage.load_issue(issue.id).unwrap().unwrap().title, "Test");
/// assert!(storage.find_user("u7").unwrap().is_some());
/// ```
#[derive(Clone, Default)]
pub struct InMemoryStorage {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a storage pre-populated with a user directory.
    pub fn with_users(users: Vec<User>) -> Result<Self> {
        let storage = Self::new();
        for user in users {
            storage.add_user(user)?;
        }
        Ok(storage)
    }

    /// Add a user to the directory, replacing any user with the same id.
    ///
    /// Emails are unique across users.
    pub fn add_user(&self, user: User) -> Result<()> {
        let mut state = self.lock()?;
        if state
            .users
            .iter()
            .any(|u| u.email == user.email && u.id != user.id)
        {
            bail!("Email already in use: {}", user.email);
        }
        state.users.retain(|u| u.id != user.id);
        state.users.push(user);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|e| anyhow!("In-memory storage lock poisoned: {}", e))
    }
}

impl IssueStore for InMemoryStorage {
    fn init(&self) -> Result<()> {
        // No initialization needed for in-memory storage
        Ok(())
    }

    fn create_issue(&self, input: &NewIssue) -> Result<Issue> {
        let mut state = self.lock()?;
        state.last_id += 1;
        let now = Utc::now();
        let issue = Issue {
            id: state.last_id,
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status,
            assigned_to_user_id: input.assigned_to_user_id.clone(),
            created_at: now,
            updated_at: now,
        };
        state.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    fn load_issue(&self, id: IssueId) -> Result<Option<Issue>> {
        Ok(self.lock()?.issues.get(&id).cloned())
    }

    fn update_issue(&self, id: IssueId, patch: &IssuePatch) -> Result<Option<Issue>> {
        let mut state = self.lock()?;
        let Some(issue) = state.issues.get_mut(&id) else {
            return Ok(None);
        };
        if issue.apply(patch) {
            issue.updated_at = Utc::now();
        }
        Ok(Some(issue.clone()))
    }

    fn delete_issue(&self, id: IssueId) -> Result<Removal> {
        Ok(match self.lock()?.issues.remove(&id) {
            Some(_) => Removal::Removed,
            None => Removal::NotFound,
        })
    }

    fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let state = self.lock()?;
        let mut issues: Vec<Issue> = state
            .issues
            .values()
            .filter(|issue| query.filter.matches(issue))
            .cloned()
            .collect();

        match query.order_by {
            OrderBy::CreatedAt => {
                issues.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)))
            }
            OrderBy::Title => issues.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id))),
            OrderBy::Status => {
                issues.sort_by(|a, b| a.status.cmp(&b.status).then(a.id.cmp(&b.id)))
            }
        }

        Ok(issues
            .into_iter()
            .skip(query.offset())
            .take(query.page_size as usize)
            .collect())
    }

    fn count_issues(&self, filter: &IssueFilter) -> Result<usize> {
        Ok(self
            .lock()?
            .issues
            .values()
            .filter(|issue| filter.matches(issue))
            .count())
    }

    fn status_summary(&self) -> Result<StatusSummary> {
        let state = self.lock()?;
        let mut summary = StatusSummary::default();
        for issue in state.issues.values() {
            summary.record(issue.status);
        }
        Ok(summary)
    }
}

impl UserDirectory for InMemoryStorage {
    fn list_users(&self) -> Result<Vec<User>> {
        let mut users = self.lock()?.users.clone();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(users)
    }

    fn find_user(&self, id: &str) -> Result<Option<User>> {
        Ok(self.lock()?.users.iter().find(|u| u.id == id).cloned())
    }
}
