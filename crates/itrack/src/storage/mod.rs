//! Storage abstraction for issues and users.
//!
//! [`IssueStore`] is the issue repository and [`UserDirectory`] the read-only
//! user listing. Both are synchronous; async callers run them on a blocking
//! thread. Missing records are ordinary values (`Option`, [`Removal`]), so
//! `Err` is reserved for backend faults such as a lost connection or a
//! violated constraint.

use crate::domain::{
    Issue, IssueFilter, IssueId, IssuePatch, IssueQuery, NewIssue, Removal, StatusSummary, User,
};
use anyhow::Result;

pub mod memory;
pub mod sqlite;

pub use memory::InMemoryStorage;
pub use sqlite::SqliteStorage;

/// Issue repository.
///
/// # Examples
///
/// ```
/// use itrack::domain::{IssuePatch, NewIssue, Status};
/// use itrack::storage::{InMemoryStorage, IssueStore};
///
/// let storage = InMemoryStorage::new();
/// let issue = storage.create_issue(&NewIssue::new("Fix bug", "Details")).unwrap();
/// assert_eq!(issue.status, Status::Open);
///
/// let patch = IssuePatch { status: Some(Status::Closed), ..IssuePatch::default() };
/// let updated = storage.update_issue(issue.id, &patch).unwrap().unwrap();
/// assert_eq!(updated.status, Status::Closed);
/// ```
pub trait IssueStore {
    /// Initialize the backend (idempotent): create tables and indexes.
    fn init(&self) -> Result<()>;

    /// Persist a new issue and return it with its assigned id and timestamps.
    fn create_issue(&self, input: &NewIssue) -> Result<Issue>;

    /// Load an issue by id. `Ok(None)` if it does not exist.
    fn load_issue(&self, id: IssueId) -> Result<Option<Issue>>;

    /// Apply a partial update. `Ok(None)` if the issue does not exist;
    /// missing ids are never created.
    ///
    /// A patch that changes nothing (empty, or repeating current values)
    /// returns the issue untouched, `updated_at` included.
    fn update_issue(&self, id: IssueId, patch: &IssuePatch) -> Result<Option<Issue>>;

    /// Hard-delete an issue.
    fn delete_issue(&self, id: IssueId) -> Result<Removal>;

    /// One page of issues matching the query's filter, in the query's order.
    fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>>;

    /// Number of issues matching a filter.
    fn count_issues(&self, filter: &IssueFilter) -> Result<usize>;

    /// Issue counts per status.
    fn status_summary(&self) -> Result<StatusSummary>;
}

/// Read-only listing of assignable users.
pub trait UserDirectory {
    /// All users, ordered by name.
    fn list_users(&self) -> Result<Vec<User>>;

    /// Look up one user. `Ok(None)` if there is no such user.
    fn find_user(&self, id: &str) -> Result<Option<User>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderBy, Status};

    fn backends() -> Vec<(&'static str, Box<dyn Fn() -> Box<dyn Backend>>)> {
        vec![
            (
                "memory",
                Box::new(|| Box::new(InMemoryStorage::new()) as Box<dyn Backend>),
            ),
            (
                "sqlite",
                Box::new(|| {
                    let storage = SqliteStorage::open_in_memory().unwrap();
                    Box::new(storage) as Box<dyn Backend>
                }),
            ),
        ]
    }

    trait Backend: IssueStore + UserDirectory {}
    impl<T: IssueStore + UserDirectory> Backend for T {}

    fn new_issue(title: &str) -> NewIssue {
        NewIssue::new(title, "Description")
    }

    #[test]
    fn test_create_assigns_increasing_ids() {
        for (name, make) in backends() {
            let storage = make();
            storage.init().unwrap();
            let first = storage.create_issue(&new_issue("First")).unwrap();
            let second = storage.create_issue(&new_issue("Second")).unwrap();
            assert!(second.id > first.id, "{}", name);
            assert_eq!(first.status, Status::Open, "{}", name);
            assert_eq!(first.assigned_to_user_id, None, "{}", name);
            assert_eq!(first.created_at, first.updated_at, "{}", name);
        }
    }

    #[test]
    fn test_create_then_load_round_trip() {
        for (name, make) in backends() {
            let storage = make();
            let mut input = new_issue("Round trip");
            input.status = Status::InProgress;
            let created = storage.create_issue(&input).unwrap();

            let loaded = storage.load_issue(created.id).unwrap().unwrap();
            assert_eq!(loaded, created, "{}", name);
            assert_eq!(loaded.title, "Round trip", "{}", name);
            assert_eq!(loaded.status, Status::InProgress, "{}", name);
        }
    }

    #[test]
    fn test_load_missing_is_none() {
        for (name, make) in backends() {
            let storage = make();
            assert!(storage.load_issue(999).unwrap().is_none(), "{}", name);
        }
    }

    #[test]
    fn test_update_missing_does_not_create() {
        for (name, make) in backends() {
            let storage = make();
            let patch = IssuePatch {
                title: Some("Ghost".to_string()),
                ..IssuePatch::default()
            };
            assert!(storage.update_issue(7, &patch).unwrap().is_none(), "{}", name);
            assert!(storage.load_issue(7).unwrap().is_none(), "{}", name);
        }
    }

    #[test]
    fn test_empty_update_keeps_timestamp() {
        for (name, make) in backends() {
            let storage = make();
            let created = storage.create_issue(&new_issue("Stable")).unwrap();
            let same = storage
                .update_issue(created.id, &IssuePatch::default())
                .unwrap()
                .unwrap();
            assert_eq!(same, created, "{}", name);
        }
    }

    #[test]
    fn test_update_changes_only_supplied_fields() {
        for (name, make) in backends() {
            let storage = make();
            let created = storage.create_issue(&new_issue("Before")).unwrap();
            let patch = IssuePatch {
                status: Some(Status::Closed),
                ..IssuePatch::default()
            };
            let updated = storage.update_issue(created.id, &patch).unwrap().unwrap();
            assert_eq!(updated.status, Status::Closed, "{}", name);
            assert_eq!(updated.title, "Before", "{}", name);
            assert_eq!(updated.created_at, created.created_at, "{}", name);
            assert!(updated.updated_at >= created.updated_at, "{}", name);
        }
    }

    #[test]
    fn test_update_with_current_values_keeps_timestamp() {
        for (name, make) in backends() {
            let storage = make();
            let created = storage.create_issue(&new_issue("Same")).unwrap();
            let patch = IssuePatch {
                title: Some("Same".to_string()),
                status: Some(Status::Open),
                assigned_to_user_id: Some(None),
                ..IssuePatch::default()
            };
            let updated = storage.update_issue(created.id, &patch).unwrap().unwrap();
            assert_eq!(updated, created, "{}", name);
            let stored = storage.load_issue(created.id).unwrap().unwrap();
            assert_eq!(stored.updated_at, created.updated_at, "{}", name);
        }
    }

    #[test]
    fn test_delete_distinguishes_missing() {
        for (name, make) in backends() {
            let storage = make();
            let created = storage.create_issue(&new_issue("Doomed")).unwrap();
            assert_eq!(storage.delete_issue(created.id).unwrap(), Removal::Removed, "{}", name);
            assert_eq!(storage.delete_issue(created.id).unwrap(), Removal::NotFound, "{}", name);
            assert!(storage.load_issue(created.id).unwrap().is_none(), "{}", name);
        }
    }

    #[test]
    fn test_list_filters_orders_and_pages() {
        for (name, make) in backends() {
            let storage = make();
            for title in ["Charlie", "alpha", "Bravo", "Delta"] {
                storage.create_issue(&new_issue(title)).unwrap();
            }
            let bravo = storage
                .list_issues(&IssueQuery::default())
                .unwrap()
                .into_iter()
                .find(|i| i.title == "Bravo")
                .unwrap();
            let patch = IssuePatch {
                status: Some(Status::Closed),
                ..IssuePatch::default()
            };
            storage.update_issue(bravo.id, &patch).unwrap();

            let by_title = IssueQuery {
                order_by: OrderBy::Title,
                page_size: 2,
                ..IssueQuery::default()
            };
            let titles: Vec<_> = storage
                .list_issues(&by_title)
                .unwrap()
                .into_iter()
                .map(|i| i.title)
                .collect();
            assert_eq!(titles, ["Bravo", "Charlie"], "{}", name);

            let second_page = IssueQuery {
                page: 2,
                ..by_title.clone()
            };
            let titles: Vec<_> = storage
                .list_issues(&second_page)
                .unwrap()
                .into_iter()
                .map(|i| i.title)
                .collect();
            assert_eq!(titles, ["Delta", "alpha"], "{}", name);

            let open_only = IssueFilter {
                status: Some(Status::Open),
                assignee: None,
            };
            assert_eq!(storage.count_issues(&open_only).unwrap(), 3, "{}", name);
            assert_eq!(storage.count_issues(&IssueFilter::default()).unwrap(), 4, "{}", name);

            let newest_first = storage.list_issues(&IssueQuery::default()).unwrap();
            assert_eq!(newest_first[0].title, "Delta", "{}", name);
        }
    }

    #[test]
    fn test_status_summary_counts() {
        for (name, make) in backends() {
            let storage = make();
            let a = storage.create_issue(&new_issue("A")).unwrap();
            storage.create_issue(&new_issue("B")).unwrap();
            let patch = IssuePatch {
                status: Some(Status::InProgress),
                ..IssuePatch::default()
            };
            storage.update_issue(a.id, &patch).unwrap();

            let summary = storage.status_summary().unwrap();
            assert_eq!(
                summary,
                StatusSummary {
                    open: 1,
                    in_progress: 1,
                    closed: 0,
                    total: 2
                },
                "{}",
                name
            );
        }
    }
}
