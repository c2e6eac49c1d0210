//! Issue service: validation, referential checks and storage calls.
//!
//! `IssueService` is the single entry point the CLI and the HTTP server use.
//! It holds no issue state between calls; every operation reads or writes
//! through to the store. Storage faults are caught here, logged, and turned
//! into [`ServiceError::Server`].
//!
//! Submodules by functional area:
//! - `issue`: create, show, list, patch, delete, summary
//! - `user`: user directory access

mod issue;
mod user;

use crate::domain::{
    Issue, IssueFilter, IssueId, IssuePage, IssueQuery, NewIssue, Removal, StatusSummary, User,
};
use crate::errors::{Resource, ServiceError, ServiceResult};
use crate::storage::{IssueStore, UserDirectory};
use crate::validation::{self, ValidationError, FIELD_ASSIGNEE};
use serde_json::Value;

/// Executes issue operations against a storage backend.
///
/// Generic over the backend so tests can run against memory and production
/// against SQLite.
pub struct IssueService<S> {
    storage: S,
}

impl<S: IssueStore + UserDirectory> IssueService<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Get reference to the storage backend
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Initialize the backing store (idempotent).
    pub fn init(&self) -> ServiceResult<()> {
        self.storage.init().map_err(|e| server_error("init", e))
    }

    /// Confirm `user_id` names an existing user.
    fn check_assignee(&self, user_id: &str) -> ServiceResult<()> {
        match self.storage.find_user(user_id) {
            Ok(Some(_)) => Ok(()),
            Ok(None) => Err(ValidationError::field(FIELD_ASSIGNEE, "Invalid user.").into()),
            Err(e) => Err(server_error("find_user", e)),
        }
    }
}

/// Log a backend fault and hide it behind a generic outcome.
fn server_error(operation: &str, error: anyhow::Error) -> ServiceError {
    tracing::error!(operation, error = ?error, "storage operation failed");
    ServiceError::Server(error)
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::storage::InMemoryStorage;

    pub fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    pub fn service() -> IssueService<InMemoryStorage> {
        IssueService::new(InMemoryStorage::with_users(vec![
            user("u7", "Ada"),
            user("u8", "Grace"),
        ])
        .unwrap())
    }
}
