//! itrack issue tracker library
//!
//! Domain types, payload validation, storage backends (SQLite and
//! in-memory) and the [`IssueService`] shared by the CLI and the HTTP server.

pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod output;
pub mod service;
pub mod storage;
pub mod validation;

// Re-export commonly used types
pub use domain::{Issue, IssueId, IssuePatch, NewIssue, Status, User, UserId};
pub use errors::{ServiceError, ServiceResult};
pub use service::IssueService;
pub use storage::{InMemoryStorage, IssueStore, SqliteStorage, UserDirectory};
pub use validation::ValidationError;
