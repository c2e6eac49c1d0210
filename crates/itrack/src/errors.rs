//! Typed outcomes for service operations.
//!
//! Callers branch on three failure kinds: a correctable payload
//! ([`ServiceError::Validation`]), a missing resource
//! ([`ServiceError::NotFound`]) and anything else ([`ServiceError::Server`]).
//! Backend faults keep their cause chain for logging, but their display text
//! is generic so it can be shown to a client as-is.

use crate::validation::ValidationError;
use std::fmt;
use thiserror::Error;

/// Message shown for faults the caller cannot correct.
pub const SERVER_ERROR_MESSAGE: &str = "An unexpected error occurred.";

/// Kind of resource a lookup failed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Issue,
    User,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resource::Issue => f.write_str("Issue"),
            Resource::User => f.write_str("User"),
        }
    }
}

/// Failure outcome of an `IssueService` operation.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The payload was malformed; every failing field is listed
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// The referenced resource does not exist
    #[error("{resource} not found: {id}")]
    NotFound { resource: Resource, id: String },

    /// The store failed; the source carries the detail
    #[error("{}", SERVER_ERROR_MESSAGE)]
    Server(#[source] anyhow::Error),
}

impl ServiceError {
    pub fn issue_not_found(id: impl ToString) -> Self {
        ServiceError::NotFound {
            resource: Resource::Issue,
            id: id.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, ServiceError::Validation(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ServiceError::NotFound { .. })
    }

    pub fn is_server(&self) -> bool {
        matches!(self, ServiceError::Server(_))
    }
}

impl From<ValidationError> for ServiceError {
    fn from(error: ValidationError) -> Self {
        ServiceError::Validation(error)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
