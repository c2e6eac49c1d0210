//! itrack REST API Server Library
//!
//! Exposes the issue service over HTTP so the web UI and the assignment
//! client can list users and create, edit, assign and delete issues.

pub mod error;
pub mod routes;

// Re-export for convenience
pub use error::ApiError;
pub use routes::{create_routes, TrackerStore};
