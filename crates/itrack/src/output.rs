//! Structured output formatting for CLI commands.
//!
//! Every command can print either human-readable text or a JSON envelope
//! (`--json`), and maps failures onto stable exit codes.

use crate::errors::ServiceError;
use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

/// Version of the JSON output format
const OUTPUT_VERSION: &str = "0.1.0";

/// Metadata attached to every JSON response
#[derive(Debug, Serialize)]
pub struct Metadata {
    pub timestamp: String,
    pub version: String,
    pub command: String,
}

impl Metadata {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            version: OUTPUT_VERSION.to_string(),
            command: command.into(),
        }
    }
}

/// Wrapper for successful command output with metadata
#[derive(Debug, Serialize)]
pub struct JsonOutput<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub metadata: Metadata,
}

impl<T: Serialize> JsonOutput<T> {
    pub fn success(data: T, command: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            metadata: Metadata::new(command),
        }
    }

    /// Serialize to JSON string with pretty formatting
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Error details including a machine-readable code
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Error code (e.g., "ISSUE_NOT_FOUND", "VALIDATION_FAILED")
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Wrapper for error output
#[derive(Debug, Serialize)]
pub struct JsonError {
    pub success: bool,
    pub error: ErrorDetail,
    pub metadata: Metadata,
}

impl JsonError {
    pub fn new(code: impl Into<String>, message: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            success: false,
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
            metadata: Metadata::new(command),
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.error.details = Some(details);
        self
    }

    /// Build the envelope for a service failure.
    pub fn from_service_error(error: &ServiceError, command: impl Into<String>) -> Self {
        let json = Self::new(error_code(error), error.to_string(), command);
        match error {
            ServiceError::Validation(errors) => match serde_json::to_value(errors) {
                Ok(details) => json.with_details(details),
                Err(_) => json,
            },
            _ => json,
        }
    }

    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Machine-readable code for a service failure.
pub fn error_code(error: &ServiceError) -> &'static str {
    match error {
        ServiceError::Validation(_) => "VALIDATION_FAILED",
        ServiceError::NotFound { .. } => "NOT_FOUND",
        ServiceError::Server(_) => "SERVER_ERROR",
    }
}

/// Standardized exit codes for the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Command succeeded (0)
    Success = 0,
    /// Generic error (1)
    GenericError = 1,
    /// Invalid arguments or payload (2)
    InvalidArgument = 2,
    /// Resource not found (3)
    NotFound = 3,
}

impl ExitCode {
    /// Convert exit code to i32 for `std::process::exit`
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&ServiceError> for ExitCode {
    fn from(error: &ServiceError) -> Self {
        match error {
            ServiceError::Validation(_) => ExitCode::InvalidArgument,
            ServiceError::NotFound { .. } => ExitCode::NotFound,
            ServiceError::Server(_) => ExitCode::GenericError,
        }
    }
}
