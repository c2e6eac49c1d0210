//! Client side of the issue API used by the assignee picker.

use itrack::domain::{Issue, IssueId, User};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use ureq::Agent;

/// Default per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Why a call to the issue API failed.
#[derive(Debug, Error)]
pub enum AssignError {
    /// No usable HTTP exchange happened
    #[error("Request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: ureq::Error,
    },

    /// The server answered with a non-success status
    #[error("Server answered {status}: {message}")]
    Rejected { status: u16, message: String },

    /// The body was not the JSON we expected
    #[error("Unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AssignError {
    /// HTTP status of a rejected request, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            AssignError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Operations the picker needs from the tracker.
pub trait IssueApi {
    /// All users, ordered by name.
    fn list_users(&self) -> Result<Vec<User>, AssignError>;

    fn show_issue(&self, id: IssueId) -> Result<Issue, AssignError>;

    /// Patch only `assignedToUserId`; `None` clears it.
    fn assign(&self, id: IssueId, user_id: Option<&str>) -> Result<Issue, AssignError>;
}

/// [`IssueApi`] over HTTP against an `itrack-server` instance.
pub struct HttpIssueApi {
    agent: Agent,
    base_url: String,
}

impl HttpIssueApi {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:3000`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self {
            agent,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, AssignError> {
        let url = self.url(path);
        let response = self
            .agent
            .get(url.as_str())
            .call()
            .map_err(|source| AssignError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(url, response)
    }

    fn patch<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T, AssignError> {
        let url = self.url(path);
        let response = self
            .agent
            .patch(url.as_str())
            .header("Content-Type", "application/json")
            .send(body.to_string())
            .map_err(|source| AssignError::Transport {
                url: url.clone(),
                source,
            })?;
        decode(url, response)
    }
}

/// Read a response body, turning non-2xx statuses into [`AssignError::Rejected`].
fn decode<T: DeserializeOwned>(
    url: String,
    mut response: ureq::http::Response<ureq::Body>,
) -> Result<T, AssignError> {
    let status = response.status();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|source| AssignError::Transport { url, source })?;

    if !status.is_success() {
        return Err(AssignError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        });
    }
    Ok(serde_json::from_str(&body)?)
}

/// The `error` field of an API error body, or the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|value| value.get("error")?.as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

impl IssueApi for HttpIssueApi {
    fn list_users(&self) -> Result<Vec<User>, AssignError> {
        self.get("/users")
    }

    fn show_issue(&self, id: IssueId) -> Result<Issue, AssignError> {
        self.get(&format!("/issues/{}", id))
    }

    fn assign(&self, id: IssueId, user_id: Option<&str>) -> Result<Issue, AssignError> {
        tracing::debug!(issue_id = id, assignee = ?user_id, "sending assignment");
        self.patch(
            &format!("/issues/{}", id),
            &json!({ "assignedToUserId": user_id }),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_prefers_error_field() {
        assert_eq!(
            error_message(r#"{"error": "Issue not found: 4"}"#),
            "Issue not found: 4"
        );
        assert_eq!(error_message("Bad Gateway\n"), "Bad Gateway");
        assert_eq!(error_message(r#"{"detail": 1}"#), r#"{"detail": 1}"#);
    }

    #[test]
    fn test_url_strips_trailing_slash() {
        let api = HttpIssueApi::new("http://localhost:3000/");
        assert_eq!(api.url("/users"), "http://localhost:3000/api/users");
    }

    #[test]
    fn test_rejected_status() {
        let error = AssignError::Rejected {
            status: 400,
            message: "Validation failed.".into(),
        };
        assert_eq!(error.status(), Some(400));
        assert_eq!(error.to_string(), "Server answered 400: Validation failed.");
    }
}
