//! API route definitions

use axum::{
    extract::{rejection::JsonRejection, rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

use itrack::domain::{
    Issue, IssueFilter, IssueId, IssuePage, IssueQuery, OrderBy, Status, StatusSummary, User,
};
use itrack::{IssueService, IssueStore, ServiceError, ServiceResult, UserDirectory};

use crate::error::ApiError;

/// Backends the server can run on.
pub trait TrackerStore: IssueStore + UserDirectory + Send + Sync + 'static {}

impl<T: IssueStore + UserDirectory + Send + Sync + 'static> TrackerStore for T {}

/// Shared application state
pub type AppState<S> = Arc<IssueService<S>>;

/// Create API routes
pub fn create_routes<S: TrackerStore>(service: Arc<IssueService<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/users", get(list_users::<S>))
        .route("/issues", get(list_issues::<S>).post(create_issue::<S>))
        .route(
            "/issues/:id",
            get(get_issue::<S>)
                .patch(patch_issue::<S>)
                .delete(delete_issue::<S>),
        )
        .route("/status", get(get_status::<S>))
        .with_state(service)
}

/// Run a service call on the blocking pool.
async fn blocking<S, T, F>(service: &AppState<S>, call: F) -> Result<T, ApiError>
where
    S: TrackerStore,
    T: Send + 'static,
    F: FnOnce(&IssueService<S>) -> ServiceResult<T> + Send + 'static,
{
    let service = Arc::clone(service);
    tokio::task::spawn_blocking(move || call(&service))
        .await
        .map_err(|e| {
            tracing::error!("Service task failed: {:?}", e);
            ApiError::Internal
        })?
        .map_err(ApiError::from)
}

/// Parse the `{id}` path segment. Anything but an integer names no issue.
fn parse_issue_id(raw: &str) -> Result<IssueId, ApiError> {
    raw.parse::<IssueId>()
        .map_err(|_| ApiError::from(ServiceError::issue_not_found(raw)))
}

fn json_body(body: Result<Json<Value>, JsonRejection>) -> Result<Value, ApiError> {
    body.map(|Json(value)| value)
        .map_err(|rejection| ApiError::BadRequest(rejection.body_text()))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "itrack-api",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Users ordered by name, for the assignee picker
async fn list_users<S: TrackerStore>(
    State(service): State<AppState<S>>,
) -> Result<Json<Vec<User>>, ApiError> {
    blocking(&service, |service| service.list_users())
        .await
        .map(Json)
}

/// Issue listing query parameters
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    status: Option<String>,
    assignee: Option<String>,
    order_by: Option<String>,
    page: Option<u32>,
    page_size: Option<u32>,
}

impl ListParams {
    fn into_query(self) -> Result<IssueQuery, ApiError> {
        let defaults = IssueQuery::default();
        let status = match self.status.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(raw.parse::<Status>().map_err(ApiError::BadRequest)?),
        };
        let order_by = match self.order_by.as_deref() {
            None | Some("") => OrderBy::default(),
            Some(raw) => raw.parse::<OrderBy>().map_err(ApiError::BadRequest)?,
        };
        Ok(IssueQuery {
            filter: IssueFilter {
                status,
                assignee: self.assignee.filter(|a| !a.is_empty()),
            },
            order_by,
            page: self.page.unwrap_or(defaults.page),
            page_size: self.page_size.unwrap_or(defaults.page_size),
        })
    }
}

/// One page of issues
async fn list_issues<S: TrackerStore>(
    State(service): State<AppState<S>>,
    params: Result<Query<ListParams>, QueryRejection>,
) -> Result<Json<IssuePage>, ApiError> {
    let Query(params) = params.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let query = params.into_query()?;
    blocking(&service, move |service| service.list_issues(query))
        .await
        .map(Json)
}

/// Get single issue by ID
async fn get_issue<S: TrackerStore>(
    Path(id): Path<String>,
    State(service): State<AppState<S>>,
) -> Result<Json<Issue>, ApiError> {
    let id = parse_issue_id(&id)?;
    blocking(&service, move |service| service.show_issue(id))
        .await
        .map(Json)
}

/// Create an issue from a JSON body
async fn create_issue<S: TrackerStore>(
    State(service): State<AppState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = json_body(body)?;
    let issue = blocking(&service, move |service| service.create_issue(&payload)).await?;
    Ok((StatusCode::CREATED, Json(issue)))
}

/// Partially update an issue; `assignedToUserId: null` unassigns
async fn patch_issue<S: TrackerStore>(
    Path(id): Path<String>,
    State(service): State<AppState<S>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Json<Issue>, ApiError> {
    let id = parse_issue_id(&id)?;
    let payload = json_body(body)?;
    blocking(&service, move |service| service.patch_issue(id, &payload))
        .await
        .map(Json)
}

/// Delete an issue permanently
async fn delete_issue<S: TrackerStore>(
    Path(id): Path<String>,
    State(service): State<AppState<S>>,
) -> Result<StatusCode, ApiError> {
    let id = parse_issue_id(&id)?;
    blocking(&service, move |service| service.delete_issue(id)).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Issue counts per status
async fn get_status<S: TrackerStore>(
    State(service): State<AppState<S>>,
) -> Result<Json<StatusSummary>, ApiError> {
    blocking(&service, |service| service.status_summary())
        .await
        .map(Json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use itrack::InMemoryStorage;
    use serde_json::json;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", id),
        }
    }

    fn create_test_app() -> TestServer {
        let storage = InMemoryStorage::with_users(vec![user("u2", "Grace"), user("u1", "Ada")])
            .unwrap();
        let service = Arc::new(IssueService::new(storage));
        TestServer::new(create_routes(service)).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let server = create_test_app();
        let response = server.get("/health").await;
        response.assert_status_ok();
        response.assert_json(&json!({
            "status": "ok",
            "service": "itrack-api",
            "version": env!("CARGO_PKG_VERSION")
        }));
    }

    #[tokio::test]
    async fn test_list_users_by_name() {
        let server = create_test_app();
        let response = server.get("/users").await;
        response.assert_status_ok();
        let users: Vec<User> = response.json();
        let names: Vec<_> = users.iter().map(|u| u.name.as_str()).collect();
        assert_eq!(names, ["Ada", "Grace"]);
    }

    #[tokio::test]
    async fn test_list_issues_empty() {
        let server = create_test_app();
        let response = server.get("/issues").await;
        response.assert_status_ok();
        let page: IssuePage = response.json();
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(page.page, 1);
    }

    #[tokio::test]
    async fn test_create_returns_created() {
        let server = create_test_app();
        let response = server
            .post("/issues")
            .json(&json!({"title": "Bug A", "description": "Broken"}))
            .await;
        response.assert_status(StatusCode::CREATED);
        let issue: Issue = response.json();
        assert_eq!(issue.id, 1);
        assert_eq!(issue.status, Status::Open);
        assert_eq!(issue.assigned_to_user_id, None);
    }

    #[tokio::test]
    async fn test_create_rejects_missing_fields() {
        let server = create_test_app();
        let response = server.post("/issues").json(&json!({})).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["fieldErrors"]["title"][0], "Title is required.");
        assert_eq!(
            body["fieldErrors"]["description"][0],
            "Description is required."
        );
    }

    #[tokio::test]
    async fn test_create_rejects_non_object_body() {
        let server = create_test_app();
        let response = server.post("/issues").json(&json!([1, 2])).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["formErrors"][0], "Expected a JSON object.");
    }

    #[tokio::test]
    async fn test_create_rejects_malformed_json() {
        let server = create_test_app();
        let response = server
            .post("/issues")
            .text("{not json")
            .content_type("application/json")
            .await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_get_issue_not_found() {
        let server = create_test_app();
        server.get("/issues/42").await.assert_status_not_found();
        server.get("/issues/abc").await.assert_status_not_found();
    }

    #[tokio::test]
    async fn test_patch_unknown_issue() {
        let server = create_test_app();
        let response = server.patch("/issues/5").json(&json!({"title": "x"})).await;
        response.assert_status_not_found();
        let body: Value = response.json();
        assert_eq!(body["error"], "Issue not found: 5");
    }

    #[tokio::test]
    async fn test_list_rejects_bad_status() {
        let server = create_test_app();
        for (key, value) in [("status", "DONE"), ("orderBy", "priority"), ("page", "abc")] {
            let response = server.get("/issues").add_query_param(key, value).await;
            response.assert_status(StatusCode::BAD_REQUEST);
            let body: Value = response.json();
            assert!(body["error"].is_string(), "{}={}", key, value);
        }
        server
            .get("/issues")
            .add_query_param("status", "OPEN")
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn test_status_counts() {
        let server = create_test_app();
        for (title, status) in [("A", "OPEN"), ("B", "CLOSED"), ("C", "CLOSED")] {
            server
                .post("/issues")
                .json(&json!({"title": title, "description": "d", "status": status}))
                .await
                .assert_status(StatusCode::CREATED);
        }
        let response = server.get("/status").await;
        response.assert_status_ok();
        response.assert_json(&json!({"open": 1, "inProgress": 0, "closed": 2, "total": 3}));
    }
}
