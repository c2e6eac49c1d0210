//! Core domain types for the issue tracker.
//!
//! Issues, users, the partial-update payload, and the query/report shapes
//! returned by the service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// System-assigned issue identifier.
pub type IssueId = i64;

/// System-assigned user identifier.
pub type UserId = String;

/// Issue lifecycle status.
///
/// All three values are mutually reachable by explicit update.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// Newly reported (default)
    #[default]
    Open,
    /// Being worked on
    InProgress,
    /// Resolved or abandoned
    Closed,
}

impl Status {
    /// Every status, in display order.
    pub const ALL: [Status; 3] = [Status::Open, Status::InProgress, Status::Closed];

    /// Wire and storage representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Open => "OPEN",
            Status::InProgress => "IN_PROGRESS",
            Status::Closed => "CLOSED",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::InProgress => "In Progress",
            Status::Closed => "Closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN" => Ok(Status::Open),
            "IN_PROGRESS" => Ok(Status::InProgress),
            "CLOSED" => Ok(Status::Closed),
            other => Err(format!(
                "Invalid status '{}': expected one of OPEN, IN_PROGRESS, CLOSED",
                other
            )),
        }
    }
}

/// A tracked work item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    /// Markdown body, opaque to the tracker
    pub description: String,
    pub status: Status,
    pub assigned_to_user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Issue {
    /// Apply a partial update in place. Returns true if anything changed.
    ///
    /// Does not touch `updated_at`; the store decides when to stamp it.
    pub fn apply(&mut self, patch: &IssuePatch) -> bool {
        let mut changed = false;
        if let Some(title) = &patch.title {
            changed |= self.title != *title;
            self.title = title.clone();
        }
        if let Some(description) = &patch.description {
            changed |= self.description != *description;
            self.description = description.clone();
        }
        if let Some(status) = patch.status {
            changed |= self.status != status;
            self.status = status;
        }
        if let Some(assignee) = &patch.assigned_to_user_id {
            changed |= self.assigned_to_user_id != *assignee;
            self.assigned_to_user_id = assignee.clone();
        }
        changed
    }
}

/// A person issues can be assigned to. Read-only from the tracker's side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

/// Validated input for creating an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub description: String,
    pub status: Status,
    pub assigned_to_user_id: Option<UserId>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            status: Status::Open,
            assigned_to_user_id: None,
        }
    }
}

/// Validated partial update. `None` fields are left untouched.
///
/// `assigned_to_user_id` is doubly optional: `Some(None)` clears the
/// assignee, `None` leaves it alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<Status>,
    pub assigned_to_user_id: Option<Option<UserId>>,
}

impl IssuePatch {
    /// A patch that only (re)assigns the issue.
    pub fn assign(user_id: Option<UserId>) -> Self {
        Self {
            assigned_to_user_id: Some(user_id),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to_user_id.is_none()
    }

    /// The user this patch assigns, if it assigns anyone.
    pub fn assignee(&self) -> Option<&str> {
        self.assigned_to_user_id
            .as_ref()
            .and_then(|a| a.as_deref())
    }
}

/// Outcome of a delete against the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// The issue existed and is gone now
    Removed,
    /// There was nothing to remove
    NotFound,
}

/// Sort order for issue listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderBy {
    /// Newest first (default)
    #[default]
    CreatedAt,
    Title,
    Status,
}

impl FromStr for OrderBy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "createdAt" => Ok(OrderBy::CreatedAt),
            "title" => Ok(OrderBy::Title),
            "status" => Ok(OrderBy::Status),
            other => Err(format!(
                "Invalid order '{}': expected one of createdAt, title, status",
                other
            )),
        }
    }
}

/// Filter shared by listing and counting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub status: Option<Status>,
    pub assignee: Option<UserId>,
}

impl IssueFilter {
    pub fn matches(&self, issue: &Issue) -> bool {
        if let Some(status) = self.status {
            if issue.status != status {
                return false;
            }
        }
        if let Some(ref assignee) = self.assignee {
            if issue.assigned_to_user_id.as_ref() != Some(assignee) {
                return false;
            }
        }
        true
    }
}

/// Default number of issues per page.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Upper bound on `page_size` a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// A paginated listing request. Pages are 1-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueQuery {
    pub filter: IssueFilter,
    pub order_by: OrderBy,
    pub page: u32,
    pub page_size: u32,
}

impl Default for IssueQuery {
    fn default() -> Self {
        Self {
            filter: IssueFilter::default(),
            order_by: OrderBy::default(),
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl IssueQuery {
    /// Clamp page and page size into their valid ranges.
    pub fn normalized(mut self) -> Self {
        self.page = self.page.max(1);
        self.page_size = self.page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    /// Rows to skip before this page.
    pub fn offset(&self) -> usize {
        (self.page.saturating_sub(1) as usize) * self.page_size as usize
    }
}

/// One page of issues plus the numbers a pager needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuePage {
    pub items: Vec<Issue>,
    pub total: usize,
    pub page: u32,
    pub page_size: u32,
    pub page_count: u32,
}

impl IssuePage {
    pub fn new(items: Vec<Issue>, total: usize, page: u32, page_size: u32) -> Self {
        let page_count = total.div_ceil(page_size.max(1) as usize) as u32;
        Self {
            items,
            total,
            page,
            page_size,
            page_count,
        }
    }
}

/// Issue counts per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub open: usize,
    pub in_progress: usize,
    pub closed: usize,
    pub total: usize,
}

impl StatusSummary {
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Open => self.open += 1,
            Status::InProgress => self.in_progress += 1,
            Status::Closed => self.closed += 1,
        }
        self.total += 1;
    }

    /// Number of issues in `status`.
    pub fn count(&self, status: Status) -> usize {
        match status {
            Status::Open => self.open,
            Status::InProgress => self.in_progress,
            Status::Closed => self.closed,
        }
    }
}
