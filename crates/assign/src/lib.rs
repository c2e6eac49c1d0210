//! Assignee picker for a single issue
//!
//! [`AssigneeSelector`] loads the user list once per activation, offers
//! "Unassigned" plus every user, and submits a selection as a patch that
//! touches only `assignedToUserId`. Outcomes are reported as
//! [`Notification`]s on a side channel; a failed save keeps the previous
//! selection.

pub mod api;

pub use api::{AssignError, HttpIssueApi, IssueApi};

use itrack::domain::{Issue, IssueId, User, UserId};
use std::fmt;
use std::str::FromStr;
use std::sync::mpsc::Sender;
use std::time::Duration;

/// Value the picker uses for "no assignee".
pub const UNASSIGNED: &str = "unassigned";

/// Retries after a failed user list fetch, on top of the first attempt.
pub const USER_FETCH_RETRIES: u32 = 3;

/// Wait before the first retry; doubles on each further retry.
pub const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Upper bound for a single retry wait.
pub const RETRY_MAX_DELAY: Duration = Duration::from_secs(30);

/// Wait before retry number `retry` (1-based).
fn backoff(base: Duration, retry: u32) -> Duration {
    let factor = 2u32.saturating_pow(retry.saturating_sub(1));
    base.saturating_mul(factor).min(RETRY_MAX_DELAY)
}

/// One entry of the picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Unassigned,
    User(UserId),
}

impl Choice {
    /// Assignee value to send: `None` for [`Choice::Unassigned`].
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Choice::Unassigned => None,
            Choice::User(id) => Some(id),
        }
    }

    fn from_assignee(assignee: Option<&str>) -> Self {
        match assignee {
            None => Choice::Unassigned,
            Some(id) => Choice::User(id.to_string()),
        }
    }
}

impl FromStr for Choice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" => Err("Choice must be a user id or 'unassigned'".to_string()),
            UNASSIGNED => Ok(Choice::Unassigned),
            id => Ok(Choice::User(id.to_string())),
        }
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Unassigned => f.write_str(UNASSIGNED),
            Choice::User(id) => f.write_str(id),
        }
    }
}

/// Transient feedback about a save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Saved {
        issue_id: IssueId,
        assignee: Option<UserId>,
    },
    Failed {
        issue_id: IssueId,
        reason: String,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notification::Saved { .. } => f.write_str("Successfully saved!"),
            Notification::Failed { .. } => f.write_str("Could not be saved."),
        }
    }
}

/// Where the user list stands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorState {
    /// Not fetched yet
    Loading,
    Ready(Vec<User>),
    /// The fetch failed; the issue can still be viewed
    Unavailable,
}

/// Picks the assignee of one issue.
pub struct AssigneeSelector {
    issue_id: IssueId,
    selection: Choice,
    state: SelectorState,
    notifications: Sender<Notification>,
    retry_delay: Duration,
}

impl AssigneeSelector {
    /// Start from the issue's current assignee, with the user list not yet loaded.
    pub fn new(issue: &Issue, notifications: Sender<Notification>) -> Self {
        Self {
            issue_id: issue.id,
            selection: Choice::from_assignee(issue.assigned_to_user_id.as_deref()),
            state: SelectorState::Loading,
            notifications,
            retry_delay: RETRY_BASE_DELAY,
        }
    }

    /// Override the first retry wait of [`Self::activate`].
    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Load the user list. Retries [`USER_FETCH_RETRIES`] times with
    /// exponential backoff, then settles on [`SelectorState::Unavailable`].
    pub fn activate<A: IssueApi + ?Sized>(&mut self, api: &A) -> &SelectorState {
        self.state = SelectorState::Loading;
        for attempt in 1..=USER_FETCH_RETRIES + 1 {
            if attempt > 1 {
                std::thread::sleep(backoff(self.retry_delay, attempt - 1));
            }
            match api.list_users() {
                Ok(users) => {
                    self.state = SelectorState::Ready(users);
                    return &self.state;
                }
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "failed to load users");
                }
            }
        }
        self.state = SelectorState::Unavailable;
        &self.state
    }

    /// Submit `choice` for this issue.
    ///
    /// On success the selection moves to `choice`; on failure it stays where
    /// it was. Either way one notification is sent. Not retried.
    pub fn select<A: IssueApi + ?Sized>(&mut self, api: &A, choice: Choice) {
        let notification = match api.assign(self.issue_id, choice.user_id()) {
            Ok(issue) => {
                self.selection = Choice::from_assignee(issue.assigned_to_user_id.as_deref());
                tracing::info!(issue_id = self.issue_id, assignee = %self.selection, "assignee saved");
                Notification::Saved {
                    issue_id: self.issue_id,
                    assignee: issue.assigned_to_user_id,
                }
            }
            Err(e) => {
                tracing::warn!(issue_id = self.issue_id, error = %e, "assignment failed");
                Notification::Failed {
                    issue_id: self.issue_id,
                    reason: e.to_string(),
                }
            }
        };
        if self.notifications.send(notification).is_err() {
            tracing::debug!("notification receiver dropped");
        }
    }

    pub fn issue_id(&self) -> IssueId {
        self.issue_id
    }

    pub fn selection(&self) -> &Choice {
        &self.selection
    }

    pub fn state(&self) -> &SelectorState {
        &self.state
    }

    /// Picker entries as `(value, label)`: "Unassigned" first, then users.
    ///
    /// Empty unless the user list is loaded.
    pub fn options(&self) -> Vec<(Choice, String)> {
        match &self.state {
            SelectorState::Ready(users) => {
                let mut options = vec![(Choice::Unassigned, "Unassigned".to_string())];
                options.extend(
                    users
                        .iter()
                        .map(|user| (Choice::User(user.id.clone()), user.name.clone())),
                );
                options
            }
            SelectorState::Loading | SelectorState::Unavailable => Vec::new(),
        }
    }
}
