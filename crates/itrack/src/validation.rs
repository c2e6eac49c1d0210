//! Schema validation for incoming issue payloads.
//!
//! Request bodies arrive as arbitrary JSON. Nothing downstream trusts a field
//! until it has passed through [`validate_new_issue`] or
//! [`validate_issue_patch`], which turn a `serde_json::Value` into a typed
//! [`NewIssue`] or [`IssuePatch`]. Every failing field is reported, not just
//! the first one.
//!
//! Referential checks (does this user exist?) are not done here; the service
//! owns those.

use crate::domain::{IssuePatch, NewIssue, Status, UserId};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Maximum title length, in characters.
pub const TITLE_MAX_LEN: usize = 255;

/// Maximum description length, in characters.
pub const DESCRIPTION_MAX_LEN: usize = 65_535;

/// Maximum length of a user identifier, in characters.
pub const USER_ID_MAX_LEN: usize = 255;

pub const FIELD_TITLE: &str = "title";
pub const FIELD_DESCRIPTION: &str = "description";
pub const FIELD_STATUS: &str = "status";
pub const FIELD_ASSIGNEE: &str = "assignedToUserId";

/// Every problem found in a payload.
///
/// `field_errors` maps a field name to its messages; `form_errors` holds
/// problems with the payload as a whole (e.g. it is not an object).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub form_errors: Vec<String>,
    pub field_errors: BTreeMap<String, Vec<String>>,
}

impl ValidationError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-field error.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut error = Self::new();
        error.add(field, message);
        error
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.field_errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn add_form(&mut self, message: impl Into<String>) {
        self.form_errors.push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.form_errors.is_empty() && self.field_errors.is_empty()
    }

    /// Messages recorded for `field`, if any.
    pub fn messages(&self, field: &str) -> &[String] {
        self.field_errors
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    fn into_result<T>(self, value: T) -> Result<T, ValidationError> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = self.form_errors.clone();
        for (field, messages) in &self.field_errors {
            for message in messages {
                parts.push(format!("{}: {}", field, message));
            }
        }
        write!(f, "{}", parts.join("; "))
    }
}

impl std::error::Error for ValidationError {}

/// Validate a create payload: `{title, description, status?, assignedToUserId?}`.
pub fn validate_new_issue(payload: &Value) -> Result<NewIssue, ValidationError> {
    let mut errors = ValidationError::new();
    let Some(object) = as_object(payload, &mut errors) else {
        return Err(errors);
    };

    let title = match object.get(FIELD_TITLE) {
        Some(value) => check_title(value, &mut errors),
        None => {
            errors.add(FIELD_TITLE, "Title is required.");
            None
        }
    };
    let description = match object.get(FIELD_DESCRIPTION) {
        Some(value) => check_description(value, &mut errors),
        None => {
            errors.add(FIELD_DESCRIPTION, "Description is required.");
            None
        }
    };
    let status = object
        .get(FIELD_STATUS)
        .map(|value| check_status(value, &mut errors));
    let assignee = object
        .get(FIELD_ASSIGNEE)
        .map(|value| check_assignee(value, &mut errors));

    match (title, description) {
        (Some(title), Some(description)) => errors.into_result(NewIssue {
            title,
            description,
            status: status.flatten().unwrap_or_default(),
            assigned_to_user_id: assignee.flatten().flatten(),
        }),
        _ => Err(errors),
    }
}

/// Validate a partial update. Only fields present in the payload are checked.
pub fn validate_issue_patch(payload: &Value) -> Result<IssuePatch, ValidationError> {
    let mut errors = ValidationError::new();
    let Some(object) = as_object(payload, &mut errors) else {
        return Err(errors);
    };

    let patch = IssuePatch {
        title: object
            .get(FIELD_TITLE)
            .and_then(|value| check_title(value, &mut errors)),
        description: object
            .get(FIELD_DESCRIPTION)
            .and_then(|value| check_description(value, &mut errors)),
        status: object
            .get(FIELD_STATUS)
            .and_then(|value| check_status(value, &mut errors)),
        assigned_to_user_id: object
            .get(FIELD_ASSIGNEE)
            .and_then(|value| check_assignee(value, &mut errors)),
    };

    errors.into_result(patch)
}

/// Format check for a user identifier: non-empty, bounded length.
pub fn validate_user_id(id: &str) -> Result<(), String> {
    let len = id.chars().count();
    if len == 0 {
        Err("Assignee id is required.".to_string())
    } else if len > USER_ID_MAX_LEN {
        Err(format!(
            "Assignee id must be at most {} characters.",
            USER_ID_MAX_LEN
        ))
    } else {
        Ok(())
    }
}

fn as_object<'a>(payload: &'a Value, errors: &mut ValidationError) -> Option<&'a Map<String, Value>> {
    match payload.as_object() {
        Some(object) => Some(object),
        None => {
            errors.add_form("Expected a JSON object.");
            None
        }
    }
}

fn check_text(
    field: &str,
    label: &str,
    max: usize,
    value: &Value,
    errors: &mut ValidationError,
) -> Option<String> {
    let Some(text) = value.as_str() else {
        errors.add(field, format!("{} must be a string.", label));
        return None;
    };
    let len = text.chars().count();
    if len == 0 {
        errors.add(field, format!("{} is required.", label));
        None
    } else if len > max {
        errors.add(
            field,
            format!("{} must be at most {} characters.", label, max),
        );
        None
    } else {
        Some(text.to_string())
    }
}

fn check_title(value: &Value, errors: &mut ValidationError) -> Option<String> {
    check_text(FIELD_TITLE, "Title", TITLE_MAX_LEN, value, errors)
}

fn check_description(value: &Value, errors: &mut ValidationError) -> Option<String> {
    check_text(
        FIELD_DESCRIPTION,
        "Description",
        DESCRIPTION_MAX_LEN,
        value,
        errors,
    )
}

fn check_status(value: &Value, errors: &mut ValidationError) -> Option<Status> {
    match value.as_str().map(str::parse::<Status>) {
        Some(Ok(status)) => Some(status),
        _ => {
            errors.add(
                FIELD_STATUS,
                "Status must be one of OPEN, IN_PROGRESS, CLOSED.",
            );
            None
        }
    }
}

/// `null` is a valid value meaning "unassigned".
fn check_assignee(value: &Value, errors: &mut ValidationError) -> Option<Option<UserId>> {
    match value {
        Value::Null => Some(None),
        Value::String(id) => match validate_user_id(id) {
            Ok(()) => Some(Some(id.clone())),
            Err(message) => {
                errors.add(FIELD_ASSIGNEE, message);
                None
            }
        },
        _ => {
            errors.add(FIELD_ASSIGNEE, "Assignee id must be a string or null.");
            None
        }
    }
}
