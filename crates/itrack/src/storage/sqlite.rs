//! SQLite storage backend.
//!
//! Two tables: `users` and `issues`, with a foreign key from
//! `issues.assigned_to_user_id` to `users.id`. Timestamps are stored as
//! RFC 3339 text with nanosecond precision, which sorts chronologically.

use crate::domain::{
    Issue, IssueFilter, IssueId, IssuePatch, IssueQuery, NewIssue, OrderBy, Removal, Status,
    StatusSummary, User,
};
use crate::storage::{IssueStore, UserDirectory};
use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::{Type, Value};
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

const ISSUE_COLUMNS: &str =
    "id, title, description, status, assigned_to_user_id, created_at, updated_at";

const MIGRATIONS: &str = "
    CREATE TABLE IF NOT EXISTS users (
        id    TEXT PRIMARY KEY,
        name  TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE
    );

    CREATE TABLE IF NOT EXISTS issues (
        id                  INTEGER PRIMARY KEY AUTOINCREMENT,
        title               TEXT NOT NULL,
        description         TEXT NOT NULL,
        status              TEXT NOT NULL DEFAULT 'OPEN'
                            CHECK (status IN ('OPEN', 'IN_PROGRESS', 'CLOSED')),
        assigned_to_user_id TEXT REFERENCES users(id) ON DELETE SET NULL,
        created_at          TEXT NOT NULL,
        updated_at          TEXT NOT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_issues_status ON issues(status);
    CREATE INDEX IF NOT EXISTS idx_issues_assignee ON issues(assigned_to_user_id);
";

/// SQLite-backed issue store and user directory.
///
/// A single connection is shared behind a mutex; clones share it.
#[derive(Clone)]
pub struct SqliteStorage {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl SqliteStorage {
    /// Open (or create) a database file and run migrations.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open SQLite database at {}", path.display()))?;
        Self::from_connection(conn, Some(path.to_path_buf()))
    }

    /// Create an in-memory database (for tests and throwaway servers).
    pub fn open_in_memory() -> Result<Self> {
        let conn =
            Connection::open_in_memory().context("Failed to open in-memory SQLite database")?;
        Self::from_connection(conn, None)
    }

    fn from_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .context("Failed to enable foreign keys")?;
        conn.busy_timeout(std::time::Duration::from_secs(5))
            .context("Failed to set busy timeout")?;
        let storage = Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        };
        storage.init()?;
        Ok(storage)
    }

    /// Database file, or `None` for an in-memory database.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Seed a user into the directory.
    ///
    /// Fails if the id or email is already taken.
    pub fn insert_user(&self, user: &User) -> Result<()> {
        self.lock()?
            .execute(
                "INSERT INTO users (id, name, email) VALUES (?1, ?2, ?3)",
                params![user.id, user.name, user.email],
            )
            .with_context(|| format!("Failed to insert user {} <{}>", user.name, user.email))?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow!("Database lock poisoned: {}", e))
    }
}

fn format_timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

fn parse_timestamp(column: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|at| at.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn row_to_issue(row: &Row<'_>) -> rusqlite::Result<Issue> {
    let status: String = row.get(3)?;
    let created_at: String = row.get(5)?;
    let updated_at: String = row.get(6)?;
    Ok(Issue {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        status: status
            .parse::<Status>()
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into()))?,
        assigned_to_user_id: row.get(4)?,
        created_at: parse_timestamp(5, &created_at)?,
        updated_at: parse_timestamp(6, &updated_at)?,
    })
}

fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
    })
}

/// WHERE clause and bound values for a filter.
fn where_clause(filter: &IssueFilter) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values = Vec::new();
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        values.push(Value::Text(status.as_str().to_string()));
    }
    if let Some(ref assignee) = filter.assignee {
        clauses.push("assigned_to_user_id = ?");
        values.push(Value::Text(assignee.clone()));
    }
    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

fn order_clause(order_by: OrderBy) -> &'static str {
    match order_by {
        OrderBy::CreatedAt => " ORDER BY created_at DESC, id DESC",
        OrderBy::Title => " ORDER BY title ASC, id ASC",
        OrderBy::Status => {
            " ORDER BY CASE status WHEN 'OPEN' THEN 0 WHEN 'IN_PROGRESS' THEN 1 ELSE 2 END, id ASC"
        }
    }
}

fn select_issue(conn: &Connection, id: IssueId) -> Result<Option<Issue>> {
    conn.query_row(
        &format!("SELECT {} FROM issues WHERE id = ?1", ISSUE_COLUMNS),
        params![id],
        row_to_issue,
    )
    .optional()
    .with_context(|| format!("Failed to load issue {}", id))
}

impl IssueStore for SqliteStorage {
    fn init(&self) -> Result<()> {
        self.lock()?
            .execute_batch(MIGRATIONS)
            .context("Failed to run migrations")
    }

    fn create_issue(&self, input: &NewIssue) -> Result<Issue> {
        let conn = self.lock()?;
        let now = Utc::now();
        let stamp = format_timestamp(&now);
        conn.execute(
            "INSERT INTO issues (title, description, status, assigned_to_user_id, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
            params![
                input.title,
                input.description,
                input.status.as_str(),
                input.assigned_to_user_id,
                stamp
            ],
        )
        .context("Failed to insert issue")?;

        Ok(Issue {
            id: conn.last_insert_rowid(),
            title: input.title.clone(),
            description: input.description.clone(),
            status: input.status,
            assigned_to_user_id: input.assigned_to_user_id.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    fn load_issue(&self, id: IssueId) -> Result<Option<Issue>> {
        let conn = self.lock()?;
        select_issue(&conn, id)
    }

    fn update_issue(&self, id: IssueId, patch: &IssuePatch) -> Result<Option<Issue>> {
        let conn = self.lock()?;
        let Some(mut issue) = select_issue(&conn, id)? else {
            return Ok(None);
        };
        if !issue.apply(patch) {
            return Ok(Some(issue));
        }

        issue.updated_at = Utc::now();
        conn.execute(
            "UPDATE issues
             SET title = ?1, description = ?2, status = ?3, assigned_to_user_id = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                issue.title,
                issue.description,
                issue.status.as_str(),
                issue.assigned_to_user_id,
                format_timestamp(&issue.updated_at),
                id
            ],
        )
        .with_context(|| format!("Failed to update issue {}", id))?;

        Ok(Some(issue))
    }

    fn delete_issue(&self, id: IssueId) -> Result<Removal> {
        let removed = self
            .lock()?
            .execute("DELETE FROM issues WHERE id = ?1", params![id])
            .with_context(|| format!("Failed to delete issue {}", id))?;
        Ok(if removed > 0 {
            Removal::Removed
        } else {
            Removal::NotFound
        })
    }

    fn list_issues(&self, query: &IssueQuery) -> Result<Vec<Issue>> {
        let conn = self.lock()?;
        let (filter_sql, mut values) = where_clause(&query.filter);
        let sql = format!(
            "SELECT {} FROM issues{}{} LIMIT ? OFFSET ?",
            ISSUE_COLUMNS,
            filter_sql,
            order_clause(query.order_by)
        );
        values.push(Value::Integer(i64::from(query.page_size)));
        values.push(Value::Integer(query.offset() as i64));

        let mut stmt = conn.prepare(&sql).context("Failed to prepare issue listing")?;
        let issues = stmt
            .query_map(params_from_iter(values), row_to_issue)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list issues")?;
        Ok(issues)
    }

    fn count_issues(&self, filter: &IssueFilter) -> Result<usize> {
        let conn = self.lock()?;
        let (filter_sql, values) = where_clause(filter);
        let count: i64 = conn
            .query_row(
                &format!("SELECT COUNT(*) FROM issues{}", filter_sql),
                params_from_iter(values),
                |row| row.get(0),
            )
            .context("Failed to count issues")?;
        Ok(count as usize)
    }

    fn status_summary(&self) -> Result<StatusSummary> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT status, COUNT(*) FROM issues GROUP BY status")
            .context("Failed to prepare status summary")?;
        let rows = stmt
            .query_map([], |row| {
                let status: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((status, count))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to summarize issues")?;

        let mut summary = StatusSummary::default();
        for (status, count) in rows {
            let count = count as usize;
            match status.parse::<Status>().map_err(|e| anyhow!(e))? {
                Status::Open => summary.open = count,
                Status::InProgress => summary.in_progress = count,
                Status::Closed => summary.closed = count,
            }
            summary.total += count;
        }
        Ok(summary)
    }
}

impl UserDirectory for SqliteStorage {
    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT id, name, email FROM users ORDER BY name ASC, id ASC")
            .context("Failed to prepare user listing")?;
        let users = stmt
            .query_map([], row_to_user)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .context("Failed to list users")?;
        Ok(users)
    }

    fn find_user(&self, id: &str) -> Result<Option<User>> {
        self.lock()?
            .query_row(
                "SELECT id, name, email FROM users WHERE id = ?1",
                params![id],
                row_to_user,
            )
            .optional()
            .with_context(|| format!("Failed to load user {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str, email: &str) -> User {
        User {
            id: id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
        }
    }

    #[test]
    fn test_persists_across_reopen() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("itrack.db");

        let id = {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.insert_user(&user("u7", "Ada", "ada@example.com")).unwrap();
            let mut input = NewIssue::new("Persisted", "Body");
            input.assigned_to_user_id = Some("u7".to_string());
            storage.create_issue(&input).unwrap().id
        };

        let storage = SqliteStorage::open(&path).unwrap();
        assert_eq!(storage.path(), Some(path.as_path()));
        let issue = storage.load_issue(id).unwrap().unwrap();
        assert_eq!(issue.title, "Persisted");
        assert_eq!(issue.assigned_to_user_id.as_deref(), Some("u7"));
        assert_eq!(storage.list_users().unwrap().len(), 1);
    }

    #[test]
    fn test_init_is_idempotent() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.init().unwrap();
        storage.init().unwrap();
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert_user(&user("u1", "Ada", "ada@example.com")).unwrap();
        let err = storage
            .insert_user(&user("u2", "Other Ada", "ada@example.com"))
            .unwrap_err();
        assert!(err.to_string().contains("Failed to insert user"));
    }

    #[test]
    fn test_foreign_key_enforced() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let mut input = NewIssue::new("Dangling", "Body");
        input.assigned_to_user_id = Some("ghost".to_string());
        assert!(storage.create_issue(&input).is_err());
    }

    #[test]
    fn test_users_ordered_by_name() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert_user(&user("u2", "Zed", "zed@example.com")).unwrap();
        storage.insert_user(&user("u1", "Ada", "ada@example.com")).unwrap();
        let names: Vec<_> = storage
            .list_users()
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, ["Ada", "Zed"]);
        assert!(storage.find_user("u3").unwrap().is_none());
    }

    #[test]
    fn test_unassign_clears_column() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.insert_user(&user("u7", "Ada", "ada@example.com")).unwrap();
        let issue = storage.create_issue(&NewIssue::new("Assign", "Body")).unwrap();

        storage
            .update_issue(issue.id, &IssuePatch::assign(Some("u7".to_string())))
            .unwrap();
        storage
            .update_issue(issue.id, &IssuePatch::assign(None))
            .unwrap();

        let loaded = storage.load_issue(issue.id).unwrap().unwrap();
        assert_eq!(loaded.assigned_to_user_id, None);
    }

    #[test]
    fn test_timestamps_round_trip_exactly() {
        let now = Utc::now();
        let parsed = parse_timestamp(0, &format_timestamp(&now)).unwrap();
        assert_eq!(parsed, now);
    }
}
