//! Issue CRUD operations

use super::*;

impl<S: IssueStore + UserDirectory> IssueService<S> {
    /// Create an issue from an untrusted payload.
    ///
    /// Status defaults to OPEN. An assignee, if supplied, must exist.
    pub fn create_issue(&self, payload: &Value) -> ServiceResult<Issue> {
        let input: NewIssue = validation::validate_new_issue(payload)?;
        if let Some(ref user_id) = input.assigned_to_user_id {
            self.check_assignee(user_id)?;
        }

        let issue = self
            .storage
            .create_issue(&input)
            .map_err(|e| server_error("create_issue", e))?;
        tracing::info!(issue_id = issue.id, "issue created");
        Ok(issue)
    }

    pub fn show_issue(&self, id: IssueId) -> ServiceResult<Issue> {
        self.storage
            .load_issue(id)
            .map_err(|e| server_error("load_issue", e))?
            .ok_or_else(|| ServiceError::issue_not_found(id))
    }

    /// One page of issues plus totals for the pager.
    pub fn list_issues(&self, query: IssueQuery) -> ServiceResult<IssuePage> {
        let query = query.normalized();
        let items = self
            .storage
            .list_issues(&query)
            .map_err(|e| server_error("list_issues", e))?;
        let total = self
            .storage
            .count_issues(&query.filter)
            .map_err(|e| server_error("count_issues", e))?;
        Ok(IssuePage::new(items, total, query.page, query.page_size))
    }

    /// Apply a partial update from an untrusted payload.
    ///
    /// Only supplied fields are validated and written. A non-null
    /// `assignedToUserId` must name an existing user; otherwise the issue is
    /// left untouched and a validation error is returned.
    pub fn patch_issue(&self, id: IssueId, payload: &Value) -> ServiceResult<Issue> {
        let patch = validation::validate_issue_patch(payload)?;
        if let Some(user_id) = patch.assignee() {
            self.check_assignee(user_id)?;
        }

        let issue = self
            .storage
            .update_issue(id, &patch)
            .map_err(|e| server_error("update_issue", e))?
            .ok_or_else(|| ServiceError::issue_not_found(id))?;
        if !patch.is_empty() {
            tracing::info!(issue_id = id, "issue updated");
        }
        Ok(issue)
    }

    /// Hard-delete an issue. No cascading side effects.
    pub fn delete_issue(&self, id: IssueId) -> ServiceResult<()> {
        match self
            .storage
            .delete_issue(id)
            .map_err(|e| server_error("delete_issue", e))?
        {
            Removal::Removed => {
                tracing::info!(issue_id = id, "issue deleted");
                Ok(())
            }
            Removal::NotFound => Err(ServiceError::NotFound {
                resource: Resource::Issue,
                id: id.to_string(),
            }),
        }
    }

    pub fn status_summary(&self) -> ServiceResult<StatusSummary> {
        self.storage
            .status_summary()
            .map_err(|e| server_error("status_summary", e))
    }

    /// Number of issues matching a filter.
    pub fn count_issues(&self, filter: &IssueFilter) -> ServiceResult<usize> {
        self.storage
            .count_issues(filter)
            .map_err(|e| server_error("count_issues", e))
    }
}
