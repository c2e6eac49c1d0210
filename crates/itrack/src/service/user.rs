//! User directory access

use super::*;

impl<S: IssueStore + UserDirectory> IssueService<S> {
    /// All assignable users, ordered by name.
    pub fn list_users(&self) -> ServiceResult<Vec<User>> {
        self.storage
            .list_users()
            .map_err(|e| server_error("list_users", e))
    }

    pub fn show_user(&self, id: &str) -> ServiceResult<User> {
        self.storage
            .find_user(id)
            .map_err(|e| server_error("find_user", e))?
            .ok_or_else(|| ServiceError::NotFound {
                resource: Resource::User,
                id: id.to_string(),
            })
    }
}
