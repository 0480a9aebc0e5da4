//! Contracts for the credential and task stores consumed by the sync core.
//!
//! Documents are addressed by slash-separated paths. A user's documents live
//! under `users/{uid}/...`; that parent segment is how discovery maps a
//! credential document back to its owner.

use crate::error::StoreError;
use crate::models::{CredentialRecord, TaskListRecord};

/// A document located by discovery, with the user that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub path: String,
    /// `None` when the document is not nested under a user.
    pub owner: Option<String>,
}

pub trait CredentialStore: Send + Sync {
    fn get_credentials(&self, path: &str) -> Result<Option<CredentialRecord>, StoreError>;

    fn set_credentials(
        &self,
        path: &str,
        record: &CredentialRecord,
        merge: bool,
    ) -> Result<(), StoreError>;

    /// Every credential document whose access token is a non-empty string.
    fn find_with_access_token(&self) -> Result<Vec<DocumentRef>, StoreError>;
}

pub trait TaskStore: Send + Sync {
    fn get_task_list(&self, path: &str) -> Result<Option<TaskListRecord>, StoreError>;
}

pub fn credential_path(uid: &str) -> Result<String, StoreError> {
    user_path(uid, "private/credentials")
}

pub fn task_path(uid: &str) -> Result<String, StoreError> {
    user_path(uid, "tasks/list")
}

fn user_path(uid: &str, suffix: &str) -> Result<String, StoreError> {
    if uid.is_empty() || uid.contains('/') {
        return Err(StoreError::InvalidPath(format!("invalid user id: {uid:?}")));
    }
    Ok(format!("users/{uid}/{suffix}"))
}
