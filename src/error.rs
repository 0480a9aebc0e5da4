//! Error taxonomy shared by the store, provider and sync layers.

use thiserror::Error;

/// Failures reading or writing the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("malformed record at {path}: {reason}")]
    MalformedRecord { path: String, reason: String },

    #[error("invalid document path: {0}")]
    InvalidPath(String),

    #[error("invalid field path: {0}")]
    InvalidField(String),

    #[error("document store lock poisoned")]
    Poisoned,
}

/// Failures talking to the external calendar provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("calendar request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("calendar API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("token refresh unavailable: {0}")]
    RefreshUnavailable(String),
}

/// A failure isolated to a single task. Never aborts the user's sync.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("malformed task {task_id}: {reason}")]
    MalformedTask { task_id: String, reason: String },

    #[error("calendar insert failed for task {task_id}: {source}")]
    Provider {
        task_id: String,
        #[source]
        source: ProviderError,
    },
}

impl TaskError {
    pub fn task_id(&self) -> &str {
        match self {
            Self::MalformedTask { task_id, .. } | Self::Provider { task_id, .. } => task_id,
        }
    }
}

/// User-level sync failures. These never abort a fan-out batch.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("no calendar credential for user {0}")]
    NoCredential(String),

    #[error("no task list for user {0}")]
    NoTasks(String),

    #[error("token refresh failed for user {uid}: {source}")]
    TokenRefresh {
        uid: String,
        #[source]
        source: ProviderError,
    },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Invalid startup configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown time zone: {0}")]
    InvalidTimeZone(String),

    #[error("invalid value for {var}: {value}")]
    InvalidValue { var: &'static str, value: String },
}
