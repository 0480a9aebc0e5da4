//! Detached per-user sync triggers.
//!
//! A dispatcher hands a user id off and returns immediately. Whether the
//! resulting sync succeeds is only visible in the logs.

use std::sync::{Arc, Mutex};

use reqwest::{Client, Url};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, info_span, warn, Instrument};

use super::SyncExecutor;
use crate::error::{ConfigError, SyncError};

pub trait SyncDispatcher: Send + Sync {
    /// Start a sync for `uid` without waiting for it.
    fn dispatch(&self, uid: &str);
}

/// Runs each sync as a tokio task on the local runtime.
///
/// At most `max_concurrent` syncs run at once. Waiting for a slot happens
/// inside the spawned task, so `dispatch` itself never blocks.
pub struct TaskDispatcher {
    executor: Arc<SyncExecutor>,
    permits: Arc<Semaphore>,
    tasks: Mutex<JoinSet<()>>,
}

impl TaskDispatcher {
    pub fn new(executor: Arc<SyncExecutor>, max_concurrent: usize) -> Self {
        Self {
            executor,
            permits: Arc::new(Semaphore::new(max_concurrent.max(1))),
            tasks: Mutex::new(JoinSet::new()),
        }
    }

    /// Wait until every sync dispatched so far has finished.
    pub async fn wait_idle(&self) {
        let mut pending = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        };
        while let Some(joined) = pending.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "detached sync task panicked");
            }
        }
    }
}

impl SyncDispatcher for TaskDispatcher {
    fn dispatch(&self, uid: &str) {
        let executor = self.executor.clone();
        let permits = self.permits.clone();
        let uid = uid.to_string();
        let span = info_span!("detached_sync", uid = %uid);

        let job = async move {
            let Ok(_permit) = permits.acquire_owned().await else {
                return;
            };
            match executor.sync(&uid).await {
                Ok(report) => info!(
                    created = report.created,
                    failed = report.errors.len(),
                    "detached sync completed"
                ),
                Err(SyncError::NoTasks(_)) => info!("no task list, nothing to sync"),
                Err(e) => error!(error = %e, "detached sync failed"),
            }
        }
        .instrument(span);

        let mut tasks = match self.tasks.lock() {
            Ok(tasks) => tasks,
            Err(poisoned) => poisoned.into_inner(),
        };
        // Reap finished jobs so the set does not grow without bound.
        while tasks.try_join_next().is_some() {}
        tasks.spawn(job);
    }
}

/// Triggers each sync through the service's internal HTTP route, so the
/// work can land on another instance.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    base_url: Url,
    secret: String,
    client: Client,
}

impl HttpDispatcher {
    pub fn new(base_url: &str, secret: impl Into<String>) -> Result<Self, ConfigError> {
        let invalid = || ConfigError::InvalidValue {
            var: "MOMENTUM_DISPATCH_URL",
            value: base_url.to_string(),
        };
        let base_url = Url::parse(base_url).map_err(|_| invalid())?;
        if base_url.cannot_be_a_base() {
            return Err(invalid());
        }
        Ok(Self {
            base_url,
            secret: secret.into(),
            client: Client::new(),
        })
    }

    /// The uid is pushed as a single encoded path segment.
    fn url_for(&self, uid: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().extend(["internal", "sync", uid]);
        }
        url
    }
}

impl SyncDispatcher for HttpDispatcher {
    fn dispatch(&self, uid: &str) {
        let request = self
            .client
            .post(self.url_for(uid))
            .bearer_auth(&self.secret)
            .send();
        let span = info_span!("remote_sync", uid = %uid);

        tokio::spawn(
            async move {
                match request.await {
                    Ok(response) if response.status().is_success() => {
                        info!(status = %response.status(), "remote sync accepted")
                    }
                    Ok(response) => warn!(status = %response.status(), "remote sync rejected"),
                    Err(e) => error!(error = %e, "remote sync request failed"),
                }
            }
            .instrument(span),
        );
    }
}
