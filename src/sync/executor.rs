use std::sync::Arc;

use chrono::Utc;
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use super::credentials::CredentialResolver;
use super::{filter, mapper};
use crate::calendar::{CalendarProvider, InsertOutcome};
use crate::db::Database;
use crate::error::{SyncError, TaskError};
use crate::models::{Credential, CredentialRecord, EligibleTask, SyncReport, TaskFailure};
use crate::store::{credential_path, task_path, CredentialStore, TaskStore};

/// Deployment-wide sync parameters.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub calendar_id: String,
    pub time_zone: Tz,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            calendar_id: "primary".to_string(),
            time_zone: chrono_tz::America::New_York,
        }
    }
}

/// Store and provider handles shared by every sync. Built once at startup.
#[derive(Clone)]
pub struct SyncContext {
    pub credentials: Arc<dyn CredentialStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub calendar: Arc<dyn CalendarProvider>,
    pub settings: SyncSettings,
}

impl SyncContext {
    /// Use one [`Database`] for both credential and task documents.
    pub fn with_database(
        db: Database,
        calendar: Arc<dyn CalendarProvider>,
        settings: SyncSettings,
    ) -> Self {
        let db = Arc::new(db);
        Self {
            credentials: db.clone(),
            tasks: db,
            calendar,
            settings,
        }
    }
}

/// Syncs one user's task list into their calendar.
pub struct SyncExecutor {
    ctx: SyncContext,
    resolver: CredentialResolver,
}

impl SyncExecutor {
    pub fn new(ctx: SyncContext) -> Self {
        let resolver = CredentialResolver::new(ctx.credentials.clone());
        Self { ctx, resolver }
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.ctx.settings
    }

    /// Insert one event per eligible task.
    ///
    /// Fails only for user-level problems. Per-task failures are collected in
    /// the report and never stop the remaining tasks.
    #[instrument(skip(self))]
    pub async fn sync(&self, uid: &str) -> Result<SyncReport, SyncError> {
        let credential = self
            .resolver
            .resolve(uid)?
            .ok_or_else(|| SyncError::NoCredential(uid.to_string()))?;
        let credential = self.ensure_fresh(uid, credential).await?;

        let Some(record) = self.ctx.tasks.get_task_list(&task_path(uid)?)? else {
            return Err(SyncError::NoTasks(uid.to_string()));
        };

        let mut report = SyncReport::new(uid);
        for rejected in &record.rejected {
            let e = TaskError::MalformedTask {
                task_id: rejected.task_id.clone(),
                reason: rejected.reason.clone(),
            };
            warn!(task_id = %rejected.task_id, error = %e, "task entry unreadable");
            report.attempted += 1;
            report.errors.push(TaskFailure::from(&e));
        }
        for task in filter::eligible(&record.list) {
            report.attempted += 1;
            match self.sync_task(&credential.access_token, &task).await {
                Ok(InsertOutcome::Created) => {
                    info!(task_id = task.id(), "calendar event created");
                    report.created += 1;
                }
                Ok(InsertOutcome::Conflict) => {
                    debug!(task_id = task.id(), "calendar event already exists");
                    report.already_synced += 1;
                }
                Err(e) => {
                    warn!(task_id = task.id(), error = %e, "task sync failed");
                    report.errors.push(TaskFailure::from(&e));
                }
            }
        }

        info!(
            attempted = report.attempted,
            created = report.created,
            already_synced = report.already_synced,
            failed = report.errors.len(),
            "sync finished"
        );
        Ok(report)
    }

    async fn sync_task(
        &self,
        access_token: &str,
        task: &EligibleTask<'_>,
    ) -> Result<InsertOutcome, TaskError> {
        let event = mapper::to_event(task, self.ctx.settings.time_zone)?;
        self.ctx
            .calendar
            .insert_event(access_token, &self.ctx.settings.calendar_id, &event)
            .await
            .map_err(|source| TaskError::Provider {
                task_id: task.id().to_string(),
                source,
            })
    }

    /// Refresh an expiring access token and merge it back into the store.
    async fn ensure_fresh(&self, uid: &str, credential: Credential) -> Result<Credential, SyncError> {
        let now = Utc::now();
        if !credential.needs_refresh(now) {
            return Ok(credential);
        }
        let Some(refresh_token) = credential.refresh_token.as_deref() else {
            return Ok(credential);
        };

        let grant = self
            .ctx
            .calendar
            .refresh_access_token(refresh_token)
            .await
            .map_err(|source| SyncError::TokenRefresh {
                uid: uid.to_string(),
                source,
            })?;

        let refreshed = credential.refreshed(grant, now);
        self.ctx.credentials.set_credentials(
            &credential_path(uid)?,
            &CredentialRecord::from(refreshed.clone()),
            true,
        )?;
        info!("calendar access token refreshed");
        Ok(refreshed)
    }
}
