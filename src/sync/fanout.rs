use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::SyncDispatcher;
use crate::error::StoreError;
use crate::models::TriggerSummary;
use crate::store::CredentialStore;

/// Discovers every user with a calendar credential and dispatches one sync
/// per user.
pub struct FanOut {
    credentials: Arc<dyn CredentialStore>,
    dispatcher: Arc<dyn SyncDispatcher>,
}

impl FanOut {
    pub fn new(credentials: Arc<dyn CredentialStore>, dispatcher: Arc<dyn SyncDispatcher>) -> Self {
        Self {
            credentials,
            dispatcher,
        }
    }

    /// Returns once every user has been dispatched, not once they are synced.
    /// A user owning several credential documents is dispatched once.
    #[instrument(skip(self))]
    pub fn trigger_all(&self) -> Result<TriggerSummary, StoreError> {
        let users = self.discover()?;
        if users.is_empty() {
            info!("no users with calendar credentials");
            return Ok(TriggerSummary::default());
        }

        for uid in &users {
            self.dispatcher.dispatch(uid);
        }

        info!(triggered = users.len(), "dispatched calendar syncs");
        Ok(TriggerSummary {
            triggered: users.len(),
            users,
        })
    }

    /// Distinct owners of credential documents with an access token, in
    /// discovery order.
    pub fn discover(&self) -> Result<Vec<String>, StoreError> {
        let mut seen = HashSet::new();
        let mut users = Vec::new();

        for doc in self.credentials.find_with_access_token()? {
            match doc.owner {
                Some(uid) => {
                    if seen.insert(uid.clone()) {
                        users.push(uid);
                    }
                }
                None => warn!(path = %doc.path, "credential document has no owning user"),
            }
        }

        Ok(users)
    }
}
