use std::sync::Arc;

use crate::error::StoreError;
use crate::models::Credential;
use crate::store::{credential_path, CredentialStore};

/// Looks up a user's delegated-access credential.
#[derive(Clone)]
pub struct CredentialResolver {
    store: Arc<dyn CredentialStore>,
}

impl CredentialResolver {
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        Self { store }
    }

    /// `Ok(None)` when the document is missing, has no calendar section, or
    /// its access token is empty or absent.
    pub fn resolve(&self, uid: &str) -> Result<Option<Credential>, StoreError> {
        let path = credential_path(uid)?;
        let credential = self
            .store
            .get_credentials(&path)?
            .and_then(|record| record.google_calendar)
            .filter(|c| !c.access_token.is_empty());
        Ok(credential)
    }
}
