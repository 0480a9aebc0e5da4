//! External calendar provider contract.

mod google;

use async_trait::async_trait;

pub use google::{GoogleCalendarClient, GoogleConfig};

use crate::error::ProviderError;
use crate::models::{EventDescriptor, TokenGrant};

/// Result of an insert-only event write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Created,
    /// The provider already holds an event with this id.
    Conflict,
}

#[async_trait]
pub trait CalendarProvider: Send + Sync {
    /// Insert `event` into `calendar_id`. Never updates an existing event.
    async fn insert_event(
        &self,
        access_token: &str,
        calendar_id: &str,
        event: &EventDescriptor,
    ) -> Result<InsertOutcome, ProviderError>;

    /// Exchange a refresh token for a new access token.
    async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenGrant, ProviderError>;
}
