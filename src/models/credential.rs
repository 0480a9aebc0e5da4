use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Key of the delegated-access sub-structure inside a credential document.
pub const CREDENTIAL_KEY: &str = "googleCalendar";

/// Field the discovery query filters on.
pub const ACCESS_TOKEN_FIELD: &str = "googleCalendar.access_token";

/// Tokens expiring within this window are refreshed before use.
const REFRESH_SKEW_SECONDS: i64 = 60;

/// A user's credential document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CredentialRecord {
    #[serde(
        rename = "googleCalendar",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub google_calendar: Option<Credential>,
}

impl From<Credential> for CredentialRecord {
    fn from(credential: Credential) -> Self {
        Self {
            google_calendar: Some(credential),
        }
    }
}

/// Delegated-access token pair for the user's calendar.
///
/// Written by the authorization flow; the sync core only reads it, apart
/// from merging a refreshed access token back in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Credential {
    /// Empty when the section exists but was never filled in.
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Expiry in milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    /// Account the calendar belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expiry_date.and_then(DateTime::from_timestamp_millis)
    }

    /// True when the access token is (nearly) expired and can be refreshed.
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        if !matches!(self.refresh_token.as_deref(), Some(token) if !token.is_empty()) {
            return false;
        }
        match self.expires_at() {
            Some(expires_at) => expires_at - Duration::seconds(REFRESH_SKEW_SECONDS) <= now,
            None => false,
        }
    }

    /// Apply a token grant, keeping every other field.
    pub fn refreshed(&self, grant: TokenGrant, now: DateTime<Utc>) -> Self {
        let expiry_date = grant
            .expires_in
            .map(|secs| (now + Duration::seconds(secs)).timestamp_millis())
            .or(self.expiry_date);

        Self {
            access_token: grant.access_token,
            expiry_date,
            ..self.clone()
        }
    }
}

/// A fresh access token returned by the provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TokenGrant {
    pub access_token: String,
    /// Lifetime in seconds.
    #[serde(default)]
    pub expires_in: Option<i64>,
}
