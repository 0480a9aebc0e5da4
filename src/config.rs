//! Process configuration loaded from environment variables.

use std::path::PathBuf;

use chrono_tz::Tz;

use crate::api::SecurityConfig;
use crate::calendar::GoogleConfig;
use crate::error::ConfigError;
use crate::sync::SyncSettings;

const DEFAULT_MAX_CONCURRENT_SYNCS: usize = 8;

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Document store location; `None` means the platform data directory.
    pub db_path: Option<PathBuf>,
    pub sync: SyncSettings,
    pub google: GoogleConfig,
    pub security: SecurityConfig,
    /// Raw `token=uid` pairs for the static identity verifier.
    pub identity_tokens: Option<String>,
    /// Base URL for remote dispatch; local tasks when unset.
    pub dispatch_url: Option<String>,
    pub max_concurrent_syncs: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let mut sync = SyncSettings::default();
        if let Some(calendar_id) = var("MOMENTUM_CALENDAR_ID") {
            sync.calendar_id = calendar_id;
        }
        if let Some(zone) = var("MOMENTUM_TIME_ZONE") {
            sync.time_zone = zone
                .parse::<Tz>()
                .map_err(|_| ConfigError::InvalidTimeZone(zone.clone()))?;
        }

        let mut google = GoogleConfig {
            client_id: var("GOOGLE_CLIENT_ID"),
            client_secret: var("GOOGLE_CLIENT_SECRET"),
            ..GoogleConfig::default()
        };
        if let Some(api_base) = var("MOMENTUM_CALENDAR_API_BASE") {
            google.api_base = api_base;
        }
        if let Some(token_url) = var("MOMENTUM_OAUTH_TOKEN_URL") {
            google.token_url = token_url;
        }

        let max_concurrent_syncs = match var("MOMENTUM_MAX_CONCURRENT_SYNCS") {
            Some(value) => match value.parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MOMENTUM_MAX_CONCURRENT_SYNCS",
                        value,
                    })
                }
            },
            None => DEFAULT_MAX_CONCURRENT_SYNCS,
        };

        Ok(Self {
            db_path: var("MOMENTUM_DB_PATH").map(PathBuf::from),
            sync,
            google,
            security: SecurityConfig::from_lookup(&var)?,
            identity_tokens: var("MOMENTUM_IDENTITY_TOKENS"),
            dispatch_url: var("MOMENTUM_DISPATCH_URL"),
            max_concurrent_syncs,
        })
    }
}
