//! Request guards: shared-secret check for scheduler routes, identity
//! verification for user routes, and per-IP rate limiting.

use axum::{
    body::Body,
    extract::State,
    http::{header::AUTHORIZATION, Request, StatusCode},
    middleware::Next,
    response::Response,
};
use std::{
    collections::HashMap,
    net::{IpAddr, Ipv4Addr},
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use super::identity::{IdentityVerifier, VerifiedUser};
use crate::error::ConfigError;

/// Security configuration loaded from environment variables.
#[derive(Clone, Debug, Default)]
pub struct SecurityConfig {
    /// Shared secret for fan-out and internal routes (MOMENTUM_SYNC_SECRET).
    /// Those routes reject every request while this is unset.
    pub sync_secret: Option<String>,
    /// Allowed CORS origins (MOMENTUM_CORS_ORIGINS, comma-separated)
    pub cors_origins: Option<Vec<String>>,
    /// Per-IP limit on user routes (MOMENTUM_RATE_LIMIT, requests per minute)
    pub rate_limiter: Option<RateLimiter>,
}

impl SecurityConfig {
    pub fn from_lookup(var: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let cors_origins = var("MOMENTUM_CORS_ORIGINS")
            .map(|s| s.split(',').map(|s| s.trim().to_string()).collect());

        let rate_limiter = match var("MOMENTUM_RATE_LIMIT") {
            Some(value) => match value.parse::<u32>() {
                Ok(n) if n > 0 => Some(RateLimiter::new(n, Duration::from_secs(60))),
                _ => {
                    return Err(ConfigError::InvalidValue {
                        var: "MOMENTUM_RATE_LIMIT",
                        value,
                    })
                }
            },
            None => None,
        };

        Ok(Self {
            sync_secret: var("MOMENTUM_SYNC_SECRET"),
            cors_origins,
            rate_limiter,
        })
    }

    /// Create a config with the scheduler secret set (for testing).
    pub fn with_sync_secret(secret: impl Into<String>) -> Self {
        Self {
            sync_secret: Some(secret.into()),
            ..Self::default()
        }
    }

    /// Create a config with rate limiting enabled.
    pub fn with_rate_limit(mut self, max_requests: u32) -> Self {
        self.rate_limiter = Some(RateLimiter::new(max_requests, Duration::from_secs(60)));
        self
    }
}

/// Simple in-memory rate limiter using sliding window.
#[derive(Clone, Debug)]
pub struct RateLimiter {
    max_requests: u32,
    window: Duration,
    requests: Arc<Mutex<HashMap<IpAddr, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            requests: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Returns true if allowed, false if rate limited.
    pub fn check(&self, ip: IpAddr) -> bool {
        let now = Instant::now();
        let cutoff = now.checked_sub(self.window);

        let mut requests = match self.requests.lock() {
            Ok(requests) => requests,
            Err(poisoned) => poisoned.into_inner(),
        };

        // Drop idle clients while we hold the lock anyway.
        requests.retain(|_, timestamps| {
            timestamps.retain(|&t| cutoff.map_or(true, |c| t > c));
            !timestamps.is_empty()
        });

        let entry = requests.entry(ip).or_default();
        if entry.len() < self.max_requests as usize {
            entry.push(now);
            true
        } else {
            false
        }
    }
}

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Guard for scheduler routes: bearer token must equal the sync secret.
pub async fn require_sync_secret(
    State(config): State<SecurityConfig>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = config.sync_secret.as_deref() else {
        tracing::warn!("Sync secret not configured, rejecting scheduler request");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match bearer_token(&request) {
        Some(token) if token == expected => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!("Invalid sync secret provided");
            Err(StatusCode::UNAUTHORIZED)
        }
        None => {
            tracing::warn!("Missing or malformed Authorization header");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Guard for user routes: verifies the bearer token and attaches the caller
/// as a [`VerifiedUser`] extension.
pub async fn verify_identity(
    State(verifier): State<Arc<dyn IdentityVerifier>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(token) = bearer_token(&request) else {
        tracing::warn!("Missing or malformed Authorization header");
        return Err(StatusCode::UNAUTHORIZED);
    };

    match verifier.verify(token).await {
        Ok(uid) => {
            request.extensions_mut().insert(VerifiedUser { uid });
            Ok(next.run(request).await)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Identity verification failed");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

pub async fn rate_limit_middleware(
    State(rate_limiter): State<RateLimiter>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = extract_client_ip(&request);

    if rate_limiter.check(ip) {
        Ok(next.run(request).await)
    } else {
        tracing::warn!("Rate limit exceeded for IP: {}", ip);
        Err(StatusCode::TOO_MANY_REQUESTS)
    }
}

fn extract_client_ip(request: &Request<Body>) -> IpAddr {
    if let Some(forwarded) = request.headers().get("X-Forwarded-For") {
        if let Ok(value) = forwarded.to_str() {
            if let Some(ip_str) = value.split(',').next() {
                if let Ok(ip) = ip_str.trim().parse() {
                    return ip;
                }
            }
        }
    }

    if let Some(real_ip) = request.headers().get("X-Real-IP") {
        if let Ok(value) = real_ip.to_str() {
            if let Ok(ip) = value.trim().parse() {
                return ip;
            }
        }
    }

    IpAddr::V4(Ipv4Addr::LOCALHOST)
}
