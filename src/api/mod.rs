mod handlers;
pub mod identity;
pub mod middleware;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};

pub use handlers::{SyncResponse, TriggerResponse};
pub use identity::{IdentityVerifier, StaticIdentityVerifier, Unauthorized, VerifiedUser};
pub use middleware::{RateLimiter, SecurityConfig};

use crate::sync::{FanOut, SyncExecutor};

/// Everything a request handler needs, constructed once at startup.
#[derive(Clone)]
pub struct AppState {
    pub executor: Arc<SyncExecutor>,
    pub fanout: Arc<FanOut>,
    pub identity: Arc<dyn IdentityVerifier>,
    pub security: SecurityConfig,
}

pub fn create_router(state: AppState) -> Router {
    let mut user_routes = Router::new()
        .route("/sync", post(handlers::sync_self))
        .route_layer(from_fn_with_state(
            state.identity.clone(),
            middleware::verify_identity,
        ));
    if let Some(limiter) = state.security.rate_limiter.clone() {
        user_routes =
            user_routes.route_layer(from_fn_with_state(limiter, middleware::rate_limit_middleware));
    }

    let scheduler_routes = Router::new()
        .route("/sync/all", post(handlers::sync_all))
        .route("/internal/sync/{uid}", post(handlers::sync_user))
        .route_layer(from_fn_with_state(
            state.security.clone(),
            middleware::require_sync_secret,
        ));

    let api = Router::new()
        .route("/health", get(handlers::health))
        .merge(user_routes)
        .merge(scheduler_routes);

    Router::new()
        .nest("/api/v1", api)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&state.security))
        .with_state(state)
}

fn cors_layer(security: &SecurityConfig) -> CorsLayer {
    match &security.cors_origins {
        Some(origins) => {
            let origins: Vec<HeaderValue> = origins
                .iter()
                .filter_map(|o| match HeaderValue::from_str(o) {
                    Ok(value) => Some(value),
                    Err(_) => {
                        tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            CorsLayer::new()
                .allow_origin(AllowOrigin::list(origins))
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        }
        None => CorsLayer::permissive(),
    }
}
