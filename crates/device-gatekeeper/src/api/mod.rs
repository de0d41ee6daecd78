//! HTTP API for the gatekeeper.

mod handlers;
mod middleware;
mod types;
mod views;

pub use handlers::*;
pub use middleware::{logging_middleware, rate_limit_middleware, RateLimitState};
pub use types::*;
pub use views::{dashboard, delete_user_form, view_pending_users, view_users};

use crate::auth::AdminAuthorizer;
use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use registration_store::RegistrationStore;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Pending and registered devices
    pub store: Arc<RegistrationStore>,
    /// Admin credential check for destructive actions
    pub authorizer: Arc<dyn AdminAuthorizer>,
}

impl AppState {
    /// Create new application state.
    pub fn new(store: RegistrationStore, authorizer: Arc<dyn AdminAuthorizer>) -> Self {
        Self {
            store: Arc::new(store),
            authorizer,
        }
    }
}

/// Create the API router with the default rate limit.
pub fn create_router(state: AppState) -> Router {
    create_router_with_rate_limit(state, RateLimitState::new(120))
}

/// Create the API router with custom rate limiting.
pub fn create_router_with_rate_limit(state: AppState, rate_limit: RateLimitState) -> Router {
    let limited: Router<AppState> = Router::new()
        // Admin views
        .route("/", get(views::dashboard))
        .route("/view_users", get(views::view_users))
        .route("/view_pending_users", get(views::view_pending_users))
        .route("/delete_user_form", get(views::delete_user_form))
        // Client endpoints
        .route("/register", post(handlers::register))
        .route("/verify", post(handlers::verify))
        // Admin actions
        .route("/approve_user", post(handlers::approve_user))
        .route("/reject_user", post(handlers::reject_user))
        .route("/unregister_user", post(handlers::unregister_user))
        .route("/delete_user", post(handlers::delete_user))
        .layer(axum_middleware::from_fn_with_state(
            rate_limit,
            rate_limit_middleware,
        ));

    Router::new()
        // Health check (no rate limiting)
        .route("/health", get(handlers::health))
        .merge(limited)
        .layer(axum_middleware::from_fn(logging_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
