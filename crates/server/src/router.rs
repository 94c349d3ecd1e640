//! HTTP routes for the profile service.
//!
//! The /customer-profile resource sits behind the auth middleware; media
//! serving and the health check are public.

use axum::{extract::DefaultBodyLimit, middleware, routing::get, Router};

use crate::auth::middleware::mw_require_auth;
use crate::config::AppState;
use crate::media::serve_media;
use crate::profile::handlers;

pub fn router(state: AppState) -> Router {
    Router::new()
        // Profile resource (auth required)
        .route(
            "/customer-profile",
            get(handlers::show)
                .post(handlers::store)
                .put(handlers::update)
                .delete(handlers::destroy),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            mw_require_auth,
        ))
        // Public media
        .route("/storage/{*path}", get(serve_media))
        // Health check
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(state.config.body_limit()))
        .with_state(state)
}

async fn health_check() -> &'static str {
    "OK - Customer Profile Server"
}
