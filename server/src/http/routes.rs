//! Router configuration.
//!
//! ```text
//! /health, /ready, /metrics        public
//! /api/auth/{register,login}       public
//! /api/profile                     student, admin
//! /api/users, /api/users/:id       admin
//! ```

use super::health::{health_check, metrics, readiness_check};
use super::state::AppState;
use crate::api::{auth, users};
use axum::{
    Router,
    http::Method,
    middleware::from_fn,
    routing::{get, post},
};
use portal_core::{Role, RoleSet};
use portal_web::{correlate, protect};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Build the complete application router.
pub fn build_router(state: AppState) -> Router {
    let authority = Arc::clone(&state.authority);

    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login));

    let profile = protect(
        Router::new().route("/profile", get(users::get_profile).put(users::update_profile)),
        Arc::clone(&authority),
        RoleSet::new([Role::Student, Role::Admin]),
    );

    let admin = protect(
        Router::new()
            .route("/users", get(users::list_users))
            .route(
                "/users/:id",
                get(users::get_user)
                    .put(users::update_user)
                    .delete(users::delete_user),
            ),
        authority,
        RoleSet::new([Role::Admin]),
    );

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(metrics))
        .nest("/api", public.merge(profile).merge(admin))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(from_fn(correlate))
        .with_state(state)
}
