//! # ktp_api
//!
//! HTTP API library for KTP.

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{delete, get, patch, post};
use ktp_core::auth::service::AuthService;
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::handlers::{admin, auth, health, profile};
use crate::middleware::auth::{protect, require_admin, require_staff};

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Auth core and account operations.
    pub auth: Arc<AuthService>,
    /// API configuration.
    pub config: ApiConfig,
    /// PostgreSQL pool, when the stores are database-backed. Only used for
    /// health reporting.
    pub pool: Option<PgPool>,
}

/// Builds the Axum router with all routes and shared state.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Public routes (no auth required)
    let public = Router::new()
        .route(routes::GET_HEALTHZ, get(health::healthz))
        .route(routes::POST_AUTH_SIGNUP, post(auth::signup_handler))
        .route(routes::POST_AUTH_LOGIN, post(auth::login_handler))
        .route(routes::POST_AUTH_REFRESH, post(auth::refresh_handler))
        .route(routes::POST_AUTH_LOGOUT, post(auth::logout_handler))
        .route(
            routes::POST_AUTH_FORGOT_PASSWORD,
            post(auth::forgot_password_handler),
        )
        .route(
            routes::POST_AUTH_RESET_PASSWORD_TOKEN,
            post(auth::reset_password_handler),
        );

    // Admin and moderator
    let staff = Router::new()
        .route(routes::GET_ADMIN_USERS, get(admin::list_users_handler))
        .route(routes::GET_ADMIN_STATS, get(admin::stats_handler))
        .route_layer(axum::middleware::from_fn(require_staff));

    // Admin only
    let admins = Router::new()
        .route(
            routes::PATCH_ADMIN_USERS_ID_ROLE,
            patch(admin::change_role_handler),
        )
        .route(
            routes::DELETE_ADMIN_USERS_ID,
            delete(admin::delete_user_handler),
        )
        .route_layer(axum::middleware::from_fn(require_admin));

    // Protected routes (require auth)
    let protected = Router::new()
        .route(
            routes::PROFILE,
            get(profile::get_profile_handler).put(profile::update_profile_handler),
        )
        .merge(staff)
        .merge(admins)
        .route_layer(axum::middleware::from_fn_with_state(state.clone(), protect));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
