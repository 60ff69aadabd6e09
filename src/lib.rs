//! Awards Vote Backend
//!
//! REST backend and client SDK for a community awards voting application:
//! level-based account administration backed by an external OAuth identity
//! provider, a category/theme registry, and a client-side state cache that
//! only ever reflects server-confirmed results.

pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod identity;
pub mod models;
pub mod session;

use std::sync::Arc;

use axum::{
    routing::{delete, get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;
use identity::IdentityVerifier;
use session::SessionStore;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub sessions: SessionStore,
    pub identity: Arc<IdentityVerifier>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Users
        .route("/me", get(api::get_me))
        .route("/users", get(api::list_users))
        .route("/user", post(api::create_user))
        .route("/user/deleteaccount", post(api::self_deregister))
        .route("/user/{external_id}", delete(api::delete_user))
        // Categories
        .route("/categories", get(api::list_categories))
        .route("/categories/{group}", get(api::list_voting_categories))
        .route("/category", post(api::create_category))
        .route("/category/{id}", patch(api::update_category))
        .route("/category/{id}", delete(api::delete_category))
        // Themes
        .route("/themes", get(api::list_themes))
        .route("/themes/create", post(api::create_theme))
        .route("/themes/delete/{type}", delete(api::delete_themes));

    // Session routes
    let auth_routes = Router::new()
        .route("/session", post(api::create_session))
        .route("/session", delete(api::destroy_session));

    // Health check (no auth required)
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .nest("/auth", auth_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
