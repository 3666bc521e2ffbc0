//! salon-server library
//!
//! HTTP service for concert programs: concert and performance CRUD,
//! drag-and-drop reordering via order keys, and the admin cookie toggle.

use axum::Router;
use salon_common::api::{Policy, SharedSecretPolicy};
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// The process-wide database pool
    pub db: SqlitePool,
    /// Authorization policy consulted by every mutating handler
    pub policy: Arc<dyn Policy>,
    /// Mark the admin cookie `Secure`
    pub secure_cookies: bool,
    admin_secret: Arc<str>,
}

impl AppState {
    /// State backed by [`SharedSecretPolicy`] with the given admin secret
    pub fn new(db: SqlitePool, admin_secret: &str, secure_cookies: bool) -> Self {
        Self {
            db,
            policy: Arc::new(SharedSecretPolicy::new(admin_secret)),
            secure_cookies,
            admin_secret: Arc::from(admin_secret),
        }
    }

    /// Value handed out in the admin cookie
    pub fn admin_secret(&self) -> &str {
        &self.admin_secret
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    let concerts = Router::new()
        .route(
            "/api/concerts",
            get(api::list_concerts).post(api::create_concert),
        )
        .route("/api/concerts/latest", get(api::latest_concert))
        .route(
            "/api/concerts/:id",
            get(api::get_concert)
                .patch(api::update_concert)
                .delete(api::delete_concert),
        )
        .route("/api/concerts/:id/rebalance", post(api::rebalance_concert));

    let performances = Router::new()
        .route(
            "/api/performances",
            post(api::create_performance).delete(api::delete_performance),
        )
        .route(
            "/api/performances/:id",
            get(api::get_performance).patch(api::update_performance),
        )
        .route("/api/performances/:id/move", post(api::move_performance));

    let admin = Router::new()
        .route("/api/check-admin", get(api::check_admin))
        .route("/api/dont-visit", get(api::dont_visit));

    let public = Router::new()
        .route("/", get(api::serve_index))
        .route("/api/buildinfo", get(api::get_build_info))
        .merge(api::health_routes());

    Router::new()
        .merge(concerts)
        .merge(performances)
        .merge(admin)
        .merge(public)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
