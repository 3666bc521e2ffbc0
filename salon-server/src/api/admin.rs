//! Admin cookie endpoints
//!
//! `/api/dont-visit` is a toggle: visiting it without a valid admin cookie
//! grants one, visiting it with one revokes it. Either way it answers with
//! the same unremarkable body.

use axum::{
    extract::State,
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::info;

use super::credentials::{admin_cookie, AdminToken, ADMIN_COOKIE_MAX_AGE};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct DecoyResponse {
    pub message: String,
    pub timestamp: String,
}

/// GET /api/check-admin
pub async fn check_admin(
    State(state): State<AppState>,
    admin: AdminToken,
) -> Json<serde_json::Value> {
    let is_admin = state.policy.is_admin(&admin.credential(None));
    Json(json!({ "isAdmin": is_admin }))
}

/// GET /api/dont-visit
pub async fn dont_visit(State(state): State<AppState>, admin: AdminToken) -> impl IntoResponse {
    let cookie = if state.policy.is_admin(&admin.credential(None)) {
        info!("Admin cookie revoked");
        admin_cookie("", 0, state.secure_cookies)
    } else {
        info!("Admin cookie granted");
        admin_cookie(state.admin_secret(), ADMIN_COOKIE_MAX_AGE, state.secure_cookies)
    };

    (
        [(header::SET_COOKIE, cookie)],
        Json(DecoyResponse {
            message: "Nothing to see here...".to_string(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        }),
    )
}
