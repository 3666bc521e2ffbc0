//! Concert endpoints
//!
//! Reads are open to everyone. Passcodes are only included in responses for
//! admins. Creating and freezing concerts is admin-only; other edits accept
//! the concert passcode.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use salon_common::api::{Action, ApiResponse, Resource};
use salon_common::db::{Concert, ConcertChanges, Performance, PerformanceDraft};
use tracing::info;

use super::credentials::{require_concert, AdminToken};
use super::error::{ApiError, ApiJson, ApiResult};
use crate::{db, AppState};

/// Concert as returned to clients
#[derive(Debug, Serialize)]
pub struct ConcertView {
    pub id: String,
    pub date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passcode: Option<String>,
    pub frozen: bool,
    pub performances: Vec<Performance>,
}

impl ConcertView {
    pub fn new(concert: Concert, show_passcode: bool) -> Self {
        Self {
            id: concert.id,
            date: concert.date,
            passcode: show_passcode.then_some(concert.passcode),
            frozen: concert.frozen,
            performances: concert.performances,
        }
    }
}

fn shows_passcode(state: &AppState, admin: &AdminToken) -> bool {
    state
        .policy
        .authorize(Action::ViewPasscode, &Resource::Site, &admin.credential(None))
}

#[derive(Debug, Deserialize)]
pub struct CreateConcertRequest {
    pub date: DateTime<Utc>,
    pub passcode: String,
    /// Initial program, in order
    #[serde(default, alias = "performances")]
    pub seed: Vec<PerformanceDraft>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateConcertRequest {
    /// Current passcode (credential)
    pub passcode: Option<String>,
    pub date: Option<DateTime<Utc>>,
    #[serde(alias = "newPasscode")]
    pub new_passcode: Option<String>,
    pub frozen: Option<bool>,
}

/// Body carrying only a passcode
#[derive(Debug, Default, Deserialize)]
pub struct PasscodeBody {
    pub passcode: Option<String>,
}

/// GET /api/concerts
pub async fn list_concerts(
    State(state): State<AppState>,
    admin: AdminToken,
) -> ApiResult<Json<Vec<ConcertView>>> {
    let show_passcode = shows_passcode(&state, &admin);
    let concerts = db::list_concerts(&state.db).await?;
    Ok(Json(
        concerts
            .into_iter()
            .map(|c| ConcertView::new(c, show_passcode))
            .collect(),
    ))
}

/// GET /api/concerts/latest
///
/// `null` when there are no concerts.
pub async fn latest_concert(
    State(state): State<AppState>,
    admin: AdminToken,
) -> ApiResult<Json<Option<ConcertView>>> {
    let show_passcode = shows_passcode(&state, &admin);
    let latest = db::latest_concert(&state.db).await?;
    Ok(Json(latest.map(|c| ConcertView::new(c, show_passcode))))
}

/// GET /api/concerts/:id
pub async fn get_concert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
) -> ApiResult<Json<ConcertView>> {
    let show_passcode = shows_passcode(&state, &admin);
    let concert = db::get_concert(&state.db, &id).await?;
    Ok(Json(ConcertView::new(concert, show_passcode)))
}

/// POST /api/concerts
pub async fn create_concert(
    State(state): State<AppState>,
    admin: AdminToken,
    ApiJson(request): ApiJson<CreateConcertRequest>,
) -> ApiResult<Json<ApiResponse<ConcertView>>> {
    if !state
        .policy
        .authorize(Action::CreateConcert, &Resource::Site, &admin.credential(None))
    {
        return Err(ApiError::forbidden("Admin access required"));
    }
    if request.passcode.trim().is_empty() {
        return Err(ApiError::invalid("Passcode must not be empty"));
    }

    let concert =
        db::create_concert(&state.db, request.date, &request.passcode, &request.seed).await?;
    Ok(Json(ApiResponse::ok(ConcertView::new(concert, true))))
}

/// PATCH /api/concerts/:id
///
/// Date and passcode changes need the passcode or admin; `frozen` needs admin.
pub async fn update_concert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
    ApiJson(request): ApiJson<UpdateConcertRequest>,
) -> ApiResult<Json<ApiResponse<ConcertView>>> {
    let concert = db::get_concert(&state.db, &id).await?;
    let credential = admin.credential(request.passcode);

    let changes = ConcertChanges {
        date: request.date,
        passcode: request.new_passcode,
        frozen: request.frozen,
    };
    if changes.date.is_none() && changes.passcode.is_none() && changes.frozen.is_none() {
        return Err(ApiError::invalid("No fields to update"));
    }
    if changes.passcode.as_deref().is_some_and(|p| p.trim().is_empty()) {
        return Err(ApiError::invalid("Passcode must not be empty"));
    }

    if changes.date.is_some() || changes.passcode.is_some() {
        require_concert(&state, Action::EditConcert, &concert, &credential)?;
    }
    if changes.frozen.is_some() {
        require_concert(&state, Action::FreezeConcert, &concert, &credential)?;
    }

    let updated = db::update_concert(&state.db, &id, &changes).await?;
    if let Some(frozen) = changes.frozen {
        info!("Concert {} {}", id, if frozen { "frozen" } else { "unfrozen" });
    }

    let show_passcode = state.policy.is_admin(&credential);
    Ok(Json(ApiResponse::ok(ConcertView::new(updated, show_passcode))))
}

/// DELETE /api/concerts/:id
pub async fn delete_concert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
    body: Option<ApiJson<PasscodeBody>>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    let concert = db::get_concert(&state.db, &id).await?;
    require_concert(
        &state,
        Action::DeleteConcert,
        &concert,
        &admin.credential(body.passcode),
    )?;

    db::delete_concert(&state.db, &id).await?;
    Ok(Json(ApiResponse::ok(true)))
}

/// POST /api/concerts/:id/rebalance
///
/// Respaces every order key in the program evenly. Clients call this after a
/// move answered with `needs_rebalance`, then retry the move.
pub async fn rebalance_concert(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
    body: Option<ApiJson<PasscodeBody>>,
) -> ApiResult<Json<ApiResponse<Vec<Performance>>>> {
    let body = body.map(|ApiJson(body)| body).unwrap_or_default();
    let concert = db::get_concert(&state.db, &id).await?;
    require_concert(
        &state,
        Action::EditPerformances,
        &concert,
        &admin.credential(body.passcode),
    )?;

    let program = db::rebalance_concert(&state.db, &id).await?;
    Ok(Json(ApiResponse::ok(program)))
}
