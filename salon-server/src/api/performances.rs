//! Performance endpoints
//!
//! Every mutation needs the concert passcode or the admin cookie, and is
//! refused on frozen concerts unless the caller is admin.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use salon_common::api::{Action, ApiResponse};
use salon_common::db::{Performance, PerformanceChanges, PerformanceDraft};
use salon_common::Program;
use tracing::info;

use super::credentials::{require_concert, AdminToken};
use super::error::{ApiError, ApiJson, ApiResult};
use crate::db::{self, SqliteKeyStore};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreatePerformanceRequest {
    #[serde(alias = "concertId")]
    pub concert_id: String,
    pub passcode: Option<String>,
    #[serde(flatten)]
    pub draft: PerformanceDraft,
}

#[derive(Debug, Deserialize)]
pub struct DeletePerformanceRequest {
    pub id: String,
    #[serde(alias = "concertId")]
    pub concert_id: String,
    pub passcode: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePerformanceRequest {
    pub passcode: Option<String>,
    #[serde(flatten)]
    pub changes: PerformanceChanges,
}

#[derive(Debug, Deserialize)]
pub struct MovePerformanceRequest {
    pub passcode: Option<String>,
    /// Target index in display order, counted after removing the item
    #[serde(alias = "toIndex")]
    pub to_index: usize,
}

#[derive(Debug, Serialize)]
pub struct MovePerformanceResponse {
    /// False when the item was already at the target index
    pub moved: bool,
    pub order_key: String,
    pub performances: Vec<Performance>,
}

/// GET /api/performances/:id
pub async fn get_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Performance>> {
    Ok(Json(db::get_performance(&state.db, &id).await?))
}

/// POST /api/performances
///
/// Appends to the end of the concert's program.
pub async fn create_performance(
    State(state): State<AppState>,
    admin: AdminToken,
    ApiJson(request): ApiJson<CreatePerformanceRequest>,
) -> ApiResult<Json<ApiResponse<Performance>>> {
    if request.draft.title.trim().is_empty() {
        return Err(ApiError::invalid("Title must not be empty"));
    }

    let concert = db::get_concert(&state.db, &request.concert_id).await?;
    require_concert(
        &state,
        Action::EditPerformances,
        &concert,
        &admin.credential(request.passcode),
    )?;

    let performance = db::create_performance(&state.db, &concert.id, &request.draft).await?;
    Ok(Json(ApiResponse::ok(performance)))
}

/// DELETE /api/performances
pub async fn delete_performance(
    State(state): State<AppState>,
    admin: AdminToken,
    ApiJson(request): ApiJson<DeletePerformanceRequest>,
) -> ApiResult<Json<ApiResponse<bool>>> {
    let concert = db::get_concert(&state.db, &request.concert_id).await?;
    require_concert(
        &state,
        Action::EditPerformances,
        &concert,
        &admin.credential(request.passcode),
    )?;

    db::delete_performance(&state.db, &request.id, &concert.id).await?;
    info!("Deleted performance {} from concert {}", request.id, concert.id);
    Ok(Json(ApiResponse::ok(true)))
}

/// PATCH /api/performances/:id
pub async fn update_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
    ApiJson(request): ApiJson<UpdatePerformanceRequest>,
) -> ApiResult<Json<ApiResponse<Performance>>> {
    if request.changes.is_empty() {
        return Err(ApiError::invalid("No fields to update"));
    }

    let performance = db::get_performance(&state.db, &id).await?;
    let concert = db::get_concert(&state.db, &performance.concert_id).await?;
    require_concert(
        &state,
        Action::EditPerformances,
        &concert,
        &admin.credential(request.passcode),
    )?;

    let updated = db::update_performance(&state.db, &id, &request.changes).await?;
    Ok(Json(ApiResponse::ok(updated)))
}

/// POST /api/performances/:id/move
///
/// Assigns the performance a key between its new neighbours and persists
/// only that key. Answers 409 with `needs_rebalance` when no key fits.
pub async fn move_performance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    admin: AdminToken,
    ApiJson(request): ApiJson<MovePerformanceRequest>,
) -> ApiResult<Json<ApiResponse<MovePerformanceResponse>>> {
    let performance = db::get_performance(&state.db, &id).await?;
    let concert = db::get_concert(&state.db, &performance.concert_id).await?;
    require_concert(
        &state,
        Action::EditPerformances,
        &concert,
        &admin.credential(request.passcode),
    )?;

    let mut program = Program::new(concert.id, concert.performances);
    let store = SqliteKeyStore::new(state.db.clone());
    let command = program
        .move_performance(&id, request.to_index, &store)
        .await?;

    let order_key = match &command {
        Some(command) => {
            info!(
                "Moved performance {} in concert {} from {} to {} ({} -> {})",
                id,
                program.concert_id(),
                command.from,
                command.to,
                command.previous_key,
                command.new_key
            );
            command.new_key.canonical()
        }
        None => performance.order_key.raw(),
    };

    Ok(Json(ApiResponse::ok(MovePerformanceResponse {
        moved: command.is_some(),
        order_key,
        performances: program.into_items(),
    })))
}
