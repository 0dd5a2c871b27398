// src/handlers/bonus.rs

use crate::{
    errors::AppResult,
    models::{
        BonusBatch, BonusBatchDetail, BonusBatchStatus, BonusRecord, CreateBonusBatchRequest,
        RecalculationRequestBody, UpdateBonusRecordRequest,
    },
    services::bonus,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use uuid::Uuid;

/// Generate a tiered attendance bonus batch over a month range
#[utoipa::path(
    post,
    path = "/api/v1/bonus/batches",
    request_body = CreateBonusBatchRequest,
    responses(
        (status = 201, description = "Bonus batch generated", body = BonusBatch),
        (status = 422, description = "Overlapping or malformed policy tiers"),
    ),
    tag = "Bonus"
)]
pub async fn generate_bonus_batch(
    State(state): State<AppState>,
    Json(body): Json<CreateBonusBatchRequest>,
) -> AppResult<(StatusCode, Json<BonusBatch>)> {
    let batch = bonus::generate_batch(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

/// List bonus batches
#[utoipa::path(
    get,
    path = "/api/v1/bonus/batches",
    responses(
        (status = 200, description = "Bonus batches", body = [BonusBatch]),
    ),
    tag = "Bonus"
)]
pub async fn list_bonus_batches(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BonusBatch>>> {
    Ok(Json(bonus::list_batches(&state.db).await?))
}

/// Get a bonus batch with all its records
#[utoipa::path(
    get,
    path = "/api/v1/bonus/batches/{id}",
    params(("id" = Uuid, Path, description = "Bonus batch id")),
    responses(
        (status = 200, description = "Bonus batch detail", body = BonusBatchDetail),
        (status = 404, description = "Not found"),
    ),
    tag = "Bonus"
)]
pub async fn get_bonus_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BonusBatchDetail>> {
    Ok(Json(bonus::get_detail(&state.db, id).await?))
}

/// Approve a pending bonus batch
#[utoipa::path(
    post,
    path = "/api/v1/bonus/batches/{id}/approve",
    params(("id" = Uuid, Path, description = "Bonus batch id")),
    responses(
        (status = 200, description = "Bonus batch approved", body = BonusBatch),
        (status = 409, description = "Not pending"),
    ),
    tag = "Bonus"
)]
pub async fn approve_bonus_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BonusBatch>> {
    Ok(Json(
        bonus::transition(&state.db, id, BonusBatchStatus::Approved).await?,
    ))
}

/// Freeze an approved bonus batch; final bonuses become immutable
#[utoipa::path(
    post,
    path = "/api/v1/bonus/batches/{id}/freeze",
    params(("id" = Uuid, Path, description = "Bonus batch id")),
    responses(
        (status = 200, description = "Bonus batch frozen", body = BonusBatch),
        (status = 409, description = "Not approved"),
    ),
    tag = "Bonus"
)]
pub async fn freeze_bonus_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BonusBatch>> {
    Ok(Json(
        bonus::transition(&state.db, id, BonusBatchStatus::Frozen).await?,
    ))
}

/// Override a record's final bonus or remarks (pre-freeze only)
#[utoipa::path(
    patch,
    path = "/api/v1/bonus/records/{id}",
    params(("id" = Uuid, Path, description = "Bonus record id")),
    request_body = UpdateBonusRecordRequest,
    responses(
        (status = 200, description = "Record updated, totals refreshed", body = BonusRecord),
        (status = 409, description = "Batch is frozen"),
    ),
    tag = "Bonus"
)]
pub async fn update_bonus_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBonusRecordRequest>,
) -> AppResult<Json<BonusRecord>> {
    Ok(Json(bonus::update_record(&state.db, id, &body).await?))
}

/// Flag a bonus batch for recomputation (pre-freeze only)
#[utoipa::path(
    post,
    path = "/api/v1/bonus/batches/{id}/recalculation",
    params(("id" = Uuid, Path, description = "Bonus batch id")),
    request_body = RecalculationRequestBody,
    responses(
        (status = 200, description = "Recalculation requested", body = BonusBatch),
        (status = 409, description = "Batch is frozen"),
    ),
    tag = "Bonus"
)]
pub async fn request_bonus_recalculation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RecalculationRequestBody>,
) -> AppResult<Json<BonusBatch>> {
    Ok(Json(
        bonus::request_recalculation(&state.db, id, body.requested_by, &body.reason).await?,
    ))
}

/// Recompute a flagged bonus batch from current attendance and policy
#[utoipa::path(
    post,
    path = "/api/v1/bonus/batches/{id}/recalculate",
    params(("id" = Uuid, Path, description = "Bonus batch id")),
    responses(
        (status = 200, description = "Bonus batch recomputed", body = BonusBatch),
        (status = 409, description = "No actionable request or batch is frozen"),
    ),
    tag = "Bonus"
)]
pub async fn recalculate_bonus_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BonusBatch>> {
    Ok(Json(bonus::recalculate(&state, id).await?))
}
