// src/handlers/payroll.rs

use crate::{
    errors::AppResult,
    models::{
        BatchStatus, GenerateBatchRequest, PayrollBatch, PayrollBatchDetail, PayrollRecord,
        RecalculationRequestBody, TransitionRequest, UpdatePayrollRecordRequest,
    },
    services::batch,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

#[derive(Debug, Deserialize, IntoParams)]
pub struct BatchFilter {
    /// Month in YYYY-MM format
    pub month: Option<String>,
}

/// Generate a payroll batch for a department scope and month.
/// Every active employee in scope is settled in its own transaction;
/// employees with no attendance summary are excluded with a reason.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches",
    request_body = GenerateBatchRequest,
    responses(
        (status = 201, description = "Batch generated", body = PayrollBatchDetail),
        (status = 409, description = "A batch already covers this scope and month"),
        (status = 422, description = "No deduction policy in force"),
    ),
    tag = "Payroll"
)]
pub async fn generate_batch(
    State(state): State<AppState>,
    Json(body): Json<GenerateBatchRequest>,
) -> AppResult<(StatusCode, Json<PayrollBatchDetail>)> {
    let detail = batch::generate(&state, &body).await?;
    Ok((StatusCode::CREATED, Json(detail)))
}

/// List payroll batches, optionally for one month
#[utoipa::path(
    get,
    path = "/api/v1/payroll/batches",
    params(BatchFilter),
    responses(
        (status = 200, description = "Payroll batches", body = [PayrollBatch]),
    ),
    tag = "Payroll"
)]
pub async fn list_batches(
    State(state): State<AppState>,
    Query(filter): Query<BatchFilter>,
) -> AppResult<Json<Vec<PayrollBatch>>> {
    Ok(Json(batch::list(&state.db, filter.month).await?))
}

/// Get a batch with all its per-employee records
#[utoipa::path(
    get,
    path = "/api/v1/payroll/batches/{id}",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch detail", body = PayrollBatchDetail),
        (status = 404, description = "Not found"),
    ),
    tag = "Payroll"
)]
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PayrollBatchDetail>> {
    Ok(Json(batch::get_detail(&state.db, id).await?))
}

/// Approve a pending batch
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches/{id}/approve",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Batch approved", body = PayrollBatch),
        (status = 409, description = "Not pending"),
    ),
    tag = "Payroll"
)]
pub async fn approve_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<PayrollBatch>> {
    Ok(Json(
        batch::transition(&state.db, id, BatchStatus::Approved, &body).await?,
    ))
}

/// Freeze an approved batch. Frozen records are immutable.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches/{id}/freeze",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Batch frozen", body = PayrollBatch),
        (status = 409, description = "Not approved"),
    ),
    tag = "Payroll"
)]
pub async fn freeze_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<PayrollBatch>> {
    Ok(Json(
        batch::transition(&state.db, id, BatchStatus::Freeze, &body).await?,
    ))
}

/// Mark a frozen batch complete (disbursed)
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches/{id}/complete",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Batch complete", body = PayrollBatch),
        (status = 409, description = "Not frozen"),
    ),
    tag = "Payroll"
)]
pub async fn complete_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<TransitionRequest>,
) -> AppResult<Json<PayrollBatch>> {
    Ok(Json(
        batch::transition(&state.db, id, BatchStatus::Complete, &body).await?,
    ))
}

/// Flag a batch for recomputation (pre-freeze only)
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches/{id}/recalculation",
    params(("id" = Uuid, Path, description = "Batch id")),
    request_body = RecalculationRequestBody,
    responses(
        (status = 200, description = "Recalculation requested", body = PayrollBatch),
        (status = 409, description = "Batch is frozen"),
    ),
    tag = "Payroll"
)]
pub async fn request_batch_recalculation(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<RecalculationRequestBody>,
) -> AppResult<Json<PayrollBatch>> {
    Ok(Json(
        batch::request_recalculation(&state.db, id, &body).await?,
    ))
}

/// Recompute a flagged batch. Already-journaled arrears settlements and
/// loan recoveries are reused, never applied twice.
#[utoipa::path(
    post,
    path = "/api/v1/payroll/batches/{id}/recalculate",
    params(("id" = Uuid, Path, description = "Batch id")),
    responses(
        (status = 200, description = "Batch recomputed", body = PayrollBatchDetail),
        (status = 400, description = "No recalculation was requested"),
        (status = 409, description = "Batch is frozen"),
    ),
    tag = "Payroll"
)]
pub async fn recalculate_batch(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<PayrollBatchDetail>> {
    Ok(Json(batch::recalculate(&state, id).await?))
}

/// Edit a record's remarks or manual deduction lines (pre-freeze only)
#[utoipa::path(
    patch,
    path = "/api/v1/payroll/records/{id}",
    params(("id" = Uuid, Path, description = "Record id")),
    request_body = UpdatePayrollRecordRequest,
    responses(
        (status = 200, description = "Record updated, totals refreshed", body = PayrollRecord),
        (status = 409, description = "Batch is frozen"),
    ),
    tag = "Payroll"
)]
pub async fn update_record(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdatePayrollRecordRequest>,
) -> AppResult<Json<PayrollRecord>> {
    Ok(Json(batch::update_record(&state.db, id, &body).await?))
}
