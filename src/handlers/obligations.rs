// src/handlers/obligations.rs
//
// Arrears requests (multi-month back pay with an approval chain) and
// loan/salary-advance obligations. Balances only ever move inside a
// payroll run; these endpoints manage the workflow around them.

use crate::{
    errors::AppResult,
    models::{ArrearsRequest, CreateArrearsRequest, CreateLoanAdvanceRequest, LoanAdvance},
    services::{arrears, loans},
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
pub struct EmployeeFilter {
    pub employee_id: Option<Uuid>,
}

/// Raise an arrears request (starts in draft)
#[utoipa::path(
    post,
    path = "/api/v1/arrears",
    request_body = CreateArrearsRequest,
    responses(
        (status = 201, description = "Arrears request created", body = ArrearsRequest),
        (status = 400, description = "Malformed months or non-positive amount"),
    ),
    tag = "Arrears"
)]
pub async fn create_arrears(
    State(state): State<AppState>,
    Json(body): Json<CreateArrearsRequest>,
) -> AppResult<(StatusCode, Json<ArrearsRequest>)> {
    let request = arrears::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// List arrears requests, optionally for one employee
#[utoipa::path(
    get,
    path = "/api/v1/arrears",
    params(EmployeeFilter),
    responses(
        (status = 200, description = "Arrears requests", body = [ArrearsRequest]),
    ),
    tag = "Arrears"
)]
pub async fn list_arrears(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<Vec<ArrearsRequest>>> {
    let requests = arrears::list(&state.db, filter.employee_id).await?;
    Ok(Json(requests))
}

/// Get one arrears request
#[utoipa::path(
    get,
    path = "/api/v1/arrears/{id}",
    params(("id" = Uuid, Path, description = "Arrears request id")),
    responses(
        (status = 200, description = "Arrears request", body = ArrearsRequest),
        (status = 404, description = "Not found"),
    ),
    tag = "Arrears"
)]
pub async fn get_arrears(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArrearsRequest>> {
    Ok(Json(arrears::get(&state.db, id).await?))
}

/// Submit a draft request into the approval chain
#[utoipa::path(
    post,
    path = "/api/v1/arrears/{id}/submit",
    params(("id" = Uuid, Path, description = "Arrears request id")),
    responses(
        (status = 200, description = "Now pending HOD approval", body = ArrearsRequest),
        (status = 409, description = "Not in draft"),
    ),
    tag = "Arrears"
)]
pub async fn submit_arrears(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArrearsRequest>> {
    Ok(Json(arrears::submit(&state.db, id).await?))
}

/// Advance the current approval gate (HOD → HR → Admin → approved)
#[utoipa::path(
    post,
    path = "/api/v1/arrears/{id}/approve",
    params(("id" = Uuid, Path, description = "Arrears request id")),
    responses(
        (status = 200, description = "Advanced one gate", body = ArrearsRequest),
        (status = 409, description = "Not at an approval gate"),
    ),
    tag = "Arrears"
)]
pub async fn approve_arrears(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArrearsRequest>> {
    Ok(Json(arrears::approve(&state.db, id).await?))
}

/// Reject a pending request
#[utoipa::path(
    post,
    path = "/api/v1/arrears/{id}/reject",
    params(("id" = Uuid, Path, description = "Arrears request id")),
    responses(
        (status = 200, description = "Rejected", body = ArrearsRequest),
        (status = 409, description = "Not rejectable from its current state"),
    ),
    tag = "Arrears"
)]
pub async fn reject_arrears(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArrearsRequest>> {
    Ok(Json(arrears::reject(&state.db, id).await?))
}

/// Cancel a request before approval
#[utoipa::path(
    post,
    path = "/api/v1/arrears/{id}/cancel",
    params(("id" = Uuid, Path, description = "Arrears request id")),
    responses(
        (status = 200, description = "Cancelled", body = ArrearsRequest),
        (status = 409, description = "Already approved or settled"),
    ),
    tag = "Arrears"
)]
pub async fn cancel_arrears(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ArrearsRequest>> {
    Ok(Json(arrears::cancel(&state.db, id).await?))
}

/// Register a loan (EMI-recovered) or salary advance (recovered in full)
#[utoipa::path(
    post,
    path = "/api/v1/loans",
    request_body = CreateLoanAdvanceRequest,
    responses(
        (status = 201, description = "Obligation registered", body = LoanAdvance),
        (status = 400, description = "Missing EMI for a loan or non-positive principal"),
    ),
    tag = "Loans & Advances"
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(body): Json<CreateLoanAdvanceRequest>,
) -> AppResult<(StatusCode, Json<LoanAdvance>)> {
    let obligation = loans::create(&state.db, &body).await?;
    Ok((StatusCode::CREATED, Json(obligation)))
}

/// List obligations, optionally for one employee
#[utoipa::path(
    get,
    path = "/api/v1/loans",
    params(EmployeeFilter),
    responses(
        (status = 200, description = "Loans and advances", body = [LoanAdvance]),
    ),
    tag = "Loans & Advances"
)]
pub async fn list_loans(
    State(state): State<AppState>,
    Query(filter): Query<EmployeeFilter>,
) -> AppResult<Json<Vec<LoanAdvance>>> {
    let obligations = loans::list(&state.db, filter.employee_id).await?;
    Ok(Json(obligations))
}

/// Get one obligation
#[utoipa::path(
    get,
    path = "/api/v1/loans/{id}",
    params(("id" = Uuid, Path, description = "Obligation id")),
    responses(
        (status = 200, description = "Loan or advance", body = LoanAdvance),
        (status = 404, description = "Not found"),
    ),
    tag = "Loans & Advances"
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<LoanAdvance>> {
    Ok(Json(loans::get(&state.db, id).await?))
}
