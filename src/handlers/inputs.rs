// src/handlers/inputs.rs
//
// Ingestion endpoints for the engine's collaborator-owned inputs:
// attendance summaries, compensation profiles, deduction policy versions
// and bonus policies. All of these are upstream facts; payroll records
// snapshot them at generation time and never read them again.

use crate::{
    errors::{AppError, AppResult},
    models::{
        AttendanceSummary, BonusPolicy, CompensationProfile, DeductionPolicy,
        UpsertAttendanceSummaryRequest, UpsertBonusPolicyRequest,
        UpsertCompensationProfileRequest, UpsertDeductionPolicyRequest,
    },
    services::bonus::validate_tiers,
    state::AppState,
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use sqlx::types::Json as Jsonb;
use uuid::Uuid;

/// Upsert one employee-month of attendance facts
#[utoipa::path(
    put,
    path = "/api/v1/attendance",
    request_body = UpsertAttendanceSummaryRequest,
    responses(
        (status = 200, description = "Attendance summary stored", body = AttendanceSummary),
        (status = 400, description = "Malformed month or negative count"),
    ),
    tag = "Inputs"
)]
pub async fn upsert_attendance(
    State(state): State<AppState>,
    Json(body): Json<UpsertAttendanceSummaryRequest>,
) -> AppResult<Json<AttendanceSummary>> {
    body.validate().map_err(AppError::Validation)?;

    let summary = sqlx::query_as::<_, AttendanceSummary>(
        "INSERT INTO attendance_summaries (
            id, employee_id, month, total_days_in_month, present_days, paid_leave_days,
            unpaid_leave_days, weekly_offs, holidays, absent_days, payable_shifts,
            extra_days, total_paid_days, late_ins_count, early_outs_count,
            permission_hours, ot_hours
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17)
        ON CONFLICT (employee_id, month) DO UPDATE SET
            total_days_in_month = EXCLUDED.total_days_in_month,
            present_days = EXCLUDED.present_days,
            paid_leave_days = EXCLUDED.paid_leave_days,
            unpaid_leave_days = EXCLUDED.unpaid_leave_days,
            weekly_offs = EXCLUDED.weekly_offs,
            holidays = EXCLUDED.holidays,
            absent_days = EXCLUDED.absent_days,
            payable_shifts = EXCLUDED.payable_shifts,
            extra_days = EXCLUDED.extra_days,
            total_paid_days = EXCLUDED.total_paid_days,
            late_ins_count = EXCLUDED.late_ins_count,
            early_outs_count = EXCLUDED.early_outs_count,
            permission_hours = EXCLUDED.permission_hours,
            ot_hours = EXCLUDED.ot_hours
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.employee_id)
    .bind(&body.month)
    .bind(body.total_days_in_month)
    .bind(body.present_days)
    .bind(body.paid_leave_days)
    .bind(body.unpaid_leave_days)
    .bind(body.weekly_offs)
    .bind(body.holidays)
    .bind(body.absent_days)
    .bind(body.payable_shifts)
    .bind(body.extra_days)
    .bind(body.total_paid_days)
    .bind(body.late_ins_count)
    .bind(body.early_outs_count)
    .bind(body.permission_hours)
    .bind(body.ot_hours)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(summary))
}

/// Get one employee-month of attendance facts
#[utoipa::path(
    get,
    path = "/api/v1/attendance/{employee_id}/{month}",
    params(
        ("employee_id" = Uuid, Path, description = "Employee id"),
        ("month" = String, Path, description = "Month in YYYY-MM format"),
    ),
    responses(
        (status = 200, description = "Attendance summary", body = AttendanceSummary),
        (status = 404, description = "No summary for that employee and month"),
    ),
    tag = "Inputs"
)]
pub async fn get_attendance(
    State(state): State<AppState>,
    Path((employee_id, month)): Path<(Uuid, String)>,
) -> AppResult<Json<AttendanceSummary>> {
    let summary = sqlx::query_as::<_, AttendanceSummary>(
        "SELECT * FROM attendance_summaries WHERE employee_id = $1 AND month = $2",
    )
    .bind(employee_id)
    .bind(&month)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| {
        AppError::NotFound(format!("No attendance summary for {employee_id} in {month}"))
    })?;

    Ok(Json(summary))
}

/// Create or replace an employee's compensation profile
#[utoipa::path(
    put,
    path = "/api/v1/employees/{employee_id}/compensation",
    params(("employee_id" = Uuid, Path, description = "Employee id")),
    request_body = UpsertCompensationProfileRequest,
    responses(
        (status = 200, description = "Profile stored", body = CompensationProfile),
        (status = 400, description = "Non-positive basic salary or negative allowance"),
    ),
    tag = "Inputs"
)]
pub async fn upsert_compensation_profile(
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
    Json(body): Json<UpsertCompensationProfileRequest>,
) -> AppResult<Json<CompensationProfile>> {
    body.validate().map_err(AppError::Validation)?;

    let profile = sqlx::query_as::<_, CompensationProfile>(
        "INSERT INTO compensation_profiles (
            id, employee_id, department_id, division_id, is_active,
            basic_salary, allowances, effective_from
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        ON CONFLICT (employee_id) DO UPDATE SET
            department_id = EXCLUDED.department_id,
            division_id = EXCLUDED.division_id,
            is_active = EXCLUDED.is_active,
            basic_salary = EXCLUDED.basic_salary,
            allowances = EXCLUDED.allowances,
            effective_from = EXCLUDED.effective_from,
            updated_at = NOW()
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(employee_id)
    .bind(body.department_id)
    .bind(body.division_id)
    .bind(body.is_active)
    .bind(body.basic_salary)
    .bind(Jsonb(&body.allowances))
    .bind(body.effective_from)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(profile))
}

/// Get an employee's compensation profile
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/compensation",
    params(("employee_id" = Uuid, Path, description = "Employee id")),
    responses(
        (status = 200, description = "Compensation profile", body = CompensationProfile),
        (status = 404, description = "No profile for that employee"),
    ),
    tag = "Inputs"
)]
pub async fn get_compensation_profile(
    State(state): State<AppState>,
    Path(employee_id): Path<Uuid>,
) -> AppResult<Json<CompensationProfile>> {
    let profile = sqlx::query_as::<_, CompensationProfile>(
        "SELECT * FROM compensation_profiles WHERE employee_id = $1",
    )
    .bind(employee_id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("No compensation profile for {employee_id}")))?;

    Ok(Json(profile))
}

/// Create or replace a deduction policy version.
/// Versions are keyed by (department, effective_month); the engine picks the
/// version in force for the month being processed, never the latest.
#[utoipa::path(
    put,
    path = "/api/v1/deduction-policies",
    request_body = UpsertDeductionPolicyRequest,
    responses(
        (status = 200, description = "Policy version stored", body = DeductionPolicy),
        (status = 400, description = "Negative rate or malformed month"),
    ),
    tag = "Inputs"
)]
pub async fn upsert_deduction_policy(
    State(state): State<AppState>,
    Json(body): Json<UpsertDeductionPolicyRequest>,
) -> AppResult<Json<DeductionPolicy>> {
    body.validate().map_err(AppError::Validation)?;

    let policy = sqlx::query_as::<_, DeductionPolicy>(
        "INSERT INTO deduction_policies (
            id, department_id, effective_month, late_in_rate, early_out_rate,
            permission_rate, leave_deduction_rate, ot_rate, ot_rate_mode, fixed_divisor
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)
        ON CONFLICT (department_id, effective_month) DO UPDATE SET
            late_in_rate = EXCLUDED.late_in_rate,
            early_out_rate = EXCLUDED.early_out_rate,
            permission_rate = EXCLUDED.permission_rate,
            leave_deduction_rate = EXCLUDED.leave_deduction_rate,
            ot_rate = EXCLUDED.ot_rate,
            ot_rate_mode = EXCLUDED.ot_rate_mode,
            fixed_divisor = EXCLUDED.fixed_divisor
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(body.department_id)
    .bind(&body.effective_month)
    .bind(body.late_in_rate)
    .bind(body.early_out_rate)
    .bind(body.permission_rate)
    .bind(body.leave_deduction_rate)
    .bind(body.ot_rate)
    .bind(body.ot_rate_mode)
    .bind(body.fixed_divisor)
    .fetch_one(&state.db)
    .await?;

    Ok(Json(policy))
}

/// List all deduction policy versions
#[utoipa::path(
    get,
    path = "/api/v1/deduction-policies",
    responses(
        (status = 200, description = "All policy versions", body = [DeductionPolicy]),
    ),
    tag = "Inputs"
)]
pub async fn list_deduction_policies(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<DeductionPolicy>>> {
    let policies = sqlx::query_as::<_, DeductionPolicy>(
        "SELECT * FROM deduction_policies ORDER BY effective_month DESC, department_id",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(policies))
}

/// Create a bonus policy. Tiers are validated up front; an overlapping
/// tier table is rejected here rather than at batch time.
#[utoipa::path(
    post,
    path = "/api/v1/bonus-policies",
    request_body = UpsertBonusPolicyRequest,
    responses(
        (status = 201, description = "Bonus policy created", body = BonusPolicy),
        (status = 422, description = "Overlapping or malformed tiers"),
    ),
    tag = "Inputs"
)]
pub async fn create_bonus_policy(
    State(state): State<AppState>,
    Json(body): Json<UpsertBonusPolicyRequest>,
) -> AppResult<(StatusCode, Json<BonusPolicy>)> {
    body.validate().map_err(AppError::Validation)?;
    validate_tiers(&body.tiers)?;

    let policy = sqlx::query_as::<_, BonusPolicy>(
        "INSERT INTO bonus_policies (
            id, name, policy_type, salary_component, gross_salary_multiplier,
            fixed_bonus_amount, tiers, effective_month
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&body.name)
    .bind(body.policy_type)
    .bind(body.salary_component)
    .bind(body.gross_salary_multiplier)
    .bind(body.fixed_bonus_amount)
    .bind(Jsonb(&body.tiers))
    .bind(&body.effective_month)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(policy)))
}

/// List all bonus policies
#[utoipa::path(
    get,
    path = "/api/v1/bonus-policies",
    responses(
        (status = 200, description = "All bonus policies", body = [BonusPolicy]),
    ),
    tag = "Inputs"
)]
pub async fn list_bonus_policies(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BonusPolicy>>> {
    let policies = sqlx::query_as::<_, BonusPolicy>(
        "SELECT * FROM bonus_policies ORDER BY effective_month DESC",
    )
    .fetch_all(&state.db)
    .await?;
    Ok(Json(policies))
}
