// src/routes/mod.rs

use crate::{
    handlers::{
        bonus::{
            approve_bonus_batch, freeze_bonus_batch, generate_bonus_batch, get_bonus_batch,
            list_bonus_batches, recalculate_bonus_batch, request_bonus_recalculation,
            update_bonus_record,
        },
        inputs::{
            create_bonus_policy, get_attendance, get_compensation_profile, list_bonus_policies,
            list_deduction_policies, upsert_attendance, upsert_compensation_profile,
            upsert_deduction_policy,
        },
        obligations::{
            approve_arrears, cancel_arrears, create_arrears, create_loan, get_arrears, get_loan,
            list_arrears, list_loans, reject_arrears, submit_arrears,
        },
        payroll::{
            approve_batch, complete_batch, freeze_batch, generate_batch, get_batch, list_batches,
            recalculate_batch, request_batch_recalculation, update_record,
        },
    },
    state::AppState,
};
use axum::{
    Router,
    routing::{get, patch, post, put},
};

pub fn api_routes() -> Router<AppState> {
    Router::new()
        // ─── Inputs ───────────────────────────────────────────
        .route("/attendance", put(upsert_attendance))
        .route("/attendance/{employee_id}/{month}", get(get_attendance))
        .route(
            "/employees/{employee_id}/compensation",
            put(upsert_compensation_profile).get(get_compensation_profile),
        )
        .route(
            "/deduction-policies",
            put(upsert_deduction_policy).get(list_deduction_policies),
        )
        .route(
            "/bonus-policies",
            post(create_bonus_policy).get(list_bonus_policies),
        )
        // ─── Arrears ──────────────────────────────────────────
        .route("/arrears", post(create_arrears).get(list_arrears))
        .route("/arrears/{id}", get(get_arrears))
        .route("/arrears/{id}/submit", post(submit_arrears))
        .route("/arrears/{id}/approve", post(approve_arrears))
        .route("/arrears/{id}/reject", post(reject_arrears))
        .route("/arrears/{id}/cancel", post(cancel_arrears))
        // ─── Loans & advances ─────────────────────────────────
        .route("/loans", post(create_loan).get(list_loans))
        .route("/loans/{id}", get(get_loan))
        // ─── Payroll batches ──────────────────────────────────
        .route("/payroll/batches", post(generate_batch).get(list_batches))
        .route("/payroll/batches/{id}", get(get_batch))
        .route("/payroll/batches/{id}/approve", post(approve_batch))
        .route("/payroll/batches/{id}/freeze", post(freeze_batch))
        .route("/payroll/batches/{id}/complete", post(complete_batch))
        .route(
            "/payroll/batches/{id}/recalculation",
            post(request_batch_recalculation),
        )
        .route("/payroll/batches/{id}/recalculate", post(recalculate_batch))
        .route("/payroll/records/{id}", patch(update_record))
        // ─── Bonus batches ────────────────────────────────────
        .route(
            "/bonus/batches",
            post(generate_bonus_batch).get(list_bonus_batches),
        )
        .route("/bonus/batches/{id}", get(get_bonus_batch))
        .route("/bonus/batches/{id}/approve", post(approve_bonus_batch))
        .route("/bonus/batches/{id}/freeze", post(freeze_bonus_batch))
        .route(
            "/bonus/batches/{id}/recalculation",
            post(request_bonus_recalculation),
        )
        .route(
            "/bonus/batches/{id}/recalculate",
            post(recalculate_bonus_batch),
        )
        .route("/bonus/records/{id}", patch(update_bonus_record))
}
