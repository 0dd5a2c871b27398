// src/openapi.rs

use crate::models::{
    AllowanceBasis, AllowanceLine, ArrearsRequest, ArrearsStatus, AttendanceSummary,
    BatchStatus, BonusBatch, BonusBatchDetail, BonusBatchStatus, BonusPolicy, BonusPolicyType,
    BonusRecord, BonusTier, CompensationProfile,
    CreateArrearsRequest, CreateBonusBatchRequest, CreateLoanAdvanceRequest, DeductionLine,
    DeductionPolicy, ExcludedEmployee, GenerateBatchRequest, LoanAdvance, ObligationKind,
    ObligationStatus, OtRateMode, PayrollBatch, PayrollBatchDetail, PayrollRecord,
    PayrollTransaction, PeriodOverride, RecalcStatus, RecalculationRequestBody, SalaryComponent,
    StatusHistoryEntry, TransitionRequest, TxnCategory,
    UpdateBonusRecordRequest, UpdatePayrollRecordRequest, UpsertAttendanceSummaryRequest,
    UpsertBonusPolicyRequest, UpsertCompensationProfileRequest, UpsertDeductionPolicyRequest,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Settlement Engine API",
        version = "1.0.0",
        description = "Payroll and compensation settlement engine built with Rust and Axum. \
            Computes per-employee earnings and deductions from attendance facts, layers in \
            multi-month arrears settlement and loan/advance recovery, resolves tiered \
            attendance bonuses, and drives batch lifecycles with auditable totals.",
        license(name = "MIT")
    ),
    paths(
        // Inputs
        crate::handlers::inputs::upsert_attendance,
        crate::handlers::inputs::get_attendance,
        crate::handlers::inputs::upsert_compensation_profile,
        crate::handlers::inputs::get_compensation_profile,
        crate::handlers::inputs::upsert_deduction_policy,
        crate::handlers::inputs::list_deduction_policies,
        crate::handlers::inputs::create_bonus_policy,
        crate::handlers::inputs::list_bonus_policies,
        // Arrears
        crate::handlers::obligations::create_arrears,
        crate::handlers::obligations::list_arrears,
        crate::handlers::obligations::get_arrears,
        crate::handlers::obligations::submit_arrears,
        crate::handlers::obligations::approve_arrears,
        crate::handlers::obligations::reject_arrears,
        crate::handlers::obligations::cancel_arrears,
        // Loans & advances
        crate::handlers::obligations::create_loan,
        crate::handlers::obligations::list_loans,
        crate::handlers::obligations::get_loan,
        // Payroll
        crate::handlers::payroll::generate_batch,
        crate::handlers::payroll::list_batches,
        crate::handlers::payroll::get_batch,
        crate::handlers::payroll::approve_batch,
        crate::handlers::payroll::freeze_batch,
        crate::handlers::payroll::complete_batch,
        crate::handlers::payroll::request_batch_recalculation,
        crate::handlers::payroll::recalculate_batch,
        crate::handlers::payroll::update_record,
        // Bonus
        crate::handlers::bonus::generate_bonus_batch,
        crate::handlers::bonus::list_bonus_batches,
        crate::handlers::bonus::get_bonus_batch,
        crate::handlers::bonus::approve_bonus_batch,
        crate::handlers::bonus::freeze_bonus_batch,
        crate::handlers::bonus::update_bonus_record,
        crate::handlers::bonus::request_bonus_recalculation,
        crate::handlers::bonus::recalculate_bonus_batch,
    ),
    components(
        schemas(
            AttendanceSummary, UpsertAttendanceSummaryRequest,
            CompensationProfile, UpsertCompensationProfileRequest,
            AllowanceLine, AllowanceBasis, DeductionLine,
            DeductionPolicy, UpsertDeductionPolicyRequest,
            BonusPolicy, BonusTier, UpsertBonusPolicyRequest,
            ArrearsRequest, CreateArrearsRequest,
            LoanAdvance, CreateLoanAdvanceRequest,
            PayrollBatch, PayrollBatchDetail, PayrollRecord, PeriodOverride,
            GenerateBatchRequest, TransitionRequest, RecalculationRequestBody,
            UpdatePayrollRecordRequest, ExcludedEmployee, StatusHistoryEntry,
            PayrollTransaction,
            BonusBatch, BonusBatchDetail, BonusRecord,
            CreateBonusBatchRequest, UpdateBonusRecordRequest,
            BatchStatus, BonusBatchStatus, ArrearsStatus, ObligationKind, ObligationStatus,
            TxnCategory, OtRateMode, RecalcStatus, BonusPolicyType, SalaryComponent,
        )
    ),
    tags(
        (name = "Inputs", description = "Attendance, compensation and policy ingestion"),
        (name = "Arrears", description = "Multi-month arrears requests and approval chain"),
        (name = "Loans & Advances", description = "Obligations recovered through payroll"),
        (name = "Payroll", description = "Settlement batch generation and lifecycle"),
        (name = "Bonus", description = "Tiered attendance bonus batches"),
    )
)]
pub struct ApiDoc;
