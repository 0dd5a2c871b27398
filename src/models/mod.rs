// src/models/mod.rs

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod lifecycle;

pub use lifecycle::{
    ArrearsStatus, BatchStatus, BonusBatchStatus, ObligationKind, ObligationStatus, OtRateMode,
    RecalcStatus, TxnCategory,
};

/// Month keys are `YYYY-MM`, matching the upstream attendance aggregator.
pub fn validate_month(month: &str) -> Result<(), String> {
    let bytes = month.as_bytes();
    let well_formed = bytes.len() == 7
        && bytes[4] == b'-'
        && month[..4].chars().all(|c| c.is_ascii_digit())
        && month[5..].chars().all(|c| c.is_ascii_digit());
    if !well_formed {
        return Err(format!("month must be in YYYY-MM format, got '{month}'"));
    }
    let mm: u32 = month[5..]
        .parse()
        .map_err(|_| "invalid month number".to_string())?;
    if !(1..=12).contains(&mm) {
        return Err(format!("month number out of range in '{month}'"));
    }
    Ok(())
}

// ─── Attendance (input, collaborator-owned) ───────────────────────────────────

/// One employee-month of attendance facts. Immutable once consumed by a
/// batch; each payroll record keeps its own snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceSummary {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub month: String,
    pub total_days_in_month: i32,
    pub present_days: Decimal,
    pub paid_leave_days: Decimal,
    pub unpaid_leave_days: Decimal,
    pub weekly_offs: Decimal,
    pub holidays: Decimal,
    pub absent_days: Decimal,
    pub payable_shifts: Decimal,
    pub extra_days: Decimal,
    pub total_paid_days: Decimal,
    pub late_ins_count: i32,
    pub early_outs_count: i32,
    pub permission_hours: Decimal,
    pub ot_hours: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Every field is required. A missing count is a deserialization error,
/// never substituted with zero — a silent zero here masks a data gap.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertAttendanceSummaryRequest {
    pub employee_id: Uuid,
    /// Format: "YYYY-MM"
    pub month: String,
    pub total_days_in_month: i32,
    pub present_days: Decimal,
    pub paid_leave_days: Decimal,
    pub unpaid_leave_days: Decimal,
    pub weekly_offs: Decimal,
    pub holidays: Decimal,
    pub absent_days: Decimal,
    pub payable_shifts: Decimal,
    pub extra_days: Decimal,
    pub total_paid_days: Decimal,
    pub late_ins_count: i32,
    pub early_outs_count: i32,
    pub permission_hours: Decimal,
    pub ot_hours: Decimal,
}

impl UpsertAttendanceSummaryRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_month(&self.month)?;
        if self.total_days_in_month < 1 {
            return Err("total_days_in_month must be at least 1".into());
        }
        let counts = [
            ("present_days", self.present_days),
            ("paid_leave_days", self.paid_leave_days),
            ("unpaid_leave_days", self.unpaid_leave_days),
            ("weekly_offs", self.weekly_offs),
            ("holidays", self.holidays),
            ("absent_days", self.absent_days),
            ("payable_shifts", self.payable_shifts),
            ("extra_days", self.extra_days),
            ("total_paid_days", self.total_paid_days),
            ("permission_hours", self.permission_hours),
            ("ot_hours", self.ot_hours),
        ];
        for (name, value) in counts {
            if value < Decimal::ZERO {
                return Err(format!("{name} must not be negative"));
            }
        }
        if self.late_ins_count < 0 || self.early_outs_count < 0 {
            return Err("late/early counts must not be negative".into());
        }
        if self.total_paid_days > Decimal::from(self.total_days_in_month) {
            return Err("total_paid_days exceeds total_days_in_month".into());
        }
        Ok(())
    }
}

// ─── Compensation profile ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AllowanceBasis {
    Fixed,
    PerDay,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct AllowanceLine {
    pub name: String,
    pub amount: Decimal,
    pub basis: AllowanceBasis,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct DeductionLine {
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct CompensationProfile {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    pub is_active: bool,
    pub basic_salary: Decimal,
    #[schema(value_type = Vec<AllowanceLine>)]
    pub allowances: Json<Vec<AllowanceLine>>,
    pub effective_from: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CompensationProfile {
    /// Monthly gross reference used by bonus policies: basic plus fixed
    /// allowances. Per-day allowances vary with attendance and are left
    /// out of the reference figure.
    pub fn reference_gross(&self) -> Decimal {
        self.basic_salary
            + self
                .allowances
                .iter()
                .filter(|a| a.basis == AllowanceBasis::Fixed)
                .map(|a| a.amount)
                .sum::<Decimal>()
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertCompensationProfileRequest {
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    pub is_active: bool,
    pub basic_salary: Decimal,
    pub allowances: Vec<AllowanceLine>,
    pub effective_from: NaiveDate,
}

impl UpsertCompensationProfileRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.basic_salary <= Decimal::ZERO {
            return Err("basic_salary must be positive".into());
        }
        for line in &self.allowances {
            if line.amount < Decimal::ZERO {
                return Err(format!("allowance '{}' must not be negative", line.name));
            }
        }
        Ok(())
    }
}

// ─── Deduction policy (versioned) ─────────────────────────────────────────────

/// Rates are currency per unit (per late-in, per early-out, per permission
/// hour). The engine uses the version with the greatest effective_month not
/// after the month being processed, never the latest.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DeductionPolicy {
    pub id: Uuid,
    pub department_id: Option<Uuid>,
    pub effective_month: String,
    pub late_in_rate: Decimal,
    pub early_out_rate: Decimal,
    pub permission_rate: Decimal,
    pub leave_deduction_rate: Decimal,
    pub ot_rate: Decimal,
    pub ot_rate_mode: OtRateMode,
    /// Overrides total_days_in_month as the per-day-pay divisor when set.
    pub fixed_divisor: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertDeductionPolicyRequest {
    pub department_id: Option<Uuid>,
    /// Format: "YYYY-MM"
    pub effective_month: String,
    pub late_in_rate: Decimal,
    pub early_out_rate: Decimal,
    pub permission_rate: Decimal,
    pub leave_deduction_rate: Decimal,
    pub ot_rate: Decimal,
    pub ot_rate_mode: OtRateMode,
    pub fixed_divisor: Option<i32>,
}

impl UpsertDeductionPolicyRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_month(&self.effective_month)?;
        let rates = [
            ("late_in_rate", self.late_in_rate),
            ("early_out_rate", self.early_out_rate),
            ("permission_rate", self.permission_rate),
            ("leave_deduction_rate", self.leave_deduction_rate),
            ("ot_rate", self.ot_rate),
        ];
        for (name, rate) in rates {
            if rate < Decimal::ZERO {
                return Err(format!("{name} must not be negative"));
            }
        }
        if let Some(divisor) = self.fixed_divisor {
            if divisor < 1 {
                return Err("fixed_divisor must be at least 1".into());
            }
        }
        Ok(())
    }
}

// ─── Bonus policy ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "bonus_policy_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BonusPolicyType {
    AttendanceRegular,
    PayrollBased,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "salary_component", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SalaryComponent {
    GrossSalary,
    FixedAmount,
}

/// Attendance-percentage band mapping to a bonus rate. Boundaries are
/// inclusive on both ends.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct BonusTier {
    pub min_percentage: Decimal,
    pub max_percentage: Decimal,
    pub bonus_percentage: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BonusPolicy {
    pub id: Uuid,
    pub name: String,
    pub policy_type: BonusPolicyType,
    pub salary_component: SalaryComponent,
    pub gross_salary_multiplier: Option<Decimal>,
    pub fixed_bonus_amount: Option<Decimal>,
    #[schema(value_type = Vec<BonusTier>)]
    pub tiers: Json<Vec<BonusTier>>,
    pub effective_month: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpsertBonusPolicyRequest {
    pub name: String,
    pub policy_type: BonusPolicyType,
    pub salary_component: SalaryComponent,
    pub gross_salary_multiplier: Option<Decimal>,
    pub fixed_bonus_amount: Option<Decimal>,
    pub tiers: Vec<BonusTier>,
    /// Format: "YYYY-MM"
    pub effective_month: String,
}

impl UpsertBonusPolicyRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_month(&self.effective_month)?;
        if self.tiers.is_empty() {
            return Err("bonus policy must define at least one tier".into());
        }
        match self.salary_component {
            SalaryComponent::GrossSalary if self.gross_salary_multiplier.is_none() => {
                Err("gross_salary component requires gross_salary_multiplier".into())
            }
            SalaryComponent::FixedAmount if self.fixed_bonus_amount.is_none() => {
                Err("fixed_amount component requires fixed_bonus_amount".into())
            }
            _ => Ok(()),
        }
    }
}

// ─── Payroll batch & record ───────────────────────────────────────────────────

/// An employee left out of a batch, with the reported reason (missing
/// attendance summary, missing compensation profile).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
pub struct ExcludedEmployee {
    pub employee_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub changed_by: Uuid,
    pub changed_at: DateTime<Utc>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollBatch {
    pub id: Uuid,
    pub batch_number: String,
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    pub month: String,
    pub status: BatchStatus,
    pub total_employees: i32,
    pub total_gross_salary: Decimal,
    pub total_deductions: Decimal,
    pub total_net_salary: Decimal,
    pub has_exceptions: bool,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    #[schema(value_type = Vec<ExcludedEmployee>)]
    pub excluded: Json<Vec<ExcludedEmployee>>,
    pub recalc_requested: bool,
    pub recalc_reason: Option<String>,
    pub recalc_status: Option<RecalcStatus>,
    pub recalc_requested_by: Option<Uuid>,
    #[schema(value_type = Vec<StatusHistoryEntry>)]
    pub status_history: Json<Vec<StatusHistoryEntry>>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PayrollBatch {
    /// Custom period this batch was generated under, if any. Reused
    /// verbatim when the batch is recomputed.
    pub fn period_override(&self) -> Option<PeriodOverride> {
        match (self.period_start, self.period_end) {
            (Some(start_date), Some(end_date)) => Some(PeriodOverride {
                start_date,
                end_date,
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub employee_id: Uuid,
    pub month: String,
    #[schema(value_type = AttendanceSummary)]
    pub attendance: Json<AttendanceSummary>,
    pub basic_pay: Decimal,
    pub earned_salary: Decimal,
    #[schema(value_type = Vec<AllowanceLine>)]
    pub allowances: Json<Vec<AllowanceLine>>,
    pub incentive: Decimal,
    pub ot_pay: Decimal,
    pub arrears_amount: Decimal,
    pub late_in_deduction: Decimal,
    pub early_out_deduction: Decimal,
    pub attendance_deduction: Decimal,
    pub permission_deduction: Decimal,
    pub leave_deduction: Decimal,
    #[schema(value_type = Vec<DeductionLine>)]
    pub other_deductions: Json<Vec<DeductionLine>>,
    pub total_emi: Decimal,
    pub advance_deduction: Decimal,
    pub gross_salary: Decimal,
    pub total_deductions: Decimal,
    pub net_salary: Decimal,
    /// rounded net − raw net, kept for audit, never absorbed.
    pub round_off: Decimal,
    pub remarks: Option<String>,
    pub has_exception: bool,
    pub exception_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Custom period for mid-cycle ("second salary") runs. The day span
/// replaces the calendar-month divisor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct PeriodOverride {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl PeriodOverride {
    pub fn day_count(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.end_date < self.start_date {
            return Err("period override end_date precedes start_date".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateBatchRequest {
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    /// Format: "YYYY-MM"
    pub month: String,
    pub created_by: Uuid,
    pub period_override: Option<PeriodOverride>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub actor_id: Uuid,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RecalculationRequestBody {
    pub requested_by: Uuid,
    pub reason: String,
}

/// Distinguishes an omitted field (keep the stored value) from an
/// explicit null (clear it).
fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: serde::Deserialize<'de>,
    D: serde::Deserializer<'de>,
{
    serde::Deserialize::deserialize(de).map(Some)
}

/// Pre-freeze edits only. Computed columns are never patched directly.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePayrollRecordRequest {
    /// Omit to keep the current remarks, send null to clear them
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub remarks: Option<Option<String>>,
    pub other_deductions: Option<Vec<DeductionLine>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PayrollBatchDetail {
    pub batch: PayrollBatch,
    pub records: Vec<PayrollRecord>,
}

// ─── Transaction ledger ───────────────────────────────────────────────────────

/// One ledger line per earning/deduction/adjustment. Settlement and
/// recovery lines carry (source_kind, source_id); their uniqueness per
/// month is the at-most-once guard.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PayrollTransaction {
    pub id: Uuid,
    pub batch_id: Option<Uuid>,
    pub record_id: Option<Uuid>,
    pub employee_id: Uuid,
    pub month: String,
    pub category: TxnCategory,
    pub kind: String,
    pub amount: Decimal,
    pub source_kind: Option<String>,
    pub source_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

pub const SOURCE_KIND_ARREARS: &str = "arrears_request";
pub const SOURCE_KIND_LOAN: &str = "loan_advance";

// ─── Arrears ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ArrearsRequest {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub start_month: String,
    pub end_month: String,
    pub monthly_amount: Decimal,
    pub total_amount: Decimal,
    pub remaining_amount: Decimal,
    pub reason: String,
    pub status: ArrearsStatus,
    pub version: i32,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateArrearsRequest {
    pub employee_id: Uuid,
    /// Format: "YYYY-MM"
    pub start_month: String,
    pub end_month: String,
    pub monthly_amount: Decimal,
    pub reason: String,
    pub created_by: Uuid,
}

impl CreateArrearsRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_month(&self.start_month)?;
        validate_month(&self.end_month)?;
        if self.end_month < self.start_month {
            return Err("end_month precedes start_month".into());
        }
        if self.monthly_amount <= Decimal::ZERO {
            return Err("monthly_amount must be positive".into());
        }
        if self.reason.trim().is_empty() {
            return Err("reason is required".into());
        }
        Ok(())
    }

    /// Inclusive month span, e.g. 2025-01..2025-04 is 4 installments.
    pub fn month_span(&self) -> i64 {
        let parse = |m: &str| -> (i64, i64) {
            let year = m[..4].parse().unwrap_or(0);
            let month = m[5..].parse().unwrap_or(0);
            (year, month)
        };
        let (sy, sm) = parse(&self.start_month);
        let (ey, em) = parse(&self.end_month);
        (ey - sy) * 12 + (em - sm) + 1
    }
}

// ─── Loans & advances ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanAdvance {
    pub id: Uuid,
    pub employee_id: Uuid,
    pub kind: ObligationKind,
    pub principal: Decimal,
    pub emi_amount: Decimal,
    pub remaining_balance: Decimal,
    pub status: ObligationStatus,
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateLoanAdvanceRequest {
    pub employee_id: Uuid,
    pub kind: ObligationKind,
    pub principal: Decimal,
    /// Required for loans, ignored for salary advances.
    pub emi_amount: Option<Decimal>,
}

impl CreateLoanAdvanceRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.principal <= Decimal::ZERO {
            return Err("principal must be positive".into());
        }
        match self.kind {
            ObligationKind::Loan => match self.emi_amount {
                Some(emi) if emi > Decimal::ZERO => Ok(()),
                _ => Err("loans require a positive emi_amount".into()),
            },
            ObligationKind::SalaryAdvance => Ok(()),
        }
    }
}

// ─── Bonus batch & record ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BonusBatch {
    pub id: Uuid,
    pub batch_number: String,
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    pub policy_id: Uuid,
    pub start_month: String,
    pub end_month: String,
    pub status: BonusBatchStatus,
    pub total_employees: i32,
    pub total_bonus: Decimal,
    pub recalc_requested: bool,
    pub recalc_reason: Option<String>,
    pub recalc_status: Option<RecalcStatus>,
    pub recalc_requested_by: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct BonusRecord {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub employee_id: Uuid,
    pub attendance_days: Decimal,
    pub total_month_days: Decimal,
    pub attendance_percentage: Decimal,
    pub salary_component_value: Decimal,
    /// The system's own figure; retained for audit even after an override.
    pub calculated_bonus: Decimal,
    /// Defaults to calculated_bonus; editable until the batch is frozen.
    pub final_bonus: Decimal,
    pub needs_review: bool,
    pub remarks: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateBonusBatchRequest {
    pub department_id: Uuid,
    pub division_id: Option<Uuid>,
    pub policy_id: Uuid,
    /// Format: "YYYY-MM"
    pub start_month: String,
    pub end_month: String,
    pub created_by: Uuid,
}

impl CreateBonusBatchRequest {
    pub fn validate(&self) -> Result<(), String> {
        validate_month(&self.start_month)?;
        validate_month(&self.end_month)?;
        if self.end_month < self.start_month {
            return Err("end_month precedes start_month".into());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateBonusRecordRequest {
    pub final_bonus: Option<Decimal>,
    /// Omit to keep the current remarks, send null to clear them
    #[serde(default, deserialize_with = "double_option")]
    #[schema(value_type = Option<String>)]
    pub remarks: Option<Option<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct BonusBatchDetail {
    pub batch: BonusBatch,
    pub records: Vec<BonusRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn month_format_is_enforced() {
        assert!(validate_month("2025-01").is_ok());
        assert!(validate_month("2025-12").is_ok());
        assert!(validate_month("2025-13").is_err());
        assert!(validate_month("2025-00").is_err());
        assert!(validate_month("202501").is_err());
        assert!(validate_month("2025-1").is_err());
        assert!(validate_month("").is_err());
    }

    #[test]
    fn arrears_month_span_is_inclusive() {
        let req = CreateArrearsRequest {
            employee_id: Uuid::new_v4(),
            start_month: "2025-01".into(),
            end_month: "2025-04".into(),
            monthly_amount: dec!(3000),
            reason: "back pay".into(),
            created_by: Uuid::new_v4(),
        };
        assert_eq!(req.month_span(), 4);

        let across_years = CreateArrearsRequest {
            start_month: "2024-11".into(),
            end_month: "2025-02".into(),
            ..req
        };
        assert_eq!(across_years.month_span(), 4);
    }

    #[test]
    fn attendance_paid_days_cannot_exceed_month() {
        let mut req = UpsertAttendanceSummaryRequest {
            employee_id: Uuid::new_v4(),
            month: "2025-06".into(),
            total_days_in_month: 30,
            present_days: dec!(28),
            paid_leave_days: dec!(1),
            unpaid_leave_days: dec!(0),
            weekly_offs: dec!(4),
            holidays: dec!(1),
            absent_days: dec!(1),
            payable_shifts: dec!(29),
            extra_days: dec!(0),
            total_paid_days: dec!(29),
            late_ins_count: 2,
            early_outs_count: 0,
            permission_hours: dec!(1.5),
            ot_hours: dec!(4),
        };
        assert!(req.validate().is_ok());

        req.total_paid_days = dec!(31);
        assert!(req.validate().is_err());

        req.total_paid_days = dec!(29);
        req.absent_days = dec!(-1);
        assert!(req.validate().is_err());
    }

    #[test]
    fn period_override_day_count() {
        let period = PeriodOverride {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        };
        assert_eq!(period.day_count(), 15);
        assert!(period.validate().is_ok());

        let inverted = PeriodOverride {
            start_date: period.end_date,
            end_date: period.start_date,
        };
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn record_edit_distinguishes_absent_and_null_remarks() {
        let keep: UpdatePayrollRecordRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(keep.remarks, None);

        let clear: UpdatePayrollRecordRequest =
            serde_json::from_str(r#"{"remarks": null}"#).unwrap();
        assert_eq!(clear.remarks, Some(None));

        let set: UpdateBonusRecordRequest =
            serde_json::from_str(r#"{"remarks": "approved by hr"}"#).unwrap();
        assert_eq!(set.remarks, Some(Some("approved by hr".to_string())));
        assert_eq!(set.final_bonus, None);
    }

    #[test]
    fn loan_creation_requires_emi() {
        let mut req = CreateLoanAdvanceRequest {
            employee_id: Uuid::new_v4(),
            kind: ObligationKind::Loan,
            principal: dec!(10000),
            emi_amount: None,
        };
        assert!(req.validate().is_err());

        req.emi_amount = Some(dec!(2000));
        assert!(req.validate().is_ok());

        req.kind = ObligationKind::SalaryAdvance;
        req.emi_amount = None;
        assert!(req.validate().is_ok());
    }
}
