// src/services/loans.rs
//
// Loan and salary-advance recovery. Loans recover one EMI per payroll run,
// capped at the remaining balance; salary advances recover in full. Each
// recovery journals a deduction line keyed by (source, month), which is the
// at-most-once guard across batch recomputation.

use crate::{
    errors::{AppError, AppResult},
    models::{
        CreateLoanAdvanceRequest, LoanAdvance, ObligationKind, ObligationStatus, SOURCE_KIND_LOAN,
        TxnCategory,
    },
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

/// One obligation's share of a payroll run.
#[derive(Debug, Clone, PartialEq)]
pub struct RecoveryPlan {
    pub amount: Decimal,
    pub remaining_after: Decimal,
    pub status_after: ObligationStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryOutcome {
    Applied { amount: Decimal },
    /// A recovery for this (obligation, month) is already journaled; the
    /// amount is the journaled one, reused verbatim on recomputation.
    AlreadyApplied { amount: Decimal },
    NotEligible,
    VersionConflict,
}

/// Loans take min(EMI, remaining); advances take the whole remaining
/// balance. An obligation reaching zero closes.
pub fn plan_recovery(obligation: &LoanAdvance) -> Option<RecoveryPlan> {
    if obligation.status != ObligationStatus::Active
        || obligation.remaining_balance <= Decimal::ZERO
    {
        return None;
    }
    let amount = match obligation.kind {
        ObligationKind::Loan => obligation.emi_amount.min(obligation.remaining_balance),
        ObligationKind::SalaryAdvance => obligation.remaining_balance,
    };
    let remaining_after = obligation.remaining_balance - amount;
    let status_after = if remaining_after == Decimal::ZERO {
        ObligationStatus::Closed
    } else {
        ObligationStatus::Active
    };
    Some(RecoveryPlan {
        amount,
        remaining_after,
        status_after,
    })
}

pub async fn create(db: &PgPool, req: &CreateLoanAdvanceRequest) -> AppResult<LoanAdvance> {
    req.validate().map_err(AppError::Validation)?;
    let emi = match req.kind {
        ObligationKind::Loan => req.emi_amount.unwrap_or(Decimal::ZERO),
        // advances recover in one shot
        ObligationKind::SalaryAdvance => req.principal,
    };

    let created = sqlx::query_as::<_, LoanAdvance>(
        "INSERT INTO loan_advances (
            id, employee_id, kind, principal, emi_amount, remaining_balance
        ) VALUES ($1,$2,$3,$4,$5,$4)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.employee_id)
    .bind(req.kind)
    .bind(req.principal)
    .bind(emi)
    .fetch_one(db)
    .await?;

    info!(
        "obligation {} created for employee {}: {:?} of {}",
        created.id, req.employee_id, req.kind, req.principal
    );
    Ok(created)
}

pub async fn get(db: &PgPool, id: Uuid) -> AppResult<LoanAdvance> {
    sqlx::query_as::<_, LoanAdvance>("SELECT * FROM loan_advances WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Loan/advance {id} not found")))
}

pub async fn list(db: &PgPool, employee_id: Option<Uuid>) -> AppResult<Vec<LoanAdvance>> {
    let rows = match employee_id {
        Some(emp) => {
            sqlx::query_as::<_, LoanAdvance>(
                "SELECT * FROM loan_advances WHERE employee_id = $1 ORDER BY created_at DESC",
            )
            .bind(emp)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, LoanAdvance>("SELECT * FROM loan_advances ORDER BY created_at DESC")
                .fetch_all(db)
                .await?
        }
    };
    Ok(rows)
}

/// Active obligations for one employee, oldest first so recovery order is
/// deterministic across recomputation.
pub async fn active_for_employee(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: Uuid,
) -> AppResult<Vec<LoanAdvance>> {
    let rows = sqlx::query_as::<_, LoanAdvance>(
        "SELECT * FROM loan_advances
         WHERE employee_id = $1 AND status = 'active' AND remaining_balance > 0
         ORDER BY created_at",
    )
    .bind(employee_id)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Recover one obligation against one payroll run inside the caller's
/// transaction. Ledger-first: if a recovery for this (obligation, month)
/// is already journaled the balance is left untouched.
pub async fn recover_for_month(
    tx: &mut Transaction<'_, Postgres>,
    obligation: &LoanAdvance,
    month: &str,
    batch_id: Uuid,
    record_id: Uuid,
) -> AppResult<RecoveryOutcome> {
    let journaled: Option<Decimal> = sqlx::query_scalar(
        "SELECT amount FROM payroll_transactions
         WHERE source_kind = $1 AND source_id = $2 AND month = $3",
    )
    .bind(SOURCE_KIND_LOAN)
    .bind(obligation.id)
    .bind(month)
    .fetch_optional(&mut **tx)
    .await?;
    if let Some(amount) = journaled {
        // repoint the line at the replacement record when a batch recomputes
        sqlx::query(
            "UPDATE payroll_transactions SET batch_id = $1, record_id = $2
             WHERE source_kind = $3 AND source_id = $4 AND month = $5",
        )
        .bind(batch_id)
        .bind(record_id)
        .bind(SOURCE_KIND_LOAN)
        .bind(obligation.id)
        .bind(month)
        .execute(&mut **tx)
        .await?;
        return Ok(RecoveryOutcome::AlreadyApplied { amount });
    }

    let Some(plan) = plan_recovery(obligation) else {
        return Ok(RecoveryOutcome::NotEligible);
    };

    let applied = sqlx::query(
        "UPDATE loan_advances
         SET remaining_balance = $1, status = $2, version = version + 1, updated_at = NOW()
         WHERE id = $3 AND version = $4",
    )
    .bind(plan.remaining_after)
    .bind(plan.status_after)
    .bind(obligation.id)
    .bind(obligation.version)
    .execute(&mut **tx)
    .await?;
    if applied.rows_affected() == 0 {
        return Ok(RecoveryOutcome::VersionConflict);
    }

    let kind = match obligation.kind {
        ObligationKind::Loan => "emi_recovery",
        ObligationKind::SalaryAdvance => "advance_recovery",
    };
    sqlx::query(
        "INSERT INTO payroll_transactions (
            id, batch_id, record_id, employee_id, month,
            category, kind, amount, source_kind, source_id
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(record_id)
    .bind(obligation.employee_id)
    .bind(month)
    .bind(TxnCategory::Deduction)
    .bind(kind)
    .bind(plan.amount)
    .bind(SOURCE_KIND_LOAN)
    .bind(obligation.id)
    .execute(&mut **tx)
    .await?;

    Ok(RecoveryOutcome::Applied { amount: plan.amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn obligation(
        kind: ObligationKind,
        emi: Decimal,
        remaining: Decimal,
        status: ObligationStatus,
    ) -> LoanAdvance {
        LoanAdvance {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            kind,
            principal: dec!(10000),
            emi_amount: emi,
            remaining_balance: remaining,
            status,
            version: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn loan_recovers_one_emi() {
        let loan = obligation(ObligationKind::Loan, dec!(2000), dec!(10000), ObligationStatus::Active);
        let plan = plan_recovery(&loan).unwrap();
        assert_eq!(plan.amount, dec!(2000));
        assert_eq!(plan.remaining_after, dec!(8000));
        assert_eq!(plan.status_after, ObligationStatus::Active);
    }

    #[test]
    fn final_emi_caps_at_remaining_and_closes() {
        // remaining 1,500 with EMI 2,000 recovers exactly 1,500
        let loan = obligation(ObligationKind::Loan, dec!(2000), dec!(1500), ObligationStatus::Active);
        let plan = plan_recovery(&loan).unwrap();
        assert_eq!(plan.amount, dec!(1500));
        assert_eq!(plan.remaining_after, dec!(0));
        assert_eq!(plan.status_after, ObligationStatus::Closed);
    }

    #[test]
    fn advance_recovers_in_full() {
        let advance = obligation(
            ObligationKind::SalaryAdvance,
            dec!(5000),
            dec!(5000),
            ObligationStatus::Active,
        );
        let plan = plan_recovery(&advance).unwrap();
        assert_eq!(plan.amount, dec!(5000));
        assert_eq!(plan.remaining_after, dec!(0));
        assert_eq!(plan.status_after, ObligationStatus::Closed);
    }

    #[test]
    fn closed_or_drained_obligations_take_nothing() {
        let closed = obligation(ObligationKind::Loan, dec!(2000), dec!(0), ObligationStatus::Closed);
        assert!(plan_recovery(&closed).is_none());

        let drained = obligation(ObligationKind::Loan, dec!(2000), dec!(0), ObligationStatus::Active);
        assert!(plan_recovery(&drained).is_none());
    }
}
