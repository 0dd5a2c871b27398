// src/services/arrears.rs
//
// Arrears approval workflow and incremental settlement. Settlement is
// at-most-once per (request, month): the guard is the transaction ledger,
// not the remaining balance, so recomputing a batch can never double-apply
// an installment already journaled for that month.

use crate::{
    errors::{AppError, AppResult},
    models::{
        ArrearsRequest, ArrearsStatus, CreateArrearsRequest, SOURCE_KIND_ARREARS, TxnCategory,
    },
};
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::info;
use uuid::Uuid;

/// What one payroll run would do to an arrears request.
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementPlan {
    pub amount: Decimal,
    pub remaining_after: Decimal,
    pub status_after: ArrearsStatus,
}

/// Outcome of a settlement attempt, reported as a normal result — callers
/// routinely probe state before acting.
#[derive(Debug, Clone, PartialEq)]
pub enum SettlementOutcome {
    Applied { amount: Decimal },
    /// A settlement for this (request, month) is already journaled; the
    /// amount is the journaled one, reused verbatim on recomputation.
    AlreadyApplied { amount: Decimal },
    /// Not approved, fully settled, or not yet in its settlement window.
    NotEligible,
    /// Lost an optimistic-lock race; the caller retries the employee.
    VersionConflict,
}

/// Settlement never overshoots: the final installment takes only what
/// remains. Returns None when the request takes no settlement at all.
pub fn plan_settlement(request: &ArrearsRequest) -> Option<SettlementPlan> {
    if !request.status.is_settleable() || request.remaining_amount <= Decimal::ZERO {
        return None;
    }
    let amount = request.monthly_amount.min(request.remaining_amount);
    let remaining_after = request.remaining_amount - amount;
    let status_after = if remaining_after == Decimal::ZERO {
        ArrearsStatus::Settled
    } else {
        ArrearsStatus::PartiallySettled
    };
    Some(SettlementPlan {
        amount,
        remaining_after,
        status_after,
    })
}

// ─── Workflow ─────────────────────────────────────────────────────────────────

pub async fn create(db: &PgPool, req: &CreateArrearsRequest) -> AppResult<ArrearsRequest> {
    req.validate().map_err(AppError::Validation)?;
    let total = req.monthly_amount * Decimal::from(req.month_span());

    let created = sqlx::query_as::<_, ArrearsRequest>(
        "INSERT INTO arrears_requests (
            id, employee_id, start_month, end_month, monthly_amount,
            total_amount, remaining_amount, reason, created_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$6,$7,$8)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(req.employee_id)
    .bind(&req.start_month)
    .bind(&req.end_month)
    .bind(req.monthly_amount)
    .bind(total)
    .bind(&req.reason)
    .bind(req.created_by)
    .fetch_one(db)
    .await?;

    info!(
        "arrears request {} created for employee {}: {} over {} months",
        created.id,
        req.employee_id,
        total,
        req.month_span()
    );
    Ok(created)
}

pub async fn get(db: &PgPool, id: Uuid) -> AppResult<ArrearsRequest> {
    sqlx::query_as::<_, ArrearsRequest>("SELECT * FROM arrears_requests WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Arrears request {id} not found")))
}

pub async fn list(db: &PgPool, employee_id: Option<Uuid>) -> AppResult<Vec<ArrearsRequest>> {
    let rows = match employee_id {
        Some(emp) => {
            sqlx::query_as::<_, ArrearsRequest>(
                "SELECT * FROM arrears_requests WHERE employee_id = $1 ORDER BY created_at DESC",
            )
            .bind(emp)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, ArrearsRequest>(
                "SELECT * FROM arrears_requests ORDER BY created_at DESC",
            )
            .fetch_all(db)
            .await?
        }
    };
    Ok(rows)
}

/// Apply one workflow transition with a status CAS; a stale expectation
/// comes back as a conflict with the authoritative state.
async fn apply_transition(
    db: &PgPool,
    id: Uuid,
    from: ArrearsStatus,
    to: ArrearsStatus,
) -> AppResult<ArrearsRequest> {
    let updated = sqlx::query_as::<_, ArrearsRequest>(
        "UPDATE arrears_requests
         SET status = $1, version = version + 1, updated_at = NOW()
         WHERE id = $2 AND status = $3
         RETURNING *",
    )
    .bind(to)
    .bind(id)
    .bind(from)
    .fetch_optional(db)
    .await?;

    match updated {
        Some(request) => Ok(request),
        None => {
            let current = get(db, id).await?;
            Err(AppError::conflict(
                "arrears status changed concurrently",
                current.status.as_str(),
            ))
        }
    }
}

/// draft → pending_hod.
pub async fn submit(db: &PgPool, id: Uuid) -> AppResult<ArrearsRequest> {
    let request = get(db, id).await?;
    if !request.status.can_transition(ArrearsStatus::PendingHod) {
        return Err(AppError::conflict(
            "only draft arrears requests can be submitted",
            request.status.as_str(),
        ));
    }
    apply_transition(db, id, request.status, ArrearsStatus::PendingHod).await
}

/// Advance the current approval gate (HOD → HR → Admin → approved).
pub async fn approve(db: &PgPool, id: Uuid) -> AppResult<ArrearsRequest> {
    let request = get(db, id).await?;
    let Some(next) = request.status.next_gate() else {
        return Err(AppError::conflict(
            "arrears request is not at an approval gate",
            request.status.as_str(),
        ));
    };
    apply_transition(db, id, request.status, next).await
}

pub async fn reject(db: &PgPool, id: Uuid) -> AppResult<ArrearsRequest> {
    let request = get(db, id).await?;
    if !request.status.can_transition(ArrearsStatus::Rejected) {
        return Err(AppError::conflict(
            "arrears request cannot be rejected from its current state",
            request.status.as_str(),
        ));
    }
    apply_transition(db, id, request.status, ArrearsStatus::Rejected).await
}

pub async fn cancel(db: &PgPool, id: Uuid) -> AppResult<ArrearsRequest> {
    let request = get(db, id).await?;
    if !request.status.can_transition(ArrearsStatus::Cancelled) {
        return Err(AppError::conflict(
            "arrears requests can only be cancelled before approval",
            request.status.as_str(),
        ));
    }
    apply_transition(db, id, request.status, ArrearsStatus::Cancelled).await
}

// ─── Settlement (inside the per-employee payroll transaction) ─────────────────

/// Settleable requests for an employee whose window has opened by `month`.
/// Requests approved after their end month still catch up.
pub async fn settleable_for_employee(
    tx: &mut Transaction<'_, Postgres>,
    employee_id: Uuid,
    month: &str,
) -> AppResult<Vec<ArrearsRequest>> {
    let rows = sqlx::query_as::<_, ArrearsRequest>(
        "SELECT * FROM arrears_requests
         WHERE employee_id = $1
           AND status IN ('approved', 'partially_settled')
           AND remaining_amount > 0
           AND start_month <= $2
         ORDER BY created_at",
    )
    .bind(employee_id)
    .bind(month)
    .fetch_all(&mut **tx)
    .await?;
    Ok(rows)
}

/// Settle one request against one payroll run, journaling the ledger line
/// in the caller's transaction so the balance mutation and the payroll
/// record commit or roll back as a unit.
pub async fn settle_for_month(
    tx: &mut Transaction<'_, Postgres>,
    request: &ArrearsRequest,
    month: &str,
    batch_id: Uuid,
    record_id: Uuid,
) -> AppResult<SettlementOutcome> {
    let journaled: Option<Decimal> = sqlx::query_scalar(
        "SELECT amount FROM payroll_transactions
         WHERE source_kind = $1 AND source_id = $2 AND month = $3",
    )
    .bind(SOURCE_KIND_ARREARS)
    .bind(request.id)
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
        .bind(SOURCE_KIND_ARREARS)
        .bind(request.id)
        .bind(month)
        .execute(&mut **tx)
        .await?;
        return Ok(SettlementOutcome::AlreadyApplied { amount });
    }

    let Some(plan) = plan_settlement(request) else {
        return Ok(SettlementOutcome::NotEligible);
    };

    let applied = sqlx::query(
        "UPDATE arrears_requests
         SET remaining_amount = $1, status = $2, version = version + 1, updated_at = NOW()
         WHERE id = $3 AND version = $4",
    )
    .bind(plan.remaining_after)
    .bind(plan.status_after)
    .bind(request.id)
    .bind(request.version)
    .execute(&mut **tx)
    .await?;
    if applied.rows_affected() == 0 {
        return Ok(SettlementOutcome::VersionConflict);
    }

    sqlx::query(
        "INSERT INTO payroll_transactions (
            id, batch_id, record_id, employee_id, month,
            category, kind, amount, source_kind, source_id
        ) VALUES ($1,$2,$3,$4,$5,$6,'arrears_settlement',$7,$8,$9)",
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(record_id)
    .bind(request.employee_id)
    .bind(month)
    .bind(TxnCategory::Earning)
    .bind(plan.amount)
    .bind(SOURCE_KIND_ARREARS)
    .bind(request.id)
    .execute(&mut **tx)
    .await?;

    Ok(SettlementOutcome::Applied { amount: plan.amount })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    fn request(status: ArrearsStatus, monthly: Decimal, total: Decimal, remaining: Decimal) -> ArrearsRequest {
        ArrearsRequest {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            start_month: "2025-01".into(),
            end_month: "2025-04".into(),
            monthly_amount: monthly,
            total_amount: total,
            remaining_amount: remaining,
            reason: "salary revision back pay".into(),
            status,
            version: 0,
            created_by: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn four_installments_then_noop() {
        // ₹12,000 over 4 months at ₹3,000/month
        let mut req = request(ArrearsStatus::Approved, dec!(3000), dec!(12000), dec!(12000));

        for expected_remaining in [dec!(9000), dec!(6000), dec!(3000)] {
            let plan = plan_settlement(&req).unwrap();
            assert_eq!(plan.amount, dec!(3000));
            assert_eq!(plan.remaining_after, expected_remaining);
            assert_eq!(plan.status_after, ArrearsStatus::PartiallySettled);
            req.remaining_amount = plan.remaining_after;
            req.status = plan.status_after;
        }

        let last = plan_settlement(&req).unwrap();
        assert_eq!(last.amount, dec!(3000));
        assert_eq!(last.remaining_after, dec!(0));
        assert_eq!(last.status_after, ArrearsStatus::Settled);
        req.remaining_amount = last.remaining_after;
        req.status = last.status_after;

        // fifth attempt takes nothing
        assert!(plan_settlement(&req).is_none());
    }

    #[test]
    fn final_installment_never_overshoots() {
        let req = request(
            ArrearsStatus::PartiallySettled,
            dec!(3000),
            dec!(12000),
            dec!(1200),
        );
        let plan = plan_settlement(&req).unwrap();
        assert_eq!(plan.amount, dec!(1200));
        assert_eq!(plan.remaining_after, dec!(0));
        assert_eq!(plan.status_after, ArrearsStatus::Settled);
    }

    #[test]
    fn remaining_is_monotonically_non_increasing() {
        let mut req = request(ArrearsStatus::Approved, dec!(500), dec!(2000), dec!(2000));
        let mut previous = req.remaining_amount;
        while let Some(plan) = plan_settlement(&req) {
            assert!(plan.remaining_after <= previous);
            assert!(plan.remaining_after >= dec!(0));
            previous = plan.remaining_after;
            req.remaining_amount = plan.remaining_after;
            req.status = plan.status_after;
        }
        assert_eq!(req.remaining_amount, dec!(0));
        assert_eq!(req.status, ArrearsStatus::Settled);
    }

    #[test]
    fn unapproved_requests_take_no_settlement() {
        for status in [
            ArrearsStatus::Draft,
            ArrearsStatus::PendingHod,
            ArrearsStatus::PendingHr,
            ArrearsStatus::PendingAdmin,
            ArrearsStatus::Rejected,
            ArrearsStatus::Cancelled,
        ] {
            let req = request(status, dec!(3000), dec!(12000), dec!(12000));
            assert!(plan_settlement(&req).is_none(), "{status:?} should not settle");
        }
    }
}
