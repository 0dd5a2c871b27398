// src/services/batch.rs
//
// Payroll batch orchestration: roster fan-out, per-employee settlement
// transactions, batch lifecycle, totals, and recomputation. Each employee
// commits atomically (record, ledger lines, arrears and loan mutations);
// a failure for one employee never leaves another half-applied.

use crate::{
    errors::{AppError, AppResult, is_unique_violation},
    models::{
        AttendanceSummary, BatchStatus, CompensationProfile, DeductionLine, DeductionPolicy,
        ExcludedEmployee, GenerateBatchRequest, ObligationKind, PayrollBatch, PayrollBatchDetail,
        PayrollRecord, PeriodOverride, RecalcStatus, RecalculationRequestBody, StatusHistoryEntry,
        TransitionRequest, TxnCategory, UpdatePayrollRecordRequest, validate_month,
    },
    services::{
        arrears::{self, SettlementOutcome},
        calculator::{LayeredAmounts, SettlementCalculator},
        loans::{self, RecoveryOutcome},
    },
    state::AppState,
};
use chrono::Utc;
use futures_util::{StreamExt, stream};
use rust_decimal::{Decimal, RoundingStrategy};
use sqlx::{PgPool, Postgres, Transaction, types::Json};
use tracing::{info, warn};
use uuid::Uuid;

enum EmployeeOutcome {
    Recorded(Box<PayrollRecord>),
    Skipped(ExcludedEmployee),
}

/// Deduction policy in force for a department and month: the version with
/// the greatest effective_month not after the month being processed, with
/// department-specific versions shadowing the global one.
pub async fn policy_for(
    db: &PgPool,
    department_id: Uuid,
    month: &str,
) -> AppResult<DeductionPolicy> {
    sqlx::query_as::<_, DeductionPolicy>(
        "SELECT * FROM deduction_policies
         WHERE (department_id = $1 OR department_id IS NULL)
           AND effective_month <= $2
         ORDER BY (department_id IS NULL), effective_month DESC
         LIMIT 1",
    )
    .bind(department_id)
    .bind(month)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| {
        AppError::Configuration(format!(
            "no deduction policy in force for department {department_id} in {month}"
        ))
    })
}

async fn next_batch_number(
    tx: &mut Transaction<'_, Postgres>,
    department_id: Uuid,
    month: &str,
) -> AppResult<String> {
    let prefix = format!("PB-{}-{}", &department_id.simple().to_string()[..8], month);
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM payroll_batches WHERE batch_number LIKE $1")
            .bind(format!("{prefix}%"))
            .fetch_one(&mut **tx)
            .await?;
    Ok(format!("{prefix}-{:03}", existing + 1))
}

async fn journal_component(
    tx: &mut Transaction<'_, Postgres>,
    batch_id: Uuid,
    record_id: Uuid,
    employee_id: Uuid,
    month: &str,
    category: TxnCategory,
    kind: &str,
    amount: Decimal,
) -> AppResult<()> {
    if amount == Decimal::ZERO {
        return Ok(());
    }
    sqlx::query(
        "INSERT INTO payroll_transactions (
            id, batch_id, record_id, employee_id, month, category, kind, amount
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(Uuid::new_v4())
    .bind(batch_id)
    .bind(record_id)
    .bind(employee_id)
    .bind(month)
    .bind(category)
    .bind(kind)
    .bind(amount)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Compute and persist one employee's record. The whole body runs in one
/// transaction; an optimistic-lock loss on any arrears request or loan
/// rolls everything back and retries from fresh rows.
async fn settle_employee(
    state: &AppState,
    batch_id: Uuid,
    month: &str,
    period: Option<PeriodOverride>,
    policy: &DeductionPolicy,
    profile: &CompensationProfile,
) -> AppResult<EmployeeOutcome> {
    let employee_id = profile.employee_id;

    let attendance = sqlx::query_as::<_, AttendanceSummary>(
        "SELECT * FROM attendance_summaries WHERE employee_id = $1 AND month = $2",
    )
    .bind(employee_id)
    .bind(month)
    .fetch_optional(&state.db)
    .await?;
    let Some(attendance) = attendance else {
        warn!("employee {employee_id} skipped: no attendance summary for {month}");
        return Ok(EmployeeOutcome::Skipped(ExcludedEmployee {
            employee_id,
            reason: format!("no attendance summary for {month}"),
        }));
    };

    'attempt: for attempt in 0..state.config.commit_retry_limit {
        let mut tx = state.db.begin().await?;
        let record_id = Uuid::new_v4();

        let mut arrears_amount = Decimal::ZERO;
        for request in arrears::settleable_for_employee(&mut tx, employee_id, month).await? {
            match arrears::settle_for_month(&mut tx, &request, month, batch_id, record_id).await? {
                SettlementOutcome::Applied { amount }
                | SettlementOutcome::AlreadyApplied { amount } => arrears_amount += amount,
                SettlementOutcome::NotEligible => {}
                SettlementOutcome::VersionConflict => {
                    tx.rollback().await?;
                    warn!(
                        "employee {employee_id}: arrears contention, retry {}",
                        attempt + 1
                    );
                    continue 'attempt;
                }
            }
        }

        let mut total_emi = Decimal::ZERO;
        let mut advance_deduction = Decimal::ZERO;
        for obligation in loans::active_for_employee(&mut tx, employee_id).await? {
            let outcome =
                loans::recover_for_month(&mut tx, &obligation, month, batch_id, record_id).await?;
            let amount = match outcome {
                RecoveryOutcome::Applied { amount }
                | RecoveryOutcome::AlreadyApplied { amount } => amount,
                RecoveryOutcome::NotEligible => continue,
                RecoveryOutcome::VersionConflict => {
                    tx.rollback().await?;
                    warn!(
                        "employee {employee_id}: loan contention, retry {}",
                        attempt + 1
                    );
                    continue 'attempt;
                }
            };
            match obligation.kind {
                ObligationKind::Loan => total_emi += amount,
                ObligationKind::SalaryAdvance => advance_deduction += amount,
            }
        }

        let layered = LayeredAmounts {
            arrears_amount,
            total_emi,
            advance_deduction,
        };
        let calc = SettlementCalculator::calculate(
            &attendance,
            profile,
            policy,
            period.as_ref(),
            layered,
            &[],
        )?;

        let has_exception = calc.net_salary < Decimal::ZERO;
        let exception_reason =
            has_exception.then(|| format!("net salary is negative ({})", calc.net_salary));

        let record = sqlx::query_as::<_, PayrollRecord>(
            "INSERT INTO payroll_records (
                id, batch_id, employee_id, month, attendance,
                basic_pay, earned_salary, allowances, incentive, ot_pay, arrears_amount,
                late_in_deduction, early_out_deduction, attendance_deduction,
                permission_deduction, leave_deduction, other_deductions,
                total_emi, advance_deduction,
                gross_salary, total_deductions, net_salary, round_off,
                has_exception, exception_reason
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,'[]',
                      $17,$18,$19,$20,$21,$22,$23,$24)
            RETURNING *",
        )
        .bind(record_id)
        .bind(batch_id)
        .bind(employee_id)
        .bind(month)
        .bind(Json(&attendance))
        .bind(calc.basic_pay)
        .bind(calc.earned_salary)
        .bind(Json(&calc.allowances))
        .bind(calc.incentive)
        .bind(calc.ot_pay)
        .bind(calc.arrears_amount)
        .bind(calc.late_in_deduction)
        .bind(calc.early_out_deduction)
        .bind(calc.attendance_deduction)
        .bind(calc.permission_deduction)
        .bind(calc.leave_deduction)
        .bind(calc.total_emi)
        .bind(calc.advance_deduction)
        .bind(calc.gross_salary)
        .bind(calc.total_deductions)
        .bind(calc.net_salary)
        .bind(calc.round_off)
        .bind(has_exception)
        .bind(&exception_reason)
        .fetch_one(&mut *tx)
        .await?;

        let earnings: [(&str, Decimal); 3] = [
            ("earned_salary", calc.earned_salary),
            ("incentive", calc.incentive),
            ("ot_pay", calc.ot_pay),
        ];
        for (kind, amount) in earnings {
            journal_component(
                &mut tx,
                batch_id,
                record_id,
                employee_id,
                month,
                TxnCategory::Earning,
                kind,
                amount,
            )
            .await?;
        }
        for line in &calc.allowances {
            journal_component(
                &mut tx,
                batch_id,
                record_id,
                employee_id,
                month,
                TxnCategory::Earning,
                &format!("allowance:{}", line.name),
                line.amount,
            )
            .await?;
        }
        let deductions: [(&str, Decimal); 5] = [
            ("late_in_deduction", calc.late_in_deduction),
            ("early_out_deduction", calc.early_out_deduction),
            ("attendance_deduction", calc.attendance_deduction),
            ("permission_deduction", calc.permission_deduction),
            ("leave_deduction", calc.leave_deduction),
        ];
        for (kind, amount) in deductions {
            journal_component(
                &mut tx,
                batch_id,
                record_id,
                employee_id,
                month,
                TxnCategory::Deduction,
                kind,
                amount,
            )
            .await?;
        }

        tx.commit().await?;
        return Ok(EmployeeOutcome::Recorded(Box::new(record)));
    }

    Err(AppError::Internal(format!(
        "employee {employee_id}: settlement contention persisted past {} retries",
        state.config.commit_retry_limit
    )))
}

/// Run the compute phase over the scope roster with bounded parallelism
/// and fold record/exclusion outcomes into the batch row.
async fn compute_roster(
    state: &AppState,
    batch: &PayrollBatch,
    policy: &DeductionPolicy,
) -> AppResult<Vec<PayrollRecord>> {
    let roster = sqlx::query_as::<_, CompensationProfile>(
        "SELECT * FROM compensation_profiles
         WHERE department_id = $1
           AND ($2::uuid IS NULL OR division_id = $2)
           AND is_active
         ORDER BY employee_id",
    )
    .bind(batch.department_id)
    .bind(batch.division_id)
    .fetch_all(&state.db)
    .await?;
    if roster.is_empty() {
        return Err(AppError::BadRequest(
            "no active employees in the requested scope".into(),
        ));
    }

    let period = batch.period_override();
    let outcomes: Vec<AppResult<EmployeeOutcome>> = stream::iter(roster.into_iter())
        .map(|profile| async move {
            settle_employee(state, batch.id, &batch.month, period, policy, &profile).await
        })
        .buffer_unordered(state.config.generation_concurrency)
        .collect()
        .await;

    let mut records = Vec::new();
    let mut excluded = Vec::new();
    for outcome in outcomes {
        match outcome? {
            EmployeeOutcome::Recorded(record) => records.push(*record),
            EmployeeOutcome::Skipped(skip) => excluded.push(skip),
        }
    }
    records.sort_by_key(|r| r.employee_id);

    sqlx::query("UPDATE payroll_batches SET excluded = $1, updated_at = NOW() WHERE id = $2")
        .bind(Json(&excluded))
        .bind(batch.id)
        .execute(&state.db)
        .await?;
    refresh_totals(&state.db, batch.id).await?;

    Ok(records)
}

/// Generate a payroll batch for every active employee in the scope.
/// Policy problems abort the whole request; employees with missing
/// attendance are excluded with a reason, the rest proceed.
pub async fn generate(
    state: &AppState,
    req: &GenerateBatchRequest,
) -> AppResult<PayrollBatchDetail> {
    validate_month(&req.month).map_err(AppError::Validation)?;
    if let Some(period) = &req.period_override {
        period.validate().map_err(AppError::Validation)?;
    }

    let policy = policy_for(&state.db, req.department_id, &req.month).await?;

    let existing = sqlx::query_as::<_, PayrollBatch>(
        "SELECT * FROM payroll_batches
         WHERE department_id = $1 AND division_id IS NOT DISTINCT FROM $2 AND month = $3",
    )
    .bind(req.department_id)
    .bind(req.division_id)
    .bind(&req.month)
    .fetch_optional(&state.db)
    .await?;
    if let Some(batch) = existing {
        return Err(AppError::conflict(
            format!("batch {} already covers this scope and month", batch.batch_number),
            batch.status.as_str(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let batch_number = next_batch_number(&mut tx, req.department_id, &req.month).await?;
    let history = vec![StatusHistoryEntry {
        status: BatchStatus::Pending.as_str().to_string(),
        changed_by: req.created_by,
        changed_at: Utc::now(),
        reason: None,
    }];
    let inserted = sqlx::query_as::<_, PayrollBatch>(
        "INSERT INTO payroll_batches (
            id, batch_number, department_id, division_id, month,
            period_start, period_end, status_history, created_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING *",
    )
    .bind(Uuid::new_v4())
    .bind(&batch_number)
    .bind(req.department_id)
    .bind(req.division_id)
    .bind(&req.month)
    .bind(req.period_override.map(|p| p.start_date))
    .bind(req.period_override.map(|p| p.end_date))
    .bind(Json(&history))
    .bind(req.created_by)
    .fetch_one(&mut *tx)
    .await;
    let batch = match inserted {
        Ok(batch) => batch,
        // a concurrent request won the scope index race between our
        // pre-check and this insert; report the winner's state
        Err(err) if is_unique_violation(&err) => {
            drop(tx);
            let winner = sqlx::query_as::<_, PayrollBatch>(
                "SELECT * FROM payroll_batches
                 WHERE department_id = $1 AND division_id IS NOT DISTINCT FROM $2 AND month = $3",
            )
            .bind(req.department_id)
            .bind(req.division_id)
            .bind(&req.month)
            .fetch_optional(&state.db)
            .await?;
            let current = winner
                .map(|b| b.status.as_str())
                .unwrap_or(BatchStatus::Pending.as_str());
            return Err(AppError::conflict(
                "a concurrent request already created a batch for this scope and month",
                current,
            ));
        }
        Err(err) => return Err(err.into()),
    };
    tx.commit().await?;

    let records = match compute_roster(state, &batch, &policy).await {
        Ok(records) => records,
        Err(err) => {
            // an aborted generation leaves no batch behind; only the
            // source-keyed settlement lines stay and guard against
            // double application on the retry
            discard_batch(&state.db, batch.id).await?;
            return Err(err);
        }
    };

    let batch = get_batch(&state.db, batch.id).await?;
    info!(
        "batch {} generated: {} records, {} excluded, exceptions={}",
        batch.batch_number,
        records.len(),
        batch.excluded.len(),
        batch.has_exceptions
    );
    Ok(PayrollBatchDetail { batch, records })
}

/// Remove a batch and its component ledger lines. Records go with the
/// batch via cascade; source-keyed settlement and recovery lines are
/// kept so the month's obligations are never applied twice.
pub(crate) async fn discard_batch(db: &PgPool, batch_id: Uuid) -> AppResult<()> {
    let mut tx = db.begin().await?;
    sqlx::query(
        "DELETE FROM payroll_transactions WHERE batch_id = $1 AND source_kind IS NULL",
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;
    sqlx::query("DELETE FROM payroll_batches WHERE id = $1")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

pub async fn get_batch(db: &PgPool, id: Uuid) -> AppResult<PayrollBatch> {
    sqlx::query_as::<_, PayrollBatch>("SELECT * FROM payroll_batches WHERE id = $1")
        .bind(id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Payroll batch {id} not found")))
}

pub async fn get_detail(db: &PgPool, id: Uuid) -> AppResult<PayrollBatchDetail> {
    let batch = get_batch(db, id).await?;
    let records = sqlx::query_as::<_, PayrollRecord>(
        "SELECT * FROM payroll_records WHERE batch_id = $1 ORDER BY employee_id",
    )
    .bind(id)
    .fetch_all(db)
    .await?;
    Ok(PayrollBatchDetail { batch, records })
}

pub async fn list(db: &PgPool, month: Option<String>) -> AppResult<Vec<PayrollBatch>> {
    let rows = match month {
        Some(month) => {
            sqlx::query_as::<_, PayrollBatch>(
                "SELECT * FROM payroll_batches WHERE month = $1 ORDER BY created_at DESC",
            )
            .bind(month)
            .fetch_all(db)
            .await?
        }
        None => {
            sqlx::query_as::<_, PayrollBatch>(
                "SELECT * FROM payroll_batches ORDER BY created_at DESC",
            )
            .fetch_all(db)
            .await?
        }
    };
    Ok(rows)
}

/// Move a batch forward in its lifecycle, appending to the status history.
/// The transition is a compare-and-set on the current status; a concurrent
/// change comes back as a conflict with the authoritative state.
pub async fn transition(
    db: &PgPool,
    batch_id: Uuid,
    to: BatchStatus,
    req: &TransitionRequest,
) -> AppResult<PayrollBatch> {
    let batch = get_batch(db, batch_id).await?;
    if !batch.status.can_transition(to) {
        return Err(AppError::conflict(
            format!(
                "payroll batch cannot move from {} to {}",
                batch.status.as_str(),
                to.as_str()
            ),
            batch.status.as_str(),
        ));
    }

    let mut history = batch.status_history.0.clone();
    history.push(StatusHistoryEntry {
        status: to.as_str().to_string(),
        changed_by: req.actor_id,
        changed_at: Utc::now(),
        reason: req.reason.clone(),
    });

    let updated = sqlx::query_as::<_, PayrollBatch>(
        "UPDATE payroll_batches
         SET status = $1, status_history = $2, updated_at = NOW()
         WHERE id = $3 AND status = $4
         RETURNING *",
    )
    .bind(to)
    .bind(Json(&history))
    .bind(batch_id)
    .bind(batch.status)
    .fetch_optional(db)
    .await?;

    match updated {
        Some(batch) => {
            info!("batch {} moved to {}", batch.batch_number, to.as_str());
            Ok(batch)
        }
        None => {
            let current = get_batch(db, batch_id).await?;
            Err(AppError::conflict(
                "payroll batch status changed concurrently",
                current.status.as_str(),
            ))
        }
    }
}

/// Pre-freeze edit of the record's free-form fields. Changing the manual
/// deduction lines recomputes total deductions and net from the stored
/// breakdown; computed columns are never patched directly.
pub async fn update_record(
    db: &PgPool,
    record_id: Uuid,
    req: &UpdatePayrollRecordRequest,
) -> AppResult<PayrollRecord> {
    let record = sqlx::query_as::<_, PayrollRecord>(
        "SELECT * FROM payroll_records WHERE id = $1",
    )
    .bind(record_id)
    .fetch_optional(db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Payroll record {record_id} not found")))?;

    let batch = get_batch(db, record.batch_id).await?;
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "records cannot be edited after the batch is frozen",
            batch.status.as_str(),
        ));
    }

    let other_lines: Vec<DeductionLine> = match &req.other_deductions {
        Some(lines) => {
            for line in lines {
                if line.amount < Decimal::ZERO {
                    return Err(AppError::Validation(format!(
                        "deduction '{}' must not be negative",
                        line.name
                    )));
                }
            }
            lines.clone()
        }
        None => record.other_deductions.0.clone(),
    };
    let other_sum: Decimal = other_lines.iter().map(|l| l.amount).sum();

    let total_deductions = record.late_in_deduction
        + record.early_out_deduction
        + record.attendance_deduction
        + record.permission_deduction
        + record.leave_deduction
        + other_sum
        + record.total_emi
        + record.advance_deduction;
    let raw_net = record.gross_salary - total_deductions;
    let net_salary = raw_net.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
    let round_off = net_salary - raw_net;
    let has_exception = net_salary < Decimal::ZERO;
    let exception_reason =
        has_exception.then(|| format!("net salary is negative ({net_salary})"));

    let remarks = match &req.remarks {
        Some(value) => value.clone(),
        None => record.remarks.clone(),
    };

    let mut tx = db.begin().await?;
    let updated = sqlx::query_as::<_, PayrollRecord>(
        "UPDATE payroll_records
         SET remarks = $1,
             other_deductions = $2,
             total_deductions = $3,
             net_salary = $4,
             round_off = $5,
             has_exception = $6,
             exception_reason = $7,
             updated_at = NOW()
         WHERE id = $8
         RETURNING *",
    )
    .bind(&remarks)
    .bind(Json(&other_lines))
    .bind(total_deductions)
    .bind(net_salary)
    .bind(round_off)
    .bind(has_exception)
    .bind(&exception_reason)
    .bind(record_id)
    .fetch_one(&mut *tx)
    .await?;

    // keep the ledger's manual-deduction lines in step with the record
    sqlx::query(
        "DELETE FROM payroll_transactions
         WHERE record_id = $1 AND kind LIKE 'manual:%'",
    )
    .bind(record_id)
    .execute(&mut *tx)
    .await?;
    for line in &other_lines {
        if line.amount == Decimal::ZERO {
            continue;
        }
        sqlx::query(
            "INSERT INTO payroll_transactions (
                id, batch_id, record_id, employee_id, month, category, kind, amount
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(Uuid::new_v4())
        .bind(record.batch_id)
        .bind(record_id)
        .bind(record.employee_id)
        .bind(&record.month)
        .bind(TxnCategory::Deduction)
        .bind(format!("manual:{}", line.name))
        .bind(line.amount)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    refresh_totals(db, record.batch_id).await?;
    Ok(updated)
}

/// Roll batch aggregates up from the surviving records.
pub async fn refresh_totals(db: &PgPool, batch_id: Uuid) -> AppResult<()> {
    sqlx::query(
        "UPDATE payroll_batches SET
            total_employees = (SELECT COUNT(*) FROM payroll_records WHERE batch_id = $1),
            total_gross_salary = COALESCE(
                (SELECT SUM(gross_salary) FROM payroll_records WHERE batch_id = $1), 0),
            total_deductions = COALESCE(
                (SELECT SUM(total_deductions) FROM payroll_records WHERE batch_id = $1), 0),
            total_net_salary = COALESCE(
                (SELECT SUM(net_salary) FROM payroll_records WHERE batch_id = $1), 0),
            has_exceptions = EXISTS(
                (SELECT 1 FROM payroll_records WHERE batch_id = $1 AND has_exception)),
            updated_at = NOW()
         WHERE id = $1",
    )
    .bind(batch_id)
    .execute(db)
    .await?;
    Ok(())
}

/// Flag a batch for recomputation. Only meaningful while the batch can
/// still change.
pub async fn request_recalculation(
    db: &PgPool,
    batch_id: Uuid,
    req: &RecalculationRequestBody,
) -> AppResult<PayrollBatch> {
    let batch = get_batch(db, batch_id).await?;
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "recalculation can only be requested before the batch is frozen",
            batch.status.as_str(),
        ));
    }

    let updated = sqlx::query_as::<_, PayrollBatch>(
        "UPDATE payroll_batches
         SET recalc_requested = TRUE, recalc_reason = $1, recalc_status = $2,
             recalc_requested_by = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(&req.reason)
    .bind(RecalcStatus::Requested)
    .bind(req.requested_by)
    .bind(batch_id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

/// Recompute a flagged batch: drop its records and component ledger lines,
/// then re-run the compute phase. Arrears settlements and loan recoveries
/// already journaled for the month are reused, never applied twice.
pub async fn recalculate(state: &AppState, batch_id: Uuid) -> AppResult<PayrollBatchDetail> {
    let batch = get_batch(&state.db, batch_id).await?;
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "frozen batches cannot be recomputed",
            batch.status.as_str(),
        ));
    }
    if !batch.recalc_requested {
        return Err(AppError::BadRequest(
            "no recalculation has been requested for this batch".into(),
        ));
    }

    let policy = policy_for(&state.db, batch.department_id, &batch.month).await?;

    let mut tx = state.db.begin().await?;
    sqlx::query("DELETE FROM payroll_records WHERE batch_id = $1")
        .bind(batch_id)
        .execute(&mut *tx)
        .await?;
    // settlement/recovery lines (source-keyed) stay; they carry the
    // at-most-once guard across the recompute
    sqlx::query(
        "DELETE FROM payroll_transactions WHERE batch_id = $1 AND source_kind IS NULL",
    )
    .bind(batch_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    let records = compute_roster(state, &batch, &policy).await?;

    // a recomputed batch goes back to the start of its lifecycle
    let mut history = batch.status_history.0.clone();
    history.push(StatusHistoryEntry {
        status: BatchStatus::Pending.as_str().to_string(),
        changed_by: batch.recalc_requested_by.unwrap_or(batch.created_by),
        changed_at: Utc::now(),
        reason: batch.recalc_reason.clone(),
    });
    let batch = sqlx::query_as::<_, PayrollBatch>(
        "UPDATE payroll_batches
         SET status = $1, status_history = $2, recalc_requested = FALSE,
             recalc_status = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(BatchStatus::Pending)
    .bind(Json(&history))
    .bind(RecalcStatus::Actioned)
    .bind(batch_id)
    .fetch_one(&state.db)
    .await?;

    info!(
        "batch {} recomputed: {} records",
        batch.batch_number,
        records.len()
    );
    Ok(PayrollBatchDetail { batch, records })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn record_edit_recomputes_net_from_stored_breakdown() {
        // mirrors the arithmetic in update_record
        let gross = dec!(30000);
        let fixed_deductions = dec!(1200); // late/early/attendance/permission/leave
        let emi = dec!(2000);
        let other = dec!(500.25);

        let total_deductions = fixed_deductions + other + emi;
        let raw_net = gross - total_deductions;
        let net = raw_net.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        assert_eq!(total_deductions, dec!(3700.25));
        assert_eq!(net, dec!(26300));
        assert_eq!(net - raw_net, dec!(0.25));
    }

    #[test]
    fn half_rounds_away_from_zero() {
        let up = dec!(100.5).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        assert_eq!(up, dec!(101));
        let down = dec!(-100.5).round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        assert_eq!(down, dec!(-101));
    }

    // the roster fan-out hands each future its own profile; borrowing
    // from the iterator does not satisfy the handler bounds
    #[tokio::test]
    async fn bounded_fan_out_yields_every_outcome() {
        async fn settle(n: u32) -> AppResult<u32> {
            Ok(n * 2)
        }
        let roster: Vec<u32> = (1..=8).collect();
        let results: Vec<AppResult<u32>> = stream::iter(roster.into_iter())
            .map(|n| async move { settle(n).await })
            .buffer_unordered(3)
            .collect()
            .await;
        let mut doubled: Vec<u32> = results.into_iter().map(|r| r.unwrap()).collect();
        doubled.sort_unstable();
        assert_eq!(doubled, vec![2, 4, 6, 8, 10, 12, 14, 16]);
    }

    async fn test_pool() -> PgPool {
        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();
        db
    }

    async fn seed_batch(db: &PgPool) -> (Uuid, Uuid) {
        let batch_id = Uuid::new_v4();
        let department_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO payroll_batches (id, batch_number, department_id, month, created_by)
             VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(batch_id)
        .bind(format!("PB-test-{batch_id}"))
        .bind(department_id)
        .bind("2025-06")
        .bind(Uuid::new_v4())
        .execute(db)
        .await
        .unwrap();
        (batch_id, department_id)
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    async fn discard_keeps_source_keyed_ledger_lines() {
        let db = test_pool().await;
        let (batch_id, _) = seed_batch(&db).await;
        let employee_id = Uuid::new_v4();

        sqlx::query(
            "INSERT INTO payroll_transactions (
                id, batch_id, employee_id, month, category, kind, amount, source_kind, source_id
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(employee_id)
        .bind("2025-06")
        .bind(TxnCategory::Earning)
        .bind("arrears_settlement")
        .bind(dec!(3000))
        .bind("arrears")
        .bind(Uuid::new_v4())
        .execute(&db)
        .await
        .unwrap();
        sqlx::query(
            "INSERT INTO payroll_transactions (
                id, batch_id, employee_id, month, category, kind, amount
            ) VALUES ($1,$2,$3,$4,$5,$6,$7)",
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(employee_id)
        .bind("2025-06")
        .bind(TxnCategory::Earning)
        .bind("earned_salary")
        .bind(dec!(25000))
        .execute(&db)
        .await
        .unwrap();

        discard_batch(&db, batch_id).await.unwrap();

        let batches: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payroll_batches WHERE id = $1")
                .bind(batch_id)
                .fetch_one(&db)
                .await
                .unwrap();
        assert_eq!(batches, 0);

        let kinds: Vec<String> =
            sqlx::query_scalar("SELECT kind FROM payroll_transactions WHERE batch_id = $1")
                .bind(batch_id)
                .fetch_all(&db)
                .await
                .unwrap();
        assert_eq!(kinds, vec!["arrears_settlement".to_string()]);

        sqlx::query("DELETE FROM payroll_transactions WHERE batch_id = $1")
            .bind(batch_id)
            .execute(&db)
            .await
            .unwrap();
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    async fn duplicate_scope_insert_is_a_unique_violation() {
        let db = test_pool().await;
        let (batch_id, department_id) = seed_batch(&db).await;

        let err = sqlx::query(
            "INSERT INTO payroll_batches (id, batch_number, department_id, month, created_by)
             VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(Uuid::new_v4())
        .bind(format!("PB-test-{}", Uuid::new_v4()))
        .bind(department_id)
        .bind("2025-06")
        .bind(Uuid::new_v4())
        .execute(&db)
        .await
        .unwrap_err();
        assert!(is_unique_violation(&err));
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));

        discard_batch(&db, batch_id).await.unwrap();
    }
}
