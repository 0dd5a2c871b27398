// src/services/bonus.rs
//
// Bonus tier resolution and the bonus batch lifecycle. Tier math is pure;
// batch generation, overrides and recalculation write through sqlx.

use crate::{
    errors::{AppError, AppResult},
    models::{
        AttendanceSummary, BonusBatch, BonusBatchDetail, BonusBatchStatus, BonusPolicy,
        BonusRecord, BonusTier, CompensationProfile, CreateBonusBatchRequest, RecalcStatus,
        SalaryComponent, UpdateBonusRecordRequest,
    },
    state::AppState,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

/// Outcome of resolving one employee against a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct BonusOutcome {
    pub salary_component_value: Decimal,
    pub calculated_bonus: Decimal,
    /// Set when no tier matched the attendance percentage; the record is
    /// flagged for manual review instead of being defaulted into a tier.
    pub needs_review: bool,
}

/// Tiers must be sorted by min_percentage and non-overlapping. A shared
/// boundary (one tier's max equal to the next tier's min) is legal; the
/// lower tier wins it at resolution time. Overlaps are a configuration
/// error surfaced at evaluation, never silently resolved.
pub fn validate_tiers(tiers: &[BonusTier]) -> AppResult<()> {
    if tiers.is_empty() {
        return Err(AppError::Configuration(
            "bonus policy has no tiers".into(),
        ));
    }
    for tier in tiers {
        if tier.min_percentage > tier.max_percentage {
            return Err(AppError::Configuration(format!(
                "tier [{}, {}] has min above max",
                tier.min_percentage, tier.max_percentage
            )));
        }
        if tier.bonus_percentage < Decimal::ZERO {
            return Err(AppError::Configuration(format!(
                "tier [{}, {}] has a negative bonus percentage",
                tier.min_percentage, tier.max_percentage
            )));
        }
    }
    for pair in tiers.windows(2) {
        if pair[1].min_percentage < pair[0].min_percentage {
            return Err(AppError::Configuration(
                "bonus tiers are not sorted by min_percentage".into(),
            ));
        }
        if pair[1].min_percentage < pair[0].max_percentage {
            return Err(AppError::Configuration(format!(
                "bonus tiers [{}, {}] and [{}, {}] overlap",
                pair[0].min_percentage,
                pair[0].max_percentage,
                pair[1].min_percentage,
                pair[1].max_percentage
            )));
        }
    }
    Ok(())
}

/// First inclusive match in sorted order, so a percentage sitting on a
/// boundary shared by two tiers resolves to the lower tier.
pub fn resolve_tier(tiers: &[BonusTier], percentage: Decimal) -> Option<&BonusTier> {
    tiers
        .iter()
        .find(|t| percentage >= t.min_percentage && percentage <= t.max_percentage)
}

/// Resolve one attendance percentage against a policy given the
/// employee's reference gross salary.
pub fn compute_bonus(
    policy: &BonusPolicy,
    reference_gross: Decimal,
    percentage: Decimal,
) -> AppResult<BonusOutcome> {
    validate_tiers(&policy.tiers)?;

    let salary_component_value = match policy.salary_component {
        SalaryComponent::GrossSalary => {
            let multiplier = policy.gross_salary_multiplier.ok_or_else(|| {
                AppError::Configuration(
                    "gross_salary policy is missing gross_salary_multiplier".into(),
                )
            })?;
            reference_gross * multiplier
        }
        SalaryComponent::FixedAmount => policy.fixed_bonus_amount.ok_or_else(|| {
            AppError::Configuration("fixed_amount policy is missing fixed_bonus_amount".into())
        })?,
    };

    match resolve_tier(&policy.tiers, percentage) {
        Some(tier) => Ok(BonusOutcome {
            salary_component_value,
            calculated_bonus: salary_component_value * tier.bonus_percentage / Decimal::ONE_HUNDRED,
            needs_review: false,
        }),
        None => Ok(BonusOutcome {
            salary_component_value,
            calculated_bonus: Decimal::ZERO,
            needs_review: true,
        }),
    }
}

/// Aggregated attendance percentage over a range of monthly summaries.
/// Working days (present + leave + absent) are the denominator; weekly
/// offs and holidays do not count against the employee.
pub fn attendance_stats(summaries: &[AttendanceSummary]) -> (Decimal, Decimal, Decimal) {
    let mut attended = Decimal::ZERO;
    let mut working = Decimal::ZERO;
    for s in summaries {
        attended += s.present_days;
        working += s.present_days + s.paid_leave_days + s.unpaid_leave_days + s.absent_days;
    }
    let percentage = if working > Decimal::ZERO {
        (attended / working * Decimal::ONE_HUNDRED).round_dp(2)
    } else {
        Decimal::ZERO
    };
    (attended, working, percentage)
}

// ─── Batch operations ─────────────────────────────────────────────────────────

pub async fn load_policy(db: &PgPool, policy_id: Uuid) -> AppResult<BonusPolicy> {
    sqlx::query_as::<_, BonusPolicy>("SELECT * FROM bonus_policies WHERE id = $1")
        .bind(policy_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bonus policy {policy_id} not found")))
}

async fn next_batch_number(
    tx: &mut Transaction<'_, Postgres>,
    department_id: Uuid,
    end_month: &str,
) -> AppResult<String> {
    let prefix = format!(
        "BO-{}-{}",
        &department_id.simple().to_string()[..8],
        end_month
    );
    let existing: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM bonus_batches WHERE batch_number LIKE $1")
            .bind(format!("{prefix}%"))
            .fetch_one(&mut **tx)
            .await?;
    Ok(format!("{prefix}-{:03}", existing + 1))
}

/// Generate a bonus batch for every active employee in scope. Policy tier
/// problems abort the whole request; employees with no attendance data in
/// the range are skipped with a warning, the rest proceed.
pub async fn generate_batch(state: &AppState, req: &CreateBonusBatchRequest) -> AppResult<BonusBatch> {
    req.validate().map_err(AppError::Validation)?;
    let policy = load_policy(&state.db, req.policy_id).await?;
    validate_tiers(&policy.tiers)?;

    let roster = sqlx::query_as::<_, CompensationProfile>(
        "SELECT * FROM compensation_profiles
         WHERE department_id = $1 AND division_id IS NOT DISTINCT FROM $2 AND is_active",
    )
    .bind(req.department_id)
    .bind(req.division_id)
    .fetch_all(&state.db)
    .await?;

    if roster.is_empty() {
        return Err(AppError::NotFound(
            "no active employees in the requested scope".into(),
        ));
    }

    let mut tx = state.db.begin().await?;
    let batch_number = next_batch_number(&mut tx, req.department_id, &req.end_month).await?;
    let batch_id = Uuid::new_v4();

    // batch row first, records reference it by FK; totals follow once
    // the roster is resolved
    sqlx::query(
        "INSERT INTO bonus_batches (
            id, batch_number, department_id, division_id, policy_id,
            start_month, end_month, created_by
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(batch_id)
    .bind(&batch_number)
    .bind(req.department_id)
    .bind(req.division_id)
    .bind(req.policy_id)
    .bind(&req.start_month)
    .bind(&req.end_month)
    .bind(req.created_by)
    .execute(&mut *tx)
    .await?;

    let mut total_bonus = Decimal::ZERO;
    let mut total_employees = 0i32;

    for profile in &roster {
        let summaries = sqlx::query_as::<_, AttendanceSummary>(
            "SELECT * FROM attendance_summaries
             WHERE employee_id = $1 AND month >= $2 AND month <= $3
             ORDER BY month",
        )
        .bind(profile.employee_id)
        .bind(&req.start_month)
        .bind(&req.end_month)
        .fetch_all(&mut *tx)
        .await?;

        if summaries.is_empty() {
            warn!(
                "no attendance data for employee {} in {}..{}, skipping",
                profile.employee_id, req.start_month, req.end_month
            );
            continue;
        }

        let (attended, working, percentage) = attendance_stats(&summaries);
        let outcome = compute_bonus(&policy, profile.reference_gross(), percentage)?;

        sqlx::query(
            "INSERT INTO bonus_records (
                id, batch_id, employee_id, attendance_days, total_month_days,
                attendance_percentage, salary_component_value,
                calculated_bonus, final_bonus, needs_review
            ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
        )
        .bind(Uuid::new_v4())
        .bind(batch_id)
        .bind(profile.employee_id)
        .bind(attended)
        .bind(working)
        .bind(percentage)
        .bind(outcome.salary_component_value)
        .bind(outcome.calculated_bonus)
        .bind(outcome.calculated_bonus)
        .bind(outcome.needs_review)
        .execute(&mut *tx)
        .await?;

        total_bonus += outcome.calculated_bonus;
        total_employees += 1;
    }

    let batch = sqlx::query_as::<_, BonusBatch>(
        "UPDATE bonus_batches
         SET total_employees = $1, total_bonus = $2, updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(total_employees)
    .bind(total_bonus)
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;
    info!(
        "bonus batch {} generated: {} employees, total {}",
        batch_number, total_employees, total_bonus
    );
    Ok(batch)
}

pub async fn get_batch(db: &PgPool, batch_id: Uuid) -> AppResult<BonusBatch> {
    sqlx::query_as::<_, BonusBatch>("SELECT * FROM bonus_batches WHERE id = $1")
        .bind(batch_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bonus batch {batch_id} not found")))
}

pub async fn list_batches(db: &PgPool) -> AppResult<Vec<BonusBatch>> {
    let batches =
        sqlx::query_as::<_, BonusBatch>("SELECT * FROM bonus_batches ORDER BY created_at DESC")
            .fetch_all(db)
            .await?;
    Ok(batches)
}

pub async fn get_detail(db: &PgPool, batch_id: Uuid) -> AppResult<BonusBatchDetail> {
    let batch = get_batch(db, batch_id).await?;
    let records = sqlx::query_as::<_, BonusRecord>(
        "SELECT * FROM bonus_records WHERE batch_id = $1 ORDER BY employee_id",
    )
    .bind(batch_id)
    .fetch_all(db)
    .await?;
    Ok(BonusBatchDetail { batch, records })
}

/// Compare-and-swap on the current status; a stale expectation is a
/// conflict carrying the authoritative state.
pub async fn transition(
    db: &PgPool,
    batch_id: Uuid,
    to: BonusBatchStatus,
) -> AppResult<BonusBatch> {
    let batch = get_batch(db, batch_id).await?;
    if !batch.status.can_transition(to) {
        return Err(AppError::conflict(
            format!(
                "bonus batch cannot move from {} to {}",
                batch.status.as_str(),
                to.as_str()
            ),
            batch.status.as_str(),
        ));
    }

    let updated = sqlx::query_as::<_, BonusBatch>(
        "UPDATE bonus_batches SET status = $1, updated_at = NOW()
         WHERE id = $2 AND status = $3
         RETURNING *",
    )
    .bind(to)
    .bind(batch_id)
    .bind(batch.status)
    .fetch_optional(db)
    .await?;

    match updated {
        Some(b) => Ok(b),
        None => {
            let current = get_batch(db, batch_id).await?;
            Err(AppError::conflict(
                "bonus batch status changed concurrently",
                current.status.as_str(),
            ))
        }
    }
}

/// Manual override of final_bonus (and remarks). calculated_bonus is the
/// system's audit figure and is never touched. Rejected once frozen.
pub async fn update_record(
    db: &PgPool,
    record_id: Uuid,
    req: &UpdateBonusRecordRequest,
) -> AppResult<BonusRecord> {
    let record = sqlx::query_as::<_, BonusRecord>("SELECT * FROM bonus_records WHERE id = $1")
        .bind(record_id)
        .fetch_optional(db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Bonus record {record_id} not found")))?;

    let batch = get_batch(db, record.batch_id).await?;
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "bonus record is immutable once its batch is frozen",
            batch.status.as_str(),
        ));
    }

    if let Some(bonus) = req.final_bonus {
        if bonus < Decimal::ZERO {
            return Err(AppError::Validation("final_bonus must not be negative".into()));
        }
    }

    let remarks = match &req.remarks {
        Some(value) => value.clone(),
        None => record.remarks.clone(),
    };

    let mut tx = db.begin().await?;
    let updated = sqlx::query_as::<_, BonusRecord>(
        "UPDATE bonus_records
         SET final_bonus = COALESCE($1, final_bonus),
             remarks = $2,
             updated_at = NOW()
         WHERE id = $3
         RETURNING *",
    )
    .bind(req.final_bonus)
    .bind(&remarks)
    .bind(record_id)
    .fetch_one(&mut *tx)
    .await?;

    refresh_totals(&mut tx, record.batch_id).await?;
    tx.commit().await?;
    Ok(updated)
}

async fn refresh_totals(tx: &mut Transaction<'_, Postgres>, batch_id: Uuid) -> AppResult<()> {
    sqlx::query(
        "UPDATE bonus_batches b SET
            total_employees = agg.cnt,
            total_bonus = agg.total,
            updated_at = NOW()
         FROM (
            SELECT COUNT(*)::int AS cnt, COALESCE(SUM(final_bonus), 0) AS total
            FROM bonus_records WHERE batch_id = $1
         ) agg
         WHERE b.id = $1",
    )
    .bind(batch_id)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

/// Flag a batch for recalculation. Does not change any bonus value; the
/// privileged recalculate operation must action it.
pub async fn request_recalculation(
    db: &PgPool,
    batch_id: Uuid,
    requested_by: Uuid,
    reason: &str,
) -> AppResult<BonusBatch> {
    let batch = get_batch(db, batch_id).await?;
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "recalculation can only be requested while pending or approved",
            batch.status.as_str(),
        ));
    }
    let updated = sqlx::query_as::<_, BonusBatch>(
        "UPDATE bonus_batches
         SET recalc_requested = TRUE, recalc_reason = $1,
             recalc_status = $2, recalc_requested_by = $3, updated_at = NOW()
         WHERE id = $4
         RETURNING *",
    )
    .bind(reason)
    .bind(RecalcStatus::Requested)
    .bind(requested_by)
    .bind(batch_id)
    .fetch_one(db)
    .await?;
    Ok(updated)
}

/// Re-run the resolver across the batch. Overrides are reset to the fresh
/// calculated values and the batch returns to pending.
pub async fn recalculate(state: &AppState, batch_id: Uuid) -> AppResult<BonusBatch> {
    let batch = get_batch(&state.db, batch_id).await?;
    if !batch.recalc_requested || batch.recalc_status != Some(RecalcStatus::Requested) {
        return Err(AppError::conflict(
            "no actionable recalculation request on this batch",
            batch.status.as_str(),
        ));
    }
    if !batch.status.is_mutable() {
        return Err(AppError::conflict(
            "frozen bonus batches cannot be recalculated",
            batch.status.as_str(),
        ));
    }

    let policy = load_policy(&state.db, batch.policy_id).await?;
    validate_tiers(&policy.tiers)?;

    let records =
        sqlx::query_as::<_, BonusRecord>("SELECT * FROM bonus_records WHERE batch_id = $1")
            .bind(batch_id)
            .fetch_all(&state.db)
            .await?;

    let mut tx = state.db.begin().await?;
    for record in &records {
        let profile = sqlx::query_as::<_, CompensationProfile>(
            "SELECT * FROM compensation_profiles WHERE employee_id = $1",
        )
        .bind(record.employee_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(profile) = profile else {
            warn!(
                "employee {} lost its compensation profile, keeping stale bonus figure",
                record.employee_id
            );
            continue;
        };

        let outcome = compute_bonus(&policy, profile.reference_gross(), record.attendance_percentage)?;
        sqlx::query(
            "UPDATE bonus_records
             SET salary_component_value = $1, calculated_bonus = $2,
                 final_bonus = $2, needs_review = $3, updated_at = NOW()
             WHERE id = $4",
        )
        .bind(outcome.salary_component_value)
        .bind(outcome.calculated_bonus)
        .bind(outcome.needs_review)
        .bind(record.id)
        .execute(&mut *tx)
        .await?;
    }

    refresh_totals(&mut tx, batch_id).await?;
    let updated = sqlx::query_as::<_, BonusBatch>(
        "UPDATE bonus_batches
         SET status = 'pending', recalc_requested = FALSE,
             recalc_status = $1, updated_at = NOW()
         WHERE id = $2
         RETURNING *",
    )
    .bind(RecalcStatus::Actioned)
    .bind(batch_id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;

    info!("bonus batch {} recalculated at {}", batch_id, Utc::now());
    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sqlx::types::Json;

    fn tier(min: Decimal, max: Decimal, pct: Decimal) -> BonusTier {
        BonusTier {
            min_percentage: min,
            max_percentage: max,
            bonus_percentage: pct,
        }
    }

    fn standard_tiers() -> Vec<BonusTier> {
        vec![
            tier(dec!(0), dec!(74), dec!(0)),
            tier(dec!(75), dec!(89), dec!(50)),
            tier(dec!(90), dec!(100), dec!(100)),
        ]
    }

    fn gross_policy(tiers: Vec<BonusTier>) -> BonusPolicy {
        BonusPolicy {
            id: Uuid::new_v4(),
            name: "annual attendance bonus".into(),
            policy_type: crate::models::BonusPolicyType::AttendanceRegular,
            salary_component: SalaryComponent::GrossSalary,
            gross_salary_multiplier: Some(dec!(1)),
            fixed_bonus_amount: None,
            tiers: Json(tiers),
            effective_month: "2025-01".into(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn tier_bands_pay_their_percentage_of_base() {
        let policy = gross_policy(standard_tiers());
        let base = dec!(10000);

        let at_92 = compute_bonus(&policy, base, dec!(92)).unwrap();
        assert_eq!(at_92.calculated_bonus, dec!(10000));
        assert!(!at_92.needs_review);

        let at_80 = compute_bonus(&policy, base, dec!(80)).unwrap();
        assert_eq!(at_80.calculated_bonus, dec!(5000));

        let at_50 = compute_bonus(&policy, base, dec!(50)).unwrap();
        assert_eq!(at_50.calculated_bonus, dec!(0));
        assert!(!at_50.needs_review);
    }

    #[test]
    fn shared_boundary_resolves_to_lower_tier() {
        let tiers = vec![
            tier(dec!(0), dec!(75), dec!(10)),
            tier(dec!(75), dec!(100), dec!(50)),
        ];
        assert!(validate_tiers(&tiers).is_ok());

        let matched = resolve_tier(&tiers, dec!(75)).unwrap();
        assert_eq!(matched.bonus_percentage, dec!(10));
    }

    #[test]
    fn boundaries_are_inclusive_both_ends() {
        let tiers = standard_tiers();
        assert_eq!(resolve_tier(&tiers, dec!(0)).unwrap().bonus_percentage, dec!(0));
        assert_eq!(resolve_tier(&tiers, dec!(74)).unwrap().bonus_percentage, dec!(0));
        assert_eq!(resolve_tier(&tiers, dec!(75)).unwrap().bonus_percentage, dec!(50));
        assert_eq!(resolve_tier(&tiers, dec!(89)).unwrap().bonus_percentage, dec!(50));
        assert_eq!(resolve_tier(&tiers, dec!(90)).unwrap().bonus_percentage, dec!(100));
        assert_eq!(resolve_tier(&tiers, dec!(100)).unwrap().bonus_percentage, dec!(100));
    }

    #[test]
    fn overlapping_tiers_are_a_configuration_error() {
        let tiers = vec![
            tier(dec!(0), dec!(80), dec!(10)),
            tier(dec!(75), dec!(100), dec!(50)),
        ];
        let err = validate_tiers(&tiers).unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn unsorted_tiers_are_rejected() {
        let tiers = vec![
            tier(dec!(75), dec!(100), dec!(50)),
            tier(dec!(0), dec!(74), dec!(0)),
        ];
        assert!(validate_tiers(&tiers).is_err());
    }

    #[test]
    fn gap_yields_zero_and_review_flag() {
        // hole between 75 and 89
        let tiers = vec![
            tier(dec!(0), dec!(74), dec!(0)),
            tier(dec!(90), dec!(100), dec!(100)),
        ];
        let policy = gross_policy(tiers);
        let outcome = compute_bonus(&policy, dec!(10000), dec!(80)).unwrap();
        assert_eq!(outcome.calculated_bonus, dec!(0));
        assert!(outcome.needs_review);
    }

    #[test]
    fn fixed_amount_component_ignores_gross() {
        let mut policy = gross_policy(standard_tiers());
        policy.salary_component = SalaryComponent::FixedAmount;
        policy.fixed_bonus_amount = Some(dec!(8000));
        policy.gross_salary_multiplier = None;

        let outcome = compute_bonus(&policy, dec!(99999), dec!(95)).unwrap();
        assert_eq!(outcome.salary_component_value, dec!(8000));
        assert_eq!(outcome.calculated_bonus, dec!(8000));
    }

    #[test]
    fn multiplier_scales_the_base() {
        let mut policy = gross_policy(standard_tiers());
        policy.gross_salary_multiplier = Some(dec!(2));

        let outcome = compute_bonus(&policy, dec!(10000), dec!(92)).unwrap();
        assert_eq!(outcome.salary_component_value, dec!(20000));
        assert_eq!(outcome.calculated_bonus, dec!(20000));
    }

    #[test]
    fn attendance_stats_ignore_offs_and_holidays() {
        let make = |present: Decimal, absent: Decimal| AttendanceSummary {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            month: "2025-01".into(),
            total_days_in_month: 31,
            present_days: present,
            paid_leave_days: dec!(0),
            unpaid_leave_days: dec!(0),
            weekly_offs: dec!(4),
            holidays: dec!(2),
            absent_days: absent,
            payable_shifts: present,
            extra_days: dec!(0),
            total_paid_days: present,
            late_ins_count: 0,
            early_outs_count: 0,
            permission_hours: dec!(0),
            ot_hours: dec!(0),
            created_at: Utc::now(),
        };

        let (attended, working, pct) = attendance_stats(&[make(dec!(20), dec!(5)), make(dec!(25), dec!(0))]);
        assert_eq!(attended, dec!(45));
        assert_eq!(working, dec!(50));
        assert_eq!(pct, dec!(90));
    }

    #[tokio::test]
    #[ignore = "needs a Postgres database at DATABASE_URL"]
    async fn generated_batch_owns_its_records() {
        use crate::config::Config;
        use chrono::NaiveDate;

        let url =
            std::env::var("DATABASE_URL").expect("DATABASE_URL must point at a test database");
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .unwrap();
        sqlx::migrate!("./migrations").run(&db).await.unwrap();

        let policy_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO bonus_policies (
                id, name, policy_type, salary_component,
                gross_salary_multiplier, tiers, effective_month
            ) VALUES ($1,$2,$3,$4,$5,$6,$7)",
        )
        .bind(policy_id)
        .bind(format!("attendance bonus {policy_id}"))
        .bind(crate::models::BonusPolicyType::AttendanceRegular)
        .bind(SalaryComponent::GrossSalary)
        .bind(dec!(1))
        .bind(Json(standard_tiers()))
        .bind("2025-01")
        .execute(&db)
        .await
        .unwrap();

        let department_id = Uuid::new_v4();
        let employee_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO compensation_profiles (
                id, employee_id, department_id, basic_salary, effective_from
            ) VALUES ($1,$2,$3,$4,$5)",
        )
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind(department_id)
        .bind(dec!(10000))
        .bind(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap())
        .execute(&db)
        .await
        .unwrap();

        // 23 present of 25 working days -> 92%, top tier
        sqlx::query(
            "INSERT INTO attendance_summaries (
                id, employee_id, month, total_days_in_month, present_days,
                paid_leave_days, unpaid_leave_days, weekly_offs, holidays,
                absent_days, payable_shifts, extra_days, total_paid_days,
                late_ins_count, early_outs_count, permission_hours, ot_hours
            ) VALUES ($1,$2,$3,31,23,0,0,4,2,2,23,0,23,0,0,0,0)",
        )
        .bind(Uuid::new_v4())
        .bind(employee_id)
        .bind("2025-01")
        .execute(&db)
        .await
        .unwrap();

        let state = AppState::new(
            db.clone(),
            Config {
                server_host: "127.0.0.1".into(),
                server_port: 0,
                database_url: url,
                generation_concurrency: 4,
                commit_retry_limit: 3,
            },
        );
        let req = CreateBonusBatchRequest {
            department_id,
            division_id: None,
            policy_id,
            start_month: "2025-01".into(),
            end_month: "2025-01".into(),
            created_by: Uuid::new_v4(),
        };
        let batch = generate_batch(&state, &req).await.unwrap();
        assert_eq!(batch.total_employees, 1);
        assert_eq!(batch.total_bonus, dec!(10000));

        let detail = get_detail(&db, batch.id).await.unwrap();
        assert_eq!(detail.records.len(), 1);
        assert_eq!(detail.records[0].employee_id, employee_id);
        assert_eq!(detail.records[0].batch_id, batch.id);
        assert_eq!(detail.records[0].final_bonus, dec!(10000));

        sqlx::query("DELETE FROM bonus_batches WHERE id = $1")
            .bind(batch.id)
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM bonus_policies WHERE id = $1")
            .bind(policy_id)
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM compensation_profiles WHERE employee_id = $1")
            .bind(employee_id)
            .execute(&db)
            .await
            .unwrap();
        sqlx::query("DELETE FROM attendance_summaries WHERE employee_id = $1")
            .bind(employee_id)
            .execute(&db)
            .await
            .unwrap();
    }
}
