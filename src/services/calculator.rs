// src/services/calculator.rs
//
// Earnings/deductions calculation for one employee-month. Pure: no I/O,
// no rounding anywhere except the single terminal net-salary rounding,
// whose residual is preserved as round_off.

use crate::{
    errors::{AppError, AppResult},
    models::{
        AllowanceBasis, AllowanceLine, AttendanceSummary, CompensationProfile, DeductionLine,
        DeductionPolicy, OtRateMode, PeriodOverride,
    },
};
use rust_decimal::{Decimal, RoundingStrategy};

pub struct SettlementCalculator;

/// Amounts layered in from the arrears ledger and the loan/advance
/// recovery engine before the net is settled.
#[derive(Debug, Clone, Copy, Default)]
pub struct LayeredAmounts {
    pub arrears_amount: Decimal,
    pub total_emi: Decimal,
    pub advance_deduction: Decimal,
}

#[derive(Debug, Clone)]
pub struct CalculatedPayroll {
    pub per_day_basic_pay: Decimal,
    pub basic_pay: Decimal,
    pub earned_salary: Decimal,
    pub allowances: Vec<AllowanceLine>,
    pub incentive: Decimal,
    pub ot_pay: Decimal,
    pub arrears_amount: Decimal,
    pub late_in_deduction: Decimal,
    pub early_out_deduction: Decimal,
    pub attendance_deduction: Decimal,
    pub permission_deduction: Decimal,
    pub leave_deduction: Decimal,
    pub other_deductions: Vec<DeductionLine>,
    pub total_emi: Decimal,
    pub advance_deduction: Decimal,
    pub gross_salary: Decimal,
    pub total_deductions: Decimal,
    /// Rounded to the nearest currency unit; may be negative after loan
    /// recovery — that is a business exception for the caller to record,
    /// not something to truncate here.
    pub net_salary: Decimal,
    pub round_off: Decimal,
}

impl SettlementCalculator {
    /// Calculate the full earnings/deductions breakdown for one
    /// employee-month. `layered` carries the arrears settlement and
    /// loan/advance recovery already determined for this cycle.
    pub fn calculate(
        attendance: &AttendanceSummary,
        profile: &CompensationProfile,
        policy: &DeductionPolicy,
        period: Option<&PeriodOverride>,
        layered: LayeredAmounts,
        other_deductions: &[DeductionLine],
    ) -> AppResult<CalculatedPayroll> {
        let divisor = Self::divisor(attendance, policy, period)?;

        if layered.arrears_amount < Decimal::ZERO
            || layered.total_emi < Decimal::ZERO
            || layered.advance_deduction < Decimal::ZERO
        {
            return Err(AppError::Validation(
                "layered arrears/recovery amounts must not be negative".into(),
            ));
        }

        let per_day_basic_pay = profile.basic_salary / divisor;
        let earned_salary = per_day_basic_pay * attendance.total_paid_days;
        let incentive = per_day_basic_pay * attendance.extra_days;

        let ot_pay = match policy.ot_rate_mode {
            OtRateMode::PerHour => policy.ot_rate * attendance.ot_hours,
            OtRateMode::FlatPerMonth => {
                if attendance.ot_hours > Decimal::ZERO {
                    policy.ot_rate
                } else {
                    Decimal::ZERO
                }
            }
        };

        let allowances: Vec<AllowanceLine> = profile
            .allowances
            .iter()
            .map(|line| AllowanceLine {
                name: line.name.clone(),
                amount: match line.basis {
                    AllowanceBasis::Fixed => line.amount,
                    AllowanceBasis::PerDay => line.amount * attendance.total_paid_days,
                },
                basis: line.basis,
            })
            .collect();
        let total_allowances: Decimal = allowances.iter().map(|a| a.amount).sum();

        // Breakdown retained per component for audit, not just the total.
        let late_in_deduction = Decimal::from(attendance.late_ins_count) * policy.late_in_rate;
        let early_out_deduction = Decimal::from(attendance.early_outs_count) * policy.early_out_rate;
        let attendance_deduction = late_in_deduction + early_out_deduction;
        let permission_deduction = attendance.permission_hours * policy.permission_rate;

        // leave_deduction_rate is a per-day multiplier; 1 = a full day's
        // basic pay per unpaid leave day.
        let leave_deduction =
            attendance.unpaid_leave_days * per_day_basic_pay * policy.leave_deduction_rate;

        for line in other_deductions {
            if line.amount < Decimal::ZERO {
                return Err(AppError::Validation(format!(
                    "other deduction '{}' must not be negative",
                    line.name
                )));
            }
        }
        let total_other: Decimal = other_deductions.iter().map(|d| d.amount).sum();

        let components = [
            ("earned_salary", earned_salary),
            ("incentive", incentive),
            ("ot_pay", ot_pay),
            ("attendance_deduction", attendance_deduction),
            ("permission_deduction", permission_deduction),
            ("leave_deduction", leave_deduction),
        ];
        for (name, value) in components {
            if value < Decimal::ZERO {
                return Err(AppError::Internal(format!(
                    "negative intermediate value for {name}: {value}"
                )));
            }
        }

        let gross_salary =
            earned_salary + total_allowances + incentive + ot_pay + layered.arrears_amount;
        let total_deductions = attendance_deduction
            + permission_deduction
            + leave_deduction
            + total_other
            + layered.total_emi
            + layered.advance_deduction;

        let net_raw = gross_salary - total_deductions;
        let net_salary = net_raw.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        let round_off = net_salary - net_raw;

        Ok(CalculatedPayroll {
            per_day_basic_pay,
            basic_pay: profile.basic_salary,
            earned_salary,
            allowances,
            incentive,
            ot_pay,
            arrears_amount: layered.arrears_amount,
            late_in_deduction,
            early_out_deduction,
            attendance_deduction,
            permission_deduction,
            leave_deduction,
            other_deductions: other_deductions.to_vec(),
            total_emi: layered.total_emi,
            advance_deduction: layered.advance_deduction,
            gross_salary,
            total_deductions,
            net_salary,
            round_off,
        })
    }

    /// Per-day-pay divisor: period override days, else the policy's fixed
    /// divisor, else the calendar month length. Zero is a configuration
    /// error — never divide by it.
    fn divisor(
        attendance: &AttendanceSummary,
        policy: &DeductionPolicy,
        period: Option<&PeriodOverride>,
    ) -> AppResult<Decimal> {
        let days: i64 = if let Some(period) = period {
            period.day_count()
        } else if let Some(fixed) = policy.fixed_divisor {
            i64::from(fixed)
        } else {
            i64::from(attendance.total_days_in_month)
        };
        if days < 1 {
            return Err(AppError::Configuration(format!(
                "per-day pay divisor must be at least 1, got {days}"
            )));
        }
        Ok(Decimal::from(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;
    use sqlx::types::Json;
    use uuid::Uuid;

    fn attendance(total_days: i32, paid_days: Decimal) -> AttendanceSummary {
        AttendanceSummary {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            month: "2025-06".into(),
            total_days_in_month: total_days,
            present_days: paid_days,
            paid_leave_days: dec!(0),
            unpaid_leave_days: dec!(0),
            weekly_offs: dec!(0),
            holidays: dec!(0),
            absent_days: dec!(0),
            payable_shifts: paid_days,
            extra_days: dec!(0),
            total_paid_days: paid_days,
            late_ins_count: 0,
            early_outs_count: 0,
            permission_hours: dec!(0),
            ot_hours: dec!(0),
            created_at: Utc::now(),
        }
    }

    fn profile(basic: Decimal) -> CompensationProfile {
        CompensationProfile {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            department_id: Uuid::new_v4(),
            division_id: None,
            is_active: true,
            basic_salary: basic,
            allowances: Json(vec![]),
            effective_from: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn policy() -> DeductionPolicy {
        DeductionPolicy {
            id: Uuid::new_v4(),
            department_id: None,
            effective_month: "2025-01".into(),
            late_in_rate: dec!(50),
            early_out_rate: dec!(30),
            permission_rate: dec!(20),
            leave_deduction_rate: dec!(1),
            ot_rate: dec!(100),
            ot_rate_mode: OtRateMode::PerHour,
            fixed_divisor: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn earned_salary_is_exact() {
        let att = attendance(30, dec!(29));
        let prof = profile(dec!(30000));
        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();

        let per_day = dec!(30000) / dec!(30);
        assert_eq!(calc.per_day_basic_pay, per_day);
        assert_eq!(calc.earned_salary, per_day * dec!(29));
        assert_eq!(calc.earned_salary, dec!(29000));
    }

    #[test]
    fn zero_divisor_fails_fast() {
        let att = attendance(0, dec!(0));
        let prof = profile(dec!(30000));
        let err = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn fixed_divisor_overrides_month_length() {
        let att = attendance(31, dec!(30));
        let prof = profile(dec!(30000));
        let mut pol = policy();
        pol.fixed_divisor = Some(30);

        let calc =
            SettlementCalculator::calculate(&att, &prof, &pol, None, LayeredAmounts::default(), &[])
                .unwrap();
        assert_eq!(calc.per_day_basic_pay, dec!(1000));
        assert_eq!(calc.earned_salary, dec!(30000));
    }

    #[test]
    fn period_override_replaces_divisor() {
        let mut att = attendance(30, dec!(10));
        att.total_paid_days = dec!(10);
        let prof = profile(dec!(30000));
        let period = PeriodOverride {
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 6, 15).unwrap(),
        };

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            Some(&period),
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();
        assert_eq!(calc.per_day_basic_pay, dec!(2000));
        assert_eq!(calc.earned_salary, dec!(20000));
    }

    #[test]
    fn attendance_deduction_breakdown_is_retained() {
        let mut att = attendance(30, dec!(28));
        att.late_ins_count = 3;
        att.early_outs_count = 2;
        att.permission_hours = dec!(4);
        let prof = profile(dec!(30000));

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();
        assert_eq!(calc.late_in_deduction, dec!(150));
        assert_eq!(calc.early_out_deduction, dec!(60));
        assert_eq!(calc.attendance_deduction, dec!(210));
        assert_eq!(calc.permission_deduction, dec!(80));
    }

    #[test]
    fn leave_deduction_only_for_unpaid_days() {
        let mut att = attendance(30, dec!(27));
        att.paid_leave_days = dec!(2);
        att.unpaid_leave_days = dec!(1);
        let prof = profile(dec!(30000));

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();
        assert_eq!(calc.leave_deduction, dec!(1000));
    }

    #[test]
    fn per_day_allowance_is_prorated() {
        let att = attendance(30, dec!(25));
        let mut prof = profile(dec!(30000));
        prof.allowances = Json(vec![
            AllowanceLine {
                name: "HRA".into(),
                amount: dec!(5000),
                basis: AllowanceBasis::Fixed,
            },
            AllowanceLine {
                name: "Conveyance".into(),
                amount: dec!(40),
                basis: AllowanceBasis::PerDay,
            },
        ]);

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();
        assert_eq!(calc.allowances[0].amount, dec!(5000));
        assert_eq!(calc.allowances[1].amount, dec!(1000));
        assert_eq!(calc.gross_salary, dec!(25000) + dec!(6000));
    }

    #[test]
    fn net_rounds_once_and_keeps_round_off() {
        // 10000/30 * 29 = 9666.666..., gross has a recurring fraction
        let att = attendance(30, dec!(29));
        let prof = profile(dec!(10000));

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();

        let raw = dec!(10000) / dec!(30) * dec!(29);
        assert_eq!(calc.net_salary, dec!(9667));
        assert_eq!(calc.round_off, dec!(9667) - raw);
        assert_eq!(calc.net_salary - calc.round_off, raw);
    }

    #[test]
    fn negative_net_flows_through() {
        let att = attendance(30, dec!(30));
        let prof = profile(dec!(3000));
        let layered = LayeredAmounts {
            arrears_amount: dec!(0),
            total_emi: dec!(5000),
            advance_deduction: dec!(0),
        };

        let calc =
            SettlementCalculator::calculate(&att, &prof, &policy(), None, layered, &[]).unwrap();
        assert_eq!(calc.net_salary, dec!(-2000));
    }

    #[test]
    fn arrears_amount_joins_gross() {
        let att = attendance(30, dec!(30));
        let prof = profile(dec!(30000));
        let layered = LayeredAmounts {
            arrears_amount: dec!(3000),
            ..Default::default()
        };

        let calc =
            SettlementCalculator::calculate(&att, &prof, &policy(), None, layered, &[]).unwrap();
        assert_eq!(calc.gross_salary, dec!(33000));
        assert_eq!(calc.arrears_amount, dec!(3000));
    }

    #[test]
    fn flat_ot_rate_pays_once() {
        let mut att = attendance(30, dec!(30));
        att.ot_hours = dec!(12);
        let prof = profile(dec!(30000));
        let mut pol = policy();
        pol.ot_rate_mode = OtRateMode::FlatPerMonth;
        pol.ot_rate = dec!(1500);

        let calc =
            SettlementCalculator::calculate(&att, &prof, &pol, None, LayeredAmounts::default(), &[])
                .unwrap();
        assert_eq!(calc.ot_pay, dec!(1500));

        att.ot_hours = dec!(0);
        let calc =
            SettlementCalculator::calculate(&att, &prof, &pol, None, LayeredAmounts::default(), &[])
                .unwrap();
        assert_eq!(calc.ot_pay, dec!(0));
    }

    #[test]
    fn negative_other_deduction_rejected() {
        let att = attendance(30, dec!(30));
        let prof = profile(dec!(30000));
        let lines = [DeductionLine {
            name: "canteen".into(),
            amount: dec!(-10),
        }];

        let err = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &lines,
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn incentive_for_extra_days() {
        let mut att = attendance(30, dec!(30));
        att.extra_days = dec!(2);
        let prof = profile(dec!(30000));

        let calc = SettlementCalculator::calculate(
            &att,
            &prof,
            &policy(),
            None,
            LayeredAmounts::default(),
            &[],
        )
        .unwrap();
        assert_eq!(calc.incentive, dec!(2000));
    }
}
