// src/models/lifecycle.rs
//
// Closed status enums with explicit transition tables. Every lifecycle
// move in the engine goes through `can_transition`; anything not in the
// table is rejected with the caller's attempted pair.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// sqlx 0.8: custom Postgres enums need #[sqlx(type_name = "...")] on the enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    Approved,
    Freeze,
    Complete,
}

impl BatchStatus {
    /// Forward-only lifecycle: pending → approved → freeze → complete.
    /// No skip-ahead, no regression. Recalculation re-opens a batch through
    /// its own dedicated path, not through this table.
    pub fn can_transition(self, to: BatchStatus) -> bool {
        matches!(
            (self, to),
            (BatchStatus::Pending, BatchStatus::Approved)
                | (BatchStatus::Approved, BatchStatus::Freeze)
                | (BatchStatus::Freeze, BatchStatus::Complete)
        )
    }

    /// Records are editable and totals re-aggregated only before freeze.
    pub fn is_mutable(self) -> bool {
        matches!(self, BatchStatus::Pending | BatchStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BatchStatus::Pending => "pending",
            BatchStatus::Approved => "approved",
            BatchStatus::Freeze => "freeze",
            BatchStatus::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "bonus_batch_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BonusBatchStatus {
    Pending,
    Approved,
    Frozen,
}

impl BonusBatchStatus {
    pub fn can_transition(self, to: BonusBatchStatus) -> bool {
        matches!(
            (self, to),
            (BonusBatchStatus::Pending, BonusBatchStatus::Approved)
                | (BonusBatchStatus::Approved, BonusBatchStatus::Frozen)
        )
    }

    pub fn is_mutable(self) -> bool {
        matches!(self, BonusBatchStatus::Pending | BonusBatchStatus::Approved)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BonusBatchStatus::Pending => "pending",
            BonusBatchStatus::Approved => "approved",
            BonusBatchStatus::Frozen => "frozen",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "arrears_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ArrearsStatus {
    Draft,
    PendingHod,
    PendingHr,
    PendingAdmin,
    Approved,
    Rejected,
    PartiallySettled,
    Settled,
    Cancelled,
}

impl ArrearsStatus {
    /// Sequential approval gates: draft → HOD → HR → Admin → approved.
    /// Any gate may reject (terminal). Cancellation is terminal and only
    /// valid before approval. Settlement statuses are reached exclusively
    /// through settlement, never through this table.
    pub fn can_transition(self, to: ArrearsStatus) -> bool {
        use ArrearsStatus::*;
        matches!(
            (self, to),
            (Draft, PendingHod)
                | (PendingHod, PendingHr)
                | (PendingHr, PendingAdmin)
                | (PendingAdmin, Approved)
                | (PendingHod, Rejected)
                | (PendingHr, Rejected)
                | (PendingAdmin, Rejected)
                | (Draft, Cancelled)
                | (PendingHod, Cancelled)
                | (PendingHr, Cancelled)
                | (PendingAdmin, Cancelled)
        )
    }

    /// The state `approve` advances to from the current gate.
    pub fn next_gate(self) -> Option<ArrearsStatus> {
        match self {
            ArrearsStatus::PendingHod => Some(ArrearsStatus::PendingHr),
            ArrearsStatus::PendingHr => Some(ArrearsStatus::PendingAdmin),
            ArrearsStatus::PendingAdmin => Some(ArrearsStatus::Approved),
            _ => None,
        }
    }

    /// Only approved or partially settled requests take settlements.
    pub fn is_settleable(self) -> bool {
        matches!(self, ArrearsStatus::Approved | ArrearsStatus::PartiallySettled)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ArrearsStatus::Draft => "draft",
            ArrearsStatus::PendingHod => "pending_hod",
            ArrearsStatus::PendingHr => "pending_hr",
            ArrearsStatus::PendingAdmin => "pending_admin",
            ArrearsStatus::Approved => "approved",
            ArrearsStatus::Rejected => "rejected",
            ArrearsStatus::PartiallySettled => "partially_settled",
            ArrearsStatus::Settled => "settled",
            ArrearsStatus::Cancelled => "cancelled",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "obligation_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    Loan,
    SalaryAdvance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "obligation_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "txn_category", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TxnCategory {
    Earning,
    Deduction,
    Adjustment,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "ot_rate_mode", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum OtRateMode {
    PerHour,
    FlatPerMonth,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, ToSchema, PartialEq, Eq)]
#[sqlx(type_name = "recalc_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RecalcStatus {
    Requested,
    Actioned,
    Dismissed,
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATCH_STATES: [BatchStatus; 4] = [
        BatchStatus::Pending,
        BatchStatus::Approved,
        BatchStatus::Freeze,
        BatchStatus::Complete,
    ];

    #[test]
    fn batch_lifecycle_is_forward_only() {
        assert!(BatchStatus::Pending.can_transition(BatchStatus::Approved));
        assert!(BatchStatus::Approved.can_transition(BatchStatus::Freeze));
        assert!(BatchStatus::Freeze.can_transition(BatchStatus::Complete));

        // no skip-ahead
        assert!(!BatchStatus::Pending.can_transition(BatchStatus::Freeze));
        assert!(!BatchStatus::Pending.can_transition(BatchStatus::Complete));
        assert!(!BatchStatus::Approved.can_transition(BatchStatus::Complete));

        // no regression from any state
        for from in BATCH_STATES {
            assert!(!from.can_transition(BatchStatus::Pending));
        }
        assert!(!BatchStatus::Freeze.can_transition(BatchStatus::Approved));
        assert!(!BatchStatus::Complete.can_transition(BatchStatus::Freeze));
    }

    #[test]
    fn complete_is_terminal() {
        for to in BATCH_STATES {
            assert!(!BatchStatus::Complete.can_transition(to));
        }
    }

    #[test]
    fn mutability_ends_at_freeze() {
        assert!(BatchStatus::Pending.is_mutable());
        assert!(BatchStatus::Approved.is_mutable());
        assert!(!BatchStatus::Freeze.is_mutable());
        assert!(!BatchStatus::Complete.is_mutable());
    }

    #[test]
    fn arrears_gates_are_sequential() {
        use ArrearsStatus::*;
        assert_eq!(PendingHod.next_gate(), Some(PendingHr));
        assert_eq!(PendingHr.next_gate(), Some(PendingAdmin));
        assert_eq!(PendingAdmin.next_gate(), Some(Approved));
        assert_eq!(Approved.next_gate(), None);
        assert_eq!(Draft.next_gate(), None);

        // no gate skipping
        assert!(!PendingHod.can_transition(PendingAdmin));
        assert!(!PendingHod.can_transition(Approved));
        assert!(!Draft.can_transition(Approved));
    }

    #[test]
    fn arrears_terminal_states_reject_everything() {
        use ArrearsStatus::*;
        let all = [
            Draft,
            PendingHod,
            PendingHr,
            PendingAdmin,
            Approved,
            Rejected,
            PartiallySettled,
            Settled,
            Cancelled,
        ];
        for to in all {
            assert!(!Rejected.can_transition(to));
            assert!(!Cancelled.can_transition(to));
            assert!(!Settled.can_transition(to));
        }
    }

    #[test]
    fn cancellation_only_before_approval() {
        use ArrearsStatus::*;
        assert!(Draft.can_transition(Cancelled));
        assert!(PendingHod.can_transition(Cancelled));
        assert!(PendingAdmin.can_transition(Cancelled));
        assert!(!Approved.can_transition(Cancelled));
        assert!(!PartiallySettled.can_transition(Cancelled));
    }

    #[test]
    fn settlement_states_unreachable_via_table() {
        use ArrearsStatus::*;
        assert!(!Approved.can_transition(PartiallySettled));
        assert!(!Approved.can_transition(Settled));
        assert!(!PartiallySettled.can_transition(Settled));
        assert!(Approved.is_settleable());
        assert!(PartiallySettled.is_settleable());
        assert!(!Settled.is_settleable());
        assert!(!PendingAdmin.is_settleable());
    }

    #[test]
    fn bonus_batch_lifecycle() {
        assert!(BonusBatchStatus::Pending.can_transition(BonusBatchStatus::Approved));
        assert!(BonusBatchStatus::Approved.can_transition(BonusBatchStatus::Frozen));
        assert!(!BonusBatchStatus::Pending.can_transition(BonusBatchStatus::Frozen));
        assert!(!BonusBatchStatus::Frozen.can_transition(BonusBatchStatus::Approved));
        assert!(!BonusBatchStatus::Frozen.is_mutable());
    }
}
