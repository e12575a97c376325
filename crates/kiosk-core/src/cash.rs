//! # Cash Reconciliation
//!
//! Summarizes drawer activity for a period and compares it with the cash the
//! cashier counted (corte de caja).
//!
//! ```text
//! expected   = opening float + deposits + cash sales − withdrawals − refunds
//! difference = counted − expected        (> 0 over, < 0 short)
//! ```
//!
//! Card sales are reported but never expected in the drawer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{new_id, CashCut, CashMovement, MovementKind};

/// Drawer totals for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct CashSummary {
    pub opening_float_cents: i64,
    pub deposits_cents: i64,
    pub withdrawals_cents: i64,
    pub cash_sales_cents: i64,
    pub card_sales_cents: i64,
    pub refunds_cents: i64,
    pub expected_cents: i64,
}

impl CashSummary {
    /// Folds the period's movements with the sales and refund totals.
    pub fn compute(
        movements: &[CashMovement],
        cash_sales: Money,
        card_sales: Money,
        refunds: Money,
    ) -> Self {
        let mut summary = CashSummary {
            cash_sales_cents: cash_sales.cents(),
            card_sales_cents: card_sales.cents(),
            refunds_cents: refunds.cents(),
            ..Default::default()
        };

        let mut drawer = Money::zero();
        for movement in movements {
            match movement.kind {
                MovementKind::OpeningFloat => summary.opening_float_cents += movement.amount_cents,
                MovementKind::Deposit => summary.deposits_cents += movement.amount_cents,
                MovementKind::Withdrawal => summary.withdrawals_cents += movement.amount_cents,
            }
            drawer += movement.signed_amount();
        }

        summary.expected_cents = (drawer + cash_sales - refunds).cents();

        summary
    }

    #[inline]
    pub fn expected(&self) -> Money {
        Money::from_cents(self.expected_cents)
    }

    /// Counted minus expected.
    pub fn reconcile(&self, counted: Money) -> Money {
        counted - self.expected()
    }

    /// Builds the cut record that closes this period.
    pub fn into_cut(
        self,
        period_start: DateTime<Utc>,
        period_end: DateTime<Utc>,
        counted: Money,
        cashier: impl Into<String>,
        notes: Option<String>,
    ) -> CashCut {
        CashCut {
            id: new_id(),
            period_start,
            period_end,
            opening_float_cents: self.opening_float_cents,
            deposits_cents: self.deposits_cents,
            withdrawals_cents: self.withdrawals_cents,
            cash_sales_cents: self.cash_sales_cents,
            card_sales_cents: self.card_sales_cents,
            refunds_cents: self.refunds_cents,
            expected_cents: self.expected_cents,
            counted_cents: counted.cents(),
            difference_cents: self.reconcile(counted).cents(),
            cashier: cashier.into(),
            notes,
            created_at: Utc::now(),
        }
    }
}
