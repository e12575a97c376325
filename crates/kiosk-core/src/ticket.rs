//! # Ticket Math
//!
//! Sale totals, change due, and refund amounts for returns.
//!
//! ## Sale-Level Discount
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Lines:  Jugo ×2  $50.00   Tiempo 1 hora $80.00    subtotal  $130.00   │
//! │  Time-session discount 10%                          discount  −$8.00   │
//! │                                                     total     $122.00  │
//! │                                                                         │
//! │  Returning one Jugo ($25.00) gives back its share of the total:        │
//! │      25.00 × 122 / 130 = $23.46                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{PaymentInput, PaymentMethod, Sale, SaleItem};

/// Computed totals of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct SaleTotals {
    pub subtotal_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
}

impl SaleTotals {
    /// Sums the lines and applies the discount, clamped to the subtotal.
    pub fn from_lines(items: &[SaleItem], discount_cents: i64) -> Self {
        let subtotal: Money = items.iter().map(SaleItem::line_total).sum();
        Self::from_subtotal(subtotal.cents(), discount_cents)
    }

    pub fn from_subtotal(subtotal_cents: i64, discount_cents: i64) -> Self {
        let discount_cents = discount_cents.clamp(0, subtotal_cents.max(0));
        SaleTotals {
            subtotal_cents,
            discount_cents,
            total_cents: subtotal_cents - discount_cents,
        }
    }
}

/// Settled payment figures stored on the sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Settlement {
    pub method: PaymentMethod,
    pub tendered_cents: i64,
    pub change_cents: i64,
}

/// Works out tendered and change for a payment against `total`.
///
/// Card payments are charged the exact total. Cash without a tendered figure
/// is taken as exact change.
pub fn settle(total: Money, payment: &PaymentInput) -> CoreResult<Settlement> {
    match payment.method {
        PaymentMethod::Card => Ok(Settlement {
            method: PaymentMethod::Card,
            tendered_cents: total.cents(),
            change_cents: 0,
        }),
        PaymentMethod::Cash => {
            let tendered = payment.tendered_cents.unwrap_or(total.cents());
            if tendered < 0 {
                return Err(CoreError::InvalidPaymentAmount {
                    reason: "tendered cash cannot be negative".to_string(),
                });
            }
            if tendered < total.cents() {
                return Err(CoreError::InsufficientPayment {
                    total_cents: total.cents(),
                    tendered_cents: tendered,
                });
            }
            Ok(Settlement {
                method: PaymentMethod::Cash,
                tendered_cents: tendered,
                change_cents: tendered - total.cents(),
            })
        }
    }
}

/// Quantity of a line that can still be returned.
#[inline]
pub fn returnable_quantity(sold: i64, already_returned: i64) -> i64 {
    (sold - already_returned).max(0)
}

/// Checks a return request against what was sold and already returned.
pub fn check_return(item: &SaleItem, quantity: i64, already_returned: i64) -> CoreResult<()> {
    crate::validation::validate_quantity(quantity)?;

    let returnable = returnable_quantity(item.quantity, already_returned);
    if quantity > returnable {
        return Err(CoreError::ReturnExceedsSold {
            name: item.name_snapshot.clone(),
            returnable,
            requested: quantity,
        });
    }

    Ok(())
}

/// Cash given back for `quantity` more units sold at `unit_price_cents`,
/// carrying the line's share of the sale-level discount.
///
/// The refund is the pro-rated value of everything returned from the line
/// after this return minus what the earlier returns already covered, so
/// returning units one at a time adds up to the same amount as returning
/// them together.
pub fn refund_for(
    unit_price_cents: i64,
    quantity: i64,
    already_returned: i64,
    sale_subtotal_cents: i64,
    sale_total_cents: i64,
) -> Money {
    if sale_subtotal_cents <= 0 {
        return Money::zero();
    }
    let paid_for = |units: i64| {
        Money::from_cents(unit_price_cents)
            .multiply_quantity(units)
            .prorate(sale_total_cents, sale_subtotal_cents)
    };
    paid_for(already_returned + quantity) - paid_for(already_returned)
}

/// [`refund_for`] over a stored sale line, capped at what is left of the
/// sale total after `refunded_cents` already given back.
pub fn refund_for_item(
    item: &SaleItem,
    quantity: i64,
    already_returned: i64,
    sale: &Sale,
    refunded_cents: i64,
) -> Money {
    let refund = refund_for(
        item.unit_price_cents,
        quantity,
        already_returned,
        sale.subtotal_cents,
        sale.total_cents,
    );
    let left = Money::from_cents((sale.total_cents - refunded_cents).max(0));
    refund.min(left)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ItemKind, SaleStatus};
    use chrono::Utc;

    fn item(unit: i64, qty: i64) -> SaleItem {
        SaleItem::new("s1", ItemKind::Product, None, "Jugo", unit, qty)
    }

    fn sale(subtotal: i64, discount: i64) -> Sale {
        let now = Utc::now();
        Sale {
            id: "s1".to_string(),
            folio: "20260101-0001".to_string(),
            status: SaleStatus::Completed,
            subtotal_cents: subtotal,
            discount_cents: discount,
            total_cents: subtotal - discount,
            payment_method: Some(PaymentMethod::Cash),
            tendered_cents: None,
            change_cents: None,
            cashier: "ana".to_string(),
            notes: None,
            created_at: now,
            updated_at: now,
            completed_at: Some(now),
        }
    }

    #[test]
    fn test_totals_from_items() {
        let totals = SaleTotals::from_lines(&[item(2500, 2), item(8000, 1)], 800);
        assert_eq!(totals.subtotal_cents, 13000);
        assert_eq!(totals.discount_cents, 800);
        assert_eq!(totals.total_cents, 12200);
    }

    #[test]
    fn test_discount_clamped_to_subtotal() {
        let totals = SaleTotals::from_subtotal(1000, 5000);
        assert_eq!(totals.discount_cents, 1000);
        assert_eq!(totals.total_cents, 0);

        let totals = SaleTotals::from_subtotal(1000, -5);
        assert_eq!(totals.discount_cents, 0);
    }

    #[test]
    fn test_settle_cash_with_change() {
        let payment = PaymentInput {
            method: PaymentMethod::Cash,
            tendered_cents: Some(20000),
        };
        let s = settle(Money::from_cents(12200), &payment).unwrap();
        assert_eq!(s.change_cents, 7800);
    }

    #[test]
    fn test_settle_cash_short_fails() {
        let payment = PaymentInput {
            method: PaymentMethod::Cash,
            tendered_cents: Some(10000),
        };
        assert!(matches!(
            settle(Money::from_cents(12200), &payment),
            Err(CoreError::InsufficientPayment { .. })
        ));
    }

    #[test]
    fn test_settle_card_is_exact() {
        let payment = PaymentInput {
            method: PaymentMethod::Card,
            tendered_cents: Some(99999),
        };
        let s = settle(Money::from_cents(12200), &payment).unwrap();
        assert_eq!(s.tendered_cents, 12200);
        assert_eq!(s.change_cents, 0);
    }

    #[test]
    fn test_check_return_limits() {
        let line = item(2500, 2);
        assert!(check_return(&line, 2, 0).is_ok());
        assert!(check_return(&line, 1, 1).is_ok());
        assert!(matches!(
            check_return(&line, 2, 1),
            Err(CoreError::ReturnExceedsSold { returnable: 1, .. })
        ));
        assert!(check_return(&line, 0, 0).is_err());
    }

    #[test]
    fn test_refund_carries_discount_share() {
        let line = item(2500, 2);
        assert_eq!(refund_for_item(&line, 1, 0, &sale(13000, 800), 0).cents(), 2346);
        assert_eq!(refund_for_item(&line, 2, 0, &sale(5000, 0), 0).cents(), 5000);
        assert_eq!(refund_for(2500, 1, 0, 0, 0).cents(), 0);
    }

    #[test]
    fn test_unit_by_unit_refunds_never_exceed_paid() {
        // 3 x $10.00 less $0.01
        let one_by_one: i64 = (0..3).map(|done| refund_for(1000, 1, done, 3000, 2999).cents()).sum();
        assert_eq!(one_by_one, 2999);
        assert_eq!(refund_for(1000, 3, 0, 3000, 2999).cents(), 2999);
    }

    #[test]
    fn test_refund_capped_at_sale_remainder() {
        // Three single-unit lines each round up to $10.00 on their own
        let paid = sale(3000, 1);
        let line = item(1000, 1);
        let mut refunded = 0;
        for _ in 0..3 {
            refunded += refund_for_item(&line, 1, 0, &paid, refunded).cents();
        }
        assert_eq!(refunded, 2999);
        assert_eq!(refund_for_item(&line, 1, 0, &paid, 2999).cents(), 0);
    }
}
