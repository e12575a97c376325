//! # Time Billing
//!
//! Turns an entry/exit pair into a charge.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  entered_at ──► exited_at                                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  elapsed  = ceil(seconds / 60), at least 1                             │
//! │  billable = max(1, elapsed − grace)                                    │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  tiers (active, by minutes):  30 min $50 │ 60 min $80 │ 120 min $140   │
//! │                                                                         │
//! │  billable = 45   → smallest tier covering it: 60 min $80               │
//! │  billable = 150  → largest tier $140 + 30 extra min pro-rated          │
//! │                    at 140/120 per minute = $35  → $175                 │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  prepaid tier?  charge = max(prepaid price, quote) once billable       │
//! │                 exceeds the prepaid minutes; overage = the difference  │
//! │        │                                                                │
//! │        ▼                                                                │
//! │  discount = charge × bps / 10000 ;  total = charge − discount          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::TimePriceTier;
use crate::validation::validate_discount_bps;

/// Price of a number of minutes under the current tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TierQuote {
    pub tier_id: String,
    pub tier_label: String,
    pub tier_minutes: i64,
    pub tier_price_cents: i64,
    /// Minutes beyond the largest tier.
    pub overage_minutes: i64,
    pub overage_cents: i64,
    pub total_cents: i64,
}

/// Result of billing a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "camelCase")]
pub struct TimeCharge {
    pub elapsed_minutes: i64,
    pub billable_minutes: i64,
    /// Tier the base price comes from (the prepaid tier when there is one).
    pub tier_id: String,
    pub tier_label: String,
    pub base_cents: i64,
    pub overage_minutes: i64,
    pub overage_cents: i64,
    pub discount_cents: i64,
    pub total_cents: i64,
    /// Whether the base was already on the session's pending sale.
    pub prepaid: bool,
}

impl TimeCharge {
    /// base + overage, before discount.
    #[inline]
    pub fn gross(&self) -> Money {
        Money::from_cents(self.base_cents + self.overage_cents)
    }
}

/// Whole minutes between entry and exit, rounded up, at least one.
///
/// ```rust
/// use chrono::{Duration, Utc};
/// use kiosk_core::billing::elapsed_minutes;
///
/// let t0 = Utc::now();
/// assert_eq!(elapsed_minutes(t0, t0 + Duration::seconds(61)), 2);
/// assert_eq!(elapsed_minutes(t0, t0), 1);
/// ```
pub fn elapsed_minutes(entered_at: DateTime<Utc>, exited_at: DateTime<Utc>) -> i64 {
    let seconds = (exited_at - entered_at).num_seconds();
    if seconds <= 0 {
        return 1;
    }
    ((seconds + 59) / 60).max(1)
}

/// Prices `minutes` against the active tiers.
///
/// Picks the smallest tier that covers the minutes. Past the largest tier the
/// extra minutes are pro-rated at the largest tier's per-minute price.
pub fn quote(tiers: &[TimePriceTier], minutes: i64) -> CoreResult<TierQuote> {
    let refs: Vec<&TimePriceTier> = tiers.iter().collect();
    quote_refs(&refs, minutes)
}

fn quote_refs(tiers: &[&TimePriceTier], minutes: i64) -> CoreResult<TierQuote> {
    let mut active: Vec<&TimePriceTier> = tiers
        .iter()
        .copied()
        .filter(|t| t.is_active && t.minutes > 0)
        .collect();
    active.sort_by_key(|t| (t.minutes, t.price_cents));

    let largest = *active.last().ok_or(CoreError::NoPriceTiers)?;
    let minutes = minutes.max(1);

    if let Some(tier) = active.iter().find(|t| t.minutes >= minutes) {
        return Ok(TierQuote {
            tier_id: tier.id.clone(),
            tier_label: tier.label.clone(),
            tier_minutes: tier.minutes,
            tier_price_cents: tier.price_cents,
            overage_minutes: 0,
            overage_cents: 0,
            total_cents: tier.price_cents,
        });
    }

    let overage_minutes = minutes - largest.minutes;
    let overage = largest.price().prorate(overage_minutes, largest.minutes);

    Ok(TierQuote {
        tier_id: largest.id.clone(),
        tier_label: largest.label.clone(),
        tier_minutes: largest.minutes,
        tier_price_cents: largest.price_cents,
        overage_minutes,
        overage_cents: overage.cents(),
        total_cents: largest.price_cents + overage.cents(),
    })
}

/// Bills a finished session.
///
/// ## Arguments
/// * `tiers` - Current price tiers (inactive ones are ignored)
/// * `prepaid` - Tier bought at the entrance, if any
/// * `discount_bps` - Discount on the whole charge
/// * `grace_minutes` - Minutes forgiven before tier selection
pub fn bill_session(
    entered_at: DateTime<Utc>,
    exited_at: DateTime<Utc>,
    tiers: &[TimePriceTier],
    prepaid: Option<&TimePriceTier>,
    discount_bps: i64,
    grace_minutes: i64,
) -> CoreResult<TimeCharge> {
    validate_discount_bps(discount_bps)?;

    let elapsed = elapsed_minutes(entered_at, exited_at);
    let billable = (elapsed - grace_minutes.max(0)).max(1);

    let (tier_id, tier_label, base, overage_minutes, overage) = match prepaid {
        Some(prepaid) if billable <= prepaid.minutes => (
            prepaid.id.clone(),
            prepaid.label.clone(),
            prepaid.price(),
            0,
            Money::zero(),
        ),
        Some(prepaid) => {
            // A prepaid tier may have been retired since check-in; it still
            // prices its own session.
            let mut own_tier = prepaid.clone();
            own_tier.is_active = true;
            let mut pool: Vec<&TimePriceTier> =
                tiers.iter().filter(|t| t.id != prepaid.id).collect();
            pool.push(&own_tier);

            let q = quote_refs(&pool, billable)?;
            let charge = Money::from_cents(q.total_cents).max(prepaid.price());
            (
                prepaid.id.clone(),
                prepaid.label.clone(),
                prepaid.price(),
                billable - prepaid.minutes,
                charge - prepaid.price(),
            )
        }
        None => {
            let q = quote(tiers, billable)?;
            (
                q.tier_id,
                q.tier_label,
                Money::from_cents(q.tier_price_cents),
                q.overage_minutes,
                Money::from_cents(q.overage_cents),
            )
        }
    };

    let gross = base + overage;
    let discount = gross.percentage_of(discount_bps);

    Ok(TimeCharge {
        elapsed_minutes: elapsed,
        billable_minutes: billable,
        tier_id,
        tier_label,
        base_cents: base.cents(),
        overage_minutes,
        overage_cents: overage.cents(),
        discount_cents: discount.cents(),
        total_cents: (gross - discount).cents(),
        prepaid: prepaid.is_some(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn tiers() -> Vec<TimePriceTier> {
        vec![
            TimePriceTier::new("2 horas", 120, 14000, 3),
            TimePriceTier::new("30 min", 30, 5000, 1),
            TimePriceTier::new("1 hora", 60, 8000, 2),
        ]
    }

    fn at(minutes: i64) -> (DateTime<Utc>, DateTime<Utc>) {
        let t0 = Utc::now();
        (t0, t0 + Duration::minutes(minutes))
    }

    #[test]
    fn test_elapsed_minutes_rounds_up() {
        let t0 = Utc::now();
        assert_eq!(elapsed_minutes(t0, t0 + Duration::seconds(1)), 1);
        assert_eq!(elapsed_minutes(t0, t0 + Duration::seconds(60)), 1);
        assert_eq!(elapsed_minutes(t0, t0 + Duration::seconds(61)), 2);
        assert_eq!(elapsed_minutes(t0, t0 - Duration::minutes(5)), 1);
    }

    #[test]
    fn test_quote_picks_smallest_covering_tier() {
        let tiers = tiers();
        assert_eq!(quote(&tiers, 1).unwrap().total_cents, 5000);
        assert_eq!(quote(&tiers, 30).unwrap().total_cents, 5000);
        assert_eq!(quote(&tiers, 31).unwrap().total_cents, 8000);
        assert_eq!(quote(&tiers, 120).unwrap().tier_label, "2 horas");
    }

    #[test]
    fn test_quote_prorates_past_largest_tier() {
        let q = quote(&tiers(), 150).unwrap();
        assert_eq!(q.tier_minutes, 120);
        assert_eq!(q.overage_minutes, 30);
        assert_eq!(q.overage_cents, 3500);
        assert_eq!(q.total_cents, 17500);
    }

    #[test]
    fn test_quote_ignores_inactive_tiers() {
        let mut tiers = tiers();
        tiers[1].is_active = false; // 30 min
        assert_eq!(quote(&tiers, 10).unwrap().tier_label, "1 hora");
    }

    #[test]
    fn test_quote_without_tiers_fails() {
        assert!(matches!(quote(&[], 10), Err(CoreError::NoPriceTiers)));
    }

    #[test]
    fn test_bill_walk_in_session() {
        let (a, b) = at(45);
        let charge = bill_session(a, b, &tiers(), None, 0, 0).unwrap();
        assert_eq!(charge.elapsed_minutes, 45);
        assert_eq!(charge.base_cents, 8000);
        assert_eq!(charge.overage_cents, 0);
        assert_eq!(charge.total_cents, 8000);
        assert!(!charge.prepaid);
    }

    #[test]
    fn test_grace_minutes_keep_lower_tier() {
        let (a, b) = at(34);
        let charge = bill_session(a, b, &tiers(), None, 0, 5).unwrap();
        assert_eq!(charge.billable_minutes, 29);
        assert_eq!(charge.total_cents, 5000);
    }

    #[test]
    fn test_prepaid_within_minutes_has_no_overage() {
        let tiers = tiers();
        let hour = tiers[2].clone();
        let (a, b) = at(55);
        let charge = bill_session(a, b, &tiers, Some(&hour), 0, 0).unwrap();
        assert_eq!(charge.base_cents, 8000);
        assert_eq!(charge.overage_cents, 0);
        assert!(charge.prepaid);
    }

    #[test]
    fn test_prepaid_overage_is_difference_to_covering_tier() {
        let tiers = tiers();
        let hour = tiers[2].clone();
        let (a, b) = at(80);
        let charge = bill_session(a, b, &tiers, Some(&hour), 0, 0).unwrap();
        // 80 min falls in the 2 hour tier: 14000 − 8000
        assert_eq!(charge.overage_minutes, 20);
        assert_eq!(charge.overage_cents, 6000);
        assert_eq!(charge.total_cents, 14000);
    }

    #[test]
    fn test_prepaid_tier_retired_still_prices_overage() {
        let mut hour = TimePriceTier::new("Promo hora", 60, 6000, 9);
        hour.is_active = false;
        let (a, b) = at(90);
        let charge = bill_session(a, b, &[], Some(&hour), 0, 0).unwrap();
        // 30 extra minutes at 6000/60
        assert_eq!(charge.overage_cents, 3000);
        assert_eq!(charge.total_cents, 9000);
    }

    #[test]
    fn test_discount_applies_to_whole_charge() {
        let (a, b) = at(150);
        let charge = bill_session(a, b, &tiers(), None, 1000, 0).unwrap();
        assert_eq!(charge.gross().cents(), 17500);
        assert_eq!(charge.discount_cents, 1750);
        assert_eq!(charge.total_cents, 15750);
    }

    #[test]
    fn test_invalid_discount_rejected() {
        let (a, b) = at(10);
        assert!(bill_session(a, b, &tiers(), None, 20000, 0).is_err());
    }
}
