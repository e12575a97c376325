//! # Time Session Commands
//!
//! Patrons enter and leave by presenting their NFC card.
//!
//! ```text
//!  scan 04A1B2C3
//!       │
//!       ▼
//!  open session for the card? ── no ──► check_in (default discount)
//!       │                                └─ session OPEN, no tab
//!      yes
//!       ▼
//!  check_out
//!   ├─ bill: elapsed − grace → tier (+ pro-rated overage) − discount
//!   ├─ walk-in:  Time line [+ Overage line] + discount ──► new tab
//!   ├─ prepaid:  [Overage line] + rest of the discount ──► session's tab
//!   └─ session CLOSED, tab returned for collection (finalize_sale)
//! ```
//!
//! A check-in with a prepaid tier (bought at the entrance) opens the tab at
//! once with the tier's Time line and its discount, so the patron can pay
//! before going in.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::state::{ConfigState, DbState};
use kiosk_core::billing::{bill_session, TimeCharge};
use kiosk_core::validation::{normalize_nfc_uid, validate_range};
use kiosk_core::{CheckIn, CoreError, ItemKind, Sale, TimePriceTier, TimeSession};
use kiosk_db::{Checkout, TabEntry};

/// Result of closing a session.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    pub session: TimeSession,
    pub charge: TimeCharge,
    /// The pending sale to collect, if anything is left to pay.
    pub sale: Option<Sale>,
}

/// What a scan did.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum ScanOutcome {
    CheckedIn { session: TimeSession },
    CheckedOut(CheckoutResponse),
}

/// What the open session of a card would be charged right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionPreview {
    pub session: TimeSession,
    pub charge: TimeCharge,
}

/// Opens a session for a card.
///
/// ## Errors
/// - `CONFLICT` - the card already has an open session
/// - `NOT_FOUND` - the prepaid tier does not exist or is retired
pub async fn check_in(
    db: &DbState,
    config: &ConfigState,
    request: CheckIn,
) -> Result<TimeSession, ApiError> {
    let nfc_uid = normalize_nfc_uid(&request.nfc_uid)?;
    request.validate()?;
    debug!(nfc_uid = %nfc_uid, prepaid_tier_id = ?request.prepaid_tier_id, "check_in command");

    let sessions = db.inner().sessions();
    if sessions.find_open_by_uid(&nfc_uid).await?.is_some() {
        return Err(CoreError::SessionAlreadyOpen { nfc_uid }.into());
    }

    let prepaid = match &request.prepaid_tier_id {
        Some(tier_id) => Some(
            db.inner()
                .price_tiers()
                .get_by_id(tier_id)
                .await?
                .filter(|t| t.is_active)
                .ok_or_else(|| CoreError::PriceTierNotFound(tier_id.clone()))?,
        ),
        None => None,
    };
    let (entries, discount_cents) = match &prepaid {
        Some(tier) => {
            let discount = tier.price().percentage_of(request.discount_bps);
            (vec![time_line(&tier.id, &tier.label, tier.price_cents)], discount.cents())
        }
        None => (Vec::new(), 0),
    };

    let session = TimeSession::new(
        nfc_uid,
        prepaid.as_ref(),
        request.discount_bps,
        config.cashier.clone(),
        Utc::now(),
    );

    let session = sessions
        .check_in(&session, &entries, discount_cents)
        .await
        .map_err(|e| match e {
            // Lost a race with another scan of the same card
            kiosk_db::DbError::UniqueViolation { .. } => ApiError::from(CoreError::SessionAlreadyOpen {
                nfc_uid: session.nfc_uid.clone(),
            }),
            other => other.into(),
        })?;

    Ok(session)
}

/// Closes the card's open session, bills it and puts the charge on a tab.
pub async fn check_out(
    db: &DbState,
    config: &ConfigState,
    nfc_uid: &str,
) -> Result<CheckoutResponse, ApiError> {
    let nfc_uid = normalize_nfc_uid(nfc_uid)?;
    debug!(nfc_uid = %nfc_uid, "check_out command");

    let session = open_session(db, &nfc_uid).await?;
    let exited_at = Utc::now();
    let (charge, prepaid) = bill(db, config, &session, exited_at).await?;

    let (entries, discount_cents) = match &prepaid {
        // The tier line and its share of the discount went on at check-in
        Some(tier) => {
            let mut entries = Vec::new();
            if charge.overage_cents > 0 {
                entries.push(overage_line(&charge));
            }
            let applied = tier.price().percentage_of(session.discount_bps).cents();
            (entries, (charge.discount_cents - applied).max(0))
        }
        None => {
            let mut entries = vec![time_line(&charge.tier_id, &charge.tier_label, charge.base_cents)];
            if charge.overage_cents > 0 {
                entries.push(overage_line(&charge));
            }
            (entries, charge.discount_cents)
        }
    };

    let checkout = Checkout {
        exited_at,
        billed_minutes: charge.billable_minutes,
        charged_cents: charge.total_cents,
        entries,
        discount_cents,
    };
    let (session, sale) = db.inner().sessions().check_out(&session.id, &checkout).await?;

    info!(
        nfc_uid = %session.nfc_uid,
        minutes = charge.billable_minutes,
        tier = %charge.tier_label,
        charge = %config.format_currency(charge.total_cents),
        folio = ?sale.as_ref().map(|s| s.folio.as_str()),
        "Patron checked out"
    );
    Ok(CheckoutResponse {
        session,
        charge,
        sale,
    })
}

/// NFC scan handler: checks the card out when it is inside, otherwise
/// checks it in with the station's default discount and no prepaid tier.
pub async fn handle_scan(
    db: &DbState,
    config: &ConfigState,
    raw_uid: &str,
) -> Result<ScanOutcome, ApiError> {
    let nfc_uid = normalize_nfc_uid(raw_uid)?;

    if db.inner().sessions().find_open_by_uid(&nfc_uid).await?.is_some() {
        return Ok(ScanOutcome::CheckedOut(check_out(db, config, &nfc_uid).await?));
    }

    let session = check_in(
        db,
        config,
        CheckIn {
            nfc_uid,
            prepaid_tier_id: None,
            discount_bps: config.default_discount_bps,
        },
    )
    .await?;

    info!(nfc_uid = %session.nfc_uid, session_id = %session.id, "Patron checked in");
    Ok(ScanOutcome::CheckedIn { session })
}

/// Charge the card's open session would get if it left now.
pub async fn preview_charge(
    db: &DbState,
    config: &ConfigState,
    nfc_uid: &str,
) -> Result<SessionPreview, ApiError> {
    let nfc_uid = normalize_nfc_uid(nfc_uid)?;
    let session = open_session(db, &nfc_uid).await?;
    let (charge, _) = bill(db, config, &session, Utc::now()).await?;

    Ok(SessionPreview { session, charge })
}

/// Patrons currently inside, earliest entry first.
pub async fn list_open_sessions(db: &DbState) -> Result<Vec<TimeSession>, ApiError> {
    Ok(db.inner().sessions().list_open().await?)
}

pub async fn get_session(db: &DbState, id: &str) -> Result<TimeSession, ApiError> {
    db.inner()
        .sessions()
        .get_by_id(id)
        .await?
        .ok_or_else(|| ApiError::not_found("Session", id))
}

/// Sessions that entered in `[from, to)`.
pub async fn session_history(
    db: &DbState,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<Vec<TimeSession>, ApiError> {
    validate_range("date range", &from, &to)?;
    Ok(db.inner().sessions().history(from, to).await?)
}

async fn open_session(db: &DbState, nfc_uid: &str) -> Result<TimeSession, ApiError> {
    db.inner()
        .sessions()
        .find_open_by_uid(nfc_uid)
        .await?
        .ok_or_else(|| {
            CoreError::NoOpenSession {
                nfc_uid: nfc_uid.to_string(),
            }
            .into()
        })
}

/// Bills `session` as if it ended at `exited_at`. Also returns the prepaid
/// tier on the terms it was sold at, which keep pricing the session even if
/// the tier was repriced or retired since.
async fn bill(
    db: &DbState,
    config: &ConfigState,
    session: &TimeSession,
    exited_at: DateTime<Utc>,
) -> Result<(TimeCharge, Option<TimePriceTier>), ApiError> {
    let tiers_repo = db.inner().price_tiers();
    let tiers = tiers_repo.list_active().await?;

    let prepaid = match &session.prepaid_tier_id {
        Some(tier_id) => Some(
            session.prepaid_as_sold(
                tiers_repo
                    .get_by_id(tier_id)
                    .await?
                    .ok_or_else(|| CoreError::PriceTierNotFound(tier_id.clone()))?,
            ),
        ),
        None => None,
    };

    let charge = bill_session(
        session.entered_at,
        exited_at,
        &tiers,
        prepaid.as_ref(),
        session.discount_bps,
        config.grace_minutes,
    )?;

    Ok((charge, prepaid))
}

fn time_line(tier_id: &str, label: &str, price_cents: i64) -> TabEntry {
    TabEntry::new(
        ItemKind::Time,
        Some(tier_id.to_string()),
        format!("Tiempo {}", label),
        price_cents,
        1,
    )
}

fn overage_line(charge: &TimeCharge) -> TabEntry {
    TabEntry::new(
        ItemKind::Overage,
        Some(charge.tier_id.clone()),
        format!("Tiempo extra {} min", charge.overage_minutes),
        charge.overage_cents,
        1,
    )
}
