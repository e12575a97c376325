//! # Time Session Repository
//!
//! Entry and exit of NFC-tagged patrons, with the pending sale ("tab") that
//! collects their time charge.
//!
//! ```text
//! check_in                                  check_out
//! ────────                                  ─────────
//! INSERT time_sessions (open)               session open? ─ no ─► NotFound
//! prepaid tier? → open tab + Time line      tab still pending? ─ yes ─► append lines
//!                                                              └ no ──► new tab (if lines)
//!                                           UPDATE time_sessions (closed, billed)
//! ```
//!
//! Both sides run in a single write transaction. The partial unique index on
//! `(nfc_uid) WHERE status = 'open'` keeps one open session per card.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::sale::{append_to_tab, begin_write, fetch_sale, open_tab, TabEntry};
use kiosk_core::{Sale, SaleStatus, TimeSession};

const SELECT_SESSION: &str = r#"
    SELECT
        id, nfc_uid, status, entered_at, exited_at, prepaid_tier_id, prepaid_minutes,
        prepaid_price_cents, discount_bps, billed_minutes, charged_cents, sale_id, cashier,
        created_at, updated_at
    FROM time_sessions
"#;

/// What check-out writes: the billing result and the lines still to collect.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub exited_at: DateTime<Utc>,
    pub billed_minutes: i64,
    pub charged_cents: i64,
    /// Lines to add to the session's tab.
    pub entries: Vec<TabEntry>,
    /// Added to the tab's discount.
    pub discount_cents: i64,
}

#[derive(Debug, Clone)]
pub struct TimeSessionRepository {
    pool: SqlitePool,
}

impl TimeSessionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TimeSessionRepository { pool }
    }

    /// Opens a session. Non-empty `entries` (a prepaid tier) are written on a
    /// new pending sale linked to the session.
    ///
    /// ## Returns
    /// * `Err(DbError::UniqueViolation)` - the card already has an open session
    pub async fn check_in(
        &self,
        session: &TimeSession,
        entries: &[TabEntry],
        discount_cents: i64,
    ) -> DbResult<TimeSession> {
        let mut tx = begin_write(&self.pool).await?;
        let mut session = session.clone();

        if !entries.is_empty() {
            let tab = open_tab(&mut tx, &session.cashier, None).await?;
            append_to_tab(&mut tx, &tab.id, entries, discount_cents).await?;
            session.sale_id = Some(tab.id);
        }

        sqlx::query(
            r#"
            INSERT INTO time_sessions (
                id, nfc_uid, status, entered_at, exited_at, prepaid_tier_id, prepaid_minutes,
                prepaid_price_cents, discount_bps, billed_minutes, charged_cents, sale_id,
                cashier, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
            "#,
        )
        .bind(&session.id)
        .bind(&session.nfc_uid)
        .bind(session.status)
        .bind(session.entered_at)
        .bind(session.exited_at)
        .bind(&session.prepaid_tier_id)
        .bind(session.prepaid_minutes)
        .bind(session.prepaid_price_cents)
        .bind(session.discount_bps)
        .bind(session.billed_minutes)
        .bind(session.charged_cents)
        .bind(&session.sale_id)
        .bind(&session.cashier)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(
            session_id = %session.id,
            nfc_uid = %session.nfc_uid,
            prepaid_tier_id = ?session.prepaid_tier_id,
            discount_bps = session.discount_bps,
            "Session opened"
        );
        Ok(session)
    }

    /// Closes an open session and puts its charge on a tab.
    ///
    /// The session's own tab is reused while it is still pending. If it was
    /// already settled (prepaid at the entrance) or never existed, a new tab
    /// is opened for the remaining lines. Returns the tab to collect, if any.
    pub async fn check_out(
        &self,
        session_id: &str,
        checkout: &Checkout,
    ) -> DbResult<(TimeSession, Option<Sale>)> {
        let mut tx = begin_write(&self.pool).await?;

        let session = fetch_session(&mut tx, session_id)
            .await?
            .filter(TimeSession::is_open)
            .ok_or_else(|| DbError::not_found("Open session", session_id))?;

        let pending_tab = match &session.sale_id {
            Some(sale_id) => {
                let tab = fetch_sale(&mut tx, sale_id).await?;
                (tab.status == SaleStatus::Pending).then_some(tab.id)
            }
            None => None,
        };

        let tab_id = match pending_tab {
            Some(id) => Some(id),
            None if !checkout.entries.is_empty() || checkout.discount_cents > 0 => {
                Some(open_tab(&mut tx, &session.cashier, None).await?.id)
            }
            None => None,
        };

        if let Some(tab_id) = &tab_id {
            append_to_tab(&mut tx, tab_id, &checkout.entries, checkout.discount_cents).await?;
        }

        let sale_id = tab_id.clone().or(session.sale_id.clone());
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE time_sessions SET
                status = 'closed',
                exited_at = ?2,
                billed_minutes = ?3,
                charged_cents = ?4,
                sale_id = ?5,
                updated_at = ?6
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(session_id)
        .bind(checkout.exited_at)
        .bind(checkout.billed_minutes)
        .bind(checkout.charged_cents)
        .bind(&sale_id)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let tab = match &tab_id {
            Some(id) => Some(fetch_sale(&mut tx, id).await?),
            None => None,
        };
        let closed = fetch_session(&mut tx, session_id)
            .await?
            .ok_or_else(|| DbError::not_found("Session", session_id))?;

        tx.commit().await?;

        info!(
            session_id = %closed.id,
            nfc_uid = %closed.nfc_uid,
            billed_minutes = checkout.billed_minutes,
            charged_cents = checkout.charged_cents,
            sale_id = ?closed.sale_id,
            "Session closed"
        );
        Ok((closed, tab))
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TimeSession>> {
        let session = sqlx::query_as::<_, TimeSession>(&format!("{SELECT_SESSION} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(session)
    }

    /// The open session of a card, if any.
    pub async fn find_open_by_uid(&self, nfc_uid: &str) -> DbResult<Option<TimeSession>> {
        debug!(nfc_uid = %nfc_uid, "Looking up open session");

        let session = sqlx::query_as::<_, TimeSession>(&format!(
            "{SELECT_SESSION} WHERE nfc_uid = ?1 AND status = 'open'"
        ))
        .bind(nfc_uid)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session)
    }

    /// Patrons currently inside, earliest entry first.
    pub async fn list_open(&self) -> DbResult<Vec<TimeSession>> {
        let sessions = sqlx::query_as::<_, TimeSession>(&format!(
            "{SELECT_SESSION} WHERE status = 'open' ORDER BY entered_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }

    /// Sessions that entered in `[from, to)`, open or closed.
    pub async fn history(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<TimeSession>> {
        let sessions = sqlx::query_as::<_, TimeSession>(&format!(
            "{SELECT_SESSION} WHERE entered_at >= ?1 AND entered_at < ?2 ORDER BY entered_at"
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sessions)
    }
}

async fn fetch_session(
    conn: &mut SqliteConnection,
    session_id: &str,
) -> DbResult<Option<TimeSession>> {
    let session = sqlx::query_as::<_, TimeSession>(&format!("{SELECT_SESSION} WHERE id = ?1"))
        .bind(session_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(session)
}
