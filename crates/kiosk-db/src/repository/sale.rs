//! # Sale Repository
//!
//! Sales, their lines, folios and settlement.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. OPEN TAB                                                           │
//! │     ├── create()            cart checkout without payment               │
//! │     └── sessions().check_in/check_out   time lines for an NFC card     │
//! │         → Sale { status: Pending, folio: 20261019-0007 }               │
//! │                                                                         │
//! │  2. SETTLE                                                             │
//! │     └── finalize()  → Completed, payment method, tendered, change      │
//! │         (create() with a settlement goes straight here)                │
//! │                                                                         │
//! │  3. OR ABANDON                                                         │
//! │     └── cancel()    → Cancelled                                        │
//! │                                                                         │
//! │  Completed sales are never edited; returns correct them.               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Opening a tab and writing its lines always share one transaction, so the
//! totals on `sales` always match the sum of `sale_items`. Those transactions
//! start with `BEGIN IMMEDIATE`: the writer lock is taken before the folio is
//! read, so two registers on the same file never draw the same folio.

use chrono::{DateTime, Local, Utc};
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use kiosk_core::ticket::{SaleTotals, Settlement};
use kiosk_core::{new_id, ItemKind, PaymentMethod, Sale, SaleItem, SaleStatus};

const SELECT_SALE: &str = r#"
    SELECT
        id, folio, status, subtotal_cents, discount_cents, total_cents,
        payment_method, tendered_cents, change_cents, cashier, notes,
        created_at, updated_at, completed_at
    FROM sales
"#;

const SELECT_ITEM: &str = r#"
    SELECT
        id, sale_id, kind, reference_id, name_snapshot,
        unit_price_cents, quantity, line_total_cents, created_at
    FROM sale_items
"#;

/// A line to write on a sale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabEntry {
    pub kind: ItemKind,
    pub reference_id: Option<String>,
    pub name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl TabEntry {
    pub fn new(
        kind: ItemKind,
        reference_id: Option<String>,
        name: impl Into<String>,
        unit_price_cents: i64,
        quantity: i64,
    ) -> Self {
        TabEntry {
            kind,
            reference_id,
            name: name.into(),
            unit_price_cents,
            quantity,
        }
    }

    /// Snapshot of this entry as a line of `sale_id`.
    pub fn to_item(&self, sale_id: &str) -> SaleItem {
        SaleItem::new(
            sale_id,
            self.kind,
            self.reference_id.clone(),
            self.name.clone(),
            self.unit_price_cents,
            self.quantity,
        )
    }
}

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Writes a new sale with its lines.
    ///
    /// Without a settlement the sale stays pending; with one it is completed
    /// in the same transaction.
    pub async fn create(
        &self,
        entries: &[TabEntry],
        discount_cents: i64,
        cashier: &str,
        settlement: Option<&Settlement>,
        notes: Option<String>,
    ) -> DbResult<Sale> {
        let mut tx = begin_write(&self.pool).await?;

        let sale = open_tab(&mut tx, cashier, notes).await?;
        append_to_tab(&mut tx, &sale.id, entries, discount_cents).await?;
        if let Some(settlement) = settlement {
            complete(&mut tx, &sale.id, settlement).await?;
        }
        let sale = fetch_sale(&mut tx, &sale.id).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            folio = %sale.folio,
            status = %sale.status,
            total_cents = sale.total_cents,
            "Sale created"
        );
        Ok(sale)
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    pub async fn get_by_folio(&self, folio: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE folio = ?1"))
            .bind(folio)
            .fetch_optional(&self.pool)
            .await?;

        Ok(sale)
    }

    /// Lines of a sale in the order they were written.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(&format!(
            "{SELECT_ITEM} WHERE sale_id = ?1 ORDER BY created_at, rowid"
        ))
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn get_item(&self, item_id: &str) -> DbResult<Option<SaleItem>> {
        let item = sqlx::query_as::<_, SaleItem>(&format!("{SELECT_ITEM} WHERE id = ?1"))
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(item)
    }

    /// Open tabs, oldest first.
    pub async fn list_pending(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "{SELECT_SALE} WHERE status = 'pending' ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Sales completed in `[from, to)`, oldest first.
    pub async fn list_completed(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            r#"{SELECT_SALE}
            WHERE status = 'completed'
              AND completed_at >= ?1 AND completed_at < ?2
            ORDER BY completed_at"#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Collects payment on a pending sale.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - no pending sale with that id
    pub async fn finalize(&self, sale_id: &str, settlement: &Settlement) -> DbResult<Sale> {
        let mut tx = begin_write(&self.pool).await?;

        complete(&mut tx, sale_id, settlement).await?;
        let sale = fetch_sale(&mut tx, sale_id).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            folio = %sale.folio,
            method = ?settlement.method,
            total_cents = sale.total_cents,
            change_cents = settlement.change_cents,
            "Sale finalized"
        );
        Ok(sale)
    }

    /// Abandons a pending sale.
    pub async fn cancel(&self, sale_id: &str) -> DbResult<Sale> {
        let result = sqlx::query(
            r#"
            UPDATE sales SET
                status = 'cancelled',
                updated_at = ?2
            WHERE id = ?1 AND status = 'pending'
            "#,
        )
        .bind(sale_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Pending sale", sale_id));
        }

        info!(sale_id = %sale_id, "Sale cancelled");

        self.get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Completed sales in `[from, to)` summed by payment method:
    /// `(cash_cents, card_cents)`.
    pub async fn totals_by_method(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<(i64, i64)> {
        let rows: Vec<(Option<PaymentMethod>, i64)> = sqlx::query_as(
            r#"
            SELECT payment_method, COALESCE(SUM(total_cents), 0)
            FROM sales
            WHERE status = 'completed'
              AND completed_at >= ?1 AND completed_at < ?2
            GROUP BY payment_method
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        let mut cash = 0;
        let mut card = 0;
        for (method, total) in rows {
            match method {
                Some(PaymentMethod::Card) => card += total,
                Some(PaymentMethod::Cash) | None => cash += total,
            }
        }

        Ok((cash, card))
    }
}

// =============================================================================
// Transaction helpers (shared with the time session repository)
// =============================================================================

/// Starts a transaction that holds the write lock from its first statement.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with("BEGIN IMMEDIATE").await?)
}

/// Next folio for today: `YYYYMMDD-NNNN`, NNNN counting from 0001 per local
/// calendar day.
pub(crate) async fn next_folio(conn: &mut SqliteConnection, now: DateTime<Utc>) -> DbResult<String> {
    let day = now.with_timezone(&Local).format("%Y%m%d").to_string();

    let last: i64 = sqlx::query_scalar(
        r#"
        SELECT COALESCE(MAX(CAST(substr(folio, 10) AS INTEGER)), 0)
        FROM sales
        WHERE folio LIKE ?1
        "#,
    )
    .bind(format!("{day}-%"))
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{}-{:04}", day, last + 1))
}

/// Inserts an empty pending sale.
pub(crate) async fn open_tab(
    conn: &mut SqliteConnection,
    cashier: &str,
    notes: Option<String>,
) -> DbResult<Sale> {
    let now = Utc::now();
    let sale = Sale {
        id: new_id(),
        folio: next_folio(conn, now).await?,
        status: SaleStatus::Pending,
        subtotal_cents: 0,
        discount_cents: 0,
        total_cents: 0,
        payment_method: None,
        tendered_cents: None,
        change_cents: None,
        cashier: cashier.to_string(),
        notes,
        created_at: now,
        updated_at: now,
        completed_at: None,
    };

    debug!(sale_id = %sale.id, folio = %sale.folio, "Opening tab");

    sqlx::query(
        r#"
        INSERT INTO sales (
            id, folio, status,
            subtotal_cents, discount_cents, total_cents,
            payment_method, tendered_cents, change_cents,
            cashier, notes, created_at, updated_at, completed_at
        ) VALUES (
            ?1, ?2, ?3,
            ?4, ?5, ?6,
            ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14
        )
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.folio)
    .bind(sale.status)
    .bind(sale.subtotal_cents)
    .bind(sale.discount_cents)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.tendered_cents)
    .bind(sale.change_cents)
    .bind(&sale.cashier)
    .bind(&sale.notes)
    .bind(sale.created_at)
    .bind(sale.updated_at)
    .bind(sale.completed_at)
    .execute(&mut *conn)
    .await?;

    Ok(sale)
}

/// Writes lines on a pending sale, adds `extra_discount_cents` to its
/// discount and recomputes the totals.
pub(crate) async fn append_to_tab(
    conn: &mut SqliteConnection,
    sale_id: &str,
    entries: &[TabEntry],
    extra_discount_cents: i64,
) -> DbResult<()> {
    let current_discount: Option<i64> = sqlx::query_scalar(
        "SELECT discount_cents FROM sales WHERE id = ?1 AND status = 'pending'",
    )
    .bind(sale_id)
    .fetch_optional(&mut *conn)
    .await?;
    let current_discount =
        current_discount.ok_or_else(|| DbError::not_found("Pending sale", sale_id))?;

    for entry in entries {
        let item = entry.to_item(sale_id);
        debug!(sale_id = %sale_id, kind = ?item.kind, name = %item.name_snapshot, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, kind, reference_id, name_snapshot,
                unit_price_cents, quantity, line_total_cents, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(item.kind)
        .bind(&item.reference_id)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(item.line_total_cents)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;
    }

    let subtotal: i64 = sqlx::query_scalar(
        "SELECT COALESCE(SUM(line_total_cents), 0) FROM sale_items WHERE sale_id = ?1",
    )
    .bind(sale_id)
    .fetch_one(&mut *conn)
    .await?;

    let totals = SaleTotals::from_subtotal(subtotal, current_discount + extra_discount_cents);

    sqlx::query(
        r#"
        UPDATE sales SET
            subtotal_cents = ?2,
            discount_cents = ?3,
            total_cents = ?4,
            updated_at = ?5
        WHERE id = ?1
        "#,
    )
    .bind(sale_id)
    .bind(totals.subtotal_cents)
    .bind(totals.discount_cents)
    .bind(totals.total_cents)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// Marks a pending sale completed with its payment figures.
pub(crate) async fn complete(
    conn: &mut SqliteConnection,
    sale_id: &str,
    settlement: &Settlement,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        r#"
        UPDATE sales SET
            status = 'completed',
            payment_method = ?2,
            tendered_cents = ?3,
            change_cents = ?4,
            completed_at = ?5,
            updated_at = ?5
        WHERE id = ?1 AND status = 'pending'
        "#,
    )
    .bind(sale_id)
    .bind(settlement.method)
    .bind(settlement.tendered_cents)
    .bind(settlement.change_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Pending sale", sale_id));
    }

    Ok(())
}

pub(crate) async fn fetch_sale(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Sale> {
    sqlx::query_as::<_, Sale>(&format!("{SELECT_SALE} WHERE id = ?1"))
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("Sale", sale_id))
}
