//! # Sale Repository
//!
//! Append-only storage for committed sales, plus the read-side reporting
//! queries (daily revenue, paginated history, single-sale detail).
//!
//! ## Append-Only
//! `append` is the only write, and it only runs on the checkout service's
//! transaction connection. There is no update or delete path: a committed
//! sale, including its line-item price snapshots, can never drift.

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use warung_core::checkout::SaleDraft;
use warung_core::reporting::{day_bounds_utc, report_zone, DailyReport, HistoryPage, Page};
use warung_core::types::{Sale, SaleLineItem};

/// Columns selected for every `Sale` row.
const SALE_COLUMNS: &str = "id, created_at, total_cents, payment_method, paid_cents, \
                            change_cents, payment_ref, created_by_user, created_by_role";

// =============================================================================
// Read Models
// =============================================================================

/// A sale with its line items enriched for display.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub items: Vec<SaleDetailLine>,
}

/// One line of a sale detail view.
///
/// `product_name` is the *current* catalog name, joined best-effort at read
/// time; when the product has been deleted a `#<id>` placeholder is shown
/// instead of failing. Prices and subtotals always come from the frozen
/// snapshot, never from the catalog.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SaleDetailLine {
    pub product_id: String,
    pub product_name: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
    pub subtotal_cents: i64,
}

#[derive(Debug, sqlx::FromRow)]
struct DetailRow {
    product_id: String,
    current_name: Option<String>,
    unit_price_cents: i64,
    quantity: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    /// Creates a new SaleRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale header by id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Gets a sale's line items in their original order.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleLineItem>> {
        let items = sqlx::query_as::<_, SaleLineItem>(
            "SELECT id, sale_id, product_id, name_snapshot, unit_price_cents, quantity \
             FROM sale_items WHERE sale_id = ?1 ORDER BY line_no",
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Gets a sale with display-ready line items.
    ///
    /// Line items are joined against the live catalog for the current
    /// product name; a deleted product falls back to a `#<id>` label.
    pub async fn get_detail(&self, id: &str) -> DbResult<SaleDetail> {
        let sale = self
            .get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("sale", id))?;

        let rows = sqlx::query_as::<_, DetailRow>(
            "SELECT si.product_id, p.name AS current_name, si.unit_price_cents, si.quantity \
             FROM sale_items si \
             LEFT JOIN products p ON p.id = si.product_id \
             WHERE si.sale_id = ?1 \
             ORDER BY si.line_no",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| SaleDetailLine {
                product_name: row
                    .current_name
                    .unwrap_or_else(|| format!("#{}", row.product_id)),
                subtotal_cents: row.unit_price_cents * row.quantity,
                product_id: row.product_id,
                unit_price_cents: row.unit_price_cents,
                quantity: row.quantity,
            })
            .collect();

        Ok(SaleDetail { sale, items })
    }

    /// Revenue aggregate for one calendar day in the reporting zone.
    ///
    /// A day with no sales reports `{0, 0}`, never an error.
    pub async fn daily_report(&self, date: NaiveDate) -> DbResult<DailyReport> {
        let (start, end) = day_bounds_utc(date, report_zone());

        let (total_transactions, total_revenue_cents): (i64, i64) = sqlx::query_as(
            "SELECT COUNT(*), COALESCE(SUM(total_cents), 0) \
             FROM sales WHERE created_at >= ?1 AND created_at < ?2",
        )
        .bind(start)
        .bind(end)
        .fetch_one(&self.pool)
        .await?;

        Ok(DailyReport {
            date,
            total_transactions,
            total_revenue_cents,
        })
    }

    /// Paginated sale history, newest first, optionally filtered to one
    /// calendar day in the reporting zone. Paging values are clamped to
    /// safe bounds.
    pub async fn history(
        &self,
        page: i64,
        page_size: i64,
        date: Option<NaiveDate>,
    ) -> DbResult<HistoryPage<Sale>> {
        let page = Page::clamp(page, page_size);
        let bounds = date.map(|d| day_bounds_utc(d, report_zone()));

        let total: i64 = match bounds {
            Some((start, end)) => {
                sqlx::query_scalar(
                    "SELECT COUNT(*) FROM sales WHERE created_at >= ?1 AND created_at < ?2",
                )
                .bind(start)
                .bind(end)
                .fetch_one(&self.pool)
                .await?
            }
            None => {
                sqlx::query_scalar("SELECT COUNT(*) FROM sales")
                    .fetch_one(&self.pool)
                    .await?
            }
        };

        let items = match bounds {
            Some((start, end)) => {
                sqlx::query_as::<_, Sale>(&format!(
                    "SELECT {SALE_COLUMNS} FROM sales \
                     WHERE created_at >= ?1 AND created_at < ?2 \
                     ORDER BY created_at DESC LIMIT ?3 OFFSET ?4"
                ))
                .bind(start)
                .bind(end)
                .bind(page.page_size)
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, Sale>(&format!(
                    "SELECT {SALE_COLUMNS} FROM sales \
                     ORDER BY created_at DESC LIMIT ?1 OFFSET ?2"
                ))
                .bind(page.page_size)
                .bind(page.offset())
                .fetch_all(&self.pool)
                .await?
            }
        };

        Ok(HistoryPage {
            page: page.page,
            page_size: page.page_size,
            total,
            total_pages: page.total_pages(total),
            items,
        })
    }
}

// =============================================================================
// Transaction-Scoped Append
// =============================================================================

/// Persists a sale draft (header + all line items) on the given
/// transaction connection and returns the committed aggregate.
///
/// Assigns the sale id and the commit timestamp here so they are decided
/// exactly once, at the moment the sale becomes durable.
pub(crate) async fn append(
    conn: &mut SqliteConnection,
    draft: &SaleDraft,
) -> DbResult<(Sale, Vec<SaleLineItem>)> {
    let sale = Sale {
        id: Uuid::new_v4().to_string(),
        created_at: Utc::now(),
        total_cents: draft.total_cents,
        payment_method: draft.payment_method,
        paid_cents: draft.paid_cents,
        change_cents: draft.change_cents,
        payment_ref: draft.payment_ref.clone(),
        created_by_user: draft.created_by_user.clone(),
        created_by_role: draft.created_by_role.clone(),
    };

    debug!(id = %sale.id, total = %sale.total_cents, "appending sale");

    sqlx::query(
        "INSERT INTO sales (id, created_at, total_cents, payment_method, paid_cents, \
                            change_cents, payment_ref, created_by_user, created_by_role) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
    )
    .bind(&sale.id)
    .bind(sale.created_at)
    .bind(sale.total_cents)
    .bind(sale.payment_method)
    .bind(sale.paid_cents)
    .bind(sale.change_cents)
    .bind(&sale.payment_ref)
    .bind(&sale.created_by_user)
    .bind(&sale.created_by_role)
    .execute(&mut *conn)
    .await?;

    let mut items = Vec::with_capacity(draft.lines.len());
    for (line_no, line) in draft.lines.iter().enumerate() {
        let item = SaleLineItem {
            id: Uuid::new_v4().to_string(),
            sale_id: sale.id.clone(),
            product_id: line.product_id.clone(),
            name_snapshot: line.name_snapshot.clone(),
            unit_price_cents: line.unit_price_cents,
            quantity: line.quantity,
        };

        sqlx::query(
            "INSERT INTO sale_items (id, sale_id, product_id, name_snapshot, \
                                     unit_price_cents, quantity, line_no) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.product_id)
        .bind(&item.name_snapshot)
        .bind(item.unit_price_cents)
        .bind(item.quantity)
        .bind(line_no as i64)
        .execute(&mut *conn)
        .await?;

        items.push(item);
    }

    Ok((sale, items))
}
