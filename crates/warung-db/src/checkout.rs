//! # Checkout Service
//!
//! The sale commit transaction: the one place where "check stock, decrement
//! stock, persist sale" must look atomic to every other observer.
//!
//! ## Protocol
//! ```text
//! begin transaction
//!   1. batch-read requested products        (re-validation, same tx)
//!   2. warung_core::resolve_items           (pure, no writes yet)
//!   3. warung_core::assemble                (totals, payment, draft)
//!   4. per product: conditional decrement   (StockRaceLost on conflict)
//!   5. append sale header + line items
//! commit
//! ```
//!
//! Any failure after step 3 drops the transaction, which rolls back every
//! decrement already applied: either a fully valid sale exists with exactly
//! matching stock decrements, or nothing changed at all. Nothing is left
//! half-done, so resubmitting the identical request after a failure is
//! always safe.

use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::DbResult;
use crate::repository::{product, sale};
use warung_core::types::{PaymentMethod, RequestedItem, Sale, SaleLineItem};

// =============================================================================
// Request / Response
// =============================================================================

/// A checkout request as it arrives from the boundary.
///
/// `payment_method` is still free text here; it is validated and mapped to
/// the [`PaymentMethod`] enum before anything else happens. Attribution
/// fields come from the caller's authenticated identity and are stored
/// opaquely.
#[derive(Debug, Clone, serde::Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<RequestedItem>,
    pub payment_method: Option<String>,
    pub cash_received_cents: Option<i64>,
    pub payment_ref: Option<String>,
    pub created_by_user: String,
    pub created_by_role: String,
}

/// The committed sale aggregate returned to the caller.
#[derive(Debug, Clone, serde::Serialize)]
pub struct CommittedSale {
    pub sale: Sale,
    pub items: Vec<SaleLineItem>,
}

// =============================================================================
// Service
// =============================================================================

/// Orchestrates the atomic sale commit.
#[derive(Debug, Clone)]
pub struct CheckoutService {
    pool: SqlitePool,
}

impl CheckoutService {
    /// Creates a new CheckoutService.
    pub fn new(pool: SqlitePool) -> Self {
        CheckoutService { pool }
    }

    /// Commits a sale: validates against live catalog state, decrements
    /// stock, and persists the sale, all inside one transaction.
    ///
    /// ## Errors
    /// - [`crate::DbError::Checkout`] - request invalid; nothing was written
    /// - [`crate::DbError::StockRaceLost`] - a concurrent commit won the
    ///   remaining stock; nothing was written, retry is safe
    /// - other variants - infrastructure failure; the transaction rolled
    ///   back, stock is unchanged
    pub async fn commit_sale(&self, request: &CheckoutRequest) -> DbResult<CommittedSale> {
        let method = PaymentMethod::parse(request.payment_method.as_deref())?;

        let mut tx = self.pool.begin().await?;

        // Re-validate against the catalog as this transaction sees it,
        // not against whatever the caller read earlier.
        let ids = distinct_ids(&request.items);
        let products = product::fetch_by_ids(&mut tx, &ids).await?;

        let lines = warung_core::resolve_items(&request.items, &products)?;
        let draft = warung_core::assemble(
            lines,
            method,
            request.cash_received_cents,
            request.payment_ref.as_deref(),
            &request.created_by_user,
            &request.created_by_role,
        )?;

        // Validation passed on this transaction's snapshot, but a commit on
        // another connection may have raced us since; the conditional
        // decrement is what makes that race lose cleanly.
        for (product_id, quantity) in aggregate_quantities(&request.items) {
            product::decrement_stock_on(&mut tx, &product_id, quantity).await?;
        }

        let (sale, items) = sale::append(&mut tx, &draft).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            total_cents = %sale.total_cents,
            method = %sale.payment_method.as_str(),
            lines = items.len(),
            "sale committed"
        );

        Ok(CommittedSale { sale, items })
    }
}

/// Distinct product ids in first-seen order, for the batch lookup.
fn distinct_ids(items: &[RequestedItem]) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for item in items {
        if !ids.contains(&item.product_id) {
            ids.push(item.product_id.clone());
        }
    }
    ids
}

/// Total quantity per product in first-seen order, so each product gets
/// exactly one decrement regardless of how many request lines name it.
fn aggregate_quantities(items: &[RequestedItem]) -> Vec<(String, i64)> {
    let mut totals: Vec<(String, i64)> = Vec::new();
    for item in items {
        match totals.iter_mut().find(|(id, _)| *id == item.product_id) {
            Some((_, qty)) => *qty += item.quantity,
            None => totals.push((item.product_id.clone(), item.quantity)),
        }
    }
    debug!(products = totals.len(), "aggregated decrement plan");
    totals
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use crate::repository::product::ProductInput;
    use chrono::{Datelike, Utc};
    use warung_core::reporting::report_zone;
    use warung_core::CheckoutError;

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn file_db_config() -> (DbConfig, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "warung-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        (DbConfig::new(&path).max_connections(4), path)
    }

    fn remove_db_files(path: &std::path::Path) {
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }

    async fn seed_product(db: &Database, name: &str, price_cents: i64, stock: i64) -> String {
        db.catalog()
            .create(ProductInput {
                name: name.to_string(),
                category: None,
                price_cents,
                stock,
            })
            .await
            .unwrap()
            .id
    }

    fn request(items: Vec<(&str, i64)>) -> CheckoutRequest {
        CheckoutRequest {
            items: items
                .into_iter()
                .map(|(id, quantity)| RequestedItem {
                    product_id: id.to_string(),
                    quantity,
                })
                .collect(),
            payment_method: Some("Cash".to_string()),
            cash_received_cents: Some(1_000_000),
            payment_ref: None,
            created_by_user: "jaya".to_string(),
            created_by_role: "Cashier".to_string(),
        }
    }

    /// The simple cash sale scenario: price 10.00 x 2, cash 25.00.
    #[tokio::test]
    async fn test_simple_cash_sale() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Teh Botol", 1000, 5).await;

        let mut req = request(vec![(&p1, 2)]);
        req.cash_received_cents = Some(2500);

        let committed = db.checkout().commit_sale(&req).await.unwrap();

        assert_eq!(committed.sale.total_cents, 2000);
        assert_eq!(committed.sale.paid_cents, 2500);
        assert_eq!(committed.sale.change_cents, 500);
        assert_eq!(committed.sale.payment_method, PaymentMethod::Cash);
        assert_eq!(committed.items.len(), 1);
        assert_eq!(committed.items[0].unit_price_cents, 1000);
        assert_eq!(committed.items[0].quantity, 2);

        let stock = db.catalog().get_by_id(&p1).await.unwrap().unwrap().stock;
        assert_eq!(stock, 3);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_stock_unchanged() {
        let db = test_db().await;
        let p = seed_product(&db, "Indomie", 300, 1).await;

        let err = db
            .checkout()
            .commit_sale(&request(vec![(&p, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Checkout(CheckoutError::InsufficientStock { available: 1, requested: 2, .. })
        ));

        let stock = db.catalog().get_by_id(&p).await.unwrap().unwrap().stock;
        assert_eq!(stock, 1);
    }

    #[tokio::test]
    async fn test_insufficient_cash_persists_nothing() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 1000, 5).await;

        let mut req = request(vec![(&p, 2)]);
        req.cash_received_cents = Some(1500);

        let err = db.checkout().commit_sale(&req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Checkout(CheckoutError::InsufficientPayment {
                total_cents: 2000,
                received_cents: 1500,
            })
        ));

        // no stock mutation, no sale persisted
        let stock = db.catalog().get_by_id(&p).await.unwrap().unwrap().stock;
        assert_eq!(stock, 5);
        let history = db.sales().history(1, 10, None).await.unwrap();
        assert_eq!(history.total, 0);
    }

    #[tokio::test]
    async fn test_multi_item_sale_decrements_every_product() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Teh Botol", 500, 10).await;
        let p2 = seed_product(&db, "Indomie", 300, 8).await;

        let mut req = request(vec![(&p1, 2), (&p2, 3)]);
        req.payment_method = Some("qris".to_string());
        req.cash_received_cents = None;
        req.payment_ref = Some("QR-77".to_string());

        let committed = db.checkout().commit_sale(&req).await.unwrap();

        assert_eq!(committed.sale.total_cents, 1900);
        assert_eq!(committed.sale.paid_cents, 1900);
        assert_eq!(committed.sale.change_cents, 0);
        assert_eq!(committed.sale.payment_ref.as_deref(), Some("QR-77"));

        assert_eq!(db.catalog().get_by_id(&p1).await.unwrap().unwrap().stock, 8);
        assert_eq!(db.catalog().get_by_id(&p2).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_failing_line_rolls_back_whole_sale() {
        // p1 could be decremented, but p2 cannot; neither may change.
        let db = test_db().await;
        let p1 = seed_product(&db, "Teh Botol", 500, 10).await;
        let p2 = seed_product(&db, "Indomie", 300, 1).await;

        let err = db
            .checkout()
            .commit_sale(&request(vec![(&p1, 2), (&p2, 5)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Checkout(_)));

        assert_eq!(db.catalog().get_by_id(&p1).await.unwrap().unwrap().stock, 10);
        assert_eq!(db.catalog().get_by_id(&p2).await.unwrap().unwrap().stock, 1);
        assert_eq!(db.sales().history(1, 10, None).await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn test_duplicate_lines_for_one_product() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 500, 5).await;

        let committed = db
            .checkout()
            .commit_sale(&request(vec![(&p, 2), (&p, 1)]))
            .await
            .unwrap();

        // two request lines stay two line items, but only one decrement
        assert_eq!(committed.items.len(), 2);
        assert_eq!(db.catalog().get_by_id(&p).await.unwrap().unwrap().stock, 2);
    }

    #[tokio::test]
    async fn test_duplicate_lines_exceeding_stock_fail_as_a_unit() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 500, 1).await;

        let err = db
            .checkout()
            .commit_sale(&request(vec![(&p, 1), (&p, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Checkout(CheckoutError::InsufficientStock { requested: 2, .. })
        ));
        assert_eq!(db.catalog().get_by_id(&p).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_unknown_product_rejected() {
        let db = test_db().await;
        let err = db
            .checkout()
            .commit_sale(&request(vec![("ghost", 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Checkout(CheckoutError::UnknownProduct { .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_request_rejected() {
        let db = test_db().await;
        let err = db
            .checkout()
            .commit_sale(&request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Checkout(CheckoutError::EmptyRequest)));
    }

    #[tokio::test]
    async fn test_unknown_payment_method_rejected_before_any_read() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 500, 5).await;

        let mut req = request(vec![(&p, 1)]);
        req.payment_method = Some("cheque".to_string());

        let err = db.checkout().commit_sale(&req).await.unwrap_err();
        assert!(matches!(
            err,
            DbError::Checkout(CheckoutError::UnknownPaymentMethod { .. })
        ));
    }

    /// Price freeze: a later catalog price change must not affect a
    /// committed sale, and the stored total must match a recomputation
    /// from its own line items.
    #[tokio::test]
    async fn test_price_freeze_survives_catalog_edit() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 1000, 5).await;

        let committed = db.checkout().commit_sale(&request(vec![(&p, 2)])).await.unwrap();

        db.catalog()
            .update(
                &p,
                ProductInput {
                    name: "Teh Botol".to_string(),
                    category: None,
                    price_cents: 9999,
                    stock: 3,
                },
            )
            .await
            .unwrap();

        let items = db.sales().get_items(&committed.sale.id).await.unwrap();
        assert_eq!(items[0].unit_price_cents, 1000);

        let recomputed: i64 = items.iter().map(|i| i.subtotal().cents()).sum();
        assert_eq!(recomputed, committed.sale.total_cents);
    }

    /// Two concurrent commits for the last unit: exactly one succeeds, the
    /// loser fails with a stock error and the stock never goes negative.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_last_unit_contention_has_exactly_one_winner() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 500, 1).await;

        let db_a = db.clone();
        let db_b = db.clone();
        let req_a = request(vec![(p.as_str(), 1)]);
        let req_b = request(vec![(p.as_str(), 1)]);

        let (res_a, res_b) = tokio::join!(
            tokio::spawn(async move { db_a.checkout().commit_sale(&req_a).await }),
            tokio::spawn(async move { db_b.checkout().commit_sale(&req_b).await }),
        );

        let results = [res_a.unwrap(), res_b.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);

        // the loser saw either InsufficientStock (revalidation caught it)
        // or StockRaceLost (the conditional decrement did)
        let loser = results.iter().find(|r| r.is_err()).unwrap();
        match loser.as_ref().unwrap_err() {
            DbError::StockRaceLost { .. }
            | DbError::Checkout(CheckoutError::InsufficientStock { .. }) => {}
            other => panic!("unexpected loser error: {other:?}"),
        }

        assert_eq!(db.catalog().get_by_id(&p).await.unwrap().unwrap().stock, 0);
        assert_eq!(db.sales().history(1, 10, None).await.unwrap().total, 1);
    }

    /// Same last-unit contention, but on a file-backed multi-connection
    /// pool: both commits can hold overlapping read snapshots, so the loser
    /// goes through SQLite's busy/snapshot refusal rather than being
    /// serialized on a single connection. The classification must still be
    /// a stock error, never a generic query failure.
    #[tokio::test(flavor = "multi_thread")]
    async fn test_contention_across_connections_classifies_loser() {
        let (config, path) = file_db_config();
        let db = Database::new(config).await.unwrap();
        let p = seed_product(&db, "Teh Botol", 500, 1).await;

        let db_a = db.clone();
        let db_b = db.clone();
        let req_a = request(vec![(p.as_str(), 1)]);
        let req_b = request(vec![(p.as_str(), 1)]);

        let (res_a, res_b) = tokio::join!(
            tokio::spawn(async move { db_a.checkout().commit_sale(&req_a).await }),
            tokio::spawn(async move { db_b.checkout().commit_sale(&req_b).await }),
        );

        let results = [res_a.unwrap(), res_b.unwrap()];
        let winners = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(winners, 1);

        let loser = results.iter().find(|r| r.is_err()).unwrap();
        match loser.as_ref().unwrap_err() {
            DbError::StockRaceLost { .. }
            | DbError::Checkout(CheckoutError::InsufficientStock { .. }) => {}
            other => panic!("unexpected loser error: {other:?}"),
        }

        assert_eq!(db.catalog().get_by_id(&p).await.unwrap().unwrap().stock, 0);
        assert_eq!(db.sales().history(1, 10, None).await.unwrap().total, 1);

        db.close().await;
        remove_db_files(&path);
    }

    #[tokio::test]
    async fn test_daily_report_and_history() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 1000, 50).await;

        for _ in 0..3 {
            db.checkout().commit_sale(&request(vec![(&p, 1)])).await.unwrap();
        }

        // today in the reporting zone covers sales committed just now
        let today = Utc::now().with_timezone(&report_zone()).date_naive();

        let report = db.sales().daily_report(today).await.unwrap();
        assert_eq!(report.total_transactions, 3);
        assert_eq!(report.total_revenue_cents, 3000);

        // an empty day reports zeros, not an error
        let empty_day = today.with_year(today.year() - 1).unwrap();
        let report = db.sales().daily_report(empty_day).await.unwrap();
        assert_eq!(report.total_transactions, 0);
        assert_eq!(report.total_revenue_cents, 0);

        let history = db.sales().history(1, 2, None).await.unwrap();
        assert_eq!(history.total, 3);
        assert_eq!(history.total_pages, 2);
        assert_eq!(history.items.len(), 2);

        // newest first
        assert!(history.items[0].created_at >= history.items[1].created_at);

        // day filter
        let filtered = db.sales().history(1, 10, Some(today)).await.unwrap();
        assert_eq!(filtered.total, 3);
        let filtered = db.sales().history(1, 10, Some(empty_day)).await.unwrap();
        assert_eq!(filtered.total, 0);
    }

    #[tokio::test]
    async fn test_sale_detail_uses_current_name_and_placeholder() {
        let db = test_db().await;
        let p1 = seed_product(&db, "Teh Botol", 500, 5).await;
        let p2 = seed_product(&db, "Indomie", 300, 5).await;

        let committed = db
            .checkout()
            .commit_sale(&request(vec![(&p1, 1), (&p2, 2)]))
            .await
            .unwrap();

        // rename one product, delete the other; p2 is referenced so it can
        // only be removed straight from the table for this test
        db.catalog()
            .update(
                &p1,
                ProductInput {
                    name: "Teh Botol Sosro".to_string(),
                    category: None,
                    price_cents: 500,
                    stock: 4,
                },
            )
            .await
            .unwrap();
        sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(&p2)
            .execute(db.pool())
            .await
            .unwrap();

        let detail = db.sales().get_detail(&committed.sale.id).await.unwrap();
        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.items[0].product_name, "Teh Botol Sosro");
        assert_eq!(detail.items[1].product_name, format!("#{p2}"));
        // the frozen snapshot is untouched by the join
        assert_eq!(detail.items[1].unit_price_cents, 300);
        assert_eq!(detail.items[1].subtotal_cents, 600);
    }

    #[tokio::test]
    async fn test_delete_guard_for_sold_products() {
        let db = test_db().await;
        let p = seed_product(&db, "Teh Botol", 500, 5).await;

        db.checkout().commit_sale(&request(vec![(&p, 1)])).await.unwrap();

        let err = db.catalog().delete(&p).await.unwrap_err();
        assert!(matches!(err, DbError::ProductInUse { .. }));
    }

    #[tokio::test]
    async fn test_get_detail_not_found() {
        let db = test_db().await;
        let err = db.sales().get_detail("missing").await.unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));
    }
}
