//! # Catalog Repository
//!
//! Database operations for products.
//!
//! The one operation checkout depends on is [`CatalogRepository::decrement_stock`]:
//! a *conditional* decrement that fails instead of driving stock negative.
//! Everything else here is ordinary catalog maintenance.

use chrono::Utc;
use sqlx::sqlite::Sqlite;
use sqlx::{QueryBuilder, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{is_write_conflict, DbError, DbResult};
use warung_core::reporting::{HistoryPage, Page};
use warung_core::types::{normalize_category, Product, UNCATEGORIZED};
use warung_core::validation::{validate_price_cents, validate_product_name, validate_stock};

/// Columns selected for every `Product` row.
const PRODUCT_COLUMNS: &str =
    "id, name, category, price_cents, stock, is_active, created_at, updated_at";

// =============================================================================
// Input Types
// =============================================================================

/// Fields for creating or replacing a product.
#[derive(Debug, Clone)]
pub struct ProductInput {
    pub name: String,
    pub category: Option<String>,
    pub price_cents: i64,
    pub stock: i64,
}

/// Active-flag filter for catalog listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for catalog database operations.
#[derive(Debug, Clone)]
pub struct CatalogRepository {
    pool: SqlitePool,
}

impl CatalogRepository {
    /// Creates a new CatalogRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CatalogRepository { pool }
    }

    /// Gets a product by its id.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Gets all products matching the given ids in one batched query.
    pub async fn get_by_ids(&self, ids: &[String]) -> DbResult<Vec<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_ids(&mut conn, ids).await
    }

    /// Decrements a product's stock, failing if it would go negative.
    ///
    /// This is the atomic check-and-decrement primitive; see
    /// [`decrement_stock_on`] for the contract.
    pub async fn decrement_stock(&self, id: &str, amount: i64) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        decrement_stock_on(&mut conn, id, amount).await
    }

    /// Adds stock for a product (goods received).
    pub async fn restock(&self, id: &str, amount: i64) -> DbResult<()> {
        if amount <= 0 {
            return Err(DbError::Validation(
                warung_core::validation::ValidationError::MustBePositive { field: "amount" },
            ));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE products SET stock = stock + ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(amount)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", id));
        }

        debug!(id = %id, amount = %amount, "stock replenished");
        Ok(())
    }

    /// Creates a product. Name and amounts are validated, the category is
    /// normalized (blank becomes `Uncategorized`), and a UUID is assigned.
    pub async fn create(&self, input: ProductInput) -> DbResult<Product> {
        let name = validate_product_name(&input.name)?;
        validate_price_cents(input.price_cents)?;
        validate_stock(input.stock)?;

        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name,
            category: normalize_category(input.category.as_deref()),
            price_cents: input.price_cents,
            stock: input.stock,
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        debug!(id = %product.id, name = %product.name, "inserting product");

        sqlx::query(
            "INSERT INTO products (id, name, category, price_cents, stock, is_active, created_at, updated_at) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.stock)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(product)
    }

    /// Replaces a product's name, price, stock and (when given) category.
    pub async fn update(&self, id: &str, input: ProductInput) -> DbResult<Product> {
        let name = validate_product_name(&input.name)?;
        validate_price_cents(input.price_cents)?;
        validate_stock(input.stock)?;

        let category = input.category.as_deref().map(|c| normalize_category(Some(c)));
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET \
                name = ?2, \
                price_cents = ?3, \
                stock = ?4, \
                category = COALESCE(?5, category), \
                updated_at = ?6 \
             WHERE id = ?1",
        )
        .bind(id)
        .bind(&name)
        .bind(input.price_cents)
        .bind(input.stock)
        .bind(&category)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("product", id))
    }

    /// Activates or deactivates a product. Deactivated products stay in
    /// historical sales but should not be offered for purchase.
    pub async fn set_active(&self, id: &str, is_active: bool) -> DbResult<()> {
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE products SET is_active = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(is_active)
        .bind(now)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", id));
        }

        Ok(())
    }

    /// Deletes a product, refusing when any committed sale references it.
    /// Referenced products can only be deactivated.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let referenced: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sale_items WHERE product_id = ?1",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        if referenced > 0 {
            return Err(DbError::ProductInUse { id: id.to_string() });
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("product", id));
        }

        debug!(id = %id, "product deleted");
        Ok(())
    }

    /// Lists products with optional name search, category and status
    /// filters, paginated and ordered by name.
    pub async fn list(
        &self,
        search: Option<&str>,
        category: Option<&str>,
        status: StatusFilter,
        page: Page,
    ) -> DbResult<HistoryPage<Product>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        let category = category.map(str::trim).filter(|c| !c.is_empty());

        let total: i64 = {
            let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
            push_list_filters(&mut qb, search, category, status);
            qb.build_query_scalar().fetch_one(&self.pool).await?
        };

        let mut qb =
            QueryBuilder::<Sqlite>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_list_filters(&mut qb, search, category, status);
        qb.push(" ORDER BY name LIMIT ");
        qb.push_bind(page.page_size);
        qb.push(" OFFSET ");
        qb.push_bind(page.offset());

        let items = qb
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(HistoryPage {
            page: page.page,
            page_size: page.page_size,
            total,
            total_pages: page.total_pages(total),
            items,
        })
    }

    /// Lists distinct category labels, sorted, always including the
    /// `Uncategorized` sentinel.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let mut categories: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT TRIM(category) AS c FROM products WHERE TRIM(category) != '' ORDER BY c",
        )
        .fetch_all(&self.pool)
        .await?;

        if !categories.iter().any(|c| c == UNCATEGORIZED) {
            categories.insert(0, UNCATEGORIZED.to_string());
        }

        Ok(categories)
    }
}

fn push_list_filters(
    qb: &mut QueryBuilder<'_, Sqlite>,
    search: Option<&str>,
    category: Option<&str>,
    status: StatusFilter,
) {
    qb.push(" WHERE 1=1");

    match status {
        StatusFilter::All => {}
        StatusFilter::Active => {
            qb.push(" AND is_active = 1");
        }
        StatusFilter::Inactive => {
            qb.push(" AND is_active = 0");
        }
    }

    if let Some(c) = category {
        qb.push(" AND category = ");
        qb.push_bind(c.to_string());
    }

    if let Some(s) = search {
        qb.push(" AND name LIKE ");
        qb.push_bind(format!("%{s}%"));
    }
}

// =============================================================================
// Transaction-Scoped Primitives
// =============================================================================
// These take a connection rather than the pool so the checkout service can
// run them inside its own transaction boundary.

/// Fetches all products matching `ids` in a single batched query.
///
/// The commit transaction uses this for its re-validation read: one
/// statement means one consistent view, with no chance of interleaved
/// catalog writes between per-line lookups.
pub(crate) async fn fetch_by_ids(
    conn: &mut SqliteConnection,
    ids: &[String],
) -> DbResult<Vec<Product>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut qb = QueryBuilder::<Sqlite>::new(format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id IN ("
    ));
    let mut separated = qb.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let products = qb.build_query_as::<Product>().fetch_all(&mut *conn).await?;
    Ok(products)
}

/// Conditionally decrements stock: the UPDATE only matches when enough
/// stock remains, so the check and the decrement are one atomic statement.
///
/// Two outcomes mean a concurrent commit won the race, and both report
/// [`DbError::StockRaceLost`]: zero rows affected (the other commit already
/// consumed the stock this connection can see), or a SQLite busy/snapshot
/// conflict (on a multi-connection pool, the other commit landed after this
/// transaction took its read snapshot, so the write is refused outright).
/// Either way the caller's transaction must abort; retrying the identical
/// request is safe.
pub(crate) async fn decrement_stock_on(
    conn: &mut SqliteConnection,
    id: &str,
    amount: i64,
) -> DbResult<()> {
    let now = Utc::now();

    let result = sqlx::query(
        "UPDATE products \
         SET stock = stock - ?2, updated_at = ?3 \
         WHERE id = ?1 AND stock >= ?2",
    )
    .bind(id)
    .bind(amount)
    .bind(now)
    .execute(&mut *conn)
    .await;

    let result = match result {
        Ok(result) => result,
        Err(err) if is_write_conflict(&err) => {
            debug!(id = %id, "write conflict on stock decrement");
            return Err(DbError::StockRaceLost {
                product_id: id.to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };

    if result.rows_affected() == 0 {
        return Err(DbError::StockRaceLost {
            product_id: id.to_string(),
        });
    }

    debug!(id = %id, amount = %amount, "stock decremented");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
