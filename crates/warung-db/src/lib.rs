//! # warung-db
//!
//! SQLite persistence and the transactional checkout service for
//! warung-pos.
//!
//! ## Architecture
//! - **pool**: connection pool setup and the [`Database`] entry point
//! - **migrations**: embedded schema migrations
//! - **repository**: catalog and sale data access
//! - **checkout**: the atomic sale commit transaction
//! - **error**: database error types
//!
//! All domain logic (totals, change, stock validation) lives in
//! `warung-core`; this crate supplies it with transactional state and
//! makes its decisions durable.
//!
//! ## Example
//! ```rust,ignore
//! use warung_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("warung.db")).await?;
//! let committed = db.checkout().commit_sale(&request).await?;
//! ```

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

pub use checkout::{CheckoutRequest, CheckoutService, CommittedSale};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use repository::{
    CatalogRepository, ProductInput, SaleDetail, SaleDetailLine, SaleRepository, StatusFilter,
};
