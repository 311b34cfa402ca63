//! # Repository Layer
//!
//! Data access repositories, one per aggregate.

pub mod product;
pub mod sale;

pub use product::{CatalogRepository, ProductInput, StatusFilter};
pub use sale::{SaleDetail, SaleDetailLine, SaleRepository};
