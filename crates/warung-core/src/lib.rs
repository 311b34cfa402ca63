//! # warung-core: Pure Business Logic for warung-pos
//!
//! The heart of the point-of-sale backend: everything here is a pure
//! function or plain data, with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! caller (HTTP layer, out of scope)
//!     │
//!     ▼
//! warung-db ── CheckoutService::commit_sale ── one SQLite transaction
//!     │              │
//!     │              ▼
//!     └──► warung-core (THIS CRATE)
//!              resolve_items ─► assemble ─► SaleDraft
//!              day_bounds_utc, Page::clamp
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLineItem, PaymentMethod)
//! - [`money`] - Money type with integer arithmetic (no floating point)
//! - [`checkout`] - Validator and assembler for the sale pipeline
//! - [`reporting`] - Day-window math and pagination clamping
//! - [`validation`] - Catalog input validation
//! - [`error`] - Domain error types
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: same input, same output; trivially testable
//! 2. **No I/O**: database access is warung-db's job
//! 3. **Integer money**: all monetary values are minor units in i64
//! 4. **Explicit errors**: typed enums, never strings or panics

pub mod checkout;
pub mod error;
pub mod money;
pub mod reporting;
pub mod types;
pub mod validation;

pub use checkout::{assemble, resolve_items, ResolvedLine, SaleDraft};
pub use error::{CheckoutError, CheckoutResult};
pub use money::Money;
pub use types::*;
