//! # Error Types
//!
//! Domain errors for warung-core.
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (product name, amounts)
//! 3. Errors are enum variants, never String
//! 4. Each variant maps to an actionable message for the cashier
//!
//! All checkout errors are client-caused: they are raised before any
//! mutation, so the caller can correct the request and resubmit. Transient
//! and infrastructure failures (`StockRaceLost`, persistence errors) live
//! in warung-db, which is where they can actually occur.

use thiserror::Error;

// =============================================================================
// Checkout Error
// =============================================================================

/// Validation and assembly failures for a checkout request.
///
/// Raised by the resolver/assembler before any stock is touched; a request
/// that fails here leaves the catalog and the sale store untouched.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// The request contained no items.
    #[error("transaction must contain at least one item")]
    EmptyRequest,

    /// A requested quantity was zero or negative.
    #[error("quantity for product {product_id} must be > 0 (got {quantity})")]
    InvalidQuantity { product_id: String, quantity: i64 },

    /// A requested product id has no catalog record.
    #[error("product not found: {product_id}")]
    UnknownProduct { product_id: String },

    /// Current stock cannot cover the requested quantity.
    ///
    /// Names the product and its current stock so the caller can present
    /// an actionable message ("only 3 left").
    #[error("stock not enough for product '{name}': available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        name: String,
        available: i64,
        requested: i64,
    },

    /// Cash tendered does not cover the total.
    #[error("cash is not enough: total {total_cents}, received {received_cents}")]
    InsufficientPayment {
        total_cents: i64,
        received_cents: i64,
    },

    /// The payment method name is not in the accepted set.
    #[error("unknown payment method: '{value}'")]
    UnknownPaymentMethod { value: String },
}

/// Convenience type alias for checkout results.
pub type CheckoutResult<T> = Result<T, CheckoutError>;

// =============================================================================
// Unit Tests
// =============================================================================
