//! # Validation Module
//!
//! Input validation for catalog writes. Checkout has its own validation in
//! [`crate::checkout`]; these helpers cover the product CRUD boundary that
//! feeds the catalog the checkout later reads.

use thiserror::Error;

/// Catalog input validation failures.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: &'static str },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("{field} must be >= 0")]
    MustBeNonNegative { field: &'static str },

    #[error("{field} must be > 0")]
    MustBePositive { field: &'static str },
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validates a product name: non-empty after trimming, at most 200 chars.
///
/// Returns the trimmed name.
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required { field: "name" });
    }

    if name.chars().count() > 200 {
        return Err(ValidationError::TooLong {
            field: "name",
            max: 200,
        });
    }

    Ok(name.to_string())
}

/// Validates a price in minor units: zero allowed (free items), never negative.
pub fn validate_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustBeNonNegative { field: "price" });
    }
    Ok(())
}

/// Validates a stock level: zero allowed, never negative.
pub fn validate_stock(stock: i64) -> ValidationResult<()> {
    if stock < 0 {
        return Err(ValidationError::MustBeNonNegative { field: "stock" });
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
