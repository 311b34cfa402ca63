//! # Domain Types
//!
//! Core domain types for warung-pos.
//!
//! ## Ownership Model
//! - `Product` is owned by the catalog; checkout only reads its price/stock
//!   and (in warung-db) decrements stock.
//! - `Sale` is an aggregate root that exclusively owns its `SaleLineItem`s.
//!   It is constructed exactly once at commit time and never mutated after:
//!   the sale store is append-only.
//! - A `SaleLineItem` references its product by id only. Deleting or
//!   deactivating the product must never corrupt historical sales, which is
//!   why the item carries its own frozen `unit_price_cents` and name snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CheckoutError;
use crate::money::Money;

/// Category label applied when a product's category is blank.
pub const UNCATEGORIZED: &str = "Uncategorized";

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name, non-empty.
    pub name: String,

    /// Normalized category label, never blank (see [`normalize_category`]).
    pub category: String,

    /// Price in minor currency units, non-negative.
    pub price_cents: i64,

    /// Current stock level. `stock >= 0` holds after every mutation; the
    /// database backs this with a CHECK constraint.
    pub stock: i64,

    /// Whether the product is purchasable going forward. Inactive products
    /// still appear in historical sales.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }
}

/// Normalizes a category label: trimmed, blank maps to [`UNCATEGORIZED`].
pub fn normalize_category(category: Option<&str>) -> String {
    match category.map(str::trim) {
        None | Some("") => UNCATEGORIZED.to_string(),
        Some(c) => c.to_string(),
    }
}

// =============================================================================
// Requested Item
// =============================================================================

/// One line of an incoming checkout request. Transient, input only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestedItem {
    pub product_id: String,
    /// Must be > 0; validated by the checkout resolver.
    pub quantity: i64,
}

// =============================================================================
// Payment Method
// =============================================================================

/// The closed set of accepted payment methods.
///
/// Internally this is an enum, not a string: the cash/non-cash branch in the
/// assembler is exhaustive and checked by the compiler. Free-text method
/// names are validated and mapped once at the boundary by [`PaymentMethod::parse`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash; requires tendered amount, produces change.
    Cash,
    /// QRIS payment, treated as settled by the caller.
    Qris,
    /// E-wallet payment, treated as settled by the caller.
    EWallet,
    /// Bank transfer, treated as settled by the caller.
    BankTransfer,
}

impl PaymentMethod {
    /// Parses a free-text method name from the request boundary.
    ///
    /// Case-insensitive; `None` or blank defaults to `Cash`. Unrecognized
    /// names are rejected rather than silently treated as non-cash.
    pub fn parse(raw: Option<&str>) -> Result<Self, CheckoutError> {
        let raw = raw.map(str::trim).unwrap_or("");
        if raw.is_empty() {
            return Ok(PaymentMethod::Cash);
        }

        match raw.to_lowercase().as_str() {
            "cash" => Ok(PaymentMethod::Cash),
            "qris" => Ok(PaymentMethod::Qris),
            "ewallet" | "e-wallet" | "e_wallet" => Ok(PaymentMethod::EWallet),
            "banktransfer" | "bank-transfer" | "bank_transfer" => Ok(PaymentMethod::BankTransfer),
            _ => Err(CheckoutError::UnknownPaymentMethod {
                value: raw.to_string(),
            }),
        }
    }

    /// Returns true for methods that tender physical cash.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    /// Canonical display name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Qris => "QRIS",
            PaymentMethod::EWallet => "EWallet",
            PaymentMethod::BankTransfer => "BankTransfer",
        }
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A committed sale. Immutable once created; the repository only ever
/// appends sales and never exposes an update path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Sale {
    /// Assigned by the repository on commit (UUID v4).
    pub id: String,

    /// Commit timestamp, always UTC. Time-zone conversion happens only at
    /// the reporting boundary, never in the commit path.
    pub created_at: DateTime<Utc>,

    /// Sum of `unit_price * quantity` over all line items, frozen at commit.
    pub total_cents: i64,

    pub payment_method: PaymentMethod,

    /// Amount paid. Cash: the tendered amount. Non-cash: equals the total.
    pub paid_cents: i64,

    /// Change returned. Cash: `paid - total`. Non-cash: always 0.
    pub change_cents: i64,

    /// Optional external reference (QRIS/transfer id); trimmed, never blank.
    pub payment_ref: Option<String>,

    /// Attribution captured from the caller's authenticated identity.
    /// Opaque to the core; never derived here.
    pub created_by_user: String,
    pub created_by_role: String,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn paid(&self) -> Money {
        Money::from_cents(self.paid_cents)
    }

    #[inline]
    pub fn change(&self) -> Money {
        Money::from_cents(self.change_cents)
    }
}

// =============================================================================
// Sale Line Item
// =============================================================================

/// A line item in a committed sale.
/// Uses the snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SaleLineItem {
    pub id: String,
    pub sale_id: String,

    /// Weak reference to the product, for lookup and display only.
    pub product_id: String,

    /// Product name at time of sale (frozen).
    pub name_snapshot: String,

    /// Unit price at time of sale (frozen). Never recomputed from the
    /// catalog, so a later price change cannot drift historical totals.
    pub unit_price_cents: i64,

    pub quantity: i64,
}

impl SaleLineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Line subtotal, recomputed from the frozen snapshot.
    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_category() {
        assert_eq!(normalize_category(None), "Uncategorized");
        assert_eq!(normalize_category(Some("")), "Uncategorized");
        assert_eq!(normalize_category(Some("   ")), "Uncategorized");
        assert_eq!(normalize_category(Some(" Minuman ")), "Minuman");
    }

    #[test]
    fn test_payment_method_parse_defaults_to_cash() {
        assert_eq!(PaymentMethod::parse(None).unwrap(), PaymentMethod::Cash);
        assert_eq!(PaymentMethod::parse(Some("")).unwrap(), PaymentMethod::Cash);
        assert_eq!(
            PaymentMethod::parse(Some("  ")).unwrap(),
            PaymentMethod::Cash
        );
    }

    #[test]
    fn test_payment_method_parse_case_insensitive() {
        assert_eq!(
            PaymentMethod::parse(Some("CASH")).unwrap(),
            PaymentMethod::Cash
        );
        assert_eq!(
            PaymentMethod::parse(Some("qris")).unwrap(),
            PaymentMethod::Qris
        );
        assert_eq!(
            PaymentMethod::parse(Some("eWallet")).unwrap(),
            PaymentMethod::EWallet
        );
        assert_eq!(
            PaymentMethod::parse(Some("BankTransfer")).unwrap(),
            PaymentMethod::BankTransfer
        );
    }

    #[test]
    fn test_payment_method_parse_rejects_unknown() {
        let err = PaymentMethod::parse(Some("cheque")).unwrap_err();
        assert!(matches!(
            err,
            CheckoutError::UnknownPaymentMethod { value } if value == "cheque"
        ));
    }

    #[test]
    fn test_line_item_subtotal() {
        let item = SaleLineItem {
            id: "i1".into(),
            sale_id: "s1".into(),
            product_id: "p1".into(),
            name_snapshot: "Kopi Sachet".into(),
            unit_price_cents: 1500,
            quantity: 4,
        };
        assert_eq!(item.subtotal().cents(), 6000);
    }
}
