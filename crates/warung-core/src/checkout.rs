//! # Checkout Module
//!
//! The pure half of the sale pipeline: resolving a requested item list
//! against a catalog snapshot and assembling the immutable sale draft.
//!
//! ## Pipeline
//! ```text
//! RequestedItem[] ──resolve_items──► ResolvedLine[] ──assemble──► SaleDraft
//!                      (validate)        (snapshot)     (totals, payment)
//! ```
//!
//! Both steps are pure functions over a `&[Product]` snapshot handed in by
//! the caller. warung-db fetches that snapshot *inside* the commit
//! transaction and runs the whole pipeline there, so validation, pricing
//! and the later stock decrement all observe the same point-in-time view
//! of the catalog.
//!
//! ## Price Freeze
//! `ResolvedLine::unit_price` is copied from the snapshot and flows into the
//! persisted line item untouched. A catalog price change racing with an
//! in-flight checkout cannot affect a sale already being assembled.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CheckoutError, CheckoutResult};
use crate::money::Money;
use crate::types::{PaymentMethod, Product, RequestedItem};

// =============================================================================
// Resolved Line
// =============================================================================

/// One request line resolved against the catalog snapshot.
///
/// Carries the frozen unit price and name so the assembler and the
/// persisted line item never re-read the catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolvedLine {
    pub product_id: String,
    pub name_snapshot: String,
    pub unit_price_cents: i64,
    pub quantity: i64,
}

impl ResolvedLine {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Sale Draft
// =============================================================================

/// A fully-formed but not-yet-persisted sale.
///
/// Everything the repository needs except the id and timestamp, which are
/// assigned at append time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleDraft {
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub paid_cents: i64,
    pub change_cents: i64,
    pub payment_ref: Option<String>,
    pub created_by_user: String,
    pub created_by_role: String,
    /// Ordered, non-empty; one entry per request line.
    pub lines: Vec<ResolvedLine>,
}

// =============================================================================
// Validator
// =============================================================================

/// Resolves requested items against a catalog snapshot.
///
/// ## Checks, in order
/// 1. `EmptyRequest` - the list must be non-empty
/// 2. `InvalidQuantity` - every quantity must be > 0
/// 3. `UnknownProduct` - every product id must resolve
/// 4. `InsufficientStock` - the *summed* quantity per product must fit in
///    current stock (two lines of qty 1 against stock 1 fail here, not at
///    decrement time)
///
/// Pure read/check step: no side effects. Any failure rejects the whole
/// request.
pub fn resolve_items(
    requested: &[RequestedItem],
    products: &[Product],
) -> CheckoutResult<Vec<ResolvedLine>> {
    if requested.is_empty() {
        return Err(CheckoutError::EmptyRequest);
    }

    for item in requested {
        if item.quantity <= 0 {
            return Err(CheckoutError::InvalidQuantity {
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }
    }

    let by_id: HashMap<&str, &Product> =
        products.iter().map(|p| (p.id.as_str(), p)).collect();

    // Duplicate request lines for one product are legal; the stock check
    // must run against the summed quantity.
    let mut total_qty: HashMap<&str, i64> = HashMap::new();
    for item in requested {
        if !by_id.contains_key(item.product_id.as_str()) {
            return Err(CheckoutError::UnknownProduct {
                product_id: item.product_id.clone(),
            });
        }
        *total_qty.entry(item.product_id.as_str()).or_insert(0) += item.quantity;
    }

    for (product_id, &requested_qty) in &total_qty {
        let product = by_id[product_id];
        if product.stock < requested_qty {
            return Err(CheckoutError::InsufficientStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
                available: product.stock,
                requested: requested_qty,
            });
        }
    }

    Ok(requested
        .iter()
        .map(|item| {
            let product = by_id[item.product_id.as_str()];
            ResolvedLine {
                product_id: product.id.clone(),
                name_snapshot: product.name.clone(),
                unit_price_cents: product.price_cents,
                quantity: item.quantity,
            }
        })
        .collect())
}

// =============================================================================
// Assembler
// =============================================================================

/// Computes totals and payment amounts and builds the sale draft.
///
/// ## Payment Policy
/// - `Cash`: `cash_received` is required (missing counts as 0);
///   `InsufficientPayment` when it is short of the total;
///   `paid = received`, `change = received - total`.
/// - Non-cash methods carry no gateway verification here; the caller is
///   trusted to have settled them: `paid = total`, `change = 0`.
///
/// `payment_ref` is trimmed; an empty string normalizes to absent.
pub fn assemble(
    lines: Vec<ResolvedLine>,
    payment_method: PaymentMethod,
    cash_received_cents: Option<i64>,
    payment_ref: Option<&str>,
    created_by_user: &str,
    created_by_role: &str,
) -> CheckoutResult<SaleDraft> {
    let total: Money = lines
        .iter()
        .fold(Money::zero(), |acc, line| acc + line.subtotal());

    let (paid, change) = if payment_method.is_cash() {
        let received = Money::from_cents(cash_received_cents.unwrap_or(0));
        if received < total {
            return Err(CheckoutError::InsufficientPayment {
                total_cents: total.cents(),
                received_cents: received.cents(),
            });
        }
        (received, received - total)
    } else {
        (total, Money::zero())
    };

    let payment_ref = payment_ref
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string);

    Ok(SaleDraft {
        total_cents: total.cents(),
        payment_method,
        paid_cents: paid.cents(),
        change_cents: change.cents(),
        payment_ref,
        created_by_user: created_by_user.to_string(),
        created_by_role: created_by_role.to_string(),
        lines,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
