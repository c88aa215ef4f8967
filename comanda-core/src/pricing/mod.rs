//! Price calculation using rust_decimal for precision
//!
//! All arithmetic is done with `Decimal` internally, then converted back to
//! `f64` for storage/serialization. The calculator is pure and stateless:
//! the same line items always produce the same totals.

use crate::orders::error::OrderError;
use rust_decimal::prelude::*;
use shared::order::CartItem;

/// Rounding for monetary values (2 decimal places, half-up).
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01).
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed unit price.
const MAX_PRICE: f64 = 1_000_000_000.0;
/// Maximum allowed quantity per line.
const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for calculation.
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places.
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Compare two monetary values for equality (within 0.01 tolerance).
pub fn money_eq(a: f64, b: f64) -> bool {
    (to_decimal(a) - to_decimal(b)).abs() < MONEY_TOLERANCE
}

/// Validate a price/quantity pair before it enters a cart line.
pub fn validate_line(price: f64, quantity: i32) -> Result<(), OrderError> {
    if !price.is_finite() {
        return Err(OrderError::Validation(format!(
            "price must be a finite number, got {price}"
        )));
    }
    if price < 0.0 {
        return Err(OrderError::Validation(format!(
            "price must be non-negative, got {price}"
        )));
    }
    if price > MAX_PRICE {
        return Err(OrderError::Validation(format!(
            "price exceeds maximum allowed ({MAX_PRICE}), got {price}"
        )));
    }
    if quantity <= 0 {
        return Err(OrderError::Validation(format!(
            "quantity must be positive, got {quantity}"
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(OrderError::Validation(format!(
            "quantity exceeds maximum allowed ({MAX_QUANTITY}), got {quantity}"
        )));
    }
    Ok(())
}

/// Validate a tendered amount before a payment attempt.
pub fn validate_tendered(tendered: f64) -> Result<(), OrderError> {
    if !tendered.is_finite() {
        return Err(OrderError::Validation(format!(
            "tendered must be a finite number, got {tendered}"
        )));
    }
    if tendered < 0.0 {
        return Err(OrderError::Validation(
            "tendered amount must be non-negative".to_string(),
        ));
    }
    Ok(())
}

/// Line subtotal: `unit_price * quantity`, rounded.
pub fn line_subtotal(unit_price: f64, quantity: i32) -> f64 {
    to_f64(to_decimal(unit_price) * Decimal::from(quantity))
}

/// Sum of line subtotals, the source of the cart's `total_amount` invariant.
pub fn cart_total(items: &[CartItem]) -> f64 {
    let total: Decimal = items.iter().map(|i| to_decimal(i.subtotal)).sum();
    to_f64(total)
}

/// Computed totals for a set of line items.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Totals {
    pub subtotal: f64,
    pub tax: f64,
    pub discount: f64,
    pub total: f64,
}

/// Compute subtotal, tax, discount and grand total for a set of lines.
///
/// `tax_rate_percent` and `discount_percent` both apply to the subtotal;
/// total = subtotal + tax - discount, clamped at zero.
pub fn calculate(items: &[CartItem], tax_rate_percent: f64, discount_percent: f64) -> Totals {
    let subtotal: Decimal = items.iter().map(|i| to_decimal(i.subtotal)).sum();
    let tax = (subtotal * to_decimal(tax_rate_percent) / Decimal::ONE_HUNDRED)
        .round_dp(DECIMAL_PLACES);
    let discount = (subtotal * to_decimal(discount_percent) / Decimal::ONE_HUNDRED)
        .round_dp(DECIMAL_PLACES);
    let total = (subtotal + tax - discount).max(Decimal::ZERO);

    Totals {
        subtotal: to_f64(subtotal),
        tax: to_f64(tax),
        discount: to_f64(discount),
        total: to_f64(total),
    }
}
