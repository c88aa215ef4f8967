//! Persisted order records and cart lines.

use super::status::{OrderStatus, PaymentMethod, PaymentStatus};
use crate::util::{new_id, now_millis};
use serde::{Deserialize, Serialize};

/// One mutable cart line. Identity is `product_id`: two lines for the same
/// product never coexist, adds merge quantities instead.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub product_id: String,
    /// Product name snapshot taken at add time.
    pub product_name: String,
    /// Unit price snapshot taken at add time.
    pub unit_price: f64,
    pub quantity: i32,
    /// `unit_price * quantity`, maintained by the owning cart.
    pub subtotal: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Immutable line item frozen at checkout. Later catalog price changes never
/// reach these records.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderItem {
    pub order_id: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: f64,
    pub subtotal: f64,
}

impl OrderItem {
    /// Freeze a cart line into an order item.
    pub fn freeze(order_id: &str, item: &CartItem) -> Self {
        Self {
            order_id: order_id.to_string(),
            product_id: item.product_id.clone(),
            product_name: item.product_name.clone(),
            quantity: item.quantity,
            unit_price: item.unit_price,
            subtotal: item.subtotal,
        }
    }
}

/// A checked-out, persisted purchase with a lifecycle independent of the
/// cart that produced it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    pub order_id: String,
    /// Human-facing receipt number, assigned at checkout.
    pub receipt_number: String,
    pub customer_name: String,
    pub phone_number: String,
    /// Frozen at creation from the source cart; never recomputed from live
    /// catalog prices.
    pub total_amount: f64,
    pub pay_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    pub status: OrderStatus,
    /// Set exactly once, on the transition into `Cooking`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_chef_id: Option<String>,
    /// Reason recorded when the order is cancelled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_reason: Option<String>,
    pub created_at: i64,
    pub items: Vec<OrderItem>,
}

impl Order {
    /// Create a fresh order in state `New`/`Unpaid` with no items attached.
    pub fn new(
        receipt_number: impl Into<String>,
        customer_name: impl Into<String>,
        phone_number: impl Into<String>,
        total_amount: f64,
        pay_method: PaymentMethod,
    ) -> Self {
        Self {
            order_id: new_id(),
            receipt_number: receipt_number.into(),
            customer_name: customer_name.into(),
            phone_number: phone_number.into(),
            total_amount,
            pay_method,
            payment_status: PaymentStatus::Unpaid,
            status: OrderStatus::New,
            assigned_chef_id: None,
            cancel_reason: None,
            created_at: now_millis(),
            items: Vec::new(),
        }
    }

    pub fn is_paid(&self) -> bool {
        self.payment_status == PaymentStatus::Paid
    }
}

/// Outcome of a single payment attempt.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentOutcome {
    Failed,
    Success,
}

/// Payment record settling an order. Created exactly once per successful
/// attempt; `amount` always equals the order's total at payment time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Payment {
    pub payment_id: String,
    pub order_id: String,
    pub amount: f64,
    pub method: PaymentMethod,
    pub status: PaymentOutcome,
    pub paid_at: i64,
}

impl Payment {
    pub fn success(order_id: &str, amount: f64, method: PaymentMethod) -> Self {
        Self {
            payment_id: new_id(),
            order_id: order_id.to_string(),
            amount,
            method,
            status: PaymentOutcome::Success,
            paid_at: now_millis(),
        }
    }
}
