//! Status and payment-method vocabularies.
//!
//! The numeric codes below are the canonical total ordering for the whole
//! system. Every caller (ordering screen, kitchen display, payment dialog,
//! status board) resolves display names through [`OrderStatus::name`] and
//! never hard-codes them.

use serde::{Deserialize, Serialize};

/// Order lifecycle status.
///
/// Codes: 0 New, 1 Confirmed, 2 Preparing, 3 Cooking, 4 Ready,
/// 5 Completed, 6 Cancelled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    New,
    Confirmed,
    Preparing,
    Cooking,
    Ready,
    Completed,
    Cancelled,
}

impl OrderStatus {
    /// All statuses in canonical code order.
    pub const ALL: [OrderStatus; 7] = [
        OrderStatus::New,
        OrderStatus::Confirmed,
        OrderStatus::Preparing,
        OrderStatus::Cooking,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Canonical numeric code.
    pub fn code(&self) -> u8 {
        match self {
            OrderStatus::New => 0,
            OrderStatus::Confirmed => 1,
            OrderStatus::Preparing => 2,
            OrderStatus::Cooking => 3,
            OrderStatus::Ready => 4,
            OrderStatus::Completed => 5,
            OrderStatus::Cancelled => 6,
        }
    }

    /// Lookup by numeric code.
    pub fn from_code(code: u8) -> Option<OrderStatus> {
        OrderStatus::ALL.into_iter().find(|s| s.code() == code)
    }

    /// Display name shown verbatim by every UI surface.
    pub fn name(&self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Cooking => "Cooking",
            OrderStatus::Ready => "Ready",
            OrderStatus::Completed => "Completed",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }
}

/// Whether an order has been settled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Unpaid,
    Paid,
}

/// How an order is (or will be) paid.
///
/// Codes: 1 Cash, 2 Card, 3 Wallet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    #[default]
    Cash,
    Card,
    Wallet,
}

impl PaymentMethod {
    pub fn code(&self) -> u8 {
        match self {
            PaymentMethod::Cash => 1,
            PaymentMethod::Card => 2,
            PaymentMethod::Wallet => 3,
        }
    }

    pub fn from_code(code: u8) -> Option<PaymentMethod> {
        match code {
            1 => Some(PaymentMethod::Cash),
            2 => Some(PaymentMethod::Card),
            3 => Some(PaymentMethod::Wallet),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::Card => "Card",
            PaymentMethod::Wallet => "Wallet",
        }
    }

    /// Cash requires a tendered amount and may produce change.
    pub fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }
}

/// Cart lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    CheckedOut,
    Abandoned,
}
