//! Order Domain Types
//!
//! Value types for the order lifecycle:
//! - Status vocabularies: fixed enumerations keyed by numeric code
//! - Cart lines: mutable pre-checkout snapshots
//! - Orders, order items and payments: immutable persisted records

pub mod status;
pub mod types;

pub use status::{CartStatus, OrderStatus, PaymentMethod, PaymentStatus};
pub use types::{CartItem, Order, OrderItem, Payment, PaymentOutcome};
