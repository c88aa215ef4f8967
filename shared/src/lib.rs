//! Shared domain types for the comanda order lifecycle engine.
//!
//! Everything in this crate is a plain value type: product and employee
//! models, the order/payment vocabularies, and small utilities. The engine
//! logic itself lives in `comanda-core`.

pub mod models;
pub mod order;
pub mod util;

pub use models::{Employee, EmployeeRole, ManagerCapabilities, Product};
pub use order::{
    CartItem, CartStatus, Order, OrderItem, OrderStatus, Payment, PaymentMethod, PaymentOutcome,
    PaymentStatus,
};
