//! Error taxonomy surfaced to UI layers.
//!
//! UI code never sees a raw storage-driver error: everything arrives as one
//! of these variants. Conflicts caused by another actor are reported
//! distinctly from generic storage failures so a screen can say
//! "updated elsewhere" instead of a bare error.

use crate::storage::StorageError;
use shared::order::OrderStatus;
use thiserror::Error;

/// Engine errors.
#[derive(Debug, Error)]
pub enum OrderError {
    /// Local input problem, recoverable inline without any storage call.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("cart has no items")]
    EmptyCart,

    #[error("invalid customer info: {0}")]
    InvalidCustomerInfo(String),

    /// Illegal status move. The caller must refresh its view of the current
    /// status before retrying.
    #[error("invalid transition: {} -> {}", from.name(), to.name())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order {order_id} already has chef {assigned} assigned")]
    ChefAlreadyAssigned { order_id: String, assigned: String },

    #[error("insufficient payment: required {required:.2}, tendered {tendered:.2}")]
    InsufficientPayment { required: f64, tendered: f64 },

    /// Another actor already transitioned or settled the order.
    #[error("order updated elsewhere: {0}")]
    Conflict(String),

    /// The storage backend did not answer within the configured timeout.
    /// The whole operation is treated as not-applied.
    #[error("storage operation timed out")]
    StorageTimeout,

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    #[error("order already paid: {0}")]
    AlreadyPaid(String),

    #[error("product unavailable: {0}")]
    ProductUnavailable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type OrderResult<T> = Result<T, OrderError>;

impl OrderError {
    /// Lift store-level lookup/conflict errors into their domain variants,
    /// keeping everything else wrapped as a storage failure.
    pub(crate) fn from_storage(err: StorageError) -> Self {
        match err {
            StorageError::OrderNotFound(id) => OrderError::OrderNotFound(id),
            StorageError::PaymentConflict(msg) => OrderError::Conflict(msg),
            // The store refused to commit past its deadline; to the caller
            // this is the same not-applied timeout.
            StorageError::Expired => OrderError::StorageTimeout,
            other => OrderError::Storage(other),
        }
    }
}
