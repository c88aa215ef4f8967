//! Storage contracts for the order engine.
//!
//! The engine talks to persistence through narrow, swappable traits; the
//! production implementation is [`RedbStore`], an embedded redb database
//! where every multi-write operation is one explicit transaction. The
//! product catalog is a separate read-only collaborator.

mod catalog;
mod redb_store;

pub use catalog::MemoryCatalog;
pub use redb_store::RedbStore;

use shared::models::Product;
use shared::order::{Order, OrderItem, OrderStatus, Payment};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Storage errors. Wrapped by the service layer before any UI sees them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Another payment already settled this order.
    #[error("payment conflict: {0}")]
    PaymentConflict(String),

    /// The write's deadline passed before commit; the transaction was
    /// aborted and nothing was applied.
    #[error("operation deadline expired before commit")]
    Expired,
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Commit-time guard for writes running under a caller-side timeout.
///
/// The caller treats a timed-out operation as not-applied, so a write that
/// outlives its caller must refuse to commit. Implementations check the
/// deadline immediately before `commit()` and abort on expiry; a write that
/// started slow therefore cannot surface after its caller already reported
/// [`StorageError::Expired`]-equivalent failure.
#[derive(Debug, Clone, Copy)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline; the write always commits.
    pub fn none() -> Self {
        Self(None)
    }

    /// Expires `timeout` from now.
    pub fn within(timeout: Duration) -> Self {
        Self(Some(Instant::now() + timeout))
    }

    /// `Err(Expired)` once the deadline has passed.
    pub fn check(&self) -> StorageResult<()> {
        match self.0 {
            Some(deadline) if Instant::now() >= deadline => Err(StorageError::Expired),
            _ => Ok(()),
        }
    }
}

/// Outcome of a compare-and-swap status write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CasResult {
    /// The expected status matched and the new status was committed.
    Committed,
    /// Another actor got there first; nothing was written.
    Conflict { actual: OrderStatus },
}

/// Order persistence contract.
///
/// Transitions are serialized by compare-and-swap on the persisted status:
/// of two racing writers exactly one commits, the other observes the
/// already-updated status.
pub trait OrderStore: Send + Sync {
    /// Persist an order and its items as one atomic write. Returns the
    /// order id. Aborts with [`StorageError::Expired`] if `deadline` passed
    /// before commit.
    fn insert_order_with_items(&self, order: &Order, deadline: Deadline) -> StorageResult<String>;

    /// Compare-and-swap the order's status. `chef_id` and `cancel_reason`
    /// are written in the same transaction as the status (never partially).
    /// Aborts with [`StorageError::Expired`] if `deadline` passed before
    /// commit.
    fn transition_status(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        chef_id: Option<&str>,
        cancel_reason: Option<&str>,
        deadline: Deadline,
    ) -> StorageResult<CasResult>;

    fn get_by_id(&self, order_id: &str) -> StorageResult<Option<Order>>;

    /// All orders currently in `status`, oldest first. Always a fresh read.
    fn get_by_status(&self, status: OrderStatus) -> StorageResult<Vec<Order>>;

    /// All orders, oldest first. Always a fresh read.
    fn get_all(&self) -> StorageResult<Vec<Order>>;

    /// Crash-safe monotonic counter used for receipt numbers. Carries no
    /// deadline: a bump that lands after its caller gave up only skips a
    /// receipt number, it cannot duplicate an order.
    fn next_order_count(&self) -> StorageResult<u64>;
}

/// Payment persistence contract.
pub trait PaymentStore: Send + Sync {
    /// Insert the payment record and flip the order's payment status as one
    /// atomic unit. Fails with [`StorageError::PaymentConflict`] if the
    /// order is already settled, leaving nothing written. Aborts with
    /// [`StorageError::Expired`] if `deadline` passed before commit.
    fn insert_payment(&self, payment: &Payment, deadline: Deadline) -> StorageResult<()>;

    /// The active payment settling `order_id`, if any.
    fn get_payment_for_order(&self, order_id: &str) -> StorageResult<Option<Payment>>;
}

/// Order line read contract, used by kitchen/cashier display surfaces.
pub trait ItemStore: Send + Sync {
    fn get_items_by_order_id(&self, order_id: &str) -> StorageResult<Vec<OrderItem>>;
}

/// Read-only product catalog supplying name/price snapshots for cart lines.
/// The order engine never writes to it.
pub trait ProductCatalog: Send + Sync {
    fn get_by_id(&self, product_id: &str) -> Option<Product>;
    fn get_available(&self) -> Vec<Product>;
}
