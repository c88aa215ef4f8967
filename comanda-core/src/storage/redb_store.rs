//! redb-backed order storage
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Persisted orders (items embedded) |
//! | `order_items` | `order_id` | `Vec<OrderItem>` | Frozen line items |
//! | `payments` | `order_id` | `Payment` | One active payment per order |
//! | `counters` | name | `u64` | Crash-safe receipt counter |
//!
//! # Atomicity
//!
//! redb commits with `Durability::Immediate` by default: a commit is
//! persistent when `commit()` returns, and the file is always in a
//! consistent state. Checkout writes order + items in one transaction;
//! settlement writes payment + paid flag in one transaction; a status
//! transition writes status + chef/cancel-reason in one transaction. A
//! dropped transaction leaves nothing behind.
//!
//! Write transactions are serialized by redb itself, which is what makes the
//! compare-and-swap in [`transition_status`](super::OrderStore::transition_status)
//! race-free: the losing writer re-reads the committed status and backs off.

use super::{CasResult, Deadline, ItemStore, OrderStore, PaymentStore, StorageError, StorageResult};
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use shared::order::{Order, OrderItem, OrderStatus, Payment, PaymentStatus};
use std::path::Path;
use std::sync::Arc;

const ORDERS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("orders");
const ITEMS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("order_items");
const PAYMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("payments");
const COUNTERS_TABLE: TableDefinition<&str, u64> = TableDefinition::new("counters");

const ORDER_COUNT_KEY: &str = "order_count";

/// Order storage backed by redb. Cheap to clone; every caller shares the
/// same database handle but runs its own transactions.
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
}

impl RedbStore {
    /// Open or create the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory database (tests and demos).
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ITEMS_TABLE)?;
            let _ = write_txn.open_table(PAYMENTS_TABLE)?;
            let mut counters = write_txn.open_table(COUNTERS_TABLE)?;
            if counters.get(ORDER_COUNT_KEY)?.is_none() {
                counters.insert(ORDER_COUNT_KEY, 0u64)?;
            }
        }
        write_txn.commit()?;
        Ok(Self { db: Arc::new(db) })
    }
}

impl OrderStore for RedbStore {
    fn insert_order_with_items(&self, order: &Order, deadline: Deadline) -> StorageResult<String> {
        let txn = self.db.begin_write()?;
        {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            orders.insert(order.order_id.as_str(), serde_json::to_vec(order)?.as_slice())?;

            let mut items = txn.open_table(ITEMS_TABLE)?;
            items.insert(
                order.order_id.as_str(),
                serde_json::to_vec(&order.items)?.as_slice(),
            )?;
        }
        // A write whose caller already gave up must not surface later.
        deadline.check()?;
        txn.commit()?;
        tracing::debug!(order_id = %order.order_id, items = order.items.len(), "Order persisted");
        Ok(order.order_id.clone())
    }

    fn transition_status(
        &self,
        order_id: &str,
        expected: OrderStatus,
        next: OrderStatus,
        chef_id: Option<&str>,
        cancel_reason: Option<&str>,
        deadline: Deadline,
    ) -> StorageResult<CasResult> {
        let txn = self.db.begin_write()?;
        let outcome = {
            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut order: Order = match orders.get(order_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StorageError::OrderNotFound(order_id.to_string())),
            };

            if order.status != expected {
                CasResult::Conflict {
                    actual: order.status,
                }
            } else {
                order.status = next;
                if let Some(chef) = chef_id {
                    order.assigned_chef_id = Some(chef.to_string());
                }
                if let Some(reason) = cancel_reason {
                    order.cancel_reason = Some(reason.to_string());
                }
                orders.insert(order_id, serde_json::to_vec(&order)?.as_slice())?;
                CasResult::Committed
            }
        };

        match outcome {
            CasResult::Committed => {
                deadline.check()?;
                txn.commit()?;
                Ok(CasResult::Committed)
            }
            conflict => {
                txn.abort()?;
                Ok(conflict)
            }
        }
    }

    fn get_by_id(&self, order_id: &str) -> StorageResult<Option<Order>> {
        let txn = self.db.begin_read()?;
        let orders = txn.open_table(ORDERS_TABLE)?;
        match orders.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }

    fn get_by_status(&self, status: OrderStatus) -> StorageResult<Vec<Order>> {
        let mut matching: Vec<Order> = self
            .scan_orders()?
            .into_iter()
            .filter(|o| o.status == status)
            .collect();
        matching.sort_by_key(|o| o.created_at);
        Ok(matching)
    }

    fn get_all(&self) -> StorageResult<Vec<Order>> {
        let mut orders = self.scan_orders()?;
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    fn next_order_count(&self) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = {
            let mut counters = txn.open_table(COUNTERS_TABLE)?;
            let current = counters
                .get(ORDER_COUNT_KEY)?
                .map(|guard| guard.value())
                .unwrap_or(0);
            let next = current + 1;
            counters.insert(ORDER_COUNT_KEY, next)?;
            next
        };
        txn.commit()?;
        Ok(next)
    }
}

impl RedbStore {
    fn scan_orders(&self) -> StorageResult<Vec<Order>> {
        let txn = self.db.begin_read()?;
        let orders = txn.open_table(ORDERS_TABLE)?;
        let mut result = Vec::new();
        for entry in orders.iter()? {
            let (_, value) = entry?;
            result.push(serde_json::from_slice(value.value())?);
        }
        Ok(result)
    }
}

impl PaymentStore for RedbStore {
    fn insert_payment(&self, payment: &Payment, deadline: Deadline) -> StorageResult<()> {
        let order_id = payment.order_id.as_str();
        let txn = self.db.begin_write()?;
        {
            let mut payments = txn.open_table(PAYMENTS_TABLE)?;
            if payments.get(order_id)?.is_some() {
                return Err(StorageError::PaymentConflict(format!(
                    "order {order_id} already has a payment record"
                )));
            }

            let mut orders = txn.open_table(ORDERS_TABLE)?;
            let mut order: Order = match orders.get(order_id)? {
                Some(guard) => serde_json::from_slice(guard.value())?,
                None => return Err(StorageError::OrderNotFound(order_id.to_string())),
            };
            if order.payment_status == PaymentStatus::Paid {
                return Err(StorageError::PaymentConflict(format!(
                    "order {order_id} is already paid"
                )));
            }

            // Payment row and paid flag become visible together or not at
            // all: both writes ride this one transaction.
            payments.insert(order_id, serde_json::to_vec(payment)?.as_slice())?;
            order.payment_status = PaymentStatus::Paid;
            orders.insert(order_id, serde_json::to_vec(&order)?.as_slice())?;
        }
        deadline.check()?;
        txn.commit()?;
        tracing::debug!(order_id = %order_id, payment_id = %payment.payment_id, "Payment persisted");
        Ok(())
    }

    fn get_payment_for_order(&self, order_id: &str) -> StorageResult<Option<Payment>> {
        let txn = self.db.begin_read()?;
        let payments = txn.open_table(PAYMENTS_TABLE)?;
        match payments.get(order_id)? {
            Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
            None => Ok(None),
        }
    }
}

impl ItemStore for RedbStore {
    fn get_items_by_order_id(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
        let txn = self.db.begin_read()?;
        let items = txn.open_table(ITEMS_TABLE)?;
        match items.get(order_id)? {
            Some(guard) => Ok(serde_json::from_slice(guard.value())?),
            None => Ok(Vec::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::order::PaymentMethod;

    fn test_order(total: f64) -> Order {
        let mut order = Order::new("ORD1", "An", "0905000000", total, PaymentMethod::Cash);
        order.items.push(OrderItem {
            order_id: order.order_id.clone(),
            product_id: "p1".to_string(),
            product_name: "Burger".to_string(),
            quantity: 2,
            unit_price: 65_000.0,
            subtotal: 130_000.0,
        });
        order
    }

    #[test]
    fn test_insert_and_get_roundtrip() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(145_000.0);
        let id = store.insert_order_with_items(&order, Deadline::none()).unwrap();

        let loaded = store.get_by_id(&id).unwrap().unwrap();
        assert_eq!(loaded, order);

        let items = store.get_items_by_order_id(&id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].unit_price, 65_000.0);
    }

    #[test]
    fn test_cas_conflict_leaves_order_untouched() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(100.0);
        store.insert_order_with_items(&order, Deadline::none()).unwrap();

        // First writer wins.
        let result = store
            .transition_status(
                &order.order_id,
                OrderStatus::New,
                OrderStatus::Confirmed,
                None,
                None,
                Deadline::none(),
            )
            .unwrap();
        assert_eq!(result, CasResult::Committed);

        // Second writer expected New but the order moved on.
        let result = store
            .transition_status(
                &order.order_id,
                OrderStatus::New,
                OrderStatus::Cancelled,
                None,
                Some("changed my mind"),
                Deadline::none(),
            )
            .unwrap();
        assert_eq!(
            result,
            CasResult::Conflict {
                actual: OrderStatus::Confirmed
            }
        );

        let loaded = store.get_by_id(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Confirmed);
        assert!(loaded.cancel_reason.is_none());
    }

    #[test]
    fn test_chef_written_with_status_atomically() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut order = test_order(100.0);
        order.status = OrderStatus::Preparing;
        store.insert_order_with_items(&order, Deadline::none()).unwrap();

        store
            .transition_status(
                &order.order_id,
                OrderStatus::Preparing,
                OrderStatus::Cooking,
                Some("chef-1"),
                None,
                Deadline::none(),
            )
            .unwrap();

        let loaded = store.get_by_id(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::Cooking);
        assert_eq!(loaded.assigned_chef_id.as_deref(), Some("chef-1"));
    }

    #[test]
    fn test_insert_payment_settles_order() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(145_000.0);
        store.insert_order_with_items(&order, Deadline::none()).unwrap();

        let payment = Payment::success(&order.order_id, 145_000.0, PaymentMethod::Cash);
        store.insert_payment(&payment, Deadline::none()).unwrap();

        let loaded = store.get_by_id(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.payment_status, PaymentStatus::Paid);
        let stored = store.get_payment_for_order(&order.order_id).unwrap().unwrap();
        assert_eq!(stored.amount, 145_000.0);
    }

    #[test]
    fn test_insert_payment_rolls_back_on_conflict() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(145_000.0);
        store.insert_order_with_items(&order, Deadline::none()).unwrap();

        let first = Payment::success(&order.order_id, 145_000.0, PaymentMethod::Cash);
        store.insert_payment(&first, Deadline::none()).unwrap();

        // The second attempt aborts its transaction: the payment row it
        // wrote never becomes visible and the stored record is still the
        // first payment.
        let second = Payment::success(&order.order_id, 145_000.0, PaymentMethod::Card);
        let err = store.insert_payment(&second, Deadline::none()).unwrap_err();
        assert!(matches!(err, StorageError::PaymentConflict(_)));

        let stored = store.get_payment_for_order(&order.order_id).unwrap().unwrap();
        assert_eq!(stored.payment_id, first.payment_id);
    }

    #[test]
    fn test_insert_payment_for_missing_order_writes_nothing() {
        let store = RedbStore::open_in_memory().unwrap();
        let payment = Payment::success("ghost", 10.0, PaymentMethod::Card);
        let err = store.insert_payment(&payment, Deadline::none()).unwrap_err();
        assert!(matches!(err, StorageError::OrderNotFound(_)));
        assert!(store.get_payment_for_order("ghost").unwrap().is_none());
    }

    #[test]
    fn test_get_by_status_sorted_oldest_first() {
        let store = RedbStore::open_in_memory().unwrap();
        let mut first = test_order(10.0);
        first.created_at = 100;
        let mut second = test_order(20.0);
        second.created_at = 50;
        store.insert_order_with_items(&first, Deadline::none()).unwrap();
        store.insert_order_with_items(&second, Deadline::none()).unwrap();

        let all = store.get_by_status(OrderStatus::New).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].order_id, second.order_id);

        assert!(store.get_by_status(OrderStatus::Cooking).unwrap().is_empty());
    }

    #[test]
    fn test_expired_deadline_aborts_insert() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(100.0);

        let expired = Deadline::within(std::time::Duration::ZERO);
        std::thread::sleep(std::time::Duration::from_millis(5));
        let err = store.insert_order_with_items(&order, expired).unwrap_err();
        assert!(matches!(err, StorageError::Expired));

        assert!(store.get_by_id(&order.order_id).unwrap().is_none());
        assert!(store.get_items_by_order_id(&order.order_id).unwrap().is_empty());
    }

    #[test]
    fn test_expired_deadline_aborts_transition_and_payment() {
        let store = RedbStore::open_in_memory().unwrap();
        let order = test_order(100.0);
        store.insert_order_with_items(&order, Deadline::none()).unwrap();

        let expired = Deadline::within(std::time::Duration::ZERO);
        std::thread::sleep(std::time::Duration::from_millis(5));

        let err = store
            .transition_status(
                &order.order_id,
                OrderStatus::New,
                OrderStatus::Confirmed,
                None,
                None,
                expired,
            )
            .unwrap_err();
        assert!(matches!(err, StorageError::Expired));

        let payment = Payment::success(&order.order_id, 100.0, PaymentMethod::Cash);
        let err = store.insert_payment(&payment, expired).unwrap_err();
        assert!(matches!(err, StorageError::Expired));

        let loaded = store.get_by_id(&order.order_id).unwrap().unwrap();
        assert_eq!(loaded.status, OrderStatus::New);
        assert!(!loaded.is_paid());
        assert!(store.get_payment_for_order(&order.order_id).unwrap().is_none());
    }

    #[test]
    fn test_next_order_count_increments() {
        let store = RedbStore::open_in_memory().unwrap();
        assert_eq!(store.next_order_count().unwrap(), 1);
        assert_eq!(store.next_order_count().unwrap(), 2);
    }
}
