//! Order orchestration.
//!
//! [`OrderService`] is the only path from a cart to a persisted order and
//! from one status to the next. It validates locally first (state machine,
//! chef guard, customer info), then pushes the write through the store's
//! compare-and-swap so concurrent actors serialize on the persisted status.
//!
//! Storage calls are synchronous; the service runs them on the blocking
//! pool and bounds each with the configured timeout. A timed-out operation
//! is reported as not-applied and the caller re-reads before retrying.

use crate::core::Config;
use crate::events::{EventBus, InventoryEvent, OrderEvent};
use crate::orders::error::{OrderError, OrderResult};
use crate::orders::state::OrderStateMachine;
use crate::pricing;
use crate::storage::{CasResult, Deadline, ItemStore, OrderStore, StorageResult};
use crate::Cart;
use shared::order::{CartStatus, Order, OrderItem, OrderStatus, PaymentMethod};
use std::sync::Arc;
use std::time::Duration;

/// Receipt numbers start counting from here each day, so they keep a fixed
/// width for thermal printing.
const RECEIPT_BASE: u64 = 10_000;

/// Optional inputs for a status transition.
#[derive(Debug, Clone, Default)]
pub struct TransitionExtra {
    /// Chef taking the order, required exactly when entering `Cooking`.
    pub chef_id: Option<String>,
    /// Recorded on the order when the target is `Cancelled`.
    pub cancel_reason: Option<String>,
}

impl TransitionExtra {
    pub fn chef(chef_id: impl Into<String>) -> Self {
        Self {
            chef_id: Some(chef_id.into()),
            cancel_reason: None,
        }
    }

    pub fn cancelled_because(reason: impl Into<String>) -> Self {
        Self {
            chef_id: None,
            cancel_reason: Some(reason.into()),
        }
    }
}

/// Checkout and lifecycle orchestration over a shared store.
///
/// Clones share the store handle and event bus; every UI actor holds one.
pub struct OrderService<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    storage_timeout: Duration,
    tax_rate_percent: f64,
}

impl<S> Clone for OrderService<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            storage_timeout: self.storage_timeout,
            tax_rate_percent: self.tax_rate_percent,
        }
    }
}

impl<S> OrderService<S>
where
    S: OrderStore + ItemStore + 'static,
{
    pub fn new(store: Arc<S>, bus: Arc<EventBus>, config: &Config) -> Self {
        Self {
            store,
            bus,
            storage_timeout: config.storage_timeout(),
            tax_rate_percent: config.tax_rate_percent,
        }
    }

    /// Turn a cart into a persisted order.
    ///
    /// The order freezes the cart's line snapshots and total at this moment;
    /// no later catalog change reaches it. The order total is the cart total
    /// plus the configured tax rate, so with the default rate of 0 the two
    /// are equal. On success the cart is sealed and can no longer be
    /// mutated; a sealed or abandoned cart cannot check out.
    pub async fn checkout(
        &self,
        cart: &mut Cart,
        customer_name: &str,
        phone_number: &str,
        pay_method: PaymentMethod,
    ) -> OrderResult<Order> {
        if cart.status() != CartStatus::Active {
            return Err(OrderError::Validation(format!(
                "cart {} is no longer active",
                cart.cart_id()
            )));
        }
        let items = cart.items();
        if items.is_empty() {
            return Err(OrderError::EmptyCart);
        }
        let customer_name = customer_name.trim();
        let phone_number = phone_number.trim();
        if customer_name.is_empty() {
            return Err(OrderError::InvalidCustomerInfo(
                "customer name is required".to_string(),
            ));
        }
        if phone_number.is_empty() {
            return Err(OrderError::InvalidCustomerInfo(
                "phone number is required".to_string(),
            ));
        }

        let totals = pricing::calculate(&items, self.tax_rate_percent, 0.0);
        let receipt_number = self.next_receipt_number().await?;

        let mut order = Order::new(
            receipt_number,
            customer_name,
            phone_number,
            totals.total,
            pay_method,
        );
        order.items = items
            .iter()
            .map(|line| OrderItem::freeze(&order.order_id, line))
            .collect();

        let persisted = order.clone();
        self.run_store(move |store, deadline| store.insert_order_with_items(&persisted, deadline))
            .await?;

        cart.mark_checked_out();
        tracing::info!(
            order_id = %order.order_id,
            receipt = %order.receipt_number,
            total = order.total_amount,
            "Order created"
        );

        for item in &order.items {
            self.bus.emit_inventory(&InventoryEvent::StockConsumed {
                order_id: order.order_id.clone(),
                product_id: item.product_id.clone(),
                quantity: item.quantity,
            });
        }
        self.bus.emit_order(&OrderEvent::Created {
            order: order.clone(),
        });

        Ok(order)
    }

    /// Move an order to `target`, enforcing the state machine and the chef
    /// guard.
    ///
    /// The write is a compare-and-swap on the status read here: if another
    /// actor commits in between, this call fails with [`OrderError::Conflict`]
    /// and nothing is written. Callers refresh and re-decide rather than
    /// blindly retrying.
    pub async fn transition(
        &self,
        order_id: &str,
        target: OrderStatus,
        extra: TransitionExtra,
    ) -> OrderResult<Order> {
        if extra.cancel_reason.is_some() && target != OrderStatus::Cancelled {
            return Err(OrderError::Validation(
                "a cancel reason only applies when cancelling".to_string(),
            ));
        }

        let order = self.get_by_id(order_id).await?;
        OrderStateMachine::validate(order.status, target)?;
        let chef_to_persist =
            OrderStateMachine::validate_chef_assignment(&order, target, extra.chef_id.as_deref())?;

        let expected = order.status;
        let id = order_id.to_string();
        let chef = chef_to_persist.clone();
        let reason = extra.cancel_reason.clone();
        let cas = self
            .run_store(move |store, deadline| {
                store.transition_status(
                    &id,
                    expected,
                    target,
                    chef.as_deref(),
                    reason.as_deref(),
                    deadline,
                )
            })
            .await?;

        match cas {
            CasResult::Committed => {
                let updated = self.get_by_id(order_id).await?;
                tracing::info!(
                    order_id = %order_id,
                    from = expected.name(),
                    to = target.name(),
                    "Order transitioned"
                );
                self.bus.emit_order(&Self::event_for(&updated, target, &extra));
                Ok(updated)
            }
            CasResult::Conflict { actual } => {
                tracing::warn!(
                    order_id = %order_id,
                    expected = expected.name(),
                    actual = actual.name(),
                    "Transition lost the race"
                );
                Err(OrderError::Conflict(format!(
                    "order {order_id} is now {}",
                    actual.name()
                )))
            }
        }
    }

    pub async fn get_by_id(&self, order_id: &str) -> OrderResult<Order> {
        let id = order_id.to_string();
        self.run_store(move |store, _| store.get_by_id(&id))
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))
    }

    /// Fresh snapshot of every order in `status`, oldest first. Polling
    /// surfaces call this each tick.
    pub async fn get_by_status(&self, status: OrderStatus) -> OrderResult<Vec<Order>> {
        self.run_store(move |store, _| store.get_by_status(status))
            .await
    }

    pub async fn get_all(&self) -> OrderResult<Vec<Order>> {
        self.run_store(move |store, _| store.get_all()).await
    }

    pub async fn get_items(&self, order_id: &str) -> OrderResult<Vec<OrderItem>> {
        let id = order_id.to_string();
        self.run_store(move |store, _| store.get_items_by_order_id(&id))
            .await
    }

    /// `ORD{yyyymmdd}{sequence}` with a crash-safe counter behind it.
    async fn next_receipt_number(&self) -> OrderResult<String> {
        let count = self
            .run_store(move |store, _| store.next_order_count())
            .await?;
        let date = chrono::Local::now().format("%Y%m%d");
        Ok(format!("ORD{date}{}", RECEIPT_BASE + count))
    }

    fn event_for(order: &Order, target: OrderStatus, extra: &TransitionExtra) -> OrderEvent {
        let order_id = order.order_id.clone();
        match target {
            OrderStatus::Confirmed => OrderEvent::Confirmed { order_id },
            OrderStatus::Preparing => OrderEvent::SentToKitchen { order_id },
            OrderStatus::Cooking => OrderEvent::CookingStarted {
                order_id,
                chef_id: order.assigned_chef_id.clone().unwrap_or_default(),
            },
            OrderStatus::Ready => OrderEvent::Ready { order_id },
            OrderStatus::Completed => OrderEvent::Completed { order_id },
            OrderStatus::Cancelled => OrderEvent::Cancelled {
                order_id,
                reason: extra.cancel_reason.clone(),
            },
            // Orders are born New; no transition targets it.
            OrderStatus::New => OrderEvent::Created {
                order: order.clone(),
            },
        }
    }

    /// Run a synchronous store call on the blocking pool, bounded by the
    /// configured timeout. On timeout the operation counts as not-applied:
    /// the closure receives a matching [`Deadline`] that the store checks
    /// before commit, so an abandoned slow write aborts instead of landing
    /// after the caller already reported [`OrderError::StorageTimeout`].
    async fn run_store<T, F>(&self, op: F) -> OrderResult<T>
    where
        F: FnOnce(&S, Deadline) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = self.store.clone();
        let deadline = Deadline::within(self.storage_timeout);
        let task = tokio::task::spawn_blocking(move || op(&store, deadline));
        match tokio::time::timeout(self.storage_timeout, task).await {
            Err(_) => Err(OrderError::StorageTimeout),
            Ok(Err(join_err)) => Err(OrderError::Internal(format!(
                "storage task failed: {join_err}"
            ))),
            Ok(Ok(result)) => result.map_err(OrderError::from_storage),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryCatalog, RedbStore};
    use shared::models::Product;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Fixture {
        service: OrderService<RedbStore>,
        catalog: Arc<MemoryCatalog>,
        bus: Arc<EventBus>,
    }

    fn fixture() -> Fixture {
        let catalog = MemoryCatalog::new();
        catalog.upsert(Product::new("p-burger", "Burger", 65_000.0));
        catalog.upsert(Product::new("p-coke", "Coke", 15_000.0));
        let catalog = Arc::new(catalog);

        let store = Arc::new(RedbStore::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let config = Config::with_data_dir("/tmp/unused");
        let service = OrderService::new(store, bus.clone(), &config);

        Fixture {
            service,
            catalog,
            bus,
        }
    }

    fn filled_cart(fx: &Fixture) -> Cart {
        let mut cart = Cart::new("cust-1", fx.catalog.clone(), fx.bus.clone());
        cart.add_item("p-burger", 2, None).unwrap();
        cart.add_item("p-coke", 1, None).unwrap();
        cart
    }

    async fn checked_out(fx: &Fixture) -> Order {
        let mut cart = filled_cart(fx);
        fx.service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_creates_new_unpaid_order() {
        let fx = fixture();
        let mut cart = filled_cart(&fx);

        let order = fx
            .service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::New);
        assert!(!order.is_paid());
        assert_eq!(order.total_amount, 145_000.0);
        assert_eq!(order.items.len(), 2);
        assert!(order.receipt_number.starts_with("ORD"));
        assert!(order.receipt_number.ends_with("10001"));

        // Cart is sealed; the persisted order is readable by other actors.
        assert!(cart.add_item("p-coke", 1, None).is_err());
        let loaded = fx.service.get_by_id(&order.order_id).await.unwrap();
        assert_eq!(loaded.total_amount, 145_000.0);
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_and_bad_customer_info() {
        let fx = fixture();

        let mut empty = Cart::new("cust-1", fx.catalog.clone(), fx.bus.clone());
        let err = fx
            .service
            .checkout(&mut empty, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::EmptyCart));

        let mut cart = filled_cart(&fx);
        let err = fx
            .service
            .checkout(&mut cart, "   ", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidCustomerInfo(_)));

        let err = fx
            .service
            .checkout(&mut cart, "An", "", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidCustomerInfo(_)));

        // Failed checkouts leave the cart usable.
        assert!(cart.add_item("p-coke", 1, None).is_ok());
    }

    #[tokio::test]
    async fn test_order_total_is_frozen_against_catalog_changes() {
        let fx = fixture();
        let order = checked_out(&fx).await;

        fx.catalog.upsert(Product::new("p-burger", "Burger", 99_000.0));

        let loaded = fx.service.get_by_id(&order.order_id).await.unwrap();
        assert_eq!(loaded.total_amount, 145_000.0);
        let items = fx.service.get_items(&order.order_id).await.unwrap();
        assert_eq!(items[0].unit_price, 65_000.0);
    }

    #[tokio::test]
    async fn test_full_lifecycle_to_completed() {
        let fx = fixture();
        let order = checked_out(&fx).await;
        let id = order.order_id.clone();

        for (target, extra) in [
            (OrderStatus::Confirmed, TransitionExtra::default()),
            (OrderStatus::Preparing, TransitionExtra::default()),
            (OrderStatus::Cooking, TransitionExtra::chef("chef-1")),
            (OrderStatus::Ready, TransitionExtra::default()),
            (OrderStatus::Completed, TransitionExtra::default()),
        ] {
            let updated = fx.service.transition(&id, target, extra).await.unwrap();
            assert_eq!(updated.status, target);
        }

        let finished = fx.service.get_by_id(&id).await.unwrap();
        assert_eq!(finished.assigned_chef_id.as_deref(), Some("chef-1"));
    }

    #[tokio::test]
    async fn test_illegal_transition_is_rejected_before_storage() {
        let fx = fixture();
        let order = checked_out(&fx).await;

        let err = fx
            .service
            .transition(&order.order_id, OrderStatus::Cooking, TransitionExtra::chef("chef-1"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let loaded = fx.service.get_by_id(&order.order_id).await.unwrap();
        assert_eq!(loaded.status, OrderStatus::New);
    }

    #[tokio::test]
    async fn test_second_chef_is_rejected() {
        let fx = fixture();
        let order = checked_out(&fx).await;
        let id = order.order_id.clone();

        fx.service
            .transition(&id, OrderStatus::Confirmed, TransitionExtra::default())
            .await
            .unwrap();
        fx.service
            .transition(&id, OrderStatus::Preparing, TransitionExtra::default())
            .await
            .unwrap();
        fx.service
            .transition(&id, OrderStatus::Cooking, TransitionExtra::chef("chef-1"))
            .await
            .unwrap();

        // Same chef repeating the claim is a no-op error-free path, but the
        // order is already Cooking so the transition itself is illegal now.
        let err = fx
            .service
            .transition(&id, OrderStatus::Cooking, TransitionExtra::chef("chef-2"))
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));

        let loaded = fx.service.get_by_id(&id).await.unwrap();
        assert_eq!(loaded.assigned_chef_id.as_deref(), Some("chef-1"));
    }

    #[tokio::test]
    async fn test_cancel_records_reason() {
        let fx = fixture();
        let order = checked_out(&fx).await;

        let cancelled = fx
            .service
            .transition(
                &order.order_id,
                OrderStatus::Cancelled,
                TransitionExtra::cancelled_because("customer left"),
            )
            .await
            .unwrap();
        assert_eq!(cancelled.status, OrderStatus::Cancelled);
        assert_eq!(cancelled.cancel_reason.as_deref(), Some("customer left"));

        // Terminal: nothing moves a cancelled order.
        let err = fx
            .service
            .transition(&order.order_id, OrderStatus::Confirmed, TransitionExtra::default())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_cancel_reason_rejected_off_cancellation() {
        let fx = fixture();
        let order = checked_out(&fx).await;

        let err = fx
            .service
            .transition(
                &order.order_id,
                OrderStatus::Confirmed,
                TransitionExtra::cancelled_because("oops"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[tokio::test]
    async fn test_receipt_numbers_increment_per_checkout() {
        let fx = fixture();
        let first = checked_out(&fx).await;
        let second = checked_out(&fx).await;

        assert!(first.receipt_number.ends_with("10001"));
        assert!(second.receipt_number.ends_with("10002"));
        assert_ne!(first.order_id, second.order_id);
    }

    #[tokio::test]
    async fn test_queries_see_fresh_state() {
        let fx = fixture();
        let order = checked_out(&fx).await;

        assert_eq!(
            fx.service.get_by_status(OrderStatus::New).await.unwrap().len(),
            1
        );

        fx.service
            .transition(&order.order_id, OrderStatus::Confirmed, TransitionExtra::default())
            .await
            .unwrap();

        assert!(fx.service.get_by_status(OrderStatus::New).await.unwrap().is_empty());
        assert_eq!(
            fx.service
                .get_by_status(OrderStatus::Confirmed)
                .await
                .unwrap()
                .len(),
            1
        );
        assert_eq!(fx.service.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_order_reports_not_found() {
        let fx = fixture();
        let err = fx.service.get_by_id("ghost").await.unwrap_err();
        assert!(matches!(err, OrderError::OrderNotFound(_)));
    }

    #[tokio::test]
    async fn test_sealed_cart_cannot_check_out_again() {
        let fx = fixture();
        let mut cart = filled_cart(&fx);

        fx.service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap();
        let err = fx
            .service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        // The retry created no second order.
        assert_eq!(fx.service.get_all().await.unwrap().len(), 1);

        let mut walked_away = filled_cart(&fx);
        walked_away.abandon().unwrap();
        let err = fx
            .service
            .checkout(&mut walked_away, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
        assert_eq!(fx.service.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_configured_tax_raises_order_total_above_cart_total() {
        let catalog = MemoryCatalog::new();
        catalog.upsert(Product::new("p-burger", "Burger", 65_000.0));
        let catalog = Arc::new(catalog);

        let store = Arc::new(RedbStore::open_in_memory().unwrap());
        let bus = Arc::new(EventBus::new());
        let mut config = Config::with_data_dir("/tmp/unused");
        config.tax_rate_percent = 10.0;
        let service = OrderService::new(store, bus.clone(), &config);

        let mut cart = Cart::new("cust-1", catalog, bus);
        cart.add_item("p-burger", 2, None).unwrap();
        assert_eq!(cart.total_amount(), 130_000.0);

        let order = service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap();
        assert_eq!(order.total_amount, 143_000.0);
    }

    /// Store whose order insert stalls past the service timeout.
    struct SlowStore {
        inner: RedbStore,
        delay: Duration,
    }

    impl OrderStore for SlowStore {
        fn insert_order_with_items(
            &self,
            order: &Order,
            deadline: Deadline,
        ) -> StorageResult<String> {
            std::thread::sleep(self.delay);
            self.inner.insert_order_with_items(order, deadline)
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
            self.inner
                .transition_status(order_id, expected, next, chef_id, cancel_reason, deadline)
        }

        fn get_by_id(&self, order_id: &str) -> StorageResult<Option<Order>> {
            self.inner.get_by_id(order_id)
        }

        fn get_by_status(&self, status: OrderStatus) -> StorageResult<Vec<Order>> {
            self.inner.get_by_status(status)
        }

        fn get_all(&self) -> StorageResult<Vec<Order>> {
            self.inner.get_all()
        }

        fn next_order_count(&self) -> StorageResult<u64> {
            self.inner.next_order_count()
        }
    }

    impl ItemStore for SlowStore {
        fn get_items_by_order_id(&self, order_id: &str) -> StorageResult<Vec<OrderItem>> {
            self.inner.get_items_by_order_id(order_id)
        }
    }

    #[tokio::test]
    async fn test_timed_out_checkout_persists_nothing() {
        let catalog = MemoryCatalog::new();
        catalog.upsert(Product::new("p-burger", "Burger", 65_000.0));
        let catalog = Arc::new(catalog);

        let inner = RedbStore::open_in_memory().unwrap();
        let bus = Arc::new(EventBus::new());
        let mut config = Config::with_data_dir("/tmp/unused");
        config.storage_timeout_ms = 50;
        let service = OrderService::new(
            Arc::new(SlowStore {
                inner: inner.clone(),
                delay: Duration::from_millis(300),
            }),
            bus.clone(),
            &config,
        );

        let mut cart = Cart::new("cust-1", catalog, bus);
        cart.add_item("p-burger", 1, None).unwrap();

        let err = service
            .checkout(&mut cart, "An", "0905000000", PaymentMethod::Cash)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::StorageTimeout));
        // The cart is still active, so the cashier can retry.
        assert_eq!(cart.status(), CartStatus::Active);

        // Give the stalled write time to reach its commit point; the store
        // must abort it rather than land an order nobody was told about.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(inner.get_all().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_emits_created_and_stock_events() {
        let fx = fixture();
        let created = Arc::new(AtomicUsize::new(0));
        let stock = Arc::new(AtomicUsize::new(0));

        let counter = created.clone();
        fx.bus.on_order(move |event| {
            if matches!(event, OrderEvent::Created { .. }) {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });
        let counter = stock.clone();
        fx.bus.on_inventory(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        checked_out(&fx).await;
        assert_eq!(created.load(Ordering::SeqCst), 1);
        assert_eq!(stock.load(Ordering::SeqCst), 2);
    }
}
