//! Post-commit event delivery.
//!
//! Four typed listener families decouple state changes from UI refresh:
//! cart, order, payment and inventory. Listeners are plain callbacks with no
//! return value: they cannot veto or roll back the mutation that triggered
//! them, because delivery happens strictly after the commit. Delivery is in
//! registration order, and a panicking listener is isolated and logged so it
//! never blocks the listeners behind it.

use parking_lot::RwLock;
use shared::order::{Order, PaymentMethod};
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

/// Cart mutations. Exactly one per mutating call, fired after the mutation
/// completes.
#[derive(Debug, Clone, PartialEq)]
pub enum CartEvent {
    Changed {
        cart_id: String,
        item_count: usize,
        total_amount: f64,
    },
}

/// Order lifecycle events, one per committed transition.
#[derive(Debug, Clone, PartialEq)]
pub enum OrderEvent {
    Created { order: Order },
    Confirmed { order_id: String },
    SentToKitchen { order_id: String },
    CookingStarted { order_id: String, chef_id: String },
    Ready { order_id: String },
    Completed { order_id: String },
    Cancelled { order_id: String, reason: Option<String> },
}

/// Payment outcomes.
#[derive(Debug, Clone, PartialEq)]
pub enum PaymentEvent {
    Success {
        order_id: String,
        payment_id: String,
        amount: f64,
        method: PaymentMethod,
        change: f64,
    },
    Failed {
        order_id: String,
        reason: String,
    },
}

/// Stock consumption recorded at checkout. Informational only: the engine
/// never writes to the catalog.
#[derive(Debug, Clone, PartialEq)]
pub enum InventoryEvent {
    StockConsumed {
        order_id: String,
        product_id: String,
        quantity: i32,
    },
}

type Listener<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// One listener family: ordered registration, panic-isolated delivery.
struct Registry<E> {
    listeners: RwLock<Vec<Listener<E>>>,
}

impl<E> Registry<E> {
    fn new() -> Self {
        Self {
            listeners: RwLock::new(Vec::new()),
        }
    }

    fn register(&self, listener: impl Fn(&E) + Send + Sync + 'static) {
        self.listeners.write().push(Arc::new(listener));
    }

    fn emit(&self, family: &'static str, event: &E) {
        // Deliver against a snapshot taken outside the lock, so a listener
        // may register further listeners without deadlocking. Those see the
        // next event, not this one.
        let listeners: Vec<Listener<E>> = self.listeners.read().clone();
        for (idx, listener) in listeners.iter().enumerate() {
            if catch_unwind(AssertUnwindSafe(|| listener(event))).is_err() {
                tracing::error!(
                    family,
                    listener = idx,
                    "Event listener panicked; continuing delivery"
                );
            }
        }
    }

    fn len(&self) -> usize {
        self.listeners.read().len()
    }
}

/// Typed callback registries for all four event families.
///
/// Constructed once and shared by reference (`Arc`) between the service
/// layer and the UI surfaces. No global singleton.
pub struct EventBus {
    cart: Registry<CartEvent>,
    order: Registry<OrderEvent>,
    payment: Registry<PaymentEvent>,
    inventory: Registry<InventoryEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            cart: Registry::new(),
            order: Registry::new(),
            payment: Registry::new(),
            inventory: Registry::new(),
        }
    }

    // ========== Registration ==========

    pub fn on_cart(&self, listener: impl Fn(&CartEvent) + Send + Sync + 'static) {
        self.cart.register(listener);
    }

    pub fn on_order(&self, listener: impl Fn(&OrderEvent) + Send + Sync + 'static) {
        self.order.register(listener);
    }

    pub fn on_payment(&self, listener: impl Fn(&PaymentEvent) + Send + Sync + 'static) {
        self.payment.register(listener);
    }

    pub fn on_inventory(&self, listener: impl Fn(&InventoryEvent) + Send + Sync + 'static) {
        self.inventory.register(listener);
    }

    // ========== Emission (post-commit only) ==========

    pub fn emit_cart(&self, event: &CartEvent) {
        self.cart.emit("cart", event);
    }

    pub fn emit_order(&self, event: &OrderEvent) {
        self.order.emit("order", event);
    }

    pub fn emit_payment(&self, event: &PaymentEvent) {
        self.payment.emit("payment", event);
    }

    pub fn emit_inventory(&self, event: &InventoryEvent) {
        self.inventory.emit("inventory", event);
    }

    /// Total registered listeners across all families.
    pub fn listener_count(&self) -> usize {
        self.cart.len() + self.order.len() + self.payment.len() + self.inventory.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
