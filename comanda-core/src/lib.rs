//! comanda-core: order lifecycle engine for a single-restaurant POS.
//!
//! The engine turns a customer's cart into a persisted order, drives that
//! order through a guarded status state machine, and settles it with a
//! payment record, all under concurrent access from independent UI actors
//! (ordering screen, kitchen display, payment dialog, status board) that
//! share nothing but the storage backend.
//!
//! # Layout
//!
//! - [`cart`]: per-customer mutable line collection with merge-on-add
//! - [`pricing`]: pure decimal price calculator and input validation
//! - [`orders`]: state machine, service orchestration, error taxonomy
//! - [`payments`]: tendered-amount validation and atomic settlement
//! - [`events`]: post-commit listener registries (cart/order/payment/inventory)
//! - [`storage`]: narrow store contracts and the redb-backed implementation
//! - [`core`]: configuration and background/polling task management
//! - [`utils`]: logging setup

pub mod cart;
pub mod core;
pub mod events;
pub mod orders;
pub mod payments;
pub mod pricing;
pub mod storage;
pub mod utils;

pub use crate::core::{BackgroundTasks, Config, PollHandle, TaskKind};
pub use cart::Cart;
pub use events::{CartEvent, EventBus, InventoryEvent, OrderEvent, PaymentEvent};
pub use orders::{OrderError, OrderResult, OrderService, OrderStateMachine, TransitionExtra};
pub use payments::{PaymentProcessor, PaymentReceipt};
pub use storage::{
    ItemStore, MemoryCatalog, OrderStore, PaymentStore, ProductCatalog, RedbStore,
};
