//! Payment settlement.
//!
//! One successful payment per order, for exactly the order's frozen total.
//! Cash requires a sufficient tendered amount and yields change; card and
//! wallet charge the total directly. The payment record and the order's
//! paid flag are committed as one atomic storage write, so no reader ever
//! sees a paid order without its payment or the reverse.

use crate::core::Config;
use crate::events::{EventBus, PaymentEvent};
use crate::orders::error::{OrderError, OrderResult};
use crate::pricing;
use crate::storage::{Deadline, OrderStore, PaymentStore, StorageResult};
use shared::order::{OrderStatus, Payment, PaymentMethod};
use std::sync::Arc;
use std::time::Duration;

/// What the cashier hands back: the settled payment and any change due.
#[derive(Debug, Clone, PartialEq)]
pub struct PaymentReceipt {
    pub payment: Payment,
    /// Zero for non-cash methods.
    pub change: f64,
}

/// Settles orders against the shared store.
pub struct PaymentProcessor<S> {
    store: Arc<S>,
    bus: Arc<EventBus>,
    storage_timeout: Duration,
}

impl<S> Clone for PaymentProcessor<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
            bus: self.bus.clone(),
            storage_timeout: self.storage_timeout,
        }
    }
}

impl<S> PaymentProcessor<S>
where
    S: OrderStore + PaymentStore + 'static,
{
    pub fn new(store: Arc<S>, bus: Arc<EventBus>, config: &Config) -> Self {
        Self {
            store,
            bus,
            storage_timeout: config.storage_timeout(),
        }
    }

    /// Take payment for an order.
    ///
    /// `tendered` is required for cash and ignored otherwise. The charged
    /// amount is always the order's stored total; callers never pass an
    /// amount of their own.
    pub async fn pay(
        &self,
        order_id: &str,
        method: PaymentMethod,
        tendered: Option<f64>,
    ) -> OrderResult<PaymentReceipt> {
        let id = order_id.to_string();
        let order = self
            .run_store(move |store, _| store.get_by_id(&id))
            .await?
            .ok_or_else(|| OrderError::OrderNotFound(order_id.to_string()))?;

        if order.status == OrderStatus::Cancelled {
            return Err(OrderError::Validation(format!(
                "order {order_id} is cancelled and cannot be paid"
            )));
        }
        if order.is_paid() {
            return Err(OrderError::AlreadyPaid(order_id.to_string()));
        }

        let required = order.total_amount;
        let change = if method.is_cash() {
            let tendered = tendered.ok_or_else(|| {
                OrderError::Validation("cash payment requires a tendered amount".to_string())
            })?;
            pricing::validate_tendered(tendered)?;

            let shortfall = pricing::to_decimal(required) - pricing::to_decimal(tendered);
            if shortfall >= pricing::MONEY_TOLERANCE {
                self.bus.emit_payment(&PaymentEvent::Failed {
                    order_id: order_id.to_string(),
                    reason: format!("insufficient cash: required {required:.2}, tendered {tendered:.2}"),
                });
                return Err(OrderError::InsufficientPayment { required, tendered });
            }
            pricing::to_f64((pricing::to_decimal(tendered) - pricing::to_decimal(required)).max(rust_decimal::Decimal::ZERO))
        } else {
            0.0
        };

        let payment = Payment::success(order_id, required, method);
        let record = payment.clone();
        let settle = self
            .run_store(move |store, deadline| store.insert_payment(&record, deadline))
            .await;

        if let Err(err) = settle {
            self.bus.emit_payment(&PaymentEvent::Failed {
                order_id: order_id.to_string(),
                reason: err.to_string(),
            });
            return Err(err);
        }

        tracing::info!(
            order_id = %order_id,
            payment_id = %payment.payment_id,
            method = method.name(),
            amount = required,
            change,
            "Payment settled"
        );
        self.bus.emit_payment(&PaymentEvent::Success {
            order_id: order_id.to_string(),
            payment_id: payment.payment_id.clone(),
            amount: required,
            method,
            change,
        });

        Ok(PaymentReceipt { payment, change })
    }

    /// The payment that settled `order_id`, if any.
    pub async fn payment_for(&self, order_id: &str) -> OrderResult<Option<Payment>> {
        let id = order_id.to_string();
        self.run_store(move |store, _| store.get_payment_for_order(&id))
            .await
    }

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
