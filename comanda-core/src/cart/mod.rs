//! Per-customer cart.
//!
//! A cart is a mutable collection of lines keyed by product id: adding a
//! product that is already present merges quantities instead of appending a
//! second line. Every line snapshots the product's name and price at add
//! time, so later catalog edits never change what the customer saw.
//!
//! Each successful mutating call fires exactly one [`CartEvent::Changed`]
//! after the cart state is updated. Ordering screens refresh off that event
//! alone; a call that fires zero or two would either freeze or flicker them.

use crate::events::{CartEvent, EventBus};
use crate::orders::error::{OrderError, OrderResult};
use crate::pricing;
use crate::storage::ProductCatalog;
use shared::order::{CartItem, CartStatus};
use shared::util::new_id;
use std::sync::Arc;

/// A single customer's in-progress selection.
pub struct Cart {
    cart_id: String,
    customer_id: String,
    status: CartStatus,
    items: Vec<CartItem>,
    catalog: Arc<dyn ProductCatalog>,
    bus: Arc<EventBus>,
}

impl Cart {
    pub fn new(
        customer_id: impl Into<String>,
        catalog: Arc<dyn ProductCatalog>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            cart_id: new_id(),
            customer_id: customer_id.into(),
            status: CartStatus::Active,
            items: Vec::new(),
            catalog,
            bus,
        }
    }

    pub fn cart_id(&self) -> &str {
        &self.cart_id
    }

    /// Owner of this cart. One active cart per customer session.
    pub fn customer_id(&self) -> &str {
        &self.customer_id
    }

    pub fn status(&self) -> CartStatus {
        self.status
    }

    /// Snapshot of the current lines. Callers get their own copy; mutating
    /// it cannot corrupt the cart's totals.
    pub fn items(&self) -> Vec<CartItem> {
        self.items.clone()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Sum of line subtotals. Recomputed from the lines on every call, so it
    /// can never drift from them.
    pub fn total_amount(&self) -> f64 {
        pricing::cart_total(&self.items)
    }

    /// Add `quantity` of a product, merging into an existing line for the
    /// same product. The product must exist in the catalog and be available.
    pub fn add_item(
        &mut self,
        product_id: &str,
        quantity: i32,
        note: Option<String>,
    ) -> OrderResult<()> {
        self.ensure_active()?;

        let product = self
            .catalog
            .get_by_id(product_id)
            .ok_or_else(|| OrderError::ProductUnavailable(product_id.to_string()))?;
        if !product.available {
            return Err(OrderError::ProductUnavailable(product_id.to_string()));
        }
        pricing::validate_line(product.price, quantity)?;

        match self.items.iter_mut().find(|i| i.product_id == product_id) {
            Some(line) => {
                let merged = line.quantity + quantity;
                pricing::validate_line(line.unit_price, merged)?;
                line.quantity = merged;
                line.subtotal = pricing::line_subtotal(line.unit_price, merged);
                if note.is_some() {
                    line.note = note;
                }
            }
            None => {
                self.items.push(CartItem {
                    product_id: product.id.clone(),
                    product_name: product.name.clone(),
                    unit_price: product.price,
                    quantity,
                    subtotal: pricing::line_subtotal(product.price, quantity),
                    note,
                });
            }
        }

        self.notify_changed();
        Ok(())
    }

    /// Remove a product's line. Removing a product that is not in the cart
    /// is a no-op, not an error.
    pub fn remove_item(&mut self, product_id: &str) -> OrderResult<()> {
        self.ensure_active()?;
        self.items.retain(|i| i.product_id != product_id);
        self.notify_changed();
        Ok(())
    }

    /// Set a line's quantity. A quantity of zero or less removes the line;
    /// a product not in the cart is a no-op.
    pub fn update_quantity(&mut self, product_id: &str, quantity: i32) -> OrderResult<()> {
        self.ensure_active()?;

        if quantity <= 0 {
            self.items.retain(|i| i.product_id != product_id);
            self.notify_changed();
            return Ok(());
        }

        if let Some(line) = self.items.iter_mut().find(|i| i.product_id == product_id) {
            pricing::validate_line(line.unit_price, quantity)?;
            line.quantity = quantity;
            line.subtotal = pricing::line_subtotal(line.unit_price, quantity);
        }

        self.notify_changed();
        Ok(())
    }

    /// Drop every line.
    pub fn clear(&mut self) -> OrderResult<()> {
        self.ensure_active()?;
        self.items.clear();
        self.notify_changed();
        Ok(())
    }

    /// Seal the cart after a successful checkout. Further mutations fail.
    pub(crate) fn mark_checked_out(&mut self) {
        self.status = CartStatus::CheckedOut;
    }

    /// Discard the cart when the customer walks away. Seals it the same way
    /// checkout does: further mutations and checkout fail.
    pub fn abandon(&mut self) -> OrderResult<()> {
        self.ensure_active()?;
        self.status = CartStatus::Abandoned;
        Ok(())
    }

    fn ensure_active(&self) -> OrderResult<()> {
        if self.status == CartStatus::Active {
            Ok(())
        } else {
            Err(OrderError::Validation(format!(
                "cart {} is no longer active",
                self.cart_id
            )))
        }
    }

    fn notify_changed(&self) {
        self.bus.emit_cart(&CartEvent::Changed {
            cart_id: self.cart_id.clone(),
            item_count: self.items.len(),
            total_amount: self.total_amount(),
        });
    }
}
