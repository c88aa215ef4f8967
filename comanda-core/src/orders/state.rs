//! Order status state machine.
//!
//! Pure validation logic: no storage, no side effects. This module is the
//! single source of truth for which status moves are legal; the service
//! layer persists only what passes here.
//!
//! ```text
//! New -> Confirmed -> Preparing -> Cooking -> Ready -> Completed
//!                          \__________________/^
//!                          (kitchens may skip Preparing)
//!
//! Cancelled <- any of {New, Confirmed, Preparing, Cooking}
//! ```
//!
//! Completed and Cancelled are terminal. Ready's only outgoing move is
//! Completed: once a plate is up it is handed over or nothing.

use super::error::OrderError;
use shared::order::{Order, OrderStatus};

/// Pure transition validation over [`OrderStatus`] plus guard conditions.
pub struct OrderStateMachine;

impl OrderStateMachine {
    /// Whether `from -> to` is a legal move.
    pub fn is_allowed(from: OrderStatus, to: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (from, to),
            (New, Confirmed)
                | (Confirmed, Preparing)
                | (Preparing, Cooking)
                | (Cooking, Ready)
                | (Preparing, Ready)
                | (Ready, Completed)
                | (New, Cancelled)
                | (Confirmed, Cancelled)
                | (Preparing, Cancelled)
                | (Cooking, Cancelled)
        )
    }

    /// Validate a status move, including backward moves and moves out of a
    /// terminal state.
    pub fn validate(from: OrderStatus, to: OrderStatus) -> Result<(), OrderError> {
        if Self::is_allowed(from, to) {
            Ok(())
        } else {
            Err(OrderError::InvalidTransition { from, to })
        }
    }

    /// Validate a chef assignment against the target status.
    ///
    /// Returns the chef id to persist, if any:
    /// - entering `Cooking` requires a chef; a repeat with the already
    ///   assigned id is a no-op (`Ok(None)`), a different id fails with
    ///   `ChefAlreadyAssigned`
    /// - any other target rejects a chef id outright
    pub fn validate_chef_assignment(
        order: &Order,
        target: OrderStatus,
        chef_id: Option<&str>,
    ) -> Result<Option<String>, OrderError> {
        if target != OrderStatus::Cooking {
            return match chef_id {
                Some(_) => Err(OrderError::Validation(format!(
                    "a chef can only be assigned when cooking starts, not on {}",
                    target.name()
                ))),
                None => Ok(None),
            };
        }

        let chef = chef_id.ok_or_else(|| {
            OrderError::Validation("starting to cook requires a chef id".to_string())
        })?;

        match order.assigned_chef_id.as_deref() {
            None => Ok(Some(chef.to_string())),
            Some(assigned) if assigned == chef => Ok(None),
            Some(assigned) => Err(OrderError::ChefAlreadyAssigned {
                order_id: order.order_id.clone(),
                assigned: assigned.to_string(),
            }),
        }
    }
}
