//! Employee Model
//!
//! Staff are modelled as a base value plus a role-specific capability record
//! selected through a tagged variant, not a subclass hierarchy.

use serde::{Deserialize, Serialize};

/// Base employee value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Employee {
    pub id: String,
    pub name: String,
    pub role: EmployeeRole,
    pub is_active: bool,
}

/// Role tag with per-role capabilities.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", tag = "role")]
pub enum EmployeeRole {
    Chef,
    Cashier,
    Manager(ManagerCapabilities),
}

/// Administrative capabilities carried only by managers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ManagerCapabilities {
    pub can_void_orders: bool,
    pub can_adjust_prices: bool,
}

impl Employee {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: EmployeeRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
            is_active: true,
        }
    }

    /// Whether this employee may cook orders.
    pub fn can_cook(&self) -> bool {
        matches!(self.role, EmployeeRole::Chef)
    }

    /// Whether this employee may void (cancel) orders beyond their own.
    pub fn can_void_orders(&self) -> bool {
        match &self.role {
            EmployeeRole::Manager(caps) => caps.can_void_orders,
            _ => false,
        }
    }
}
