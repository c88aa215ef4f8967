//! Product Model

use serde::{Deserialize, Serialize};

/// Catalog product. The order engine only ever reads these; name and price
/// are copied into cart lines as snapshots at add time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub available: bool,
}

impl Product {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            available: true,
        }
    }
}
