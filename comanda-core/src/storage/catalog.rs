//! In-memory product catalog.
//!
//! The engine only ever reads the catalog; whatever owns product CRUD seeds
//! and refreshes this map from the outside.

use super::ProductCatalog;
use dashmap::DashMap;
use shared::models::Product;

/// Concurrent in-memory catalog keyed by product id.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    products: DashMap<String, Product>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self {
            products: DashMap::new(),
        }
    }

    /// Seed or replace a product. Owned by the catalog-managing side, not
    /// the order engine.
    pub fn upsert(&self, product: Product) {
        self.products.insert(product.id.clone(), product);
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl ProductCatalog for MemoryCatalog {
    fn get_by_id(&self, product_id: &str) -> Option<Product> {
        self.products.get(product_id).map(|p| p.clone())
    }

    fn get_available(&self) -> Vec<Product> {
        let mut available: Vec<Product> = self
            .products
            .iter()
            .filter(|p| p.available)
            .map(|p| p.clone())
            .collect();
        available.sort_by(|a, b| a.name.cmp(&b.name));
        available
    }
}
