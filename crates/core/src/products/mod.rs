//! Ad products - priced placement bundles that advertisers can buy.
//!
//! Raw form input goes through the sanitizers before it is persisted.
//! Storage follows the site's layout: one meta row per product field under
//! a fixed prefix, and the list of all product ids in an aggregate option.

mod sanitize;
mod sqlite;
mod types;

pub use sanitize::{
    sanitize_payable_event, sanitize_placements, sanitize_price, sanitize_price_value,
    sanitize_sizes,
};
pub use sqlite::SqliteProductStore;
pub use types::*;

/// Trait for ad product storage.
pub trait ProductStore: Send + Sync {
    /// Sanitize and store a new product. Returns the stored product.
    fn create(&self, input: &ProductInput) -> Result<AdProduct, ProductError>;

    /// Get a product by id.
    fn get(&self, id: ProductId) -> Result<AdProduct, ProductError>;

    /// Sanitize and replace every field of an existing product.
    fn update(&self, id: ProductId, input: &ProductInput) -> Result<AdProduct, ProductError>;

    /// Delete a product and its metadata.
    fn delete(&self, id: ProductId) -> Result<(), ProductError>;

    /// All products, ordered by id.
    fn list(&self) -> Result<Vec<AdProduct>, ProductError>;

    /// Ids from the aggregate product registry.
    fn ids(&self) -> Result<Vec<ProductId>, ProductError>;
}
