//! Cache types for catalog responses.

use rooh_core::{Category, Product, ProductId};

use super::ProductQuery;

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Product(ProductId),
    ProductSlug(String),
    Products(ProductQuery),
    Categories { per_page: u32, hide_empty: bool },
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Product(Box<Product>),
    /// `None` records a slug that matched nothing.
    ProductSlug(Option<Box<Product>>),
    Products(Vec<Product>),
    Categories(Vec<Category>),
}
