//! Read-only catalog types (products and categories).
//!
//! Catalog prices come from the REST v3 API as decimal strings in major
//! units (`"111.00"`), unlike cart amounts which are minor-unit integers.
//! An empty price string means "not set" and maps to `None`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ImageId, ProductId};

/// Stock status of a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum StockStatus {
    #[default]
    #[serde(rename = "instock")]
    InStock,
    #[serde(rename = "outofstock")]
    OutOfStock,
    #[serde(rename = "onbackorder")]
    OnBackorder,
}

impl StockStatus {
    /// Whether the product can be added to the cart.
    ///
    /// Informational only: the cart never filters on this, the server decides.
    #[must_use]
    pub const fn is_purchasable(self) -> bool {
        matches!(self, Self::InStock | Self::OnBackorder)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductImage {
    pub id: ImageId,
    pub src: String,
    pub alt: String,
}

/// Category reference embedded in a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRef {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub slug: String,
    pub price: Option<Decimal>,
    pub regular_price: Option<Decimal>,
    pub sale_price: Option<Decimal>,
    pub description: String,
    pub short_description: String,
    pub images: Vec<ProductImage>,
    pub categories: Vec<CategoryRef>,
    pub stock_status: StockStatus,
    pub permalink: String,
}

impl Product {
    #[must_use]
    pub fn on_sale(&self) -> bool {
        matches!(
            (self.sale_price, self.regular_price),
            (Some(sale), Some(regular)) if sale < regular
        )
    }

    #[must_use]
    pub fn primary_image(&self) -> Option<&ProductImage> {
        self.images.first()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryImage {
    pub src: String,
    pub alt: String,
}

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub description: String,
    pub image: Option<CategoryImage>,
    /// Number of published products in the category.
    pub count: u32,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_stock_status_serde() {
        let status: StockStatus = serde_json::from_str("\"onbackorder\"").unwrap();
        assert_eq!(status, StockStatus::OnBackorder);
        assert!(status.is_purchasable());
        assert!(!StockStatus::OutOfStock.is_purchasable());
    }

    #[test]
    fn test_on_sale() {
        let product = Product {
            id: ProductId::new(1),
            name: "Oud Mist".to_string(),
            slug: "oud-mist".to_string(),
            price: Some(Decimal::new(9000, 2)),
            regular_price: Some(Decimal::new(11100, 2)),
            sale_price: Some(Decimal::new(9000, 2)),
            description: String::new(),
            short_description: String::new(),
            images: Vec::new(),
            categories: Vec::new(),
            stock_status: StockStatus::InStock,
            permalink: String::new(),
        };
        assert!(product.on_sale());

        let full_price = Product {
            sale_price: None,
            ..product
        };
        assert!(!full_price.on_sale());
    }
}
