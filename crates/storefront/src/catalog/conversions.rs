//! REST v3 catalog payloads and their conversion to domain types.

use rooh_core::{
    Category, CategoryId, CategoryImage, CategoryRef, ImageId, Product, ProductId, ProductImage,
    StockStatus,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

// =============================================================================
// Raw payloads
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct WooProduct {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub regular_price: String,
    #[serde(default)]
    pub sale_price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub short_description: String,
    #[serde(default)]
    pub images: Vec<WooImage>,
    #[serde(default)]
    pub categories: Vec<WooCategoryRef>,
    #[serde(default)]
    pub stock_status: StockStatus,
    #[serde(default)]
    pub permalink: String,
}

#[derive(Debug, Deserialize)]
pub struct WooImage {
    pub id: i64,
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

#[derive(Debug, Deserialize)]
pub struct WooCategoryRef {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
}

#[derive(Debug, Deserialize)]
pub struct WooCategory {
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: Option<WooCategoryImage>,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Deserialize)]
pub struct WooCategoryImage {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
}

// =============================================================================
// Conversions
// =============================================================================

/// Parse a decimal price string; empty means "not set".
fn parse_price(raw: &str, field: &'static str, product_id: i64) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<Decimal>() {
        Ok(price) => Some(price),
        Err(e) => {
            warn!(product_id, field, value = %raw, error = %e, "Ignoring unparseable catalog price");
            None
        }
    }
}

pub fn convert_product(product: WooProduct) -> Product {
    let id = product.id;
    Product {
        id: ProductId::new(id),
        price: parse_price(&product.price, "price", id),
        regular_price: parse_price(&product.regular_price, "regular_price", id),
        sale_price: parse_price(&product.sale_price, "sale_price", id),
        name: product.name,
        slug: product.slug,
        description: product.description,
        short_description: product.short_description,
        images: product
            .images
            .into_iter()
            .map(|image| ProductImage {
                id: ImageId::new(image.id),
                src: image.src,
                alt: image.alt,
            })
            .collect(),
        categories: product
            .categories
            .into_iter()
            .map(|category| CategoryRef {
                id: CategoryId::new(category.id),
                name: category.name,
                slug: category.slug,
            })
            .collect(),
        stock_status: product.stock_status,
        permalink: product.permalink,
    }
}

pub fn convert_category(category: WooCategory) -> Category {
    Category {
        id: CategoryId::new(category.id),
        name: category.name,
        slug: category.slug,
        description: category.description,
        image: category.image.map(|image| CategoryImage {
            src: image.src,
            alt: image.alt,
        }),
        count: category.count,
    }
}
