//! Conversions from raw Store API payloads to domain types.

use rooh_core::{
    CartImage, CartLineItem, CartSnapshot, CartTotals, Currency, ImageId, LineKey, LinePrices,
    LineTotals, Money, PackageId, PackageItem, ProductId, ShippingPackage, ShippingRate,
};
use tracing::warn;

use super::wire::{
    StoreCart, StoreCartItem, StoreCartTotals, StoreCurrency, StoreImage, StorePackage,
    StorePackageItem, StoreRate,
};

fn convert_currency(currency: StoreCurrency) -> Currency {
    Currency::new(currency.currency_code, currency.currency_minor_unit)
}

/// Convert a raw cart into a snapshot.
///
/// The server's `items_count` is kept as reported; a mismatch with the line
/// quantities is logged, not corrected.
pub fn convert_cart(cart: StoreCart) -> CartSnapshot {
    let snapshot = CartSnapshot {
        items: cart.items.into_iter().map(convert_line).collect(),
        item_count: cart.items_count,
        totals: convert_totals(cart.totals),
        needs_shipping: cart.needs_shipping,
        shipping_packages: cart.shipping_rates.into_iter().map(convert_package).collect(),
    };

    if !snapshot.is_consistent() {
        warn!(
            item_count = snapshot.item_count,
            quantity_sum = snapshot.quantity_sum(),
            "Store API cart count disagrees with its lines"
        );
    }

    snapshot
}

fn convert_line(item: StoreCartItem) -> CartLineItem {
    let price_currency = convert_currency(item.prices.currency);
    let totals_currency = convert_currency(item.totals.currency);

    CartLineItem {
        key: LineKey::new(item.key),
        product_id: ProductId::new(item.id),
        name: item.name,
        quantity: item.quantity,
        prices: LinePrices {
            price: Money::new(item.prices.price, price_currency.clone()),
            regular_price: Money::new(item.prices.regular_price, price_currency.clone()),
            sale_price: Money::new(item.prices.sale_price, price_currency),
        },
        totals: LineTotals {
            subtotal: Money::new(item.totals.line_subtotal, totals_currency.clone()),
            total: Money::new(item.totals.line_total, totals_currency),
        },
        images: item.images.into_iter().map(convert_image).collect(),
        short_description: item.short_description,
    }
}

fn convert_image(image: StoreImage) -> CartImage {
    CartImage {
        id: ImageId::new(image.id),
        src: image.src,
        thumbnail: image.thumbnail,
        alt: image.alt,
    }
}

fn convert_totals(totals: StoreCartTotals) -> CartTotals {
    let currency = convert_currency(totals.currency);
    CartTotals {
        items: Money::new(totals.total_items, currency.clone()),
        shipping: Money::new(totals.total_shipping, currency.clone()),
        tax: Money::new(totals.total_tax, currency.clone()),
        total: Money::new(totals.total_price, currency),
    }
}

fn convert_package(package: StorePackage) -> ShippingPackage {
    ShippingPackage {
        package_id: PackageId::new(package.package_id),
        name: package.name,
        destination: package
            .destination
            .into_iter()
            .filter_map(|(field, value)| match value {
                serde_json::Value::String(s) => Some((field, s)),
                serde_json::Value::Null => None,
                other => Some((field, other.to_string())),
            })
            .collect(),
        items: package.items.into_iter().map(convert_package_item).collect(),
        rates: package.shipping_rates.into_iter().map(convert_rate).collect(),
    }
}

fn convert_package_item(item: StorePackageItem) -> PackageItem {
    PackageItem {
        key: LineKey::new(item.key),
        name: item.name,
        quantity: item.quantity,
    }
}

fn convert_rate(rate: StoreRate) -> ShippingRate {
    ShippingRate {
        rate_id: rate.rate_id,
        name: rate.name,
        price: Money::new(rate.price, convert_currency(rate.currency)),
        selected: rate.selected,
    }
}
