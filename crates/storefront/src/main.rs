//! Rooh storefront diagnostics.
//!
//! Loads the storefront configuration, resumes (or bootstraps) the persisted
//! cart session and logs a summary of the server cart. Useful for checking
//! credentials and connectivity against a store without a UI.
//!
//! Takes no arguments; everything comes from the environment (see
//! [`rooh_storefront::config`]).

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;

use rooh_storefront::cart::CartView;
use rooh_storefront::catalog::CategoryQuery;
use rooh_storefront::config::StoreConfig;
use rooh_storefront::state::Storefront;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StoreConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration from environment (needed for Sentry init)
    let config = match StoreConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Failed to load configuration: {e}");
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    // Defaults to info level for our crate if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "rooh_storefront=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let storefront = match Storefront::new(config) {
        Ok(storefront) => storefront,
        Err(e) => {
            tracing::error!(error = %e, "Failed to initialize storefront");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(
        store = %storefront.config().base_url,
        session_file = %storefront.config().session_file.display(),
        "Storefront initialized"
    );

    if let Some(catalog) = storefront.catalog() {
        match catalog.get_categories(CategoryQuery::default()).await {
            Ok(categories) => tracing::info!(count = categories.len(), "Catalog reachable"),
            Err(e) => tracing::warn!(error = %e, "Catalog unreachable"),
        }
    }

    let snapshot = match storefront.cart().refresh().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::error!(error = %e, message = %e.user_message(), "Failed to load cart");
            return ExitCode::FAILURE;
        }
    };

    let view = CartView::from(&snapshot);
    tracing::info!(
        items = view.item_count,
        subtotal = %view.subtotal,
        shipping = %view.shipping,
        tax = %view.tax,
        total = %view.total,
        "Cart loaded"
    );
    for item in &view.items {
        tracing::info!(
            key = %item.key,
            name = %item.name,
            quantity = item.quantity,
            line_price = %item.line_price,
            "Cart line"
        );
    }

    ExitCode::SUCCESS
}
