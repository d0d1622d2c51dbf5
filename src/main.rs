//! PriceWatch binary entrypoint.
//! Boots the Axum HTTP server, wiring routes, shared state, and middleware.
//!
//! See `README.md` for quickstart and endpoint overview.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pricewatch::api::{create_router, AppState};
use pricewatch::auth::SessionTable;
use pricewatch::catalog::sources::litres::LitresSource;
use pricewatch::catalog::sources::steam::SteamSource;
use pricewatch::catalog::sources::CatalogSource;
use pricewatch::catalog::Aggregator;
use pricewatch::config::AppConfig;
use pricewatch::metrics::Metrics;
use pricewatch::rates::RatesClient;
use pricewatch::wishlist::MemoryWishlist;

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PRICEWATCH_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PRICEWATCH_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pricewatch=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    // This enables PRICEWATCH_CONFIG_PATH / LITRES_SESSION_ID from .env.
    let _ = dotenvy::dotenv();

    // Initialize dev tracing early (no-op in production).
    enable_dev_tracing();

    let cfg = AppConfig::load_default().expect("Failed to load configuration");

    let steam = SteamSource::new(cfg.steam.clone()).expect("Failed to build steam client");
    let litres = LitresSource::new(cfg.litres.clone()).expect("Failed to build litres client");
    let sources: Vec<Arc<dyn CatalogSource>> = vec![Arc::new(steam), Arc::new(litres)];

    // Prometheus recorder first, so every later series lands in it.
    let metrics = Metrics::init(sources.len());

    let state = AppState {
        aggregator: Arc::new(Aggregator::new(sources, cfg.aggregator.max_items)),
        rates: Arc::new(RatesClient::new(cfg.rates.clone()).expect("Failed to build rates client")),
        wishlist: Arc::new(MemoryWishlist::new()),
        identity: Arc::new(SessionTable::new()),
    };

    let router = create_router(state).merge(metrics.router());
    Ok(router.into())
}
