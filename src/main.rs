mod aggregator;
mod config;
mod error;
mod export;
mod models;
mod routes;
mod scrapers;
#[cfg(test)]
mod test_support;

use anyhow::Context;
use config::AppConfig;
use routes::AppState;
use scrapers::{BnaRateFetcher, ListingSource, MercadoLibreScraper};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("🚗 Autos Scout - MercadoLibre vehicle search");
    info!("==========================================");

    let config = AppConfig::from_env();

    let scraper = MercadoLibreScraper::new(&config)?;
    let rates = BnaRateFetcher::new(&config)?;
    info!(
        "Scraping {} at {} (max {} pages)",
        scraper.source_name(),
        config.search_base_url,
        config.max_pages
    );
    info!("Exchange rate from {} (fallback {})", config.rate_url, config.fallback_rate);

    let state = AppState {
        listings: Arc::new(scraper),
        rates: Arc::new(rates),
    };
    let app = routes::router(state);

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    info!("✅ Listening on http://{}", config.listen_addr);

    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
