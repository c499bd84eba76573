use crate::config::{AppConfig, USER_AGENT};
use crate::scrapers::traits::RateSource;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

const SELL_RATE_SELECTOR: &str = "span.value.sell";

/// Reads the official USD sell rate from Banco de la Nación's home page
pub struct BnaRateFetcher {
    client: Client,
    url: String,
    fallback: f64,
    timeout: Duration,
}

impl BnaRateFetcher {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            url: config.rate_url.clone(),
            fallback: config.fallback_rate,
            timeout: config.rate_timeout,
        })
    }

    async fn fetch_live_rate(&self) -> Result<f64> {
        debug!("Fetching exchange rate from {}", self.url);

        let response = self
            .client
            .get(&self.url)
            .timeout(self.timeout)
            .send()
            .await
            .context("Failed to fetch exchange rate page")?;

        if !response.status().is_success() {
            anyhow::bail!("Exchange rate page returned status: {}", response.status());
        }

        let html = response.text().await.context("Failed to read response body")?;
        parse_rate(&html)
    }
}

#[async_trait]
impl RateSource for BnaRateFetcher {
    async fn fetch_rate(&self) -> f64 {
        match self.fetch_live_rate().await {
            Ok(rate) => {
                info!("Official USD rate: {}", rate);
                rate
            }
            Err(e) => {
                warn!("Using fallback USD rate {}: {:#}", self.fallback, e);
                self.fallback
            }
        }
    }
}

/// Extract the sell rate from the page, e.g. `1.234,50` → `1234.5`
pub fn parse_rate(html: &str) -> Result<f64> {
    let selector = Selector::parse(SELL_RATE_SELECTOR)
        .map_err(|e| anyhow!("Invalid selector {}: {}", SELL_RATE_SELECTOR, e))?;
    let document = Html::parse_document(html);

    let text = document
        .select(&selector)
        .next()
        .map(|el| el.text().collect::<String>())
        .context("Sell rate element not found")?;

    let normalized = text.trim().replace('.', "").replace(',', ".");
    let rate: f64 = normalized
        .parse()
        .with_context(|| format!("Unparsable rate text {:?}", text.trim()))?;

    if !rate.is_finite() || rate <= 0.0 {
        anyhow::bail!("Rate out of range: {}", rate);
    }
    Ok(rate)
}
