use crate::models::ListingRecord;
use crate::scrapers::types::SearchParams;
use anyhow::Result;
use async_trait::async_trait;

/// Common trait for listing scrapers
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Scrape every listing for the given search, in page order
    async fn scrape(&self, params: &SearchParams) -> Result<Vec<ListingRecord>>;

    /// Get the name of the scraper source
    fn source_name(&self) -> &'static str;
}

/// Provider of the USD → ARS conversion rate.
///
/// Never fails: implementations absorb errors and return a fallback rate.
#[async_trait]
pub trait RateSource: Send + Sync {
    async fn fetch_rate(&self) -> f64;
}
