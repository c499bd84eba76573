use crate::config::{AppConfig, USER_AGENT};
use crate::models::ListingRecord;
use crate::scrapers::traits::ListingSource;
use crate::scrapers::types::SearchParams;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, warn};

fn selector(css: &'static str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("Invalid selector {}: {}", css, e))
}

/// Parsed CSS selectors for the search results markup
struct ListingSelectors {
    item: Selector,
    content: Selector,
    title_link: Selector,
    seller: Selector,
    price: Selector,
    attributes: Selector,
    location: Selector,
}

impl ListingSelectors {
    fn new() -> Result<Self> {
        Ok(Self {
            item: selector("li.ui-search-layout__item")?,
            content: selector("div.poly-card__content")?,
            title_link: selector("h3.poly-component__title-wrapper a")?,
            seller: selector("span.poly-component__seller")?,
            price: selector("div.poly-component__price")?,
            attributes: selector(
                "div.poly-component__attributes-list ul.poly-attributes_list li",
            )?,
            location: selector("span.poly-component__location")?,
        })
    }
}

/// One results page after parsing
#[derive(Debug, Default)]
pub struct ListingPage {
    /// Listing items on the page, including ones that could not be parsed
    pub item_count: usize,
    pub records: Vec<ListingRecord>,
}

/// MercadoLibre Argentina vehicle search scraper
pub struct MercadoLibreScraper {
    client: Client,
    base_url: String,
    max_pages: usize,
    page_delay: Duration,
    selectors: ListingSelectors,
}

impl MercadoLibreScraper {
    pub fn new(config: &AppConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.page_timeout)
            .user_agent(USER_AGENT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: config.search_base_url.clone(),
            max_pages: config.max_pages,
            page_delay: config.page_delay,
            selectors: ListingSelectors::new()?,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch results page")?;

        if !response.status().is_success() {
            anyhow::bail!("Results page returned status: {}", response.status());
        }

        response.text().await.context("Failed to read response body")
    }

    /// Parse every listing item of a results page, skipping items without a card body
    pub fn parse_listing_page(&self, html: &str) -> ListingPage {
        let document = Html::parse_document(html);
        let items: Vec<_> = document.select(&self.selectors.item).collect();

        let mut records = Vec::with_capacity(items.len());
        for (idx, item) in items.iter().enumerate() {
            match self.parse_item(*item) {
                Some(record) => records.push(record),
                None => debug!("Skipped listing item {}: no card content", idx),
            }
        }

        ListingPage {
            item_count: items.len(),
            records,
        }
    }

    fn parse_item(&self, item: ElementRef) -> Option<ListingRecord> {
        let s = &self.selectors;
        let content = item.select(&s.content).next()?;

        let mut record = ListingRecord::default();

        if let Some(anchor) = content.select(&s.title_link).next() {
            record.title = element_text(anchor);
            if let Some(href) = anchor.value().attr("href") {
                record.link = href.to_string();
            }
        }

        if let Some(seller) = content.select(&s.seller).next() {
            record.seller = element_text(seller);
        }

        if let Some(price) = content.select(&s.price).next() {
            let price_text = spaced_text(price);
            record.raw_price = parse_price(&price_text);
            record.is_usd = is_usd(&price_text);
        }

        let attributes: Vec<_> = content.select(&s.attributes).collect();
        if let Some(model) = attributes.first() {
            record.model = element_text(*model);
        }
        if let Some(km) = attributes.get(1) {
            record.km = parse_km(&element_text(*km));
        }

        if let Some(location) = content.select(&s.location).next() {
            record.location = element_text(location);
        }

        Some(record)
    }
}

#[async_trait]
impl ListingSource for MercadoLibreScraper {
    async fn scrape(&self, params: &SearchParams) -> Result<Vec<ListingRecord>> {
        info!("Starting MercadoLibre scrape for {:?}", params.query());

        let mut records: Vec<ListingRecord> = Vec::new();
        let mut offset = 0;
        let mut previous_page: Vec<ListingRecord> = Vec::new();
        let mut page = 1;

        loop {
            if page > self.max_pages {
                warn!("Stopping after {} pages (page cap reached)", self.max_pages);
                break;
            }

            let url = params.page_url(&self.base_url, offset);
            debug!("Fetching page {}: {}", page, url);

            let html = match self.fetch_page(&url).await {
                Ok(html) => html,
                Err(e) => {
                    info!("Pagination ended at page {}: {:#}", page, e);
                    break;
                }
            };

            let parsed = self.parse_listing_page(&html);
            if parsed.item_count == 0 {
                debug!("Page {} has no listings", page);
                break;
            }

            // Whole records, not just links: degraded cards all share the "#" link
            if !parsed.records.is_empty() && parsed.records == previous_page {
                warn!("Page {} repeats the previous page, stopping pagination", page);
                break;
            }

            if parsed.records.is_empty() {
                warn!(
                    "Page {} had {} listing items but none could be parsed",
                    page, parsed.item_count
                );
            }

            debug!(
                "Page {}: {} items, {} records",
                page,
                parsed.item_count,
                parsed.records.len()
            );

            offset += parsed.item_count;
            records.extend(parsed.records.iter().cloned());
            previous_page = parsed.records;
            page += 1;

            if !self.page_delay.is_zero() {
                tokio::time::sleep(self.page_delay).await;
            }
        }

        info!("Scraped {} listings from {} pages", records.len(), page - 1);
        Ok(records)
    }

    fn source_name(&self) -> &'static str {
        "MercadoLibre"
    }
}

fn element_text(el: ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Text nodes trimmed and joined by single spaces
fn spaced_text(el: ElementRef) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_price_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == ','
}

/// Integer amount of a printed price: first run of digits and separators,
/// `.` thousands separators removed, `,` decimals truncated. Zero when unparsable.
pub fn parse_price(text: &str) -> u64 {
    let run: String = text
        .chars()
        .skip_while(|c| !is_price_char(*c))
        .take_while(|c| is_price_char(*c))
        .collect();

    let digits = run.split(',').next().unwrap_or_default().replace('.', "");
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return 0;
    }
    digits.parse().unwrap_or(0)
}

pub fn is_usd(price_text: &str) -> bool {
    price_text.contains("U$S") || price_text.contains("US$")
}

/// Kilometers from text like "45.000 Km"
pub fn parse_km(text: &str) -> u64 {
    text.chars()
        .filter(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .unwrap_or(0)
}
