use serde::{Deserialize, Serialize};

/// One scraped vehicle listing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    #[serde(rename = "titulo")]
    pub title: String,
    pub link: String,
    #[serde(rename = "vendedor")]
    pub seller: String,
    /// Price as printed, in whatever currency the listing uses
    #[serde(rename = "bruto")]
    pub raw_price: u64,
    #[serde(rename = "es_usd")]
    pub is_usd: bool,
    #[serde(rename = "modelo")]
    pub model: String,
    /// Mileage in kilometers
    pub km: u64,
    #[serde(rename = "ubic")]
    pub location: String,
    /// Price in ARS, filled in by the aggregator once the exchange rate is known
    #[serde(rename = "precio_ars", default)]
    pub local_price: f64,
}

impl Default for ListingRecord {
    fn default() -> Self {
        Self {
            title: "N/D".to_string(),
            link: "#".to_string(),
            seller: String::new(),
            raw_price: 0,
            is_usd: false,
            model: String::new(),
            km: 0,
            location: String::new(),
            local_price: 0.0,
        }
    }
}

impl ListingRecord {
    /// Price converted to ARS with the given USD rate
    pub fn price_in_local(&self, rate: f64) -> f64 {
        if self.is_usd {
            self.raw_price as f64 * rate
        } else {
            self.raw_price as f64
        }
    }
}

/// Aggregated response of a search
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    #[serde(rename = "datos")]
    pub listings: Vec<ListingRecord>,
    #[serde(rename = "promedio")]
    pub average_price: i64,
    pub price_min: f64,
    pub price_max: f64,
    pub km_min: u64,
    pub km_max: u64,
}
