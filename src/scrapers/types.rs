use serde::{Deserialize, Serialize};

fn default_year() -> String {
    "2025".to_string()
}

/// Search parameters for a vehicle listing scrape
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchParams {
    /// Model/version text, e.g. "Corolla XEI"
    #[serde(default)]
    pub version: String,
    /// Model year, kept as text as it is only ever spliced into the URL
    #[serde(default = "default_year")]
    pub year: String,
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            version: String::new(),
            year: default_year(),
        }
    }
}

impl SearchParams {
    pub fn new(version: impl Into<String>, year: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            year: year.into(),
        }
    }

    /// Free-text query sent to the marketplace
    pub fn query(&self) -> String {
        format!("{} {}", self.version, self.year)
    }

    /// URL path segment for the query
    pub fn slug(&self) -> String {
        self.query().replace(' ', "-")
    }

    /// URL of the first results page under `base_url`
    pub fn base_url(&self, base_url: &str) -> String {
        format!("{}{}", base_url, self.slug())
    }

    /// URL of a results page given how many items were already seen
    pub fn page_url(&self, base_url: &str, offset: usize) -> String {
        let base = self.base_url(base_url);
        if offset == 0 {
            base
        } else {
            format!("{}_Desde_{}", base, offset + 1)
        }
    }
}
