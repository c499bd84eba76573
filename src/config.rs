use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_SEARCH_BASE_URL: &str = "https://autos.mercadolibre.com.ar/";
pub const DEFAULT_RATE_URL: &str = "https://www.bna.com.ar/";
/// ARS per USD used when the live rate cannot be read
pub const FALLBACK_RATE: f64 = 1155.0;
pub const USER_AGENT: &str = "Mozilla/5.0";

/// Runtime configuration, read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub listen_addr: SocketAddr,
    pub search_base_url: String,
    pub rate_url: String,
    pub fallback_rate: f64,
    pub rate_timeout: Duration,
    pub page_timeout: Duration,
    /// Hard stop for the pagination loop
    pub max_pages: usize,
    pub page_delay: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 5001)),
            search_base_url: DEFAULT_SEARCH_BASE_URL.to_string(),
            rate_url: DEFAULT_RATE_URL.to_string(),
            fallback_rate: FALLBACK_RATE,
            rate_timeout: Duration::from_secs(5),
            page_timeout: Duration::from_secs(30),
            max_pages: 50,
            page_delay: Duration::ZERO,
        }
    }
}

impl AppConfig {
    /// Build the config from `AUTOS_*` environment variables, keeping defaults
    /// for anything unset or unparsable
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env_or("AUTOS_SCOUT_ADDR", defaults.listen_addr),
            search_base_url: env_or("AUTOS_SEARCH_BASE_URL", defaults.search_base_url),
            rate_url: env_or("AUTOS_RATE_URL", defaults.rate_url),
            fallback_rate: env_or("AUTOS_FALLBACK_RATE", defaults.fallback_rate),
            rate_timeout: Duration::from_secs(env_or(
                "AUTOS_RATE_TIMEOUT_SECS",
                defaults.rate_timeout.as_secs(),
            )),
            page_timeout: Duration::from_secs(env_or(
                "AUTOS_PAGE_TIMEOUT_SECS",
                defaults.page_timeout.as_secs(),
            )),
            max_pages: env_or("AUTOS_MAX_PAGES", defaults.max_pages),
            page_delay: Duration::from_millis(env_or(
                "AUTOS_PAGE_DELAY_MS",
                defaults.page_delay.as_millis() as u64,
            )),
        }
    }

    pub fn with_search_base_url(mut self, url: impl Into<String>) -> Self {
        self.search_base_url = url.into();
        self
    }

    pub fn with_rate_url(mut self, url: impl Into<String>) -> Self {
        self.rate_url = url.into();
        self
    }

    pub fn with_rate_timeout(mut self, timeout: Duration) -> Self {
        self.rate_timeout = timeout;
        self
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages;
        self
    }

    pub fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match std::env::var(key) {
        Ok(raw) => match raw.trim().parse() {
            Ok(value) => value,
            Err(_) => {
                warn!("Ignoring unparsable {}={:?}, using default", key, raw);
                default
            }
        },
        Err(_) => default,
    }
}
