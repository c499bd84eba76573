pub mod exchange;
pub mod mercadolibre;
pub mod traits;
pub mod types;

pub use exchange::BnaRateFetcher;
pub use mercadolibre::MercadoLibreScraper;
pub use traits::{ListingSource, RateSource};
pub use types::SearchParams;
