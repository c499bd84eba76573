use crate::models::{ListingRecord, SearchResult};

/// Fill in ARS prices and compute the search summary.
///
/// Every statistic is 0 for an empty input.
pub fn summarize(mut listings: Vec<ListingRecord>, rate: f64) -> SearchResult {
    for listing in &mut listings {
        listing.local_price = listing.price_in_local(rate);
    }

    let prices: Vec<f64> = listings.iter().map(|l| l.local_price).collect();
    let kms: Vec<u64> = listings.iter().map(|l| l.km).collect();

    let average_price = if prices.is_empty() {
        0
    } else {
        (prices.iter().sum::<f64>() / prices.len() as f64).round_ties_even() as i64
    };

    SearchResult {
        average_price,
        price_min: prices.iter().copied().reduce(f64::min).unwrap_or(0.0),
        price_max: prices.iter().copied().reduce(f64::max).unwrap_or(0.0),
        km_min: kms.iter().copied().min().unwrap_or(0),
        km_max: kms.iter().copied().max().unwrap_or(0),
        listings,
    }
}
