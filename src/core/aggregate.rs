//! Deduplication, ordering and per-year statistics.

use crate::domain::model::{Dataset, ListingRecord, PriceExtremes, YearlyStats};
use std::collections::{BTreeMap, HashSet};

type RecordKey = (
    String,
    String,
    i32,
    u64,
    Option<u64>,
    Option<String>,
    String,
);

/// Identity of a record for deduplication. The year source is diagnostic and
/// does not take part.
fn record_key(r: &ListingRecord) -> RecordKey {
    (
        r.brand.clone(),
        r.model.clone(),
        r.year,
        r.price_eur,
        r.km,
        r.location.clone(),
        r.source_url.clone(),
    )
}

/// Drops exact duplicates (first occurrence kept), then sorts by year and
/// price. The sort is stable, so equal keys keep their scrape order.
pub fn build_dataset(records: Vec<ListingRecord>) -> Dataset {
    let mut seen = HashSet::new();
    let mut unique: Vec<ListingRecord> = records
        .into_iter()
        .filter(|r| seen.insert(record_key(r)))
        .collect();
    unique.sort_by_key(|r| (r.year, r.price_eur));

    Dataset::from_sorted(unique)
}

fn median(sorted: &[u64]) -> f64 {
    let n = sorted.len();
    if n % 2 == 1 {
        sorted[n / 2] as f64
    } else {
        (sorted[n / 2 - 1] as f64 + sorted[n / 2] as f64) / 2.0
    }
}

/// One entry per year present in the dataset, in ascending year order.
pub fn yearly_stats(dataset: &Dataset) -> Vec<YearlyStats> {
    let mut by_year: BTreeMap<i32, Vec<u64>> = BTreeMap::new();
    for record in dataset.records() {
        by_year.entry(record.year).or_default().push(record.price_eur);
    }

    by_year
        .into_iter()
        .map(|(year, mut prices)| {
            prices.sort_unstable();
            let count = prices.len();
            let total: u128 = prices.iter().map(|&p| u128::from(p)).sum();
            YearlyStats {
                year,
                count,
                mean: total as f64 / count as f64,
                median: median(&prices),
                min: prices[0],
                max: prices[count - 1],
            }
        })
        .collect()
}

/// Years with the lowest and highest mean price; the earlier year wins ties.
pub fn price_extremes(stats: &[YearlyStats]) -> Option<PriceExtremes> {
    let first = stats.first()?;
    let mut cheapest = first;
    let mut priciest = first;
    for s in &stats[1..] {
        if s.mean < cheapest.mean {
            cheapest = s;
        }
        if s.mean > priciest.mean {
            priciest = s;
        }
    }

    Some(PriceExtremes {
        cheapest_year: cheapest.year,
        cheapest_mean: cheapest.mean.round() as u64,
        priciest_year: priciest.year,
        priciest_mean: priciest.mean.round() as u64,
    })
}
