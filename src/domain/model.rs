use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";
pub const DEFAULT_ACCEPT_LANGUAGE: &str = "it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7";
pub const DEFAULT_MAX_PAGES: usize = 12;
pub const DEFAULT_DELAY_SECS: f64 = 1.0;

/// Pause of `secs` seconds; out-of-range input saturates instead of panicking.
pub fn delay_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(if secs > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

pub fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("User-Agent".to_string(), DEFAULT_USER_AGENT.to_string()),
        (
            "Accept-Language".to_string(),
            DEFAULT_ACCEPT_LANGUAGE.to_string(),
        ),
    ])
}

/// Site-specific structure of the catalog being scraped.
///
/// Everything here is data about one catalog's markup and URL scheme; the
/// defaults match the moto.it used-bike listings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogProfile {
    /// Root used to derive a search URL from brand and model.
    pub catalog_root: String,
    /// Path segment prefix of numbered pages, `{base}/{page_segment}{n}`.
    pub page_segment: String,
    /// Any of these in a page's text counts as evidence of listings.
    pub listing_markers: Vec<String>,
    /// Tried in order; the first selector matching anything splits the page.
    pub fragment_selectors: Vec<String>,
    /// Containers on a detail page that usually hold the technical data.
    pub detail_selectors: Vec<String>,
}

impl Default for CatalogProfile {
    fn default() -> Self {
        Self {
            catalog_root: "https://www.moto.it/moto-usate".to_string(),
            page_segment: "pagina-".to_string(),
            listing_markers: ["annunci", "Prezzo", "km", "usate"]
                .map(String::from)
                .to_vec(),
            fragment_selectors: [
                "article",
                "li",
                "div.card",
                "div.result",
                "div.list-item",
                "div[class*='Listing']",
                "div[class*='Result']",
            ]
            .map(String::from)
            .to_vec(),
            detail_selectors: [
                "dl",
                ".scheda",
                ".specifiche",
                ".dati-tecnici",
                ".vehicle-specs",
                "table",
                "ul",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

impl CatalogProfile {
    /// `{root}/{brand}/{model}` with each part lower-cased and spaces turned into dashes.
    pub fn search_url(&self, brand: &str, model: &str) -> String {
        fn slug(s: &str) -> String {
            s.split_whitespace()
                .collect::<Vec<_>>()
                .join("-")
                .to_lowercase()
        }
        format!(
            "{}/{}/{}",
            self.catalog_root.trim_end_matches('/'),
            slug(brand),
            slug(model)
        )
    }

    pub fn page_url(&self, base_url: &str, index: usize) -> String {
        format!(
            "{}/{}{}",
            base_url.trim_end_matches('/'),
            self.page_segment,
            index
        )
    }
}

/// Label and negative-context vocabularies used by year resolution.
///
/// The defaults are Italian and tuned to one catalog's phrasing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YearTerms {
    pub labels: Vec<String>,
    pub negatives: Vec<String>,
}

impl Default for YearTerms {
    fn default() -> Self {
        Self {
            labels: [
                "anno",
                "immatricolazione",
                "immatricolata",
                "prima immatricolazione",
                "mese/anno",
            ]
            .map(String::from)
            .to_vec(),
            negatives: [
                "aggiornato",
                "pubblicato",
                "garanzia",
                "fino al",
                "tagliando",
                "revisione",
                "bollo",
                "promo",
                "copyright",
                "©",
            ]
            .map(String::from)
            .to_vec(),
        }
    }
}

/// Parameters of one scrape run. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    pub search_url: String,
    pub brand: String,
    pub model: String,
    pub delay: Duration,
    pub max_pages: usize,
    pub verify_detail_year: bool,
    pub headers: BTreeMap<String, String>,
    pub catalog: CatalogProfile,
    pub year_terms: YearTerms,
}

impl ScrapeConfig {
    pub fn new(search_url: &str) -> Self {
        Self {
            search_url: search_url.to_string(),
            brand: String::new(),
            model: String::new(),
            delay: Duration::from_secs_f64(DEFAULT_DELAY_SECS),
            max_pages: DEFAULT_MAX_PAGES,
            verify_detail_year: true,
            headers: default_headers(),
            catalog: CatalogProfile::default(),
            year_terms: YearTerms::default(),
        }
    }

    pub fn with_filters(mut self, brand: &str, model: &str) -> Self {
        brand.trim().clone_into(&mut self.brand);
        model.trim().clone_into(&mut self.model);
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Clamped to at least one page: the search page itself is always visited.
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn with_detail_verification(mut self, enabled: bool) -> Self {
        self.verify_detail_year = enabled;
        self
    }

    pub fn with_header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_catalog(mut self, catalog: CatalogProfile) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_year_terms(mut self, year_terms: YearTerms) -> Self {
        self.year_terms = year_terms;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum YearSource {
    Card,
    Detail,
}

impl YearSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            YearSource::Card => "card",
            YearSource::Detail => "detail",
        }
    }
}

impl fmt::Display for YearSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted listing. Field order matches the exported column order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingRecord {
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price_eur: u64,
    pub km: Option<u64>,
    pub location: Option<String>,
    pub source_url: String,
    #[serde(skip, default = "card_source")]
    pub year_source: YearSource,
}

fn card_source() -> YearSource {
    YearSource::Card
}

/// Deduplicated listings in (year, price) order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dataset {
    records: Vec<ListingRecord>,
}

impl Dataset {
    pub(crate) fn from_sorted(records: Vec<ListingRecord>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &[ListingRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_records(self) -> Vec<ListingRecord> {
        self.records
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearlyStats {
    pub year: i32,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceExtremes {
    pub cheapest_year: i32,
    pub cheapest_mean: u64,
    pub priciest_year: i32,
    pub priciest_mean: u64,
}

/// Output of the transform phase, ready for the exporters.
#[derive(Debug, Clone)]
pub struct ReportData {
    pub dataset: Dataset,
    pub yearly_stats: Vec<YearlyStats>,
    pub extremes: Option<PriceExtremes>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Written { files: Vec<String>, records: usize },
    NothingFound,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_from_filters() {
        let catalog = CatalogProfile::default();
        assert_eq!(
            catalog.search_url(" Honda ", "CBR  650 R"),
            "https://www.moto.it/moto-usate/honda/cbr-650-r"
        );
    }

    #[test]
    fn test_page_url_trims_trailing_slash() {
        let catalog = CatalogProfile::default();
        assert_eq!(
            catalog.page_url("https://www.moto.it/moto-usate/honda/", 3),
            "https://www.moto.it/moto-usate/honda/pagina-3"
        );
    }

    #[test]
    fn test_scrape_config_keeps_at_least_one_page() {
        let config = ScrapeConfig::new("https://example.com").with_max_pages(0);
        assert_eq!(config.max_pages, 1);
        assert!(config.verify_detail_year);
        assert!(config.headers.contains_key("User-Agent"));
    }
}
