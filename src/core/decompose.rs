//! Turns one catalog page into listing records.

use crate::core::document::{element_text, parse_selector};
use crate::core::extract::{parse_km, parse_location, parse_price};
use crate::core::year::YearResolver;
use crate::domain::model::{ListingRecord, ScrapeConfig, YearSource};
use crate::domain::ports::{Fetcher, ScrapeObserver};
use crate::utils::error::Result;
use scraper::{ElementRef, Html, Selector};
use url::Url;

const SNIPPET_CHARS: usize = 60;

/// A piece of a page believed to hold one listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    pub link: Option<String>,
}

/// Case-insensitive brand/model match; the model also ignores whitespace.
#[derive(Debug, Clone)]
pub struct ListingFilter {
    brand: String,
    model: String,
}

fn compact(s: &str) -> String {
    s.chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

impl ListingFilter {
    pub fn new(brand: &str, model: &str) -> Self {
        Self {
            brand: brand.trim().to_lowercase(),
            model: compact(model),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        let brand_ok = self.brand.is_empty() || text.to_lowercase().contains(&self.brand);
        let model_ok = self.model.is_empty() || compact(text).contains(&self.model);
        brand_ok && model_ok
    }
}

pub struct ListingDecomposer {
    fragment_selectors: Vec<Selector>,
    link_selector: Selector,
    resolver: YearResolver,
    filter: ListingFilter,
    brand: String,
    model: String,
    verify_detail_year: bool,
}

impl ListingDecomposer {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let fragment_selectors = config
            .catalog
            .fragment_selectors
            .iter()
            .map(|s| parse_selector(s))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fragment_selectors,
            link_selector: parse_selector("a[href]")?,
            resolver: YearResolver::new(&config.year_terms, &config.catalog.detail_selectors)?,
            filter: ListingFilter::new(&config.brand, &config.model),
            brand: config.brand.clone(),
            model: config.model.clone(),
            verify_detail_year: config.verify_detail_year,
        })
    }

    fn fragment(&self, element: ElementRef<'_>, base: Option<&Url>) -> Fragment {
        let link = element
            .select(&self.link_selector)
            .filter_map(|a| a.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(|href| match base.and_then(|b| b.join(href).ok()) {
                Some(resolved) => resolved.to_string(),
                None => href.to_string(),
            });

        Fragment {
            text: element_text(element),
            link,
        }
    }

    /// Splits a page with the first fragment selector that matches anything;
    /// the whole page is one fragment when none does.
    pub fn fragments(&self, body: &str, page_url: &str) -> Vec<Fragment> {
        let document = Html::parse_document(body);
        let base = Url::parse(page_url).ok();

        self.fragment_selectors
            .iter()
            .map(|selector| {
                document
                    .select(selector)
                    .map(|el| self.fragment(el, base.as_ref()))
                    .collect::<Vec<_>>()
            })
            .find(|fragments| !fragments.is_empty())
            .unwrap_or_else(|| vec![self.fragment(document.root_element(), base.as_ref())])
    }

    /// Records for every acceptable fragment of `body`, in document order.
    ///
    /// May fetch detail pages; a failed detail fetch only costs that listing.
    pub async fn decompose<F: Fetcher>(
        &self,
        page_url: &str,
        body: &str,
        fetcher: &F,
        observer: &dyn ScrapeObserver,
    ) -> Vec<ListingRecord> {
        let mut records = Vec::new();

        for fragment in self.fragments(body, page_url) {
            if !self.filter.matches(&fragment.text) {
                observer.on_log(&format!(
                    "Skipped fragment: no brand/model match in '{}'",
                    snippet(&fragment.text)
                ));
                continue;
            }
            let Some(price) = parse_price(&fragment.text) else {
                observer.on_log(&format!(
                    "Skipped fragment: no price in '{}'",
                    snippet(&fragment.text)
                ));
                continue;
            };

            let mut resolved = self
                .resolver
                .resolve_inline(&fragment.text)
                .map(|year| (year, YearSource::Card));

            if resolved.is_none() && self.verify_detail_year {
                if let Some(link) = &fragment.link {
                    resolved = self
                        .detail_year(link, fetcher, observer)
                        .await
                        .map(|year| (year, YearSource::Detail));
                }
            }

            let Some((year, year_source)) = resolved else {
                observer.on_log("Skipped listing: no year on card or detail page");
                continue;
            };

            let source_url = fragment.link.unwrap_or_else(|| page_url.to_string());
            observer.on_log(&format!(
                "OK year={} [{}] price={} url={}",
                year, year_source, price, source_url
            ));

            records.push(ListingRecord {
                brand: self.brand.clone(),
                model: self.model.clone(),
                year,
                price_eur: price,
                km: parse_km(&fragment.text),
                location: parse_location(&fragment.text),
                source_url,
                year_source,
            });
        }

        records
    }

    async fn detail_year<F: Fetcher>(
        &self,
        link: &str,
        fetcher: &F,
        observer: &dyn ScrapeObserver,
    ) -> Option<i32> {
        match fetcher.fetch(link).await {
            Ok(body) => self.resolver.resolve_detail_page(&body),
            Err(e) => {
                observer.on_log(&format!("Detail page unavailable, {}", e));
                None
            }
        }
    }
}

/// First characters of a fragment, enough to recognise it in a log line.
fn snippet(text: &str) -> &str {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((i, _)) => &text[..i],
        None => text,
    }
}
