//! Works out which catalog pages a run should visit.
//!
//! The first page usually links to its siblings (`/pagina-N`), which gives the
//! page count for free. When it does not, or cannot be read, pages are probed
//! one at a time until one is missing or no longer lists anything.

use crate::core::document::{document_text, parse_selector};
use crate::core::extract::has_listings;
use crate::domain::model::ScrapeConfig;
use crate::domain::ports::{Fetcher, ScrapeObserver};
use crate::utils::error::{FetchError, ReportError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::BTreeSet;

pub struct PageDiscoverer {
    config: ScrapeConfig,
    page_index_re: Regex,
    link_selector: Selector,
}

impl PageDiscoverer {
    pub fn new(config: &ScrapeConfig) -> Result<Self> {
        let pattern = format!(r"/{}(\d+)", regex::escape(&config.catalog.page_segment));
        let page_index_re =
            Regex::new(&pattern).map_err(|e| ReportError::ConfigValidationError {
                field: "catalog.page_segment".to_string(),
                message: e.to_string(),
            })?;

        Ok(Self {
            config: config.clone(),
            page_index_re,
            link_selector: parse_selector("a[href]")?,
        })
    }

    fn base_url(&self) -> &str {
        self.config.search_url.trim_end_matches('/')
    }

    fn page_url(&self, index: usize) -> String {
        self.config.catalog.page_url(self.base_url(), index)
    }

    /// Distinct page indices linked from `body`.
    pub fn declared_indices(&self, body: &str) -> BTreeSet<usize> {
        let document = Html::parse_document(body);
        document
            .select(&self.link_selector)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| self.page_index_re.captures(href))
            .filter_map(|caps| caps[1].parse().ok())
            .collect()
    }

    fn page_has_listings(&self, body: &str) -> bool {
        let text = document_text(&Html::parse_document(body));
        has_listings(&text, &self.config.catalog.listing_markers)
    }

    /// Ordered page URLs, always starting with the search URL itself.
    pub async fn discover<F: Fetcher>(
        &self,
        fetcher: &F,
        observer: &dyn ScrapeObserver,
    ) -> Vec<String> {
        let cap = self.config.max_pages;
        let mut pages = vec![self.base_url().to_string()];

        match fetcher.fetch(&self.config.search_url).await {
            Ok(body) => {
                if let Some(&highest) = self.declared_indices(&body).last() {
                    tracing::debug!("First page links up to page {}", highest);
                    pages.extend((2..=highest.min(cap)).map(|i| self.page_url(i)));
                    return pages;
                }
                observer.on_log("No pagination links on the first page, probing pages in turn");
            }
            Err(e) => {
                observer.on_log(&format!(
                    "Could not estimate pagination ({}), probing pages in turn",
                    e
                ));
            }
        }

        for index in 2..=cap {
            tokio::time::sleep(self.config.delay).await;

            let url = self.page_url(index);
            match fetcher.fetch(&url).await {
                Ok(body) => {
                    if !self.page_has_listings(&body) {
                        tracing::debug!("Page {} shows no listings, probing stops", index);
                        break;
                    }
                    pages.push(url);
                }
                Err(e) if e.is_not_found() => {
                    tracing::debug!("Page {} not found, probing stops", index);
                    break;
                }
                Err(e @ FetchError::Status { .. }) => {
                    observer.on_log(&format!("Skipping page {} while probing: {}", index, e));
                }
                Err(e @ FetchError::Transport { .. }) => {
                    observer.on_log(&format!("Probing stopped at page {}: {}", index, e));
                    break;
                }
            }
        }

        pages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{RecordingObserver, StaticFetcher};
    use std::time::Duration;

    const BASE: &str = "https://www.moto.it/moto-usate/honda/cbr-650-r";

    fn config(max_pages: usize) -> ScrapeConfig {
        ScrapeConfig::new(BASE)
            .with_max_pages(max_pages)
            .with_delay(Duration::ZERO)
    }

    fn page(index: usize) -> String {
        format!("{}/pagina-{}", BASE, index)
    }

    fn linked_first_page(up_to: usize) -> String {
        let links: String = (2..=up_to)
            .map(|i| format!(r#"<a href="/moto-usate/honda/cbr-650-r/pagina-{}">{}</a>"#, i, i))
            .collect();
        format!("<html><body>42 annunci {}</body></html>", links)
    }

    #[test]
    fn test_declared_indices() {
        let discoverer = PageDiscoverer::new(&config(5)).unwrap();
        let body = r#"
            <a href="/x/pagina-3">3</a>
            <a href="/x/pagina-3">3 again</a>
            <a href="https://www.moto.it/x/pagina-12?sort=price">12</a>
            <a href="/x/paginazione">no</a>
            <a>no href</a>
        "#;
        let indices: Vec<usize> = discoverer.declared_indices(body).into_iter().collect();
        assert_eq!(indices, vec![3, 12]);
    }

    #[tokio::test]
    async fn test_declared_pagination_is_capped() {
        let fetcher = StaticFetcher::new().with_page(BASE, &linked_first_page(7));
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(5)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string(), page(2), page(3), page(4), page(5)]);
        assert_eq!(fetcher.requested(), vec![BASE.to_string()]);
    }

    #[tokio::test]
    async fn test_declared_pagination_below_cap() {
        let fetcher = StaticFetcher::new().with_page(BASE, &linked_first_page(3));
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(12)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages.len(), 3);
    }

    #[tokio::test]
    async fn test_probing_stops_on_not_found() {
        let fetcher = StaticFetcher::new().with_page(BASE, "<p>annunci senza link</p>");
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(3)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string()]);
        assert_eq!(fetcher.requested(), vec![BASE.to_string(), page(2)]);
    }

    #[tokio::test]
    async fn test_probing_after_first_page_failure() {
        let fetcher = StaticFetcher::new()
            .with_status(BASE, 503)
            .with_page(&page(2), "<p>Prezzo 5.000 €</p>")
            .with_page(&page(3), "<p>Nessun risultato</p>")
            .with_page(&page(4), "<p>Prezzo 6.000 €</p>");
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(6)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string(), page(2)]);
        assert!(observer.logs()[0].starts_with("Could not estimate pagination"));
    }

    #[tokio::test]
    async fn test_probing_skips_server_errors() {
        let fetcher = StaticFetcher::new()
            .with_page(BASE, "<p>annunci</p>")
            .with_status(&page(2), 502)
            .with_page(&page(3), "<p>annunci</p>");
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(4)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string(), page(3)]);
        assert_eq!(fetcher.requested().len(), 4);
    }

    #[tokio::test]
    async fn test_probing_halts_on_transport_error() {
        let fetcher = StaticFetcher::new()
            .with_page(BASE, "<p>annunci</p>")
            .with_page(&page(2), "<p>annunci</p>")
            .with_transport_error(&page(3))
            .with_page(&page(4), "<p>annunci</p>");
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(5)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string(), page(2)]);
        assert!(observer
            .logs()
            .iter()
            .any(|l| l.starts_with("Probing stopped at page 3")));
    }

    #[tokio::test]
    async fn test_single_page_cap_never_probes() {
        let fetcher = StaticFetcher::new().with_page(BASE, "<p>annunci</p>");
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&config(1)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string()]);
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_base_url_trailing_slash_is_trimmed() {
        let base = format!("{}/", BASE);
        let fetcher = StaticFetcher::new().with_page(&base, &linked_first_page(2));
        let observer = RecordingObserver::default();
        let discoverer = PageDiscoverer::new(&ScrapeConfig::new(&base)).unwrap();

        let pages = discoverer.discover(&fetcher, &observer).await;

        assert_eq!(pages, vec![BASE.to_string(), page(2)]);
    }
}
