use crate::core::decompose::ListingDecomposer;
use crate::core::pagination::PageDiscoverer;
use crate::domain::model::{ListingRecord, ScrapeConfig};
use crate::domain::ports::{Fetcher, ScrapeObserver};
use crate::utils::error::Result;

/// Forwards scrape notifications to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ScrapeObserver for TracingObserver {
    fn on_progress(&self, pages_done: usize, pages_total: usize) {
        tracing::debug!("Progress {}/{}", pages_done, pages_total);
    }

    fn on_log(&self, message: &str) {
        tracing::info!("{}", message);
    }
}

/// Visits every discovered page in order and collects the raw records.
///
/// A page that cannot be fetched is logged and contributes nothing; the
/// remaining pages are still visited.
pub async fn scrape_listings<F: Fetcher>(
    config: &ScrapeConfig,
    fetcher: &F,
    observer: &dyn ScrapeObserver,
) -> Result<Vec<ListingRecord>> {
    let discoverer = PageDiscoverer::new(config)?;
    let decomposer = ListingDecomposer::new(config)?;

    let pages = discoverer.discover(fetcher, observer).await;
    let total = pages.len();
    let mut records = Vec::new();

    for (i, page_url) in pages.iter().enumerate() {
        let n = i + 1;
        observer.on_log(&format!("Page {}/{}: {}", n, total, page_url));

        match fetcher.fetch(page_url).await {
            Ok(body) => {
                let found = decomposer
                    .decompose(page_url, &body, fetcher, observer)
                    .await;
                tracing::debug!("{} listings accepted on page {}", found.len(), n);
                records.extend(found);
            }
            Err(e) => observer.on_log(&format!("Page {}/{} skipped: {}", n, total, e)),
        }

        observer.on_progress(n, total);
        if n < total {
            tokio::time::sleep(config.delay).await;
        }
    }

    Ok(records)
}
