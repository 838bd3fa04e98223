use crate::domain::model::{ListingRecord, ReportData, RunOutcome, ScrapeConfig};
use crate::utils::error::{FetchError, Result};
use async_trait::async_trait;
use std::path::PathBuf;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;

    /// Human-readable location of `path` inside this storage.
    fn locate(&self, path: &str) -> String;
}

/// Fetch capability: the body of `url`, or why it could not be had.
///
/// Non-success statuses must come back as [`FetchError::Status`].
pub trait Fetcher: Send + Sync {
    fn fetch(
        &self,
        url: &str,
    ) -> impl std::future::Future<Output = std::result::Result<String, FetchError>> + Send;
}

/// Fire-and-forget notifications from a running scrape.
pub trait ScrapeObserver: Send + Sync {
    fn on_progress(&self, pages_done: usize, pages_total: usize);
    fn on_log(&self, message: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub formats: Vec<String>,
    pub csv_filename: String,
    pub json_filename: String,
    pub html_filename: String,
}

impl OutputSettings {
    pub fn new(dir: PathBuf, formats: Vec<String>) -> Self {
        Self {
            dir,
            formats,
            csv_filename: "listings.csv".to_string(),
            json_filename: "listings.json".to_string(),
            html_filename: "report.html".to_string(),
        }
    }

    pub fn wants(&self, format: &str) -> bool {
        self.formats.iter().any(|f| f == format)
    }
}

pub trait ConfigProvider: Send + Sync {
    fn scrape_config(&self) -> ScrapeConfig;
    fn output_settings(&self) -> OutputSettings;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<ListingRecord>>;
    async fn transform(&self, records: Vec<ListingRecord>) -> Result<ReportData>;
    async fn load(&self, data: ReportData) -> Result<RunOutcome>;
}
