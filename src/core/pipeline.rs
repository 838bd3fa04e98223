use crate::core::aggregate::{build_dataset, price_extremes, yearly_stats};
use crate::core::export::{csv_bytes, json_bytes};
use crate::core::report::{render_html, ReportHeader};
use crate::core::scrape::{scrape_listings, TracingObserver};
use crate::core::{ConfigProvider, Fetcher, Pipeline, ScrapeObserver, Storage};
use crate::domain::model::{ListingRecord, ReportData, RunOutcome};
use crate::utils::error::Result;
use chrono::Local;
use std::sync::Arc;

/// Scrape → aggregate → export, driven by one [`ConfigProvider`].
pub struct ReportPipeline<S: Storage, C: ConfigProvider, F: Fetcher> {
    storage: S,
    config: C,
    fetcher: F,
    observer: Arc<dyn ScrapeObserver>,
}

impl<S: Storage, C: ConfigProvider, F: Fetcher> ReportPipeline<S, C, F> {
    pub fn new(storage: S, config: C, fetcher: F) -> Self {
        Self {
            storage,
            config,
            fetcher,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ScrapeObserver>) -> Self {
        self.observer = observer;
        self
    }

    async fn write(&self, filename: &str, data: &[u8], files: &mut Vec<String>) -> Result<()> {
        tracing::debug!("Writing {} ({} bytes)", filename, data.len());
        self.storage.write_file(filename, data).await?;
        files.push(self.storage.locate(filename));
        Ok(())
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, F: Fetcher> Pipeline for ReportPipeline<S, C, F> {
    async fn extract(&self) -> Result<Vec<ListingRecord>> {
        let config = self.config.scrape_config();
        tracing::debug!("Collecting listings from: {}", config.search_url);

        scrape_listings(&config, &self.fetcher, self.observer.as_ref()).await
    }

    async fn transform(&self, records: Vec<ListingRecord>) -> Result<ReportData> {
        let raw = records.len();
        let dataset = build_dataset(records);
        if dataset.len() < raw {
            tracing::debug!("Dropped {} duplicate listings", raw - dataset.len());
        }

        let yearly_stats = yearly_stats(&dataset);
        let extremes = price_extremes(&yearly_stats);

        Ok(ReportData {
            dataset,
            yearly_stats,
            extremes,
        })
    }

    async fn load(&self, data: ReportData) -> Result<RunOutcome> {
        // 沒有資料就不寫任何檔案
        if data.dataset.is_empty() {
            return Ok(RunOutcome::NothingFound);
        }

        let output = self.config.output_settings();
        let scrape = self.config.scrape_config();
        let generated_at = Local::now();
        let mut files = Vec::new();

        if output.wants("csv") {
            let bytes = csv_bytes(&data.dataset)?;
            self.write(&output.csv_filename, &bytes, &mut files).await?;
        }

        if output.wants("json") {
            let bytes = json_bytes(&data, &scrape.search_url, generated_at)?;
            self.write(&output.json_filename, &bytes, &mut files).await?;
        }

        if output.wants("html") {
            let mut header = ReportHeader::new(&scrape.brand, &scrape.model, &scrape.search_url);
            header.generated_at = generated_at;
            let html = render_html(&data, &header)?;
            self.write(&output.html_filename, html.as_bytes(), &mut files)
                .await?;
        }

        Ok(RunOutcome::Written {
            files,
            records: data.dataset.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::{RecordingObserver, StaticFetcher};
    use crate::domain::model::ScrapeConfig;
    use crate::domain::ports::OutputSettings;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;
    use tokio::sync::Mutex;

    const BASE: &str = "https://www.moto.it/moto-usate/honda/cbr-650-r";

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }

        async fn file_count(&self) -> usize {
            self.files.lock().await.len()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn locate(&self, path: &str) -> String {
            format!("mem://{}", path)
        }
    }

    struct MockConfig {
        formats: Vec<String>,
    }

    impl MockConfig {
        fn new(formats: &[&str]) -> Self {
            Self {
                formats: formats.iter().map(|f| f.to_string()).collect(),
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn scrape_config(&self) -> ScrapeConfig {
            ScrapeConfig::new(BASE)
                .with_filters("Honda", "CBR 650 R")
                .with_delay(Duration::ZERO)
                .with_max_pages(1)
        }

        fn output_settings(&self) -> OutputSettings {
            OutputSettings::new(PathBuf::from("unused"), self.formats.clone())
        }
    }

    const PAGE: &str = r#"<html><body>
        <article><a href="/annuncio/1">Honda CBR 650 R</a> Anno 2019, 9.800 €, Km: 12.000</article>
        <article><a href="/annuncio/1">Honda CBR 650 R</a> Anno 2019, 9.800 €, Km: 12.000</article>
        <article><a href="/annuncio/2">Honda CBR 650 R</a> Anno 2021, 10.900 €, Bari (BA)</article>
    </body></html>"#;

    fn pipeline(
        storage: MockStorage,
        formats: &[&str],
        fetcher: StaticFetcher,
    ) -> ReportPipeline<MockStorage, MockConfig, StaticFetcher> {
        ReportPipeline::new(storage, MockConfig::new(formats), fetcher)
    }

    #[tokio::test]
    async fn test_extract_uses_observer() {
        let observer = Arc::new(RecordingObserver::default());
        let pipeline = pipeline(
            MockStorage::new(),
            &["csv"],
            StaticFetcher::new().with_page(BASE, PAGE),
        )
        .with_observer(observer.clone());

        let records = pipeline.extract().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(observer.progress(), vec![(1, 1)]);
    }

    #[tokio::test]
    async fn test_transform_dedups_and_summarises() {
        let pipeline = pipeline(
            MockStorage::new(),
            &["csv"],
            StaticFetcher::new().with_page(BASE, PAGE),
        );

        let records = pipeline.extract().await.unwrap();
        let data = pipeline.transform(records).await.unwrap();

        assert_eq!(data.dataset.len(), 2);
        assert_eq!(data.yearly_stats.len(), 2);
        let extremes = data.extremes.unwrap();
        assert_eq!(extremes.cheapest_year, 2019);
        assert_eq!(extremes.priciest_mean, 10900);
    }

    #[tokio::test]
    async fn test_load_writes_requested_formats() {
        let storage = MockStorage::new();
        let pipeline = pipeline(
            storage.clone(),
            &["csv", "json", "html"],
            StaticFetcher::new().with_page(BASE, PAGE),
        );

        let records = pipeline.extract().await.unwrap();
        let data = pipeline.transform(records).await.unwrap();
        let outcome = pipeline.load(data).await.unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Written {
                files: vec![
                    "mem://listings.csv".to_string(),
                    "mem://listings.json".to_string(),
                    "mem://report.html".to_string(),
                ],
                records: 2,
            }
        );
        let html = storage.get_file("report.html").await.unwrap();
        assert!(String::from_utf8(html).unwrap().contains("Honda CBR 650 R"));
    }

    #[tokio::test]
    async fn test_load_only_csv() {
        let storage = MockStorage::new();
        let pipeline = pipeline(
            storage.clone(),
            &["csv"],
            StaticFetcher::new().with_page(BASE, PAGE),
        );

        let records = pipeline.extract().await.unwrap();
        let data = pipeline.transform(records).await.unwrap();
        pipeline.load(data).await.unwrap();

        assert_eq!(storage.file_count().await, 1);
        let csv = storage.get_file("listings.csv").await.unwrap();
        assert!(csv.starts_with(b"\xEF\xBB\xBF"));
    }

    #[tokio::test]
    async fn test_empty_run_writes_nothing() {
        let storage = MockStorage::new();
        let pipeline = pipeline(
            storage.clone(),
            &["csv", "json", "html"],
            StaticFetcher::new().with_page(BASE, "<p>Nessun annuncio</p>"),
        );

        let records = pipeline.extract().await.unwrap();
        let data = pipeline.transform(records).await.unwrap();
        let outcome = pipeline.load(data).await.unwrap();

        assert_eq!(outcome, RunOutcome::NothingFound);
        assert_eq!(storage.file_count().await, 0);
    }
}
