pub mod aggregate;
pub mod decompose;
pub mod document;
pub mod etl;
pub mod export;
pub mod extract;
pub mod pagination;
pub mod pipeline;
pub mod report;
pub mod scrape;
pub mod year;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::domain::model::{ListingRecord, ReportData, RunOutcome};
pub use crate::domain::ports::{ConfigProvider, Fetcher, Pipeline, ScrapeObserver, Storage};
pub use crate::utils::error::Result;
