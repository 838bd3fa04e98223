pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::HttpFetcher;
pub use config::{cli::LocalStorage, toml_config::TomlConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use core::{etl::ReportEngine, pipeline::ReportPipeline, scrape::TracingObserver};
pub use domain::model::{ListingRecord, RunOutcome, ScrapeConfig};
pub use utils::error::{ReportError, Result};
