pub mod cli;
pub mod output_dir;
pub mod toml_config;

#[cfg(feature = "cli")]
pub use self::args::CliConfig;

#[cfg(feature = "cli")]
mod args {
    use crate::config::output_dir::OutputDir;
    use crate::core::ConfigProvider;
    use crate::domain::model::{
        delay_from_secs, CatalogProfile, ScrapeConfig, DEFAULT_DELAY_SECS, DEFAULT_MAX_PAGES,
    };
    use crate::domain::ports::OutputSettings;
    use crate::utils::error::Result;
    use crate::utils::validation::{
        validate_delay, validate_output_formats, validate_path, validate_positive_number,
        validate_search_target, Validate,
    };
    use clap::Parser;
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Clone, Serialize, Deserialize, Parser)]
    #[command(name = "listing-report")]
    #[command(about = "Collects used-bike listings and reports price against model year")]
    pub struct CliConfig {
        /// Brand filter, also used to build the search URL
        #[arg(long, default_value = "")]
        pub brand: String,

        /// Model filter, also used to build the search URL and output folder
        #[arg(long, default_value = "")]
        pub model: String,

        /// Search URL to scrape instead of the one derived from brand and model
        #[arg(long)]
        pub url: Option<String>,

        #[arg(long, default_value_t = DEFAULT_MAX_PAGES)]
        pub max_pages: usize,

        /// Pause between requests, in seconds
        #[arg(long, default_value_t = DEFAULT_DELAY_SECS)]
        pub delay_secs: f64,

        /// Skip opening listing pages when the card has no usable year
        #[arg(long)]
        pub no_detail_verify: bool,

        /// Output folder (default: <Desktop>/<model>)
        #[arg(long)]
        pub output_dir: Option<String>,

        #[arg(long, value_delimiter = ',', default_value = "csv,json,html")]
        pub formats: Vec<String>,

        #[arg(long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Log memory usage and timings per phase")]
        pub monitor: bool,
    }

    impl CliConfig {
        pub fn search_url(&self) -> String {
            match self.url.as_deref().map(str::trim) {
                Some(url) if !url.is_empty() => url.to_string(),
                _ => CatalogProfile::default().search_url(&self.brand, &self.model),
            }
        }

        pub fn output_dir(&self) -> OutputDir {
            let mut dir = OutputDir::derived(&self.model);
            if let Some(path) = self.output_dir.as_deref().filter(|p| !p.trim().is_empty()) {
                dir.override_with(path);
            }
            dir
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_search_target(self.url.as_deref().unwrap_or(""), &self.brand, &self.model)?;
            validate_positive_number("max_pages", self.max_pages, 1)?;
            validate_delay("delay_secs", self.delay_secs)?;
            validate_output_formats("formats", &self.formats)?;
            if let Some(dir) = &self.output_dir {
                validate_path("output_dir", dir)?;
            }
            Ok(())
        }
    }

    impl ConfigProvider for CliConfig {
        fn scrape_config(&self) -> ScrapeConfig {
            ScrapeConfig::new(&self.search_url())
                .with_filters(&self.brand, &self.model)
                .with_max_pages(self.max_pages)
                .with_delay(delay_from_secs(self.delay_secs))
                .with_detail_verification(!self.no_detail_verify)
        }

        fn output_settings(&self) -> OutputSettings {
            OutputSettings::new(self.output_dir().path().to_path_buf(), self.formats.clone())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use std::time::Duration;

        fn parse(args: &[&str]) -> CliConfig {
            CliConfig::parse_from(std::iter::once("listing-report").chain(args.iter().copied()))
        }

        #[test]
        fn test_defaults_from_brand_and_model() {
            let config = parse(&["--brand", "Honda", "--model", "CBR 650 R"]);

            assert!(config.validate().is_ok());
            assert_eq!(
                config.search_url(),
                "https://www.moto.it/moto-usate/honda/cbr-650-r"
            );
            let scrape = config.scrape_config();
            assert_eq!(scrape.max_pages, 12);
            assert_eq!(scrape.delay, Duration::from_secs(1));
            assert!(scrape.verify_detail_year);
            assert_eq!(config.formats, vec!["csv", "json", "html"]);
            assert!(config.output_settings().dir.ends_with("CBR 650 R"));
        }

        #[test]
        fn test_explicit_url_and_overrides() {
            let config = parse(&[
                "--url",
                " https://www.moto.it/moto-usate/ducati/monster ",
                "--max-pages",
                "3",
                "--delay-secs",
                "0.5",
                "--no-detail-verify",
                "--output-dir",
                "/tmp/out",
                "--formats",
                "csv,html",
            ]);

            assert!(config.validate().is_ok());
            let scrape = config.scrape_config();
            assert_eq!(scrape.search_url, "https://www.moto.it/moto-usate/ducati/monster");
            assert_eq!(scrape.max_pages, 3);
            assert_eq!(scrape.delay, Duration::from_millis(500));
            assert!(!scrape.verify_detail_year);
            let output = config.output_settings();
            assert_eq!(output.dir, std::path::PathBuf::from("/tmp/out"));
            assert!(output.wants("html"));
            assert!(!output.wants("json"));
        }

        #[test]
        fn test_validation_failures() {
            assert!(parse(&["--brand", "Honda"]).validate().is_err());
            assert!(parse(&["--url", "not a url"]).validate().is_err());
            assert!(parse(&["--brand", "Honda", "--model", "X", "--max-pages", "0"])
                .validate()
                .is_err());
            assert!(parse(&["--brand", "Honda", "--model", "X", "--delay-secs=-1"])
                .validate()
                .is_err());
            assert!(parse(&["--brand", "Honda", "--model", "X", "--formats", "xml"])
                .validate()
                .is_err());
        }

        #[test]
        fn test_huge_delay_is_rejected_without_panicking() {
            let config = parse(&["--brand", "Honda", "--model", "X", "--delay-secs", "1e30"]);

            assert!(config.validate().is_err());
            assert_eq!(config.scrape_config().delay, Duration::MAX);
        }
    }
}
