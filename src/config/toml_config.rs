use crate::config::output_dir::OutputDir;
use crate::core::ConfigProvider;
use crate::domain::model::{
    delay_from_secs, CatalogProfile, ScrapeConfig, YearTerms, DEFAULT_DELAY_SECS, DEFAULT_MAX_PAGES,
};
use crate::domain::ports::OutputSettings;
use crate::utils::error::{ReportError, Result};
use crate::utils::validation::{
    validate_delay, validate_output_formats, validate_path, validate_positive_number,
    validate_search_target, validate_url, Validate,
};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static ENV_VAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub search: SearchConfig,
    #[serde(default)]
    pub scrape: ScrapeSection,
    #[serde(default)]
    pub catalog: CatalogProfile,
    #[serde(default)]
    pub year_terms: YearTerms,
    #[serde(default)]
    pub output: OutputConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScrapeSection {
    pub max_pages: Option<usize>,
    pub delay_secs: Option<f64>,
    pub verify_detail_year: Option<bool>,
    /// Merged over the default browser headers.
    pub headers: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Defaults to `<Desktop>/<model>` when unset.
    pub dir: Option<String>,
    #[serde(default = "default_formats")]
    pub formats: Vec<String>,
    pub filenames: Option<FilenameConfig>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: None,
            formats: default_formats(),
            filenames: None,
        }
    }
}

fn default_formats() -> Vec<String> {
    ["csv", "json", "html"].map(String::from).to_vec()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilenameConfig {
    pub csv: Option<String>,
    pub json: Option<String>,
    pub html: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ReportError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content);

        toml::from_str(&processed_content).map_err(|e| ReportError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${BRAND})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        // 驗證搜尋目標
        validate_search_target(
            self.search.url.as_deref().unwrap_or(""),
            &self.search.brand,
            &self.search.model,
        )?;
        validate_url("catalog.catalog_root", &self.catalog.catalog_root)?;

        if self.catalog.page_segment.trim().is_empty() {
            return Err(ReportError::InvalidConfigValueError {
                field: "catalog.page_segment".to_string(),
                value: self.catalog.page_segment.clone(),
                reason: "Page segment cannot be empty".to_string(),
            });
        }

        // 驗證抓取參數
        validate_positive_number("scrape.max_pages", self.max_pages(), 1)?;
        validate_delay("scrape.delay_secs", self.delay_secs())?;

        // 驗證輸出設定
        validate_output_formats("output.formats", &self.output.formats)?;
        if let Some(dir) = &self.output.dir {
            validate_path("output.dir", dir)?;
        }
        if let Some(names) = &self.output.filenames {
            for (field, name) in [
                ("output.filenames.csv", &names.csv),
                ("output.filenames.json", &names.json),
                ("output.filenames.html", &names.html),
            ] {
                if let Some(name) = name {
                    validate_path(field, name)?;
                }
            }
        }

        Ok(())
    }

    /// 取得搜尋 URL，未指定時由品牌與型號推導
    pub fn search_url(&self) -> String {
        match self.search.url.as_deref().map(str::trim) {
            Some(url) if !url.is_empty() => url.to_string(),
            _ => self.catalog.search_url(&self.search.brand, &self.search.model),
        }
    }

    pub fn max_pages(&self) -> usize {
        self.scrape.max_pages.unwrap_or(DEFAULT_MAX_PAGES)
    }

    pub fn delay_secs(&self) -> f64 {
        self.scrape.delay_secs.unwrap_or(DEFAULT_DELAY_SECS)
    }

    pub fn verify_detail_year(&self) -> bool {
        self.scrape.verify_detail_year.unwrap_or(true)
    }

    pub fn output_dir(&self) -> OutputDir {
        let mut dir = OutputDir::derived(&self.search.model);
        if let Some(path) = self.output.dir.as_deref().filter(|p| !p.trim().is_empty()) {
            dir.override_with(path);
        }
        dir
    }

    /// 套用命令列覆寫並回傳最終輸出資料夾
    ///
    /// 未指定資料夾時，資料夾隨新的型號重新推導；已指定者保持不變
    pub fn apply_overrides(&mut self, model: Option<&str>, dir: Option<&str>) -> OutputDir {
        let mut output_dir = self.output_dir();

        if let Some(dir) = dir.map(str::trim).filter(|d| !d.is_empty()) {
            output_dir.override_with(dir);
            self.output.dir = Some(dir.to_string());
        }
        if let Some(model) = model {
            output_dir.on_model_change(model);
            self.search.model = model.to_string();
        }

        output_dir
    }

    /// 取得監控設定
    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl ConfigProvider for TomlConfig {
    fn scrape_config(&self) -> ScrapeConfig {
        let mut config = ScrapeConfig::new(&self.search_url())
            .with_filters(&self.search.brand, &self.search.model)
            .with_max_pages(self.max_pages())
            .with_delay(delay_from_secs(self.delay_secs()))
            .with_detail_verification(self.verify_detail_year())
            .with_catalog(self.catalog.clone())
            .with_year_terms(self.year_terms.clone());

        for (key, value) in self.scrape.headers.iter().flatten() {
            config = config.with_header(key, value);
        }
        config
    }

    fn output_settings(&self) -> OutputSettings {
        let mut settings = OutputSettings::new(
            PathBuf::from(self.output_dir().path()),
            self.output.formats.clone(),
        );
        if let Some(names) = &self.output.filenames {
            if let Some(csv) = &names.csv {
                settings.csv_filename = csv.clone();
            }
            if let Some(json) = &names.json {
                settings.json_filename = json.clone();
            }
            if let Some(html) = &names.html {
                settings.html_filename = html.clone();
            }
        }
        settings
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
