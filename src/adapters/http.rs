use crate::domain::model::ScrapeConfig;
use crate::domain::ports::Fetcher;
use crate::utils::error::{FetchError, ReportError, Result};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// `reqwest`-backed [`Fetcher`] sending the run's headers on every request.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes()).map_err(|e| {
            ReportError::InvalidConfigValueError {
                field: "scrape.headers".to_string(),
                value: key.clone(),
                reason: format!("Invalid header name: {}", e),
            }
        })?;
        let val = HeaderValue::from_str(value).map_err(|e| {
            ReportError::InvalidConfigValueError {
                field: format!("scrape.headers.{}", key),
                value: value.clone(),
                reason: format!("Invalid header value: {}", e),
            }
        })?;
        map.insert(name, val);
    }
    Ok(map)
}

impl HttpFetcher {
    pub fn new(headers: &BTreeMap<String, String>) -> Result<Self> {
        let client = Client::builder()
            .default_headers(header_map(headers)?)
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &ScrapeConfig) -> Result<Self> {
        Self::new(&config.headers)
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            url: url.to_string(),
            message: e.to_string(),
        };

        tracing::debug!("GET {}", url);
        let response = self.client.get(url).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(transport)
    }
}
