//! In-memory fetcher and observer for unit tests.

use crate::domain::ports::{Fetcher, ScrapeObserver};
use crate::utils::error::FetchError;
use std::collections::HashMap;
use std::sync::Mutex;

/// Serves canned responses; any unknown URL is a 404.
#[derive(Default)]
pub struct StaticFetcher {
    responses: HashMap<String, Result<String, FetchError>>,
    requested: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: &str) -> Self {
        self.responses.insert(url.to_string(), Ok(body.to_string()));
        self
    }

    pub fn with_status(mut self, url: &str, status: u16) -> Self {
        self.responses.insert(
            url.to_string(),
            Err(FetchError::Status {
                url: url.to_string(),
                status,
            }),
        );
        self
    }

    pub fn with_transport_error(mut self, url: &str) -> Self {
        self.responses.insert(
            url.to_string(),
            Err(FetchError::Transport {
                url: url.to_string(),
                message: "connection refused".to_string(),
            }),
        );
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        self.requested.lock().unwrap().push(url.to_string());
        self.responses.get(url).cloned().unwrap_or_else(|| {
            Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    logs: Mutex<Vec<String>>,
    progress: Mutex<Vec<(usize, usize)>>,
}

impl RecordingObserver {
    pub fn logs(&self) -> Vec<String> {
        self.logs.lock().unwrap().clone()
    }

    pub fn progress(&self) -> Vec<(usize, usize)> {
        self.progress.lock().unwrap().clone()
    }
}

impl ScrapeObserver for RecordingObserver {
    fn on_progress(&self, pages_done: usize, pages_total: usize) {
        self.progress.lock().unwrap().push((pages_done, pages_total));
    }

    fn on_log(&self, message: &str) {
        self.logs.lock().unwrap().push(message.to_string());
    }
}
