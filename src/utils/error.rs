use thiserror::Error;

/// Failure of a single page fetch.
///
/// `Status` carries the HTTP code of a non-success response so callers can
/// single out "not found"; `Transport` covers everything where no usable
/// response arrived.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },
}

impl FetchError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, FetchError::Status { status: 404, .. })
    }

    pub fn url(&self) -> &str {
        match self {
            FetchError::Status { url, .. } | FetchError::Transport { url, .. } => url,
        }
    }
}

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("HTTP client error: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("Fetch failed: {0}")]
    FetchError(#[from] FetchError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid CSS selector '{selector}': {message}")]
    SelectorError { selector: String, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Configuration validation failed for {field}: {message}")]
    ConfigValidationError { field: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Parsing,
    Configuration,
    Storage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ReportError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ReportError::ApiError(_) | ReportError::FetchError(_) => ErrorCategory::Network,
            ReportError::SelectorError { .. } | ReportError::SerializationError(_) => {
                ErrorCategory::Parsing
            }
            ReportError::ConfigError { .. }
            | ReportError::MissingConfigError { .. }
            | ReportError::InvalidConfigValueError { .. }
            | ReportError::ConfigValidationError { .. } => ErrorCategory::Configuration,
            ReportError::CsvError(_) | ReportError::IoError(_) => ErrorCategory::Storage,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            // the site may just be slow or throttling us, a retry often works
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Parsing | ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Storage => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Network => {
                "Check the connection or raise the delay between requests, then retry"
            }
            ErrorCategory::Parsing => {
                "The catalog markup may have changed; review the catalog selectors"
            }
            ErrorCategory::Configuration => {
                "Provide a search URL, or both brand and model, and check numeric options"
            }
            ErrorCategory::Storage => "Check that the output directory exists and is writable",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            ReportError::FetchError(e) if e.is_not_found() => {
                format!("The page {} does not exist", e.url())
            }
            ReportError::FetchError(e) => format!("Could not download {}", e.url()),
            ReportError::ApiError(_) => "The HTTP client could not be set up".to_string(),
            ReportError::MissingConfigError { field } => {
                format!("Missing required setting: {}", field)
            }
            ReportError::InvalidConfigValueError { field, reason, .. } => {
                format!("Invalid setting {}: {}", field, reason)
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;
