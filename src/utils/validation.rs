use crate::utils::error::{ReportError, Result};
use std::time::Duration;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(ReportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

/// Rejects seconds that are negative, NaN or too large for a `Duration`.
pub fn validate_delay(field_name: &str, seconds: f64) -> Result<()> {
    if Duration::try_from_secs_f64(seconds).is_err() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: seconds.to_string(),
            reason: "Delay must be a representable number of seconds, zero or more".to_string(),
        });
    }
    Ok(())
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    const VALID_FORMATS: [&str; 3] = ["csv", "json", "html"];

    if formats.is_empty() {
        return Err(ReportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: String::new(),
            reason: "At least one output format is required".to_string(),
        });
    }

    for format in formats {
        if !VALID_FORMATS.contains(&format.as_str()) {
            return Err(ReportError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    VALID_FORMATS.join(", ")
                ),
            });
        }
    }
    Ok(())
}

/// A run needs either an explicit search URL or both filters to derive one from.
pub fn validate_search_target(url: &str, brand: &str, model: &str) -> Result<()> {
    if !url.trim().is_empty() {
        return validate_url("search.url", url.trim());
    }
    if brand.trim().is_empty() {
        return Err(ReportError::MissingConfigError {
            field: "search.brand".to_string(),
        });
    }
    if model.trim().is_empty() {
        return Err(ReportError::MissingConfigError {
            field: "search.model".to_string(),
        });
    }
    Ok(())
}
