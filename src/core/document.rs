//! Thin helpers over `scraper` shared by decomposition and year lookup.

use crate::core::extract::clean_text;
use crate::utils::error::{ReportError, Result};
use scraper::{ElementRef, Html, Selector};

pub fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ReportError::SelectorError {
        selector: selector.to_string(),
        message: e.to_string(),
    })
}

/// One selector group matching any of `selectors`, yielding elements in document order.
pub fn parse_selector_group(selectors: &[String]) -> Result<Option<Selector>> {
    if selectors.is_empty() {
        return Ok(None);
    }
    parse_selector(&selectors.join(", ")).map(Some)
}

pub fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

pub fn document_text(document: &Html) -> String {
    element_text(document.root_element())
}
