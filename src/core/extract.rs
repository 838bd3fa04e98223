//! Field extractors over cleaned listing text.
//!
//! Every function here is total: a missing or malformed field is `None`,
//! never an error.

use regex::Regex;
use std::sync::LazyLock;

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

// The currency sign must follow the amount.
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,3}(?:[.\s]\d{3})+|\d+)\s*€").unwrap());

static KM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)km\s*:?[\s\-]*([\d. ]+)").unwrap());

static LOCATION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zÀ-ÿ'’\-\s]+\s*\([A-Z]{2}\)").unwrap());

pub fn clean_text(s: &str) -> String {
    WHITESPACE_RE.replace_all(s, " ").trim().to_string()
}

fn parse_grouped_number(raw: &str) -> Option<u64> {
    let digits: String = raw.chars().filter(|c| !matches!(c, '.' | ' ')).collect();
    digits.parse().ok()
}

/// "12.500 €" and "12 500 €" are both 12500; "€12.500" is no price.
pub fn parse_price(txt: &str) -> Option<u64> {
    let caps = PRICE_RE.captures(txt)?;
    parse_grouped_number(&caps[1])
}

pub fn parse_km(txt: &str) -> Option<u64> {
    let caps = KM_RE.captures(txt)?;
    parse_grouped_number(&caps[1])
}

/// A place name followed by a province code, e.g. "Milano (MI)".
///
/// A separator dash in front of the name ("8.900 € - Bologna (BO)") is dropped.
pub fn parse_location(txt: &str) -> Option<String> {
    LOCATION_RE
        .find(txt)
        .map(|m| clean_text(m.as_str().trim_start_matches(['-', ' '])))
        .filter(|loc| !loc.is_empty())
}

/// Cheap check that a page still lists ads: any marker appears in its text.
pub fn has_listings(page_text: &str, markers: &[String]) -> bool {
    markers.iter().any(|marker| page_text.contains(marker.as_str()))
}
