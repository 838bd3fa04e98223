//! Model-year resolution from free listing text.
//!
//! Two strategies: score every year-shaped token of the card text by the
//! words around it ([`YearResolver::resolve_inline`]), and, when that finds
//! nothing trustworthy, look inside the specification blocks of the listing's
//! own page ([`YearResolver::resolve_detail_page`]).
//!
//! Scoring policy:
//! - a year outside [`YEAR_MIN`]..=[`YEAR_MAX`] is never a candidate;
//! - a `month/year` date wins outright;
//! - a labeled year without negative context scores [`LABELED_SCORE`],
//!   plus [`DATE_IN_WINDOW_BONUS`] when a date sits in the same window;
//! - an unlabeled year scores [`ISOLATED_SCORE`], or [`NEGATIVE_SCORE`]
//!   when negative context is nearby (labeled ones included);
//! - highest score wins, ties go to the older year, and a winner scoring
//!   [`MIN_ACCEPTED_SCORE`] or less is rejected.

use crate::core::document::{element_text, parse_selector_group};
use crate::core::extract::clean_text;
use crate::domain::model::YearTerms;
use crate::utils::error::{ReportError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use std::cmp::Reverse;
use std::sync::LazyLock;

pub const YEAR_MIN: i32 = 1990;
pub const YEAR_MAX: i32 = 2035;

/// Characters inspected on each side of a year token.
pub const WINDOW_CHARS: usize = 16;
pub const LABELED_SCORE: i32 = 10;
pub const DATE_IN_WINDOW_BONUS: i32 = 1;
pub const ISOLATED_SCORE: i32 = 1;
pub const NEGATIVE_SCORE: i32 = -5;
pub const MIN_ACCEPTED_SCORE: i32 = ISOLATED_SCORE;

/// Max non-digit characters between a label and its year on a detail page.
pub const LABEL_GAP_CHARS: usize = 12;

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(19\d{2}|20\d{2})\b").unwrap());

static DATE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(0?[1-9]|1[0-2])\s*[/\-]\s*(19\d{2}|20\d{2})\b").unwrap()
});

const LABEL_DELIMITERS: &str = r"[\s:;,.|]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearCandidate {
    pub value: i32,
    pub score: i32,
    pub labeled: bool,
    pub negative_context: bool,
}

pub struct YearResolver {
    label_re: Option<Regex>,
    negative_re: Option<Regex>,
    labeled_year_re: Option<Regex>,
    detail_containers: Option<Selector>,
}

fn in_range(year: i32) -> bool {
    (YEAR_MIN..=YEAR_MAX).contains(&year)
}

/// Regex source for one term: words may be split by any whitespace and
/// a `/` may carry spaces around it ("mese / anno").
fn term_pattern(term: &str) -> String {
    term.split_whitespace()
        .map(|word| regex::escape(word).replace('/', r"\s*/\s*"))
        .collect::<Vec<_>>()
        .join(r"\s+")
}

fn alternation(terms: &[String]) -> Option<String> {
    let parts: Vec<String> = terms
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| term_pattern(t))
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts.join("|"))
    }
}

fn compile(field: &str, pattern: String) -> Result<Regex> {
    Regex::new(&pattern).map_err(|e| ReportError::ConfigValidationError {
        field: field.to_string(),
        message: e.to_string(),
    })
}

/// Slice of `text` holding up to `WINDOW_CHARS` characters on each side of `start..end`.
fn window_around(text: &str, start: usize, end: usize) -> &str {
    let from = text[..start]
        .char_indices()
        .rev()
        .nth(WINDOW_CHARS - 1)
        .map_or(0, |(i, _)| i);
    let to = text[end..]
        .char_indices()
        .nth(WINDOW_CHARS)
        .map_or(text.len(), |(i, _)| end + i);
    &text[from..to]
}

fn padded(txt: &str) -> String {
    format!(" {} ", clean_text(txt))
}

fn first_dated_year(txt: &str) -> Option<i32> {
    DATE_RE
        .captures_iter(txt)
        .filter_map(|caps| caps[2].parse::<i32>().ok())
        .find(|y| in_range(*y))
}

/// Highest score, older year on ties; `None` when the winner is too weak.
pub fn pick_best(candidates: &[YearCandidate]) -> Option<i32> {
    candidates
        .iter()
        .max_by_key(|c| (c.score, Reverse(c.value)))
        .filter(|best| best.score > MIN_ACCEPTED_SCORE)
        .map(|best| best.value)
}

impl YearResolver {
    pub fn new(terms: &YearTerms, detail_selectors: &[String]) -> Result<Self> {
        let label_re = alternation(&terms.labels)
            .map(|alts| {
                compile(
                    "year_terms.labels",
                    format!(
                        r"(?i)(?:^|{d})(?:{alts})(?:{d}|$)",
                        d = LABEL_DELIMITERS,
                        alts = alts
                    ),
                )
            })
            .transpose()?;
        let labeled_year_re = alternation(&terms.labels)
            .map(|alts| {
                compile(
                    "year_terms.labels",
                    format!(
                        r"(?i)(?:{alts})[^\d]{{0,{gap}}}(19\d{{2}}|20\d{{2}})",
                        alts = alts,
                        gap = LABEL_GAP_CHARS
                    ),
                )
            })
            .transpose()?;
        let negative_re = alternation(&terms.negatives)
            .map(|alts| compile("year_terms.negatives", format!(r"(?i)(?:{})", alts)))
            .transpose()?;

        Ok(Self {
            label_re,
            negative_re,
            labeled_year_re,
            detail_containers: parse_selector_group(detail_selectors)?,
        })
    }

    fn has_label(&self, window: &str) -> bool {
        self.label_re.as_ref().is_some_and(|re| re.is_match(window))
    }

    fn has_negative_context(&self, window: &str) -> bool {
        self.negative_re.as_ref().is_some_and(|re| re.is_match(window))
    }

    /// Every in-range year token of `txt` with its score.
    pub fn candidates(&self, txt: &str) -> Vec<YearCandidate> {
        let norm = padded(txt);
        self.scored_candidates(&norm)
    }

    fn scored_candidates(&self, norm: &str) -> Vec<YearCandidate> {
        let mut candidates = Vec::new();
        for m in YEAR_RE.find_iter(norm) {
            let Ok(value) = m.as_str().parse::<i32>() else {
                continue;
            };
            if !in_range(value) {
                continue;
            }

            let window = window_around(norm, m.start(), m.end());
            let labeled = self.has_label(window);
            let negative_context = self.has_negative_context(window);

            let score = if labeled && !negative_context {
                let bonus = if DATE_RE.is_match(window) {
                    DATE_IN_WINDOW_BONUS
                } else {
                    0
                };
                LABELED_SCORE + bonus
            } else if negative_context {
                NEGATIVE_SCORE
            } else {
                ISOLATED_SCORE
            };

            candidates.push(YearCandidate {
                value,
                score,
                labeled,
                negative_context,
            });
        }
        candidates
    }

    /// The year a card's own text supports, if any.
    pub fn resolve_inline(&self, txt: &str) -> Option<i32> {
        if txt.trim().is_empty() {
            return None;
        }
        let norm = padded(txt);

        if let Some(year) = first_dated_year(&norm) {
            return Some(year);
        }
        pick_best(&self.scored_candidates(&norm))
    }

    /// The year stated in the technical-data blocks of a detail page.
    ///
    /// Per container, in document order: a label followed closely by a year,
    /// then a `month/year` date, then the card-text scoring.
    pub fn resolve_detail_page(&self, body: &str) -> Option<i32> {
        let document = Html::parse_document(body);

        let mut boxes: Vec<String> = match &self.detail_containers {
            Some(selector) => document.select(selector).map(element_text).collect(),
            None => Vec::new(),
        };
        if boxes.is_empty() {
            boxes.push(element_text(document.root_element()));
        }

        boxes.iter().find_map(|text| self.resolve_container(text))
    }

    fn resolve_container(&self, text: &str) -> Option<i32> {
        let norm = padded(text);

        let labeled = self.labeled_year_re.as_ref().and_then(|re| {
            re.captures_iter(&norm)
                .filter_map(|caps| caps[1].parse::<i32>().ok())
                .find(|y| in_range(*y))
        });

        labeled
            .or_else(|| first_dated_year(&norm))
            .or_else(|| self.resolve_inline(text))
    }
}
