//! Text cleaning helpers for scraped values.

use regex::Regex;
use scraper::Html;
use std::sync::LazyLock;

static WS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("whitespace pattern is valid"));

/// Collapses runs of whitespace into single spaces and trims the ends.
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    WS_RE.replace_all(text, " ").trim().to_string()
}

/// Renders an HTML fragment as plain text.
///
/// Tags are dropped and every character reference is decoded by the HTML
/// parser; whitespace is collapsed.
#[must_use]
pub fn html_to_text(markup: &str) -> String {
    let fragment = Html::parse_fragment(markup);
    normalize_whitespace(&fragment.root_element().text().collect::<String>())
}

/// Tidies already-decoded text: collapses whitespace.
///
/// With `ascii_only`, every non-ASCII character is dropped as well. Markup
/// characters are kept literally; use [`html_to_text`] for raw HTML.
#[must_use]
pub fn clean_text(text: &str, ascii_only: bool) -> String {
    if ascii_only {
        normalize_whitespace(&text.chars().filter(char::is_ascii).collect::<String>())
    } else {
        normalize_whitespace(text)
    }
}
