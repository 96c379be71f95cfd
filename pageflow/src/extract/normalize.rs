//! Value normalization applied after a field has been located.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::LazyLock;

use super::text::{clean_text, html_to_text};
use crate::errors::FieldLookupFault;

static NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d[\d,]*(?:\.\d+)?").expect("number pattern is valid"));

/// Maps recognized literal tokens to numeric values.
///
/// A token missing from the table is an error for the field being
/// normalized, never for the whole item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValueTable(BTreeMap<String, i64>);

impl ValueTable {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The word ratings used by star widgets: `One` through `Five`.
    #[must_use]
    pub fn star_ratings() -> Self {
        [("One", 1), ("Two", 2), ("Three", 3), ("Four", 4), ("Five", 5)]
            .into_iter()
            .collect()
    }

    /// Adds an entry.
    #[must_use]
    pub fn with_entry(mut self, token: impl Into<String>, value: i64) -> Self {
        self.0.insert(token.into(), value);
        self
    }

    /// Looks up a token exactly as given (after trimming).
    #[must_use]
    pub fn get(&self, token: &str) -> Option<i64> {
        self.0.get(token.trim()).copied()
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the table has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, i64)> for ValueTable {
    fn from_iter<T: IntoIterator<Item = (K, i64)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// One normalization step. Steps run in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Normalizer {
    /// Collapse whitespace in extracted text, optionally dropping non-ASCII.
    CleanText {
        /// Drop every non-ASCII character as well.
        #[serde(default)]
        ascii_only: bool,
    },
    /// Render a value holding raw HTML (e.g. a `data-*` attribute) as text.
    StripMarkup,
    /// Drop currency symbols and other non-numeric padding around a price.
    StripCurrency,
    /// Keep only the first decimal number in the value, without thousands separators.
    FirstNumber,
    /// Replace the token with its numeric value from the table.
    Lookup {
        /// The token table.
        table: ValueTable,
    },
    /// Prepend a literal, e.g. a site origin for relative links.
    Prefix {
        /// Text to prepend.
        value: String,
    },
    /// Keep one segment of a URL path, e.g. the category in `/news/world-123`.
    PathSegment {
        /// 0-based segment index; negative counts from the end.
        index: i64,
    },
}

impl Normalizer {
    /// Shorthand for a lookup step.
    #[must_use]
    pub const fn lookup(table: ValueTable) -> Self {
        Self::Lookup { table }
    }

    /// Applies this step to a value of `field`.
    pub fn apply(&self, field: &str, value: String) -> Result<String, FieldLookupFault> {
        match self {
            Self::CleanText { ascii_only } => Ok(clean_text(&value, *ascii_only)),
            Self::StripMarkup => Ok(html_to_text(&value)),
            Self::StripCurrency => strip_currency(&value)
                .map(str::to_string)
                .ok_or_else(|| FieldLookupFault::malformed(field, format!("no amount in '{value}'"))),
            Self::FirstNumber => NUMBER_RE
                .find(&value)
                .map(|m| m.as_str().replace(',', ""))
                .ok_or_else(|| FieldLookupFault::malformed(field, format!("no number in '{value}'"))),
            Self::Lookup { table } => table
                .get(&value)
                .map(|n| n.to_string())
                .ok_or_else(|| FieldLookupFault::unrecognized(field, value.trim())),
            Self::Prefix { value: prefix } => Ok(format!("{prefix}{value}")),
            Self::PathSegment { index } => path_segment(&value, *index)
                .map(str::to_string)
                .ok_or_else(|| FieldLookupFault::malformed(field, format!("no path segment {index} in '{value}'"))),
        }
    }
}

/// Picks a non-empty segment of the path part of `value`.
///
/// Accepts absolute URLs and bare paths; query and fragment are ignored.
fn path_segment(value: &str, index: i64) -> Option<&str> {
    let path = match value.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |at| &rest[at..]),
        None => value,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let position = if index < 0 {
        segments.len().checked_sub(usize::try_from(index.unsigned_abs()).ok()?)?
    } else {
        usize::try_from(index).ok()?
    };
    segments.get(position).copied()
}

/// Trims everything around the amount that is not a digit, sign, or separator.
fn strip_currency(value: &str) -> Option<&str> {
    let is_amount_char = |c: char| c.is_ascii_digit() || matches!(c, '.' | ',' | '-');
    let trimmed = value
        .trim_start_matches(|c: char| !is_amount_char(c))
        .trim_end_matches(|c: char| !is_amount_char(c));
    trimmed.chars().any(|c| c.is_ascii_digit()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_star_ratings_table() {
        let table = ValueTable::star_ratings();
        assert_eq!(table.len(), 5);
        assert_eq!(table.get("Three"), Some(3));
        assert_eq!(table.get(" Five "), Some(5));
        assert_eq!(table.get("three"), None);
    }

    #[test]
    fn test_lookup_unrecognized_token_is_field_fault() {
        let step = Normalizer::lookup(ValueTable::star_ratings());
        assert_eq!(step.apply("rating", "Four".to_string()).unwrap(), "4");
        assert_eq!(
            step.apply("rating", "Seven".to_string()),
            Err(FieldLookupFault::unrecognized("rating", "Seven"))
        );
    }

    #[test]
    fn test_strip_currency() {
        let step = Normalizer::StripCurrency;
        assert_eq!(step.apply("price", "£51.77".to_string()).unwrap(), "51.77");
        assert_eq!(step.apply("price", "Â£13.99".to_string()).unwrap(), "13.99");
        assert_eq!(step.apply("price", "12,00 €".to_string()).unwrap(), "12,00");
        assert!(matches!(
            step.apply("price", "Free".to_string()),
            Err(FieldLookupFault::Malformed { .. })
        ));
    }

    #[test]
    fn test_first_number() {
        let step = Normalizer::FirstNumber;
        assert_eq!(step.apply("rating", "4.5 out of 5 stars".to_string()).unwrap(), "4.5");
        assert_eq!(step.apply("reviews", "1,204 ratings".to_string()).unwrap(), "1204");
        assert_eq!(step.apply("price", "$2,499.99".to_string()).unwrap(), "2499.99");
        assert!(step.apply("rating", "N/A".to_string()).is_err());
    }

    #[test]
    fn test_prefix() {
        let step = Normalizer::Prefix {
            value: "https://www.bbc.com".to_string(),
        };
        assert_eq!(step.apply("url", "/news".to_string()).unwrap(), "https://www.bbc.com/news");
    }

    #[test]
    fn test_path_segment() {
        let category = Normalizer::PathSegment { index: 0 };
        assert_eq!(category.apply("category", "/news/world-123".to_string()).unwrap(), "news");
        assert_eq!(
            category.apply("category", "https://www.bbc.com/sport/football/1?x=1".to_string()).unwrap(),
            "sport"
        );

        let from_end = Normalizer::PathSegment { index: -2 };
        assert_eq!(
            from_end.apply("category", "https://www.nytimes.com/2024/05/01/world/europe/story.html".to_string()).unwrap(),
            "europe"
        );
        assert!(matches!(
            from_end.apply("category", "/".to_string()),
            Err(FieldLookupFault::Malformed { .. })
        ));
    }

    #[test]
    fn test_strip_markup() {
        let step = Normalizer::StripMarkup;
        assert_eq!(step.apply("blurb", "<em>Great</em> &amp; cheap".to_string()).unwrap(), "Great & cheap");
    }

    #[test]
    fn test_clean_text_does_not_decode_again() {
        let step = Normalizer::CleanText { ascii_only: false };
        assert_eq!(step.apply("title", " 5 &lt; 6 <b> ".to_string()).unwrap(), "5 &lt; 6 <b>");
    }

    #[test]
    fn test_normalizer_serde() {
        let steps: Vec<Normalizer> = serde_json::from_str(
            r#"[{"kind": "strip_currency"}, {"kind": "lookup", "table": {"One": 1}}, {"kind": "clean_text"}]"#,
        )
        .unwrap();
        assert_eq!(steps[0], Normalizer::StripCurrency);
        assert_eq!(steps[1], Normalizer::lookup(ValueTable::new().with_entry("One", 1)));
        assert_eq!(steps[2], Normalizer::CleanText { ascii_only: false });
    }
}
