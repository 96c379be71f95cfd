//! Filtering and keyword search over records.

use std::collections::BTreeMap;

use crate::extract::ExtractionResult;

/// Records whose `field` equals `value`, ignoring case.
#[must_use]
pub fn filter_by_value<'a>(results: &'a [ExtractionResult], field: &str, value: &str) -> Vec<&'a ExtractionResult> {
    let wanted = value.to_lowercase();
    results
        .iter()
        .filter(|r| r.get(field).is_some_and(|v| v.to_lowercase() == wanted))
        .collect()
}

/// Records where any of `fields` contains `keyword`, ignoring case.
///
/// An empty keyword matches every record with one of the fields present.
#[must_use]
pub fn search<'a>(results: &'a [ExtractionResult], keyword: &str, fields: &[&str]) -> Vec<&'a ExtractionResult> {
    let needle = keyword.to_lowercase();
    results
        .iter()
        .filter(|r| {
            fields
                .iter()
                .filter_map(|field| r.get(field))
                .any(|v| v.to_lowercase().contains(&needle))
        })
        .collect()
}

/// How many records hold each value of `field`; absent values are skipped.
#[must_use]
pub fn value_counts(results: &[ExtractionResult], field: &str) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for value in results.iter().filter_map(|r| r.get(field)) {
        *counts.entry(value.to_string()).or_insert(0) += 1;
    }
    counts
}
