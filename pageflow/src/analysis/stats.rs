//! Numeric statistics for one field.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

use serde::Serialize;
use std::fmt;

use crate::extract::ExtractionResult;

/// Parses a field value as a number; unparseable values are missing.
#[must_use]
pub fn numeric_value(result: &ExtractionResult, field: &str) -> Option<f64> {
    result
        .get(field)
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Descriptive statistics of a numeric field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NumericSummary {
    /// Field summarized.
    pub field: String,
    /// Records with a numeric value.
    pub count: usize,
    /// Records with the field absent or not numeric.
    pub missing: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std_dev: Option<f64>,
    /// Smallest value.
    pub min: f64,
    /// First quartile.
    pub q1: f64,
    /// Median.
    pub median: f64,
    /// Third quartile.
    pub q3: f64,
    /// Largest value.
    pub max: f64,
}

impl fmt::Display for NumericSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}:", self.field)?;
        writeln!(f, "  count   {}", self.count)?;
        writeln!(f, "  missing {}", self.missing)?;
        writeln!(f, "  mean    {:.2}", self.mean)?;
        match self.std_dev {
            Some(std) => writeln!(f, "  std     {std:.2}")?,
            None => writeln!(f, "  std     -")?,
        }
        writeln!(f, "  min     {:.2}", self.min)?;
        writeln!(f, "  25%     {:.2}", self.q1)?;
        writeln!(f, "  50%     {:.2}", self.median)?;
        writeln!(f, "  75%     {:.2}", self.q3)?;
        write!(f, "  max     {:.2}", self.max)
    }
}

/// Linear interpolation between closest ranks of a sorted slice.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}

/// Summarizes `field` over `results`; `None` if no value is numeric.
#[must_use]
pub fn summarize(results: &[ExtractionResult], field: &str) -> Option<NumericSummary> {
    let mut values: Vec<f64> = results.iter().filter_map(|r| numeric_value(r, field)).collect();
    if values.is_empty() {
        return None;
    }
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std_dev = (count > 1).then(|| {
        let squares: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (squares / (count - 1) as f64).sqrt()
    });

    Some(NumericSummary {
        field: field.to_string(),
        count,
        missing: results.len() - count,
        mean,
        std_dev,
        min: values[0],
        q1: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q3: quantile(&values, 0.75),
        max: values[count - 1],
    })
}

/// The first record holding the largest numeric value of `field`.
#[must_use]
pub fn max_by_field<'a>(results: &'a [ExtractionResult], field: &str) -> Option<&'a ExtractionResult> {
    extreme(results, field, |candidate, best| candidate > best)
}

/// The first record holding the smallest numeric value of `field`.
#[must_use]
pub fn min_by_field<'a>(results: &'a [ExtractionResult], field: &str) -> Option<&'a ExtractionResult> {
    extreme(results, field, |candidate, best| candidate < best)
}

fn extreme<'a>(
    results: &'a [ExtractionResult],
    field: &str,
    better: impl Fn(f64, f64) -> bool,
) -> Option<&'a ExtractionResult> {
    let mut best: Option<(f64, &ExtractionResult)> = None;
    for result in results {
        let Some(value) = numeric_value(result, field) else {
            continue;
        };
        if best.map_or(true, |(current, _)| better(value, current)) {
            best = Some((value, result));
        }
    }
    best.map(|(_, result)| result)
}

/// One histogram bin, `(lower, upper]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    /// Exclusive lower edge; the first bin also holds values equal to it.
    pub lower: f64,
    /// Inclusive upper edge.
    pub upper: f64,
    /// Values in the bin.
    pub count: usize,
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.3}, {:.3}]  {}", self.lower, self.upper, self.count)
    }
}

/// Splits the numeric values of `field` into `bins` equal-width buckets.
///
/// The range spans the smallest to the largest value. When every value is
/// the same the range is widened by 0.1% on each side. Empty when no value
/// is numeric or `bins` is zero.
#[must_use]
pub fn histogram(results: &[ExtractionResult], field: &str, bins: usize) -> Vec<Bucket> {
    let values: Vec<f64> = results.iter().filter_map(|r| numeric_value(r, field)).collect();
    if values.is_empty() || bins == 0 {
        return Vec::new();
    }
    let mut low = values.iter().copied().fold(f64::INFINITY, f64::min);
    let mut high = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (high - low).abs() < f64::EPSILON {
        let pad = if low == 0.0 { 0.001 } else { low.abs() * 0.001 };
        low -= pad;
        high += pad;
    }

    let width = (high - low) / bins as f64;
    let mut buckets: Vec<Bucket> = (0..bins)
        .map(|i| Bucket {
            lower: low + width * i as f64,
            upper: if i + 1 == bins { high } else { low + width * (i + 1) as f64 },
            count: 0,
        })
        .collect();
    for value in values {
        let index = (((value - low) / width).ceil() as usize).saturating_sub(1).min(bins - 1);
        buckets[index].count += 1;
    }
    buckets
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn books(prices: &[Option<&str>]) -> Vec<ExtractionResult> {
        prices
            .iter()
            .enumerate()
            .map(|(i, price)| {
                ExtractionResult::from_fields([("title", Some(format!("Book {i}"))), ("price", price.map(str::to_string))])
            })
            .collect()
    }

    #[test]
    fn test_summary_skips_missing_and_non_numeric() {
        let results = books(&[Some("10"), Some("20"), None, Some("n/a"), Some("30"), Some("40")]);
        let summary = summarize(&results, "price").unwrap();

        assert_eq!(summary.count, 4);
        assert_eq!(summary.missing, 2);
        assert!((summary.mean - 25.0).abs() < 1e-9);
        assert!((summary.std_dev.unwrap() - 12.909_944).abs() < 1e-5);
        assert!((summary.min - 10.0).abs() < 1e-9);
        assert!((summary.q1 - 17.5).abs() < 1e-9);
        assert!((summary.median - 25.0).abs() < 1e-9);
        assert!((summary.q3 - 32.5).abs() < 1e-9);
        assert!((summary.max - 40.0).abs() < 1e-9);
        assert!(summary.to_string().contains("mean    25.00"));
    }

    #[test]
    fn test_summary_of_single_value() {
        let summary = summarize(&books(&[Some("51.77")]), "price").unwrap();
        assert_eq!(summary.std_dev, None);
        assert!((summary.median - 51.77).abs() < 1e-9);
        assert!(summarize(&books(&[None, Some("free")]), "price").is_none());
    }

    #[test]
    fn test_extremes_pick_first_record() {
        let results = books(&[Some("12.5"), Some("60"), Some("3"), Some("60"), Some("3")]);
        assert_eq!(max_by_field(&results, "price").unwrap().get("title"), Some("Book 1"));
        assert_eq!(min_by_field(&results, "price").unwrap().get("title"), Some("Book 2"));
        assert!(max_by_field(&results, "rating").is_none());
    }

    #[test]
    fn test_histogram_equal_width() {
        let results = books(&[Some("0"), Some("1"), Some("2"), Some("5"), Some("10"), None]);
        let buckets = histogram(&results, "price", 5);

        assert_eq!(buckets.len(), 5);
        assert_eq!(buckets.iter().map(|b| b.count).collect::<Vec<_>>(), vec![3, 0, 1, 0, 1]);
        assert!((buckets[0].lower - 0.0).abs() < 1e-9);
        assert!((buckets[0].upper - 2.0).abs() < 1e-9);
        assert!((buckets[4].upper - 10.0).abs() < 1e-9);
        assert_eq!(buckets[0].to_string(), "(0.000, 2.000]  3");
    }

    #[test]
    fn test_histogram_of_constant_values() {
        let buckets = histogram(&books(&[Some("20"), Some("20")]), "price", 2);
        assert_eq!(buckets.iter().map(|b| b.count).sum::<usize>(), 2);
        assert!(buckets[0].lower < 20.0 && buckets[1].upper > 20.0);
        assert!(histogram(&books(&[None]), "price", 5).is_empty());
        assert!(histogram(&books(&[Some("1")]), "price", 0).is_empty());
    }
}
