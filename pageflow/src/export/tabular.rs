//! Delimited tabular export: one header row, one row per record.

use std::io::{Read, Write};

use crate::errors::{PageflowError, Result};
use crate::extract::ExtractionResult;

/// Writes `results` under `header`, absent values as empty cells.
///
/// Every record must declare exactly the header's fields.
pub fn write_csv<W: Write>(writer: W, header: &[String], results: &[ExtractionResult]) -> Result<()> {
    let mut out = csv::Writer::from_writer(writer);
    if header.is_empty() {
        if results.iter().any(|r| !r.is_empty()) {
            return Err(PageflowError::Export("records have fields but the header is empty".to_string()));
        }
        out.flush()?;
        return Ok(());
    }

    out.write_record(header)?;
    for (row, result) in results.iter().enumerate() {
        if result.len() != header.len() || header.iter().any(|name| !result.has_field(name)) {
            return Err(PageflowError::Export(format!(
                "record {row} has fields {:?}, expected {header:?}",
                result.field_names()
            )));
        }
        out.write_record(header.iter().map(|name| result.get(name).unwrap_or_default()))?;
    }
    out.flush()?;
    Ok(())
}

/// Reads records back, empty cells as absent values.
pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ExtractionResult>> {
    let mut input = csv::Reader::from_reader(reader);
    let header: Vec<String> = input.headers()?.iter().map(str::to_string).collect();

    let mut results = Vec::new();
    for record in input.records() {
        let record = record?;
        results.push(ExtractionResult::from_fields(
            header
                .iter()
                .zip(record.iter())
                .map(|(name, cell)| (name.as_str(), (!cell.is_empty()).then_some(cell))),
        ));
    }
    Ok(results)
}
