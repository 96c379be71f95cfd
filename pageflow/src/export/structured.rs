//! Structured export: a JSON array of records.

use std::io::{Read, Write};

use crate::errors::Result;
use crate::extract::ExtractionResult;

/// Writes `results` as a pretty-printed array, absent values as `null`.
pub fn write_json<W: Write>(writer: W, results: &[ExtractionResult]) -> Result<()> {
    serde_json::to_writer_pretty(writer, results)?;
    Ok(())
}

/// Reads an array of records written by [`write_json`].
pub fn read_json<R: Read>(reader: R) -> Result<Vec<ExtractionResult>> {
    Ok(serde_json::from_reader(reader)?)
}
