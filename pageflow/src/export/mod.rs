//! Writers for crawl output: CSV and JSON, in memory or to files.

mod structured;
mod tabular;

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;
use tracing::info;

use crate::errors::Result;
use crate::extract::ExtractionResult;

pub use tabular::{read_csv, write_csv};
pub use structured::{read_json, write_json};

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Writes a CSV file, creating parent directories.
pub fn export_csv_file(path: impl AsRef<Path>, header: &[String], results: &[ExtractionResult]) -> Result<()> {
    let path = path.as_ref();
    write_csv(create(path)?, header, results)?;
    info!(path = %path.display(), records = results.len(), "CSV export written");
    Ok(())
}

/// Writes a JSON file, creating parent directories.
pub fn export_json_file(path: impl AsRef<Path>, results: &[ExtractionResult]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = create(path)?;
    write_json(&mut writer, results)?;
    std::io::Write::flush(&mut writer)?;
    info!(path = %path.display(), records = results.len(), "JSON export written");
    Ok(())
}
