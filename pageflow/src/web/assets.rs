//! Downloading images and other assets referenced by extracted records.

use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::fetcher::Fetcher;
use super::page::parse_url;
use crate::errors::PageflowError;
use crate::extract::ExtractionResult;

/// Extension used when the URL path has none.
pub const DEFAULT_ASSET_EXTENSION: &str = "jpg";

/// Turns a record name into a file stem: letters, digits, `-` and `_`,
/// with whitespace runs as a single `_`.
fn file_stem(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    let mut last_underscore = false;
    for ch in name.chars() {
        if ch.is_alphanumeric() || ch == '-' {
            out.push(ch);
            last_underscore = false;
        } else if (ch.is_whitespace() || ch == '_') && !last_underscore {
            out.push('_');
            last_underscore = true;
        }
    }
    let out = out.trim_matches('_');
    (!out.is_empty()).then(|| out.to_string())
}

/// Extension of the last path segment, or [`DEFAULT_ASSET_EXTENSION`].
fn extension_of(url: &str) -> String {
    parse_url(url)
        .ok()
        .and_then(|url| {
            let segment = url.path_segments()?.next_back()?.to_string();
            let (_, ext) = segment.rsplit_once('.')?;
            (!ext.is_empty() && ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
                .then(|| ext.to_ascii_lowercase())
        })
        .unwrap_or_else(|| DEFAULT_ASSET_EXTENSION.to_string())
}

/// Fetches `url` and saves it as `<dir>/<name>.<ext>`.
///
/// `name` is reduced to a safe file stem and the extension comes from the
/// URL. The directory is created if missing.
pub async fn download_asset(fetcher: &dyn Fetcher, url: &str, dir: &Path, name: &str) -> Result<PathBuf, PageflowError> {
    let stem = file_stem(name).ok_or_else(|| PageflowError::Export(format!("'{name}' is not usable as a file name")))?;
    let path = dir.join(format!("{stem}.{}", extension_of(url)));
    save(fetcher, url, &path).await?;
    Ok(path)
}

async fn save(fetcher: &dyn Fetcher, url: &str, path: &Path) -> Result<(), PageflowError> {
    let bytes = fetcher.fetch_bytes(url).await?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, &bytes).await?;
    info!(url = %url, path = %path.display(), bytes = bytes.len(), "Asset saved");
    Ok(())
}

/// Downloads the asset of the first record whose `name_field` equals
/// `name`, ignoring case.
///
/// Returns `Ok(None)` when no record matches or the match has no URL.
pub async fn download_asset_named(
    fetcher: &dyn Fetcher,
    results: &[ExtractionResult],
    name_field: &str,
    url_field: &str,
    name: &str,
    dir: &Path,
) -> Result<Option<PathBuf>, PageflowError> {
    let wanted = name.to_lowercase();
    let Some(record) = results
        .iter()
        .find(|r| r.get(name_field).is_some_and(|v| v.to_lowercase() == wanted))
    else {
        warn!(name = %name, "No record with that name");
        return Ok(None);
    };
    let Some(url) = record.get(url_field) else {
        warn!(name = %name, field = %url_field, "Record has no asset URL");
        return Ok(None);
    };
    download_asset(fetcher, url, dir, name).await.map(Some)
}

/// Outcome of [`download_assets`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AssetReport {
    /// Files written, in record order.
    pub saved: Vec<PathBuf>,
    /// `(url, error)` for each failed download.
    pub failed: Vec<(String, String)>,
    /// Records without a URL or a usable name.
    pub skipped: usize,
}

/// Downloads the asset of every record that has both fields.
///
/// Files are named after `name_field`; a repeated name gets a ` (2)`,
/// ` (3)`, ... suffix. A failed download is logged and recorded, not fatal.
pub async fn download_assets(
    fetcher: &dyn Fetcher,
    results: &[ExtractionResult],
    name_field: &str,
    url_field: &str,
    dir: &Path,
) -> AssetReport {
    let mut report = AssetReport::default();
    let mut seen: HashMap<String, usize> = HashMap::new();

    for result in results {
        let (Some(url), Some(stem)) = (result.get(url_field), result.get(name_field).and_then(file_stem)) else {
            report.skipped += 1;
            continue;
        };
        let count = seen.entry(stem.to_lowercase()).or_insert(0);
        *count += 1;
        let file_name = if *count == 1 {
            format!("{stem}.{}", extension_of(url))
        } else {
            format!("{stem} ({count}).{}", extension_of(url))
        };
        let path = dir.join(file_name);

        match save(fetcher, url, &path).await {
            Ok(()) => report.saved.push(path),
            Err(e) => {
                warn!(url = %url, error = %e, "Asset download failed");
                report.failed.push((url.to_string(), e.to_string()));
            }
        }
    }
    report
}
