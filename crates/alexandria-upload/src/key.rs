//! Storage keys derived from export file names.

use crate::{Error, Result};
use chrono::NaiveDate;
use std::path::Path;
use tracing::warn;

pub const DEFAULT_KEY_PREFIX: &str = "alexandria";

/// `<prefix>/<YYYY>/<MM>/<DD>/<basename>` for a file named
/// `<name>_<YYYYMMDD>.<ext>`.
///
/// Only the basename of `filename` is used. The stem must split on `_` into
/// exactly two parts, and the second must be a real calendar date.
pub fn storage_key(prefix: &str, filename: &str) -> Result<String> {
    let base = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| parse_error(filename, "no file name"))?;
    let stem = Path::new(base)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(base);

    let parts: Vec<&str> = stem.split('_').collect();
    let [_, date] = parts.as_slice() else {
        return Err(parse_error(
            filename,
            &format!("expected <name>_<YYYYMMDD>, got {} part(s)", parts.len()),
        ));
    };
    if date.len() != 8 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return Err(parse_error(filename, &format!("'{}' is not YYYYMMDD", date)));
    }
    let date = NaiveDate::parse_from_str(date, "%Y%m%d")
        .map_err(|e| parse_error(filename, &format!("'{}': {}", date, e)))?;

    Ok(format!("{}/{}/{}", prefix, date.format("%Y/%m/%d"), base))
}

/// [`storage_key`], logging a warning and returning `None` for names that
/// don't fit the pattern.
pub fn build_storage_key(prefix: &str, filename: &str) -> Option<String> {
    match storage_key(prefix, filename) {
        Ok(key) => Some(key),
        Err(e) => {
            warn!("Skipping file with unexpected name: {}", e);
            None
        }
    }
}

fn parse_error(file: &str, reason: &str) -> Error {
    Error::FilenameParse {
        file: file.to_string(),
        reason: reason.to_string(),
    }
}
