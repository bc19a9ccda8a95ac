use crate::key::DEFAULT_KEY_PREFIX;
use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Uploader settings, read from `config.json` next to the binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    pub aws_secret_name: String,
    pub aws_region: String,
    /// Directory walked for CSV files.
    pub local_upload_dir: PathBuf,
    /// First segment of every storage key.
    pub key_prefix: String,
}

#[derive(Deserialize)]
struct RawConfig {
    aws_secret_name: String,
    aws_region: String,
    #[serde(default)]
    local_upload_dir: Option<PathBuf>,
    #[serde(default)]
    key_prefix: Option<String>,
}

impl UploadConfig {
    /// Load from a JSON file. Relative paths resolve against `base_dir`.
    pub fn load(path: &Path, base_dir: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::parse(&content, base_dir)
    }

    pub fn parse(json: &str, base_dir: &Path) -> Result<Self> {
        let raw: RawConfig = serde_json::from_str(json)?;
        if raw.aws_secret_name.trim().is_empty() {
            return Err(Error::Config("aws_secret_name is empty".into()));
        }
        if raw.aws_region.trim().is_empty() {
            return Err(Error::Config("aws_region is empty".into()));
        }

        let local_upload_dir = match raw.local_upload_dir {
            Some(dir) => base_dir.join(dir),
            None => base_dir.join("upload_files"),
        };
        let key_prefix = raw
            .key_prefix
            .map(|p| p.trim_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_KEY_PREFIX.to_string());
        if key_prefix.is_empty() {
            return Err(Error::Config("key_prefix is empty".into()));
        }

        Ok(Self {
            aws_secret_name: raw.aws_secret_name,
            aws_region: raw.aws_region,
            local_upload_dir,
            key_prefix,
        })
    }
}
