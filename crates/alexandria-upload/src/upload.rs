use crate::key::build_storage_key;
use crate::{Error, Result};
use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Destination for uploaded files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()>;
}

/// Amazon S3.
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    pub fn new(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }

    pub async fn connect(region: &str) -> Self {
        let config = crate::aws::sdk_config(region).await;
        Self::new(aws_sdk_s3::Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let upload_error = |message: String| Error::Upload {
            file: path.display().to_string(),
            bucket: bucket.to_string(),
            key: key.to_string(),
            message,
        };
        let body = ByteStream::from_path(path)
            .await
            .map_err(|e| upload_error(e.to_string()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .content_type("text/csv")
            .body(body)
            .send()
            .await
            .map_err(|e| upload_error(DisplayErrorContext(&e).to_string()))?;
        Ok(())
    }
}

/// What one upload pass did.
#[derive(Debug, Default)]
pub struct UploadSummary {
    /// Storage keys written.
    pub uploaded: Vec<String>,
    /// CSV files whose names don't carry a date.
    pub skipped: Vec<PathBuf>,
    /// Files that failed to upload, with the reason.
    pub failed: Vec<(PathBuf, String)>,
}

/// Upload every dated `.csv` under `dir` to `bucket`.
///
/// The walk is recursive and sorted. Files without a derivable key are
/// skipped and a failed upload doesn't stop the rest; both show up in the
/// summary. Only an unreadable directory is an error. A missing `dir` uploads
/// nothing.
pub async fn upload_matching_files<S: ObjectStore + ?Sized>(
    store: &S,
    dir: &Path,
    bucket: &str,
    prefix: &str,
) -> Result<UploadSummary> {
    let mut summary = UploadSummary::default();
    if !dir.is_dir() {
        warn!("Upload directory {} does not exist", dir.display());
        return Ok(summary);
    }

    for path in csv_files(dir)? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let Some(key) = build_storage_key(prefix, &name) else {
            summary.skipped.push(path);
            continue;
        };

        info!("Uploading {} to s3://{}/{}", path.display(), bucket, key);
        match store.put_file(bucket, &key, &path).await {
            Ok(()) => {
                info!("Upload successful.");
                summary.uploaded.push(key);
            }
            Err(e) => {
                error!("Failed to upload {}: {}", name, e);
                summary.failed.push((path, e.to_string()));
            }
        }
    }
    Ok(summary)
}

/// Files ending in `.csv`, depth first: a directory's files before its
/// subdirectories, each level sorted by name.
fn csv_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut dirs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            dirs.push(path);
        } else if path.to_string_lossy().ends_with(".csv") {
            files.push(path);
        }
    }
    files.sort();
    dirs.sort();
    debug!("{}: {} csv file(s)", dir.display(), files.len());

    for sub in dirs {
        files.extend(csv_files(&sub)?);
    }
    Ok(files)
}
