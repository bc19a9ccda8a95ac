use crate::{Error, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Suffixes browsers use for downloads still in progress.
const PARTIAL_SUFFIXES: &[&str] = &["crdownload", "part", "tmp", "download"];

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// A finished download sitting in the browser's download directory.
#[derive(Debug, Clone)]
pub struct DownloadArtifact {
    /// File name the server suggested (what the browser saved it as).
    pub suggested_filename: String,
    /// Where the browser saved it.
    pub path: PathBuf,
}

impl DownloadArtifact {
    /// Move the file to `dest`, replacing anything already there.
    pub fn save_as(&self, dest: &Path) -> Result<PathBuf> {
        if let Some(parent) = dest.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        if std::fs::rename(&self.path, dest).is_err() {
            // rename fails across filesystems and, on Windows, over an existing file
            std::fs::copy(&self.path, dest)?;
            if let Err(e) = std::fs::remove_file(&self.path) {
                warn!("Could not remove {}: {}", self.path.display(), e);
            }
        }
        Ok(dest.to_path_buf())
    }
}

/// Detects the file a click adds to a download directory.
///
/// Take the snapshot before the click, then [`wait`](Self::wait) for a new
/// complete file.
#[derive(Debug)]
pub struct DownloadWatcher {
    dir: PathBuf,
    before: HashSet<PathBuf>,
}

impl DownloadWatcher {
    pub fn snapshot(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let before = list_files(&dir)?.into_iter().map(|(p, _)| p).collect();
        Ok(Self { dir, before })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Wait until a new file appears and its size holds still across two
    /// polls while no partial download started after the snapshot is
    /// pending. Partial files left over from earlier downloads are ignored.
    pub async fn wait(&self, timeout_ms: u64) -> Result<DownloadArtifact> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut sizes: HashMap<PathBuf, u64> = HashMap::new();

        loop {
            let files: Vec<_> = list_files(&self.dir)?
                .into_iter()
                .filter(|(p, _)| !self.before.contains(p))
                .collect();
            let pending = files.iter().any(|(p, _)| is_partial(p));

            let mut ready = None;
            for (path, size) in &files {
                if is_partial(path) {
                    continue;
                }
                if !pending && sizes.get(path) == Some(size) {
                    ready = Some(path.clone());
                    break;
                }
                sizes.insert(path.clone(), *size);
            }

            if let Some(path) = ready {
                let suggested_filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                debug!("Download finished: {}", path.display());
                return Ok(DownloadArtifact {
                    suggested_filename,
                    path,
                });
            }

            if Instant::now() >= deadline {
                return Err(Error::DownloadTimeout {
                    dir: self.dir.display().to_string(),
                    timeout_ms,
                });
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

fn is_partial(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PARTIAL_SUFFIXES.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn list_files(dir: &Path) -> Result<Vec<(PathBuf, u64)>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let meta = entry.metadata()?;
        if meta.is_file() {
            files.push((entry.path(), meta.len()));
        }
    }
    files.sort();
    Ok(files)
}
