//! # alexandria-upload
//!
//! Pushes date-stamped CSV exports to S3. A file named
//! `<name>_<YYYYMMDD>.csv` lands at `<prefix>/<YYYY>/<MM>/<DD>/<file>`; the
//! bucket name comes from a Secrets Manager secret.
//!
//! ```rust,no_run
//! use alexandria_upload::{bucket_name, upload_matching_files, S3Store, SecretSource, SecretsManager, UploadConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> alexandria_upload::Result<()> {
//! let base = std::path::Path::new(".");
//! let config = UploadConfig::load(&base.join("config.json"), base)?;
//! let secrets = SecretsManager::connect(&config.aws_region).await;
//! let bucket = bucket_name(&config.aws_secret_name, &secrets.secret_json(&config.aws_secret_name).await?)?;
//! let store = S3Store::connect(&config.aws_region).await;
//! let summary = upload_matching_files(&store, &config.local_upload_dir, &bucket, &config.key_prefix).await?;
//! println!("{} uploaded", summary.uploaded.len());
//! # Ok(())
//! # }
//! ```

mod aws;
mod config;
mod key;
pub mod logging;
mod secrets;
mod upload;

pub use config::UploadConfig;
pub use key::{build_storage_key, storage_key, DEFAULT_KEY_PREFIX};
pub use secrets::{bucket_name, SecretSource, SecretsManager, BUCKET_NAME_KEY};
pub use upload::{upload_matching_files, ObjectStore, S3Store, UploadSummary};

/// Result type for alexandria-upload operations.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("failed to retrieve secret '{name}': {message}")]
    SecretRetrieval { name: String, message: String },

    #[error("failed to upload {file} to s3://{bucket}/{key}: {message}")]
    Upload {
        file: String,
        bucket: String,
        key: String,
        message: String,
    },

    #[error("cannot derive storage key from '{file}': {reason}")]
    FilenameParse { file: String, reason: String },

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
