use alexandria_upload::{
    bucket_name, logging, upload_matching_files, S3Store, SecretSource, SecretsManager,
    UploadConfig,
};
use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, Level};

#[derive(Parser)]
#[command(name = "alexandria-upload")]
#[command(about = "Upload matching CSV files to S3")]
#[command(version)]
struct Cli {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// Directory holding config.json, logs/ and upload_files/
    /// (defaults to the executable's directory)
    #[arg(long, value_name = "DIR")]
    base_dir: Option<PathBuf>,

    /// Config file (defaults to <base-dir>/config.json)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn default_base_dir() -> anyhow::Result<PathBuf> {
    let exe = std::env::current_exe().context("cannot locate the executable")?;
    Ok(exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(".")))
}

async fn run(base_dir: &Path, config_path: &Path) -> anyhow::Result<()> {
    let config = UploadConfig::load(config_path, base_dir)?;

    let secrets = SecretsManager::connect(&config.aws_region).await;
    let secret = secrets.secret_json(&config.aws_secret_name).await?;
    let bucket = bucket_name(&config.aws_secret_name, &secret)?;

    let store = S3Store::connect(&config.aws_region).await;
    let summary =
        upload_matching_files(&store, &config.local_upload_dir, &bucket, &config.key_prefix)
            .await
            .with_context(|| format!("walking {}", config.local_upload_dir.display()))?;
    info!(
        "{} uploaded, {} skipped, {} failed",
        summary.uploaded.len(),
        summary.skipped.len(),
        summary.failed.len()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let base_dir = match cli.base_dir {
        Some(dir) => dir,
        None => default_base_dir()?,
    };
    let level = if cli.debug { Level::DEBUG } else { Level::INFO };
    let (log_file, _guard) = logging::init(level, &base_dir.join("logs"))?;
    info!("Logging to {}", log_file.display());

    info!("--- Starting File Upload to S3 ---");
    let config_path = cli.config.unwrap_or_else(|| base_dir.join("config.json"));
    match run(&base_dir, &config_path).await {
        Ok(()) => info!("--- Upload complete ---"),
        // reported, not propagated: the exit status stays 0
        Err(e) => error!("CRITICAL: Upload process failed: {:#}", e),
    }
    Ok(())
}
