use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

/// File name stem of every uploader log.
pub const LOG_STEM: &str = "UploadRun";

/// `<logs_dir>/<YYYY-MM-DD-HH-MM>_UploadRun.log`
pub fn log_path(logs_dir: &Path, now: DateTime<Local>) -> PathBuf {
    logs_dir.join(format!("{}_{}.log", now.format("%Y-%m-%d-%H-%M"), LOG_STEM))
}

/// Log to stdout and to a per-run file in `logs_dir`, both at `level`.
///
/// Returns the file path and the guard that flushes it on drop.
pub fn init(level: Level, logs_dir: &Path) -> anyhow::Result<(PathBuf, WorkerGuard)> {
    std::fs::create_dir_all(logs_dir)?;
    let path = log_path(logs_dir, Local::now());
    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("bad log path {}", path.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(logs_dir, file_name));

    let filter = LevelFilter::from_level(level);
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stdout)
                .with_filter(filter),
        )
        .with(
            fmt::layer()
                .with_ansi(false)
                .with_target(false)
                .with_writer(writer)
                .with_filter(filter),
        )
        .try_init()?;
    Ok((path, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_path() {
        let now = Local.with_ymd_and_hms(2024, 1, 15, 23, 9, 41).unwrap();
        assert_eq!(
            log_path(Path::new("/opt/alexandria/logs"), now),
            Path::new("/opt/alexandria/logs/2024-01-15-23-09_UploadRun.log")
        );
    }
}
