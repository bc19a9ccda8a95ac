//! Console plus per-run log file.

use crate::Result;
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// `<YYYY-MM-DD-HH-MM>_<stem>.log`
pub fn log_file_name(now: DateTime<Local>, stem: &str) -> String {
    format!("{}_{}.log", now.format("%Y-%m-%d-%H-%M"), stem)
}

/// Install the global subscriber.
///
/// The console shows `level` and above (`RUST_LOG` overrides it). With a
/// `log_dir`, everything at debug and above also goes to a timestamped file
/// there. Keep the returned guard alive until exit so the file is flushed.
pub fn init(level: Level, log_dir: Option<&Path>, stem: &str) -> Result<Option<WorkerGuard>> {
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(LevelFilter::from_level(level).to_string()));
    let console = fmt::layer()
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .with_filter(console_filter);

    let (file, guard) = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let name = log_file_name(Local::now(), stem);
            let appender = tracing_appender::rolling::never(dir, &name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_target(true)
                .with_writer(writer)
                .with_filter(LevelFilter::DEBUG);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .try_init()
        .map_err(|e| crate::Error::Config(format!("logging already initialized: {}", e)))?;
    Ok(guard)
}

/// Where [`init`] writes the file for a run started `now`.
pub fn log_path(dir: &Path, now: DateTime<Local>, stem: &str) -> PathBuf {
    dir.join(log_file_name(now, stem))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let now = Local.with_ymd_and_hms(2024, 3, 18, 6, 5, 0).unwrap();
        assert_eq!(log_file_name(now, "ReportRun"), "2024-03-18-06-05_ReportRun.log");
        assert_eq!(
            log_path(Path::new("logs"), now, "ReportRun"),
            Path::new("logs").join("2024-03-18-06-05_ReportRun.log")
        );
    }
}
