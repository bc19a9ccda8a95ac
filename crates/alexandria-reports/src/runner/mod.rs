mod login;
mod main_page;
mod notifications;
mod reports;

pub use login::login;
pub use main_page::find_main_page;
pub use notifications::dismiss_notifications;
pub use reports::{open_reports_menu, run_report, ReportSettings, SavedReport};

use crate::browser::{BrowserSession, EokaSession, PageHandle};
use crate::config::{BrowserConfig, Config, ReportJob};
use crate::credentials::Credentials;
use crate::Result;
use chrono::NaiveDate;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Result of a completed run.
#[derive(Debug)]
pub struct RunResult {
    /// Saved reports, in run order.
    pub reports: Vec<SavedReport>,
    /// Best-effort steps that did not happen.
    pub warnings: Vec<String>,
    /// Total duration in milliseconds.
    pub duration_ms: u64,
}

/// Drives one browser session through login and the configured reports.
pub struct Runner<S: BrowserSession = EokaSession> {
    session: S,
}

impl Runner<EokaSession> {
    /// Launch Chrome with the given browser config.
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        Ok(Self::with_session(EokaSession::launch(config).await?))
    }
}

impl<S: BrowserSession> Runner<S> {
    pub fn with_session(session: S) -> Self {
        Self { session }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// Run every report in the config.
    pub async fn run(
        &self,
        config: &Config,
        credentials: &Credentials,
        run_date: NaiveDate,
    ) -> Result<RunResult> {
        let jobs: Vec<&ReportJob> = config.reports.iter().collect();
        self.run_reports(config, credentials, run_date, &jobs).await
    }

    /// Run only `jobs`, which normally come from [`Config::select_reports`].
    ///
    /// There are no retries. On a fatal error the failure screenshot (if
    /// configured) is written and the error is returned.
    pub async fn run_reports(
        &self,
        config: &Config,
        credentials: &Credentials,
        run_date: NaiveDate,
        jobs: &[&ReportJob],
    ) -> Result<RunResult> {
        let start = Instant::now();
        match self.run_once(config, credentials, run_date, jobs).await {
            Ok((reports, warnings)) => Ok(RunResult {
                reports,
                warnings,
                duration_ms: start.elapsed().as_millis() as u64,
            }),
            Err(e) => {
                warn!("Run failed: {}", e);
                self.handle_failure(config).await;
                Err(e)
            }
        }
    }

    async fn run_once(
        &self,
        config: &Config,
        credentials: &Credentials,
        run_date: NaiveDate,
        jobs: &[&ReportJob],
    ) -> Result<(Vec<SavedReport>, Vec<String>)> {
        let t = &config.timeouts;
        let mut warnings = Vec::new();

        let page = self.session.active_page().await?;
        let submitted = login(&page, &config.portal.url, credentials, &config.login, t).await?;
        if let Some(w) = submitted.warning() {
            warnings.push(w.to_string());
        }

        if let Some(ref snooze) = config.notifications {
            page.wait_for_content_loaded(t.page_load_ms).await?;
            let dismissed = dismiss_notifications(&page, snooze, t.notifications_ms).await;
            debug!("Notifications: {:?}", dismissed);
        }

        let main = find_main_page(&self.session, &config.main_marker, t).await?;

        let settings = ReportSettings::from(config);
        let mut reports = Vec::with_capacity(jobs.len());
        for job in jobs {
            open_reports_menu(&self.session, &main, &config.reports_menu, t).await?;
            let saved = run_report(&self.session, &main, job, &settings, run_date).await?;
            if let Some(w) = saved.close.warning() {
                warnings.push(format!("{}: {}", saved.name, w));
            }
            reports.push(saved);
        }
        Ok((reports, warnings))
    }

    async fn handle_failure(&self, config: &Config) {
        let Some(path) = config
            .on_failure
            .as_ref()
            .and_then(|f| f.screenshot.as_ref())
        else {
            return;
        };
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        let path = path.replace("{timestamp}", &timestamp.to_string());
        info!("Saving failure screenshot to: {}", path);

        let data = match self.session.active_page().await {
            Ok(page) => page.screenshot().await,
            Err(e) => Err(e),
        };
        match data {
            Ok(data) => {
                if let Some(parent) = std::path::Path::new(&path).parent() {
                    let _ = std::fs::create_dir_all(parent);
                }
                if let Err(e) = std::fs::write(&path, data) {
                    warn!("Failed to save screenshot: {}", e);
                }
            }
            Err(e) => warn!("Failed to take screenshot: {}", e),
        }
    }

    /// Close the browser.
    pub async fn close(self) -> Result<()> {
        self.session.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::browser::fake::{self, FakePage, FakeSession};
    use crate::browser::DownloadArtifact;
    use crate::config::{Locator, Params};
    use crate::Error;
    use std::path::Path;

    fn config(output_dir: &Path) -> Config {
        let params = Params::new().set("AMD_URL", "https://portal.example.com");
        let mut config = Config::load_with_params("configs/alexandria.yaml", &params).unwrap();
        config.output_dir = output_dir.to_path_buf();
        config
    }

    fn creds() -> Credentials {
        Credentials {
            username: "jane".into(),
            password: "secret".into(),
            office_key: "1234".into(),
        }
    }

    fn run_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 18).unwrap()
    }

    /// Portal where login happens in the first tab and the app opens in a
    /// second one, with a popup and download registered for every report.
    fn portal(config: &Config, downloads: &Path, log: &fake::Log) -> FakeSession {
        let login = &config.login;
        let login_page = FakePage::new("login", "about:blank", log)
            .with(&login.username)
            .with(&login.password)
            .with(&login.office_key)
            .with(&login.submit);

        let mut app = FakePage::new("app", "https://portal.example.com/app", log)
            .with(&config.main_marker)
            .with(&config.reports_menu);
        for job in &config.reports {
            app = app.with(&job.submenu).with(&job.link);
        }

        let session = FakeSession::new(vec![login_page, app], log);
        for (i, job) in config.reports.iter().enumerate() {
            let popup = FakePage::new(&format!("popup{}", i), "https://portal/report", log)
                .with(&job.option)
                .with(&job.trigger)
                .with(&config.popup_close);
            session.add_popup(&job.link, popup);

            let suggested = format!("Report{}.xlsx", i);
            let file = downloads.join(&suggested);
            std::fs::write(&file, job.name.as_bytes()).unwrap();
            session.add_download(
                &job.trigger,
                DownloadArtifact {
                    suggested_filename: suggested,
                    path: file,
                },
            );
        }
        session
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_run() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("out");
        let config = config(&out);
        let log = fake::new_log();
        let runner = Runner::with_session(portal(&config, tmp.path(), &log));

        let result = runner.run(&config, &creds(), run_date()).await.unwrap();

        let names: Vec<_> = result
            .reports
            .iter()
            .map(|r| r.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            names,
            [
                "endofdaytotals_20240301_20240318.xlsx",
                "transactiondetail_20240301_20240318.xlsx"
            ]
        );
        assert_eq!(
            std::fs::read_to_string(out.join("transactiondetail_20240301_20240318.xlsx")).unwrap(),
            "Transaction Detail"
        );
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        // the Reports menu is reopened before every report
        let menu_clicks = fake::matching(&log, "click app selector 'a.dropdown-toggle'");
        assert_eq!(menu_clicks.len(), 2);
        assert_eq!(runner.session().page_ids(), ["login", "app"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_selected_reports_only() {
        let tmp = tempfile::tempdir().unwrap();
        let config = config(tmp.path());
        let log = fake::new_log();
        let runner = Runner::with_session(portal(&config, tmp.path(), &log));

        let jobs = config
            .select_reports(&["Transaction Detail".to_string()])
            .unwrap();
        let result = runner
            .run_reports(&config, &creds(), run_date(), &jobs)
            .await
            .unwrap();

        assert_eq!(result.reports.len(), 1);
        assert_eq!(result.reports[0].name, "Transaction Detail");
        assert!(fake::matching(&log, "popup popup0").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_writes_screenshot() {
        let tmp = tempfile::tempdir().unwrap();
        let mut config = config(tmp.path());
        let shots = tmp.path().join("shots");
        config.on_failure = Some(crate::config::OnFailure {
            screenshot: Some(shots.join("failure_{timestamp}.png").display().to_string()),
        });
        config.main_marker = Locator::css("#never-there");

        let log = fake::new_log();
        let runner = Runner::with_session(portal(&config, tmp.path(), &log));
        let err = runner.run(&config, &creds(), run_date()).await.unwrap_err();

        assert!(matches!(err, Error::MainPageNotFound { .. }), "{}", err);
        let written: Vec<_> = std::fs::read_dir(&shots).unwrap().collect();
        assert_eq!(written.len(), 1);
    }
}
