use crate::browser::{BrowserSession, BrowsingContext, PageHandle};
use crate::config::{Config, Locator, ReportJob, Timeouts};
use crate::resolver::{resolve, resolve_in_page, Candidate};
use crate::{Outcome, Result};
use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// What a report run needs besides the job itself.
#[derive(Debug, Clone)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
    pub popup_close: Locator,
    pub timeouts: Timeouts,
}

impl From<&Config> for ReportSettings {
    fn from(config: &Config) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            popup_close: config.popup_close.clone(),
            timeouts: config.timeouts.clone(),
        }
    }
}

/// A report file that made it to disk.
#[derive(Debug, Clone)]
pub struct SavedReport {
    pub name: String,
    pub path: PathBuf,
    /// Whether the popup's close button was clicked.
    pub close: Outcome,
}

/// Open the top-level Reports dropdown on the main page.
pub async fn open_reports_menu<S: BrowserSession>(
    session: &S,
    main_page: &S::Page,
    menu: &Locator,
    timeouts: &Timeouts,
) -> Result<()> {
    session.bring_to_front(main_page).await?;
    main_page
        .wait_for_content_loaded(timeouts.page_load_ms)
        .await?;

    let resolved = resolve_in_page(main_page, menu, timeouts.menu_ms, timeouts.menu_ms).await?;
    resolved.context().click(menu, timeouts.action_ms).await?;
    info!("Clicked {} menu", menu);
    Ok(())
}

/// Pull one report: walk the submenu, open the report popup, run it and
/// store the download under its computed name.
///
/// Expects the Reports menu to be open already. Everything up to and
/// including saving the file is fatal; closing the popup afterwards is not.
pub async fn run_report<S: BrowserSession>(
    session: &S,
    main_page: &S::Page,
    job: &ReportJob,
    settings: &ReportSettings,
    run_date: NaiveDate,
) -> Result<SavedReport> {
    let t = &settings.timeouts;
    info!("Running report: {}", job.name);

    session.bring_to_front(main_page).await?;
    main_page.wait_for_content_loaded(t.page_load_ms).await?;

    let here = [Candidate::new(main_page, t.menu_ms)];
    resolve(&here, &job.submenu).await?;
    main_page.hover(&job.submenu, t.menu_ms).await?;
    // the third-level menu renders after a short animation
    main_page.settle(t.settle_ms).await;

    resolve(&here, &job.link).await?;
    let popup = session
        .click_expect_popup(main_page, &job.link, t.popup_ms)
        .await?;
    debug!("Report popup opened: {}", popup.label());
    popup.wait_for_content_loaded(t.page_load_ms).await?;

    popup.click(&job.option, t.action_ms).await?;
    let download = session
        .click_expect_download(&popup, &job.trigger, t.download_ms)
        .await?;

    let file_name = job.naming.file_name(&download.suggested_filename, run_date);
    let path = download.save_as(&settings.output_dir.join(&file_name))?;
    info!("{} report downloaded to: {}", job.name, path.display());

    let close = match popup.click(&settings.popup_close, t.close_ms).await {
        Ok(()) => Outcome::Completed,
        Err(e) => {
            warn!("Could not click close button on {} popup: {}", job.name, e);
            Outcome::Degraded(format!("close button: {}", e))
        }
    };
    if let Err(e) = session.close_page(&popup).await {
        debug!("Closing {} popup: {}", job.name, e);
    }

    Ok(SavedReport {
        name: job.name.clone(),
        path,
        close,
    })
}
