use super::Locator;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use std::path::Path;

fn default_submenu() -> Locator {
    Locator::css_with_text("a", "Financial Totals")
}

/// One report to pull from the Reports menu.
#[derive(Debug, Clone, Deserialize)]
pub struct ReportJob {
    /// Display name, also used by `--report` filtering.
    pub name: String,

    /// Menu entry hovered to expand the third-level submenu.
    #[serde(default = "default_submenu")]
    pub submenu: Locator,

    /// Submenu link that opens the report popup.
    pub link: Locator,

    /// Report option clicked inside the popup.
    pub option: Locator,

    /// Run button inside the popup; clicking it starts the download.
    pub trigger: Locator,

    /// How the saved file is named.
    #[serde(default)]
    pub naming: FileNaming,
}

/// Destination file naming for a downloaded report.
///
/// Written as a map with a `kind` field, e.g.
/// `{ kind: month_to_date, prefix: endofdaytotals }`.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FileNaming {
    /// `{prefix}_{first of month:%Y%m%d}_{run date:%Y%m%d}{.ext}`, with the
    /// extension taken from the portal's suggested filename.
    MonthToDate { prefix: String },
    /// Keep the portal's suggested filename as is.
    #[default]
    Suggested,
}

impl FileNaming {
    /// Compute the destination filename. Pure function of its inputs.
    pub fn file_name(&self, suggested: &str, run_date: NaiveDate) -> String {
        match self {
            FileNaming::Suggested => suggested.to_string(),
            FileNaming::MonthToDate { prefix } => {
                let month_start = run_date.with_day(1).unwrap_or(run_date);
                let ext = Path::new(suggested)
                    .extension()
                    .map(|e| format!(".{}", e.to_string_lossy()))
                    .unwrap_or_default();
                format!(
                    "{}_{}_{}{}",
                    prefix,
                    month_start.format("%Y%m%d"),
                    run_date.format("%Y%m%d"),
                    ext
                )
            }
        }
    }
}
