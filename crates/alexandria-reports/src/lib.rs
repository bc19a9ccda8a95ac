//! # alexandria-reports
//!
//! Portal report automation. Log in, find the main application page, walk the
//! Reports menu and capture each report download under a date-stamped name.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use alexandria_reports::{Config, EnvCredentials, Runner};
//!
//! # #[tokio::main]
//! # async fn main() -> alexandria_reports::Result<()> {
//! let config = Config::load("configs/alexandria.yaml")?;
//! let credentials = alexandria_reports::resolve_credentials(&[&EnvCredentials::default()])?;
//! let runner = Runner::launch(&config.browser).await?;
//! let result = runner
//!     .run(&config, &credentials, chrono::Local::now().date_naive())
//!     .await?;
//! println!("Saved {} reports", result.reports.len());
//! runner.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod browser;
mod config;
mod credentials;
pub mod logging;
pub mod resolver;
mod runner;

pub use browser::{BrowserSession, BrowsingContext, DownloadArtifact, PageHandle};
pub use config::{
    BrowserConfig, Config, FileNaming, Locator, LoginConfig, OnFailure, ParamDef, Params,
    ReportJob, Timeouts,
};
pub use credentials::{
    resolve_credentials, CredentialProvider, Credentials, EnvCredentials, PromptCredentials,
};
pub use runner::{
    dismiss_notifications, find_main_page, login, open_reports_menu, run_report, ReportSettings,
    RunResult, Runner, SavedReport,
};

/// Result type for alexandria-reports operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during config loading or a report run.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error("{target} not found (tried: {})", .tried.join(", "))]
    ElementNotFound { target: String, tried: Vec<String> },

    #[error("login form not found (tried: {})", .tried.join(", "))]
    LoginFormNotFound { tried: Vec<String> },

    #[error("main application page not found within {waited_ms}ms")]
    MainPageNotFound { waited_ms: u64 },

    #[error("no popup opened within {0}ms")]
    PopupTimeout(u64),

    #[error("no download completed in {dir} within {timeout_ms}ms")]
    DownloadTimeout { dir: String, timeout_ms: u64 },

    #[error("no credential provider supplied username, password and office key")]
    MissingCredentials,

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("action failed: {0}")]
    ActionFailed(String),
}

/// Result of a best-effort step.
///
/// Optional UI (notification dialogs, popup close buttons, the submit button
/// fallback) never fails a run. Callers still get to see whether the step
/// actually happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Completed,
    Degraded(String),
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed)
    }

    /// The reason, if the step was skipped or only partly done.
    pub fn warning(&self) -> Option<&str> {
        match self {
            Outcome::Completed => None,
            Outcome::Degraded(reason) => Some(reason),
        }
    }
}
