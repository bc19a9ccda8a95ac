//! Browser abstraction used by the runner.
//!
//! The runner only talks to these traits. [`EokaSession`] drives a real
//! Chrome through eoka; tests drive scripted fakes.

mod chrome;
mod download;
#[cfg(test)]
pub(crate) mod fake;
pub(crate) mod scripts;

pub use self::chrome::{EokaFrame, EokaPage, EokaSession};
pub use self::download::{DownloadArtifact, DownloadWatcher};

use crate::config::Locator;
use crate::Result;
use async_trait::async_trait;

/// Anything elements can be looked up in: a page or one of its frames.
#[async_trait]
pub trait BrowsingContext: Send + Sync {
    /// Human-readable name used in logs and `ElementNotFound` errors.
    fn label(&self) -> String;

    /// Wait until `locator` matches a visible element.
    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()>;

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()>;

    /// Move the pointer over the element without clicking.
    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()>;

    /// Replace the element's value with `value`.
    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()>;
}

/// A top-level browsing context (a tab).
#[async_trait]
pub trait PageHandle: BrowsingContext + Clone + 'static {
    type Frame: BrowsingContext;

    /// Stable identifier within the session.
    fn id(&self) -> &str;

    async fn url(&self) -> Result<String>;

    async fn goto(&self, url: &str) -> Result<()>;

    /// Wait for the DOM to be parsed (`interactive` or `complete`).
    async fn wait_for_content_loaded(&self, timeout_ms: u64) -> Result<()>;

    /// Nested frames in document order, depth first.
    async fn frames(&self) -> Result<Vec<Self::Frame>>;

    /// Unconditional pause.
    async fn settle(&self, ms: u64);

    /// PNG screenshot of the viewport.
    async fn screenshot(&self) -> Result<Vec<u8>>;
}

/// One browser with its open pages.
#[async_trait]
pub trait BrowserSession: Send + Sync {
    type Page: PageHandle;

    /// The page the user would currently see.
    async fn active_page(&self) -> Result<Self::Page>;

    /// Every open page, oldest first.
    async fn pages(&self) -> Result<Vec<Self::Page>>;

    async fn bring_to_front(&self, page: &Self::Page) -> Result<()>;

    /// Click `locator` on `page` and return the page the click opened.
    async fn click_expect_popup(
        &self,
        page: &Self::Page,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<Self::Page>;

    /// Click `locator` on `page` and return the finished download it caused.
    async fn click_expect_download(
        &self,
        page: &Self::Page,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<DownloadArtifact>;

    async fn close_page(&self, page: &Self::Page) -> Result<()>;

    async fn close(self) -> Result<()>;
}
