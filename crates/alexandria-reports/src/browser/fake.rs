//! Scripted in-memory browser for unit tests.
//!
//! Elements are keyed by the locator's display string. A probe for an absent
//! element sleeps for its full timeout before failing, so tests run under a
//! paused tokio clock see realistic timing. Every call is appended to a
//! shared log.

use super::{BrowserSession, BrowsingContext, DownloadArtifact, PageHandle};
use crate::config::Locator;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

pub type Log = Arc<Mutex<Vec<String>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn entries(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Log entries starting with `prefix`.
pub fn matching(log: &Log, prefix: &str) -> Vec<String> {
    entries(log)
        .into_iter()
        .filter(|e| e.starts_with(prefix))
        .collect()
}

struct ContextInner {
    label: String,
    created: Instant,
    /// Locator key -> delay after creation before it becomes visible.
    elements: Mutex<HashMap<String, Duration>>,
    broken: Mutex<HashSet<String>>,
    log: Log,
}

#[derive(Clone)]
pub struct FakeContext {
    inner: Arc<ContextInner>,
}

impl FakeContext {
    pub fn new(label: &str, log: &Log) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                label: label.to_string(),
                created: Instant::now(),
                elements: Mutex::new(HashMap::new()),
                broken: Mutex::new(HashSet::new()),
                log: Arc::clone(log),
            }),
        }
    }

    pub fn with(self, locator: &Locator) -> Self {
        self.with_after(locator, 0)
    }

    /// Element becomes visible `ms` after the context was created.
    pub fn with_after(self, locator: &Locator, ms: u64) -> Self {
        self.inner
            .elements
            .lock()
            .unwrap()
            .insert(locator.to_string(), Duration::from_millis(ms));
        self
    }

    /// Element is visible but clicking it fails.
    pub fn with_broken(self, locator: &Locator) -> Self {
        self.inner
            .broken
            .lock()
            .unwrap()
            .insert(locator.to_string());
        self.with(locator)
    }

    fn record(&self, entry: String) {
        self.inner.log.lock().unwrap().push(entry);
    }

    async fn probe(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.record(format!("probe {} {}", self.inner.label, locator));
        let appears = self
            .inner
            .elements
            .lock()
            .unwrap()
            .get(&locator.to_string())
            .map(|delay| self.inner.created + *delay);
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        match appears {
            Some(at) if at <= deadline => {
                tokio::time::sleep_until(at).await;
                Ok(())
            }
            _ => {
                tokio::time::sleep_until(deadline).await;
                Err(Error::Timeout(format!("{} after {}ms", locator, timeout_ms)))
            }
        }
    }
}

#[async_trait]
impl BrowsingContext for FakeContext {
    fn label(&self) -> String {
        self.inner.label.clone()
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.probe(locator, timeout_ms).await
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.probe(locator, timeout_ms).await?;
        if self.inner.broken.lock().unwrap().contains(&locator.to_string()) {
            self.record(format!("click-failed {} {}", self.inner.label, locator));
            return Err(Error::ActionFailed(format!("{} is not clickable", locator)));
        }
        self.record(format!("click {} {}", self.inner.label, locator));
        Ok(())
    }

    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.probe(locator, timeout_ms).await?;
        self.record(format!("hover {} {}", self.inner.label, locator));
        Ok(())
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()> {
        self.probe(locator, timeout_ms).await?;
        self.record(format!("fill {} {}={}", self.inner.label, locator, value));
        Ok(())
    }
}

#[derive(Clone)]
pub struct FakePage {
    pub ctx: FakeContext,
    id: String,
    url: Arc<Mutex<String>>,
    frames: Arc<Vec<FakeContext>>,
    loads: bool,
}

impl FakePage {
    pub fn new(id: &str, url: &str, log: &Log) -> Self {
        Self {
            ctx: FakeContext::new(id, log),
            id: id.to_string(),
            url: Arc::new(Mutex::new(url.to_string())),
            frames: Arc::new(Vec::new()),
            loads: true,
        }
    }

    pub fn with(mut self, locator: &Locator) -> Self {
        self.ctx = self.ctx.with(locator);
        self
    }

    pub fn with_after(mut self, locator: &Locator, ms: u64) -> Self {
        self.ctx = self.ctx.with_after(locator, ms);
        self
    }

    pub fn with_broken(mut self, locator: &Locator) -> Self {
        self.ctx = self.ctx.with_broken(locator);
        self
    }

    pub fn with_frames(mut self, frames: Vec<FakeContext>) -> Self {
        self.frames = Arc::new(frames);
        self
    }

    /// `wait_for_content_loaded` fails on this page.
    pub fn never_loads(mut self) -> Self {
        self.loads = false;
        self
    }
}

#[async_trait]
impl BrowsingContext for FakePage {
    fn label(&self) -> String {
        self.ctx.label()
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.ctx.wait_visible(locator, timeout_ms).await
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.ctx.click(locator, timeout_ms).await
    }

    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.ctx.hover(locator, timeout_ms).await
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()> {
        self.ctx.fill(locator, value, timeout_ms).await
    }
}

#[async_trait]
impl PageHandle for FakePage {
    type Frame = FakeContext;

    fn id(&self) -> &str {
        &self.id
    }

    async fn url(&self) -> Result<String> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.ctx.record(format!("goto {} {}", self.id, url));
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn wait_for_content_loaded(&self, timeout_ms: u64) -> Result<()> {
        if self.loads {
            Ok(())
        } else {
            tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
            Err(Error::Timeout(format!("{} never loaded", self.id)))
        }
    }

    async fn frames(&self) -> Result<Vec<FakeContext>> {
        Ok(self.frames.as_ref().clone())
    }

    async fn settle(&self, ms: u64) {
        self.ctx.record(format!("settle {} {}", self.id, ms));
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(b"\x89PNG".to_vec())
    }
}

/// Session whose popups and downloads are registered up front, keyed by the
/// locator that triggers them.
pub struct FakeSession {
    pages: Mutex<Vec<FakePage>>,
    active: Mutex<String>,
    popups: Mutex<HashMap<String, FakePage>>,
    downloads: Mutex<HashMap<String, DownloadArtifact>>,
    log: Log,
}

impl FakeSession {
    pub fn new(pages: Vec<FakePage>, log: &Log) -> Self {
        let active = pages.first().map(|p| p.id.clone()).unwrap_or_default();
        Self {
            pages: Mutex::new(pages),
            active: Mutex::new(active),
            popups: Mutex::new(HashMap::new()),
            downloads: Mutex::new(HashMap::new()),
            log: Arc::clone(log),
        }
    }

    pub fn set_active(&self, id: &str) {
        *self.active.lock().unwrap() = id.to_string();
    }

    pub fn add_popup(&self, trigger: &Locator, popup: FakePage) {
        self.popups
            .lock()
            .unwrap()
            .insert(trigger.to_string(), popup);
    }

    pub fn add_download(&self, trigger: &Locator, artifact: DownloadArtifact) {
        self.downloads
            .lock()
            .unwrap()
            .insert(trigger.to_string(), artifact);
    }

    pub fn page_ids(&self) -> Vec<String> {
        self.pages.lock().unwrap().iter().map(|p| p.id.clone()).collect()
    }

    fn record(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    type Page = FakePage;

    async fn active_page(&self) -> Result<FakePage> {
        let active = self.active.lock().unwrap().clone();
        self.pages
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == active)
            .cloned()
            .ok_or_else(|| Error::ActionFailed("no active page".into()))
    }

    async fn pages(&self) -> Result<Vec<FakePage>> {
        Ok(self.pages.lock().unwrap().clone())
    }

    async fn bring_to_front(&self, page: &FakePage) -> Result<()> {
        self.record(format!("front {}", page.id));
        self.set_active(&page.id);
        Ok(())
    }

    async fn click_expect_popup(
        &self,
        page: &FakePage,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<FakePage> {
        page.click(locator, timeout_ms).await?;
        let popup = self.popups.lock().unwrap().remove(&locator.to_string());
        match popup {
            Some(popup) => {
                self.record(format!("popup {}", popup.id));
                self.pages.lock().unwrap().push(popup.clone());
                self.set_active(&popup.id);
                Ok(popup)
            }
            None => {
                tokio::time::sleep(Duration::from_millis(timeout_ms)).await;
                Err(Error::PopupTimeout(timeout_ms))
            }
        }
    }

    async fn click_expect_download(
        &self,
        page: &FakePage,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<DownloadArtifact> {
        page.click(locator, timeout_ms).await?;
        let artifact = self.downloads.lock().unwrap().remove(&locator.to_string());
        artifact.ok_or_else(|| Error::DownloadTimeout {
            dir: "fake".into(),
            timeout_ms,
        })
    }

    async fn close_page(&self, page: &FakePage) -> Result<()> {
        self.record(format!("close {}", page.id));
        let mut pages = self.pages.lock().unwrap();
        pages.retain(|p| p.id != page.id);
        let mut active = self.active.lock().unwrap();
        if *active == page.id {
            *active = pages.last().map(|p| p.id.clone()).unwrap_or_default();
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.record("session closed".into());
        Ok(())
    }
}
