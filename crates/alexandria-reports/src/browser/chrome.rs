use super::scripts::{self, FrameList, Located, ReadyState};
use super::{BrowserSession, BrowsingContext, DownloadArtifact, DownloadWatcher, PageHandle};
use crate::config::{BrowserConfig, Locator};
use crate::{Error, Result};
use async_trait::async_trait;
use eoka::cdp::MouseEventType;
use eoka::{Browser, Page};
use std::collections::HashSet;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const POLL_MS: u64 = 100;

/// Chrome driven through eoka.
///
/// eoka cannot attach to a tab it did not open, so tabs the portal opens on
/// its own are adopted: the tab's URL is reopened in a page we own and the
/// original tab is closed. Downloads are detected by watching the browser's
/// download directory.
pub struct EokaSession {
    browser: Browser,
    download_dir: PathBuf,
    state: Mutex<SessionState>,
}

struct SessionState {
    pages: Vec<EokaPage>,
    current: String,
}

impl EokaSession {
    pub async fn launch(config: &BrowserConfig) -> Result<Self> {
        let download_dir = config
            .download_dir
            .clone()
            .or_else(dirs::download_dir)
            .ok_or_else(|| {
                Error::Config("no download directory found, set browser.download_dir".into())
            })?;

        let stealth = eoka::StealthConfig {
            headless: config.headless,
            proxy: config.proxy.clone(),
            user_agent: config.user_agent.clone(),
            viewport_width: config.viewport.width,
            viewport_height: config.viewport.height,
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?}, downloads: {})",
            config.headless,
            config.proxy,
            download_dir.display()
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = EokaPage::new(browser.new_page("about:blank").await?);
        let current = page.id.clone();

        Ok(Self {
            browser,
            download_dir,
            state: Mutex::new(SessionState {
                pages: vec![page],
                current,
            }),
        })
    }

    /// Reconcile our page list with the browser's tabs: forget tabs that
    /// closed, adopt tabs opened behind our back.
    async fn sync(&self) -> Result<()> {
        let tabs = self.browser.tabs().await?;
        let live: HashSet<&str> = tabs.iter().map(|t| t.id.as_str()).collect();

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.pages.retain(|p| live.contains(p.id.as_str()));

        let known: HashSet<String> = state.pages.iter().map(|p| p.id.clone()).collect();
        for tab in tabs.iter().filter(|t| !known.contains(&t.id)) {
            if is_blank(&tab.url) {
                continue;
            }
            let page = self.adopt(&tab.id, &tab.url).await?;
            state.current = page.id.clone();
            state.pages.push(page);
        }

        if !state.pages.iter().any(|p| p.id == state.current) {
            if let Some(last) = state.pages.last() {
                state.current = last.id.clone();
            }
        }
        Ok(())
    }

    async fn adopt(&self, tab_id: &str, url: &str) -> Result<EokaPage> {
        info!("Adopting tab {}: {}", tab_id, url);
        let page = EokaPage::new(self.browser.new_page(url).await?);
        if let Err(e) = self.browser.close_tab(tab_id).await {
            warn!("Could not close adopted tab {}: {}", tab_id, e);
        }
        Ok(page)
    }
}

#[async_trait]
impl BrowserSession for EokaSession {
    type Page = EokaPage;

    async fn active_page(&self) -> Result<EokaPage> {
        self.sync().await?;
        let state = self.state.lock().await;
        state
            .pages
            .iter()
            .find(|p| p.id == state.current)
            .cloned()
            .ok_or_else(|| Error::ActionFailed("browser has no open pages".into()))
    }

    async fn pages(&self) -> Result<Vec<EokaPage>> {
        self.sync().await?;
        Ok(self.state.lock().await.pages.clone())
    }

    async fn bring_to_front(&self, page: &EokaPage) -> Result<()> {
        self.browser.activate_tab(&page.id).await?;
        self.state.lock().await.current = page.id.clone();
        Ok(())
    }

    async fn click_expect_popup(
        &self,
        page: &EokaPage,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<EokaPage> {
        let before: HashSet<String> = self
            .browser
            .tabs()
            .await?
            .into_iter()
            .map(|t| t.id)
            .collect();
        page.click(locator, timeout_ms).await?;

        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        loop {
            let opened = self
                .browser
                .tabs()
                .await?
                .into_iter()
                .find(|t| !before.contains(&t.id) && !is_blank(&t.url));
            if let Some(tab) = opened {
                let popup = self.adopt(&tab.id, &tab.url).await?;
                self.browser.activate_tab(&popup.id).await?;
                let mut state = self.state.lock().await;
                state.current = popup.id.clone();
                state.pages.push(popup.clone());
                return Ok(popup);
            }
            if Instant::now() >= deadline {
                return Err(Error::PopupTimeout(timeout_ms));
            }
            tokio::time::sleep(Duration::from_millis(POLL_MS * 2)).await;
        }
    }

    async fn click_expect_download(
        &self,
        page: &EokaPage,
        locator: &Locator,
        timeout_ms: u64,
    ) -> Result<DownloadArtifact> {
        let watcher = DownloadWatcher::snapshot(&self.download_dir)?;
        page.click(locator, timeout_ms).await?;
        watcher.wait(timeout_ms).await
    }

    async fn close_page(&self, page: &EokaPage) -> Result<()> {
        self.browser.close_tab(&page.id).await?;
        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        state.pages.retain(|p| p.id != page.id);
        if state.current == page.id {
            if let Some(last) = state.pages.last() {
                state.current = last.id.clone();
                self.browser.activate_tab(&state.current).await?;
            }
        }
        Ok(())
    }

    async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}

fn is_blank(url: &str) -> bool {
    url.is_empty() || url == "about:blank"
}

/// A tab owned by the session.
#[derive(Clone)]
pub struct EokaPage {
    page: Arc<Page>,
    id: String,
}

impl EokaPage {
    fn new(page: Page) -> Self {
        let id = page.target_id().to_string();
        Self {
            page: Arc::new(page),
            id,
        }
    }
}

/// A frame inside an [`EokaPage`], addressed by its index path.
#[derive(Clone)]
pub struct EokaFrame {
    page: Arc<Page>,
    path: Vec<usize>,
    url: String,
}

#[async_trait]
impl BrowsingContext for EokaPage {
    fn label(&self) -> String {
        format!("page {}", self.id)
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        wait_located(&self.page, &[], locator, timeout_ms, false).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        click_located(&self.page, &[], locator, timeout_ms).await
    }

    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        hover_at(&self.page, &[], locator, timeout_ms).await
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()> {
        fill_in(&self.page, &[], locator, value, timeout_ms).await
    }
}

#[async_trait]
impl BrowsingContext for EokaFrame {
    fn label(&self) -> String {
        let path: Vec<String> = self.path.iter().map(|i| i.to_string()).collect();
        format!("frame {} ({})", path.join("/"), self.url)
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        wait_located(&self.page, &self.path, locator, timeout_ms, false).await?;
        Ok(())
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        click_located(&self.page, &self.path, locator, timeout_ms).await
    }

    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        hover_at(&self.page, &self.path, locator, timeout_ms).await
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()> {
        fill_in(&self.page, &self.path, locator, value, timeout_ms).await
    }
}

#[async_trait]
impl PageHandle for EokaPage {
    type Frame = EokaFrame;

    fn id(&self) -> &str {
        &self.id
    }

    async fn url(&self) -> Result<String> {
        Ok(self.page.url().await?)
    }

    async fn goto(&self, url: &str) -> Result<()> {
        self.page.goto(url).await?;
        Ok(())
    }

    async fn wait_for_content_loaded(&self, timeout_ms: u64) -> Result<()> {
        let page: &Page = &self.page;
        // evaluate fails while a navigation swaps the execution context
        poll_until(timeout_ms, move || async move {
            match page.evaluate::<ReadyState>(scripts::READY_STATE).await {
                Ok(r) if r.state == "interactive" || r.state == "complete" => Attempt::Ready(()),
                Ok(r) => Attempt::Pending(format!("still '{}'", r.state)),
                Err(e) => Attempt::Pending(format!("evaluate failed: {}", e)),
            }
        })
        .await
        .map_err(|why| Error::Timeout(format!("{} after {}ms: {}", self.label(), timeout_ms, why)))
    }

    async fn frames(&self) -> Result<Vec<EokaFrame>> {
        let list: FrameList = self.page.evaluate(&scripts::frames(&[])).await?;
        Ok(list
            .frames
            .into_iter()
            .map(|f| EokaFrame {
                page: Arc::clone(&self.page),
                path: f.path,
                url: if f.url.is_empty() { f.name } else { f.url },
            })
            .collect())
    }

    async fn settle(&self, ms: u64) {
        self.page.wait(ms).await;
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        Ok(self.page.screenshot().await?)
    }
}

/// Result of one polling attempt.
enum Attempt<T> {
    Ready(T),
    Pending(String),
}

/// Call `attempt` every [`POLL_MS`] until it is ready. After the deadline
/// the reason given by the last attempt is returned.
async fn poll_until<T, F, Fut>(timeout_ms: u64, mut attempt: F) -> std::result::Result<T, String>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    loop {
        match attempt().await {
            Attempt::Ready(value) => return Ok(value),
            Attempt::Pending(why) if Instant::now() >= deadline => return Err(why),
            Attempt::Pending(_) => {}
        }
        tokio::time::sleep(Duration::from_millis(POLL_MS)).await;
    }
}

/// Poll until the locator matches a visible element in the document at
/// `path`.
async fn wait_located(
    page: &Page,
    path: &[usize],
    locator: &Locator,
    timeout_ms: u64,
    scroll: bool,
) -> Result<Located> {
    let js = scripts::locate(path, locator, scroll);
    let js = js.as_str();
    poll_until(timeout_ms, move || async move {
        match page.evaluate::<Located>(js).await {
            Ok(l) if l.found && l.visible => Attempt::Ready(l),
            Ok(l) if !l.attached => Attempt::Pending("frame detached".into()),
            Ok(l) if l.found => Attempt::Pending("not visible".into()),
            Ok(_) => Attempt::Pending("no match".into()),
            Err(e) => Attempt::Pending(format!("evaluate failed: {}", e)),
        }
    })
    .await
    .map_err(|why| Error::Timeout(format!("{} after {}ms: {}", locator, timeout_ms, why)))
}

async fn click_located(
    page: &Page,
    path: &[usize],
    locator: &Locator,
    timeout_ms: u64,
) -> Result<()> {
    let at = wait_located(page, path, locator, timeout_ms, true).await?;
    debug!("click: {} at ({:.0}, {:.0})", locator, at.x, at.y);
    page.session()
        .dispatch_mouse_event(MouseEventType::MouseMoved, at.x, at.y, None, None)
        .await?;
    page.click_at(at.x, at.y).await?;
    Ok(())
}

async fn hover_at(page: &Page, path: &[usize], locator: &Locator, timeout_ms: u64) -> Result<()> {
    let at = wait_located(page, path, locator, timeout_ms, true).await?;
    debug!("hover: {}", locator);
    page.session()
        .dispatch_mouse_event(MouseEventType::MouseMoved, at.x, at.y, None, None)
        .await?;
    page.wait(100).await;
    Ok(())
}

async fn fill_in(
    page: &Page,
    path: &[usize],
    locator: &Locator,
    value: &str,
    timeout_ms: u64,
) -> Result<()> {
    wait_located(page, path, locator, timeout_ms, true).await?;
    let focused: Located = page
        .evaluate(&scripts::focus_and_clear(path, locator))
        .await?;
    if !focused.found {
        return Err(Error::ActionFailed(format!("{} disappeared before fill", locator)));
    }
    page.type_text(value).await?;
    Ok(())
}
