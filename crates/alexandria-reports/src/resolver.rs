//! Ordered probing of browsing contexts.
//!
//! The portal renders parts of its UI inside frames, and which frame varies
//! between sessions. Every lookup therefore probes a list of contexts in
//! order (usually the page, then each frame) with a bounded timeout each. The
//! first context where the element becomes visible wins and the rest are
//! never touched.

use crate::browser::{BrowsingContext, PageHandle};
use crate::config::Locator;
use crate::{Error, Result};
use async_trait::async_trait;
use tracing::{debug, trace};

/// One context to probe and how long to wait on it.
#[derive(Clone, Copy)]
pub struct Candidate<'a> {
    pub context: &'a dyn BrowsingContext,
    pub timeout_ms: u64,
}

impl<'a> Candidate<'a> {
    pub fn new(context: &'a dyn BrowsingContext, timeout_ms: u64) -> Self {
        Self {
            context,
            timeout_ms,
        }
    }
}

/// Return the first candidate in which `locator` becomes visible.
///
/// Worst case latency is the sum of all candidate timeouts.
pub async fn resolve<'a>(
    candidates: &[Candidate<'a>],
    locator: &Locator,
) -> Result<&'a dyn BrowsingContext> {
    let index = resolve_index(candidates, locator).await?;
    Ok(candidates[index].context)
}

async fn resolve_index(candidates: &[Candidate<'_>], locator: &Locator) -> Result<usize> {
    let mut tried = Vec::with_capacity(candidates.len());
    for (index, candidate) in candidates.iter().enumerate() {
        let label = candidate.context.label();
        trace!("probing {} for {} ({}ms)", label, locator, candidate.timeout_ms);
        match candidate
            .context
            .wait_visible(locator, candidate.timeout_ms)
            .await
        {
            Ok(()) => {
                debug!("{} found in {}", locator, label);
                return Ok(index);
            }
            Err(e) => {
                trace!("{}: {}", label, e);
                tried.push(label);
            }
        }
    }
    Err(Error::ElementNotFound {
        target: locator.to_string(),
        tried,
    })
}

/// Where inside a page an element was found.
pub enum Resolved<P: PageHandle> {
    Page(P),
    Frame(P::Frame),
}

impl<P: PageHandle> Resolved<P> {
    pub fn context(&self) -> &dyn BrowsingContext {
        match self {
            Resolved::Page(page) => page,
            Resolved::Frame(frame) => frame,
        }
    }
}

#[async_trait]
impl<P: PageHandle> BrowsingContext for Resolved<P> {
    fn label(&self) -> String {
        self.context().label()
    }

    async fn wait_visible(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.context().wait_visible(locator, timeout_ms).await
    }

    async fn click(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.context().click(locator, timeout_ms).await
    }

    async fn hover(&self, locator: &Locator, timeout_ms: u64) -> Result<()> {
        self.context().hover(locator, timeout_ms).await
    }

    async fn fill(&self, locator: &Locator, value: &str, timeout_ms: u64) -> Result<()> {
        self.context().fill(locator, value, timeout_ms).await
    }
}

/// Probe the page's own document, then each of its frames.
pub async fn resolve_in_page<P: PageHandle>(
    page: &P,
    locator: &Locator,
    page_timeout_ms: u64,
    frame_timeout_ms: u64,
) -> Result<Resolved<P>> {
    let frames = page.frames().await?;

    let mut candidates = Vec::with_capacity(frames.len() + 1);
    candidates.push(Candidate::new(page, page_timeout_ms));
    for frame in &frames {
        candidates.push(Candidate::new(frame, frame_timeout_ms));
    }

    let index = resolve_index(&candidates, locator).await?;
    drop(candidates);

    let mut frames = frames;
    Ok(match index {
        0 => Resolved::Page(page.clone()),
        i => Resolved::Frame(frames.swap_remove(i - 1)),
    })
}

/// Whether `locator` is visible in the page or any of its frames.
pub async fn has_match<P: PageHandle>(
    page: &P,
    locator: &Locator,
    page_timeout_ms: u64,
    frame_timeout_ms: u64,
) -> bool {
    resolve_in_page(page, locator, page_timeout_ms, frame_timeout_ms)
        .await
        .is_ok()
}
