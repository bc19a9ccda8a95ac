use crate::browser::{BrowserSession, BrowsingContext, PageHandle};
use crate::config::{Locator, Timeouts};
use crate::resolver::has_match;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Find the page that hosts the application menu.
///
/// After login the portal may keep the app in the login tab or open it in a
/// new one. The active page is checked first; after that every open page is
/// polled until `main_page_deadline_ms` runs out. The deadline is only
/// checked between sweeps, so one sweep in progress always completes.
pub async fn find_main_page<S: BrowserSession>(
    session: &S,
    marker: &Locator,
    timeouts: &Timeouts,
) -> Result<S::Page> {
    let current = session.active_page().await?;
    if current
        .wait_for_content_loaded(timeouts.page_load_ms)
        .await
        .is_ok()
        && has_match(
            &current,
            marker,
            timeouts.main_page_first_ms,
            timeouts.main_page_first_ms,
        )
        .await
    {
        info!("Using current page as main app page (URL: {})", url_of(&current).await);
        return Ok(current);
    }

    let deadline = Instant::now() + Duration::from_millis(timeouts.main_page_deadline_ms);
    while Instant::now() < deadline {
        for page in session.pages().await? {
            if let Err(e) = page.wait_for_content_loaded(timeouts.page_load_ms).await {
                debug!("Skipping {}: {}", page.label(), e);
                continue;
            }
            let probe = timeouts.main_page_probe_ms;
            if has_match(&page, marker, probe, probe).await {
                session.bring_to_front(&page).await?;
                info!("Using main app page with URL: {}", url_of(&page).await);
                return Ok(page);
            }
        }
        tokio::time::sleep(Duration::from_millis(timeouts.main_page_poll_ms)).await;
    }

    Err(Error::MainPageNotFound {
        waited_ms: timeouts.main_page_deadline_ms,
    })
}

async fn url_of<P: PageHandle>(page: &P) -> String {
    page.url().await.unwrap_or_else(|_| page.label())
}
