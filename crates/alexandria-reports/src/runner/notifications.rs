use crate::browser::{BrowsingContext, PageHandle};
use crate::config::Locator;
use crate::Outcome;
use tracing::{debug, info};

/// Click the notification dialog's dismiss button if one shows up.
///
/// Tries the page and then each frame, `timeout_ms` each. A context where
/// the button shows up but the click fails counts as a miss and the next
/// one is tried. Never fails: a missing dialog is the normal case.
pub async fn dismiss_notifications<P: PageHandle>(
    page: &P,
    locator: &Locator,
    timeout_ms: u64,
) -> Outcome {
    let frames = match page.frames().await {
        Ok(frames) => frames,
        Err(e) => {
            debug!("Could not list frames of {}: {}", page.label(), e);
            Vec::new()
        }
    };
    let mut contexts: Vec<&dyn BrowsingContext> = vec![page];
    contexts.extend(frames.iter().map(|f| f as &dyn BrowsingContext));

    let mut tried = Vec::with_capacity(contexts.len());
    for ctx in contexts {
        let clicked = match ctx.wait_visible(locator, timeout_ms).await {
            Ok(()) => ctx.click(locator, timeout_ms).await,
            Err(e) => Err(e),
        };
        match clicked {
            Ok(()) => {
                info!("Clicked {} in {}", locator, ctx.label());
                return Outcome::Completed;
            }
            Err(e) => {
                debug!("{} in {}: {}", locator, ctx.label(), e);
                tried.push(ctx.label());
            }
        }
    }

    info!("{} not found; continuing without dismissing", locator);
    Outcome::Degraded(format!("{} not dismissed (tried: {})", locator, tried.join(", ")))
}
