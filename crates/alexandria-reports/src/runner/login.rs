use crate::browser::{BrowsingContext, PageHandle};
use crate::config::{LoginConfig, Timeouts};
use crate::credentials::Credentials;
use crate::resolver::resolve_in_page;
use crate::{Error, Outcome, Result};
use tracing::{debug, info, warn};

/// Open the portal and submit the login form.
///
/// The form may live in the page or in any of its frames; the context that
/// holds the username field receives all three values and the submit click.
/// A form that cannot be found is fatal. A submit button that cannot be
/// clicked is not: the fields stay filled and the result is
/// [`Outcome::Degraded`].
pub async fn login<P: PageHandle>(
    page: &P,
    url: &str,
    credentials: &Credentials,
    form: &LoginConfig,
    timeouts: &Timeouts,
) -> Result<Outcome> {
    info!("Navigating to: {}", url);
    page.goto(url).await?;
    page.wait_for_content_loaded(timeouts.page_load_ms).await?;

    let resolved = resolve_in_page(
        page,
        &form.username,
        timeouts.login_page_ms,
        timeouts.login_frame_ms,
    )
    .await
    .map_err(|e| match e {
        Error::ElementNotFound { tried, .. } => Error::LoginFormNotFound { tried },
        other => other,
    })?;
    let ctx = resolved.context();
    debug!("Login form found in {}", ctx.label());

    ctx.fill(&form.username, &credentials.username, timeouts.action_ms)
        .await?;
    ctx.fill(&form.password, &credentials.password, timeouts.action_ms)
        .await?;
    ctx.fill(&form.office_key, &credentials.office_key, timeouts.action_ms)
        .await?;

    Ok(submit(ctx, form, timeouts.action_ms).await)
}

async fn submit(ctx: &dyn BrowsingContext, form: &LoginConfig, timeout_ms: u64) -> Outcome {
    let primary = match ctx.click(&form.submit, timeout_ms).await {
        Ok(()) => {
            info!("Login submitted");
            return Outcome::Completed;
        }
        Err(e) => e,
    };
    debug!("{} failed ({}), trying {}", form.submit, primary, form.submit_fallback);

    match ctx.click(&form.submit_fallback, timeout_ms).await {
        Ok(()) => {
            info!("Login submitted via {}", form.submit_fallback);
            Outcome::Completed
        }
        Err(fallback) => {
            warn!("Login button not found; fields were filled but not submitted");
            Outcome::Degraded(format!(
                "login not submitted: {} ({}); {} ({})",
                form.submit, primary, form.submit_fallback, fallback
            ))
        }
    }
}
