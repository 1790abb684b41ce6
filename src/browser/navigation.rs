use crate::core::{BrowserTrait, TimingConfig};
use crate::errors::Result;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// How a wait for the page to go quiet ended.
///
/// A timeout is reported, never raised: callers re-check page state themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationOutcome {
    Settled { elapsed: Duration },
    TimedOut { elapsed: Duration },
}

impl NavigationOutcome {
    pub fn settled(&self) -> bool {
        matches!(self, NavigationOutcome::Settled { .. })
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            NavigationOutcome::Settled { elapsed } | NavigationOutcome::TimedOut { elapsed } => {
                *elapsed
            }
        }
    }
}

pub struct NavigationManager;

impl NavigationManager {
    /// Navigate to `url` and wait, up to the navigation timeout, for the page
    /// to finish loading and stop fetching resources.
    pub async fn navigate_and_settle<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        url: &str,
        timing: &TimingConfig,
    ) -> Result<NavigationOutcome> {
        debug!("navigating to {}", url);
        browser.navigate(tab, url).await?;
        let outcome =
            Self::settle(browser, tab, timing.navigation_timeout(), timing.network_quiet(), timing.probe_interval())
                .await?;
        if !outcome.settled() {
            warn!("{} did not settle within {:?}", url, outcome.elapsed());
        }
        if let Ok(landed) = browser.current_url(tab).await {
            if landed != url {
                debug!("{} redirected to {}", url, landed);
            }
        }
        Ok(outcome)
    }

    /// Wait for the page to leave `from_url` (or start reloading) after an
    /// action that triggers a navigation, then for the new page to settle.
    /// Both phases share `timeout`.
    pub async fn await_navigation<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        from_url: &str,
        timeout: Duration,
        quiet: Duration,
        poll_interval: Duration,
    ) -> Result<NavigationOutcome> {
        let start = Instant::now();
        loop {
            if start.elapsed() >= timeout {
                return Ok(NavigationOutcome::TimedOut {
                    elapsed: start.elapsed(),
                });
            }
            let moved = matches!(browser.current_url(tab).await, Ok(url) if url != from_url);
            let reloading = matches!(browser.page_activity(tab).await, Ok(activity) if !activity.is_loaded());
            if moved || reloading {
                break;
            }
            tokio::time::sleep(poll_interval).await;
        }
        debug!("left {} after {:?}", from_url, start.elapsed());

        let remaining = timeout.saturating_sub(start.elapsed());
        let outcome = Self::settle(browser, tab, remaining, quiet, poll_interval).await?;
        let elapsed = start.elapsed();
        Ok(if outcome.settled() {
            NavigationOutcome::Settled { elapsed }
        } else {
            NavigationOutcome::TimedOut { elapsed }
        })
    }

    /// Wait without navigating until the page has been loaded with an unchanged
    /// resource count for `quiet`, or `timeout` passes.
    pub async fn settle<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        timeout: Duration,
        quiet: Duration,
        poll_interval: Duration,
    ) -> Result<NavigationOutcome> {
        let start = Instant::now();
        let mut last_count: Option<u64> = None;
        let mut quiet_since = start;

        while start.elapsed() < timeout {
            match browser.page_activity(tab).await {
                Ok(activity) if activity.is_loaded() => {
                    if last_count != Some(activity.resource_count) {
                        last_count = Some(activity.resource_count);
                        quiet_since = Instant::now();
                    } else if quiet_since.elapsed() >= quiet {
                        return Ok(NavigationOutcome::Settled {
                            elapsed: start.elapsed(),
                        });
                    }
                }
                Ok(_) => {
                    last_count = None;
                }
                // The document can be torn down mid-navigation; keep polling.
                Err(e) => debug!("page activity unavailable: {}", e),
            }

            tokio::time::sleep(poll_interval).await;
        }

        Ok(NavigationOutcome::TimedOut {
            elapsed: start.elapsed(),
        })
    }
}
