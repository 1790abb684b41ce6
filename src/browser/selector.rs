use crate::core::{BrowserTrait, ElementHandle, Locator, Step};
use crate::errors::{PublishError, Result};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Per-candidate wait used while resolving a step.
#[derive(Debug, Clone, Copy)]
pub struct ProbeTiming {
    pub timeout: Duration,
    pub interval: Duration,
}

impl ProbeTiming {
    pub fn new(timeout: Duration, interval: Duration) -> Self {
        Self { timeout, interval }
    }

    /// Look once, never wait.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }
}

/// First-match resolution over ordered locator candidates.
pub struct SelectorResolver;

impl SelectorResolver {
    /// Resolve the first candidate that matches, probing candidates in order
    /// and giving each up to `timing.timeout` to appear.
    pub async fn resolve<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        scope: Option<&ElementHandle>,
        candidates: &[Locator],
        step: Step,
        timing: ProbeTiming,
    ) -> Result<ElementHandle> {
        Self::find(browser, tab, scope, candidates, step, timing)
            .await?
            .ok_or(PublishError::ElementNotFound { step })
    }

    /// Like [`resolve`](Self::resolve) but absence is `None`, not an error.
    pub async fn find<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        scope: Option<&ElementHandle>,
        candidates: &[Locator],
        step: Step,
        timing: ProbeTiming,
    ) -> Result<Option<ElementHandle>> {
        for (index, candidate) in candidates.iter().enumerate() {
            let start = Instant::now();
            loop {
                if let Some(element) = Self::first_match(browser, tab, scope, candidate, step).await {
                    debug!("{}: candidate {} ({}) matched", step, index, candidate);
                    return Ok(Some(element));
                }
                if start.elapsed() >= timing.timeout {
                    break;
                }
                tokio::time::sleep(timing.interval).await;
            }
        }
        debug!("{}: none of {} candidates matched", step, candidates.len());
        Ok(None)
    }

    /// Scan every element matched by any candidate, in candidate order, for
    /// the first one not reporting itself disabled. Rescans until `timing.timeout`.
    pub async fn find_enabled<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        scope: Option<&ElementHandle>,
        candidates: &[Locator],
        step: Step,
        timing: ProbeTiming,
    ) -> Result<Option<ElementHandle>> {
        let start = Instant::now();
        loop {
            for candidate in candidates {
                let matches = match browser.find_all(tab, scope, candidate).await {
                    Ok(matches) => matches,
                    Err(e) => {
                        debug!("{}: probe {} failed: {}", step, candidate, e);
                        continue;
                    }
                };
                for element in matches {
                    if Self::is_disabled(browser, tab, &element).await? {
                        debug!("{}: skipping disabled match of {}", step, candidate);
                        continue;
                    }
                    return Ok(Some(element));
                }
            }
            if start.elapsed() >= timing.timeout {
                return Ok(None);
            }
            tokio::time::sleep(timing.interval).await;
        }
    }

    /// `aria-disabled="true"` or a bare `disabled` attribute.
    pub async fn is_disabled<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        element: &ElementHandle,
    ) -> Result<bool> {
        let aria = browser.attribute(tab, element, "aria-disabled").await?;
        if aria.as_deref().map(str::trim) == Some("true") {
            return Ok(true);
        }
        Ok(browser.attribute(tab, element, "disabled").await?.is_some())
    }

    async fn first_match<B: BrowserTrait>(
        browser: &B,
        tab: &B::TabHandle,
        scope: Option<&ElementHandle>,
        candidate: &Locator,
        step: Step,
    ) -> Option<ElementHandle> {
        match browser.find_all(tab, scope, candidate).await {
            Ok(matches) => matches.into_iter().next(),
            Err(e) => {
                debug!("{}: probe {} failed: {}", step, candidate, e);
                None
            }
        }
    }
}
