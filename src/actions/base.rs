use crate::browser::navigation::{NavigationManager, NavigationOutcome};
use crate::browser::selector::{ProbeTiming, SelectorResolver};
use crate::core::{BrowserTrait, Config, ElementHandle, PlatformProfile, Step};
use crate::errors::Result;
use std::time::Duration;

/// Everything an action needs to drive the page: the browser, the tab, the
/// platform's locators and the tunable waits.
pub struct PageContext<'a, B: BrowserTrait> {
    pub browser: &'a B,
    pub tab: &'a B::TabHandle,
    pub profile: &'a PlatformProfile,
    pub config: &'a Config,
}

impl<'a, B: BrowserTrait> Clone for PageContext<'a, B> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<'a, B: BrowserTrait> Copy for PageContext<'a, B> {}

impl<'a, B: BrowserTrait> PageContext<'a, B> {
    pub fn new(
        browser: &'a B,
        tab: &'a B::TabHandle,
        profile: &'a PlatformProfile,
        config: &'a Config,
    ) -> Self {
        Self {
            browser,
            tab,
            profile,
            config,
        }
    }

    pub fn probe_timing(&self) -> ProbeTiming {
        ProbeTiming::new(
            self.config.timing.probe_timeout(),
            self.config.timing.probe_interval(),
        )
    }

    /// Resolve a required step anywhere on the page.
    pub async fn resolve(&self, step: Step) -> Result<ElementHandle> {
        self.resolve_within(None, step).await
    }

    pub async fn resolve_within(
        &self,
        scope: Option<&ElementHandle>,
        step: Step,
    ) -> Result<ElementHandle> {
        SelectorResolver::resolve(
            self.browser,
            self.tab,
            scope,
            self.profile.candidates(step),
            step,
            self.probe_timing(),
        )
        .await
    }

    /// Resolve an optional step, waiting the usual per-candidate timeout.
    pub async fn find(&self, step: Step) -> Result<Option<ElementHandle>> {
        SelectorResolver::find(
            self.browser,
            self.tab,
            None,
            self.profile.candidates(step),
            step,
            self.probe_timing(),
        )
        .await
    }

    /// Single look for a step, no waiting.
    pub async fn is_present(&self, step: Step) -> Result<bool> {
        let found = SelectorResolver::find(
            self.browser,
            self.tab,
            None,
            self.profile.candidates(step),
            step,
            ProbeTiming::immediate(),
        )
        .await?;
        Ok(found.is_some())
    }

    pub async fn navigate(&self, url: &str) -> Result<NavigationOutcome> {
        NavigationManager::navigate_and_settle(self.browser, self.tab, url, &self.config.timing)
            .await
    }

    pub async fn pause(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
