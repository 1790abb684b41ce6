use crate::actions::base::PageContext;
use crate::actions::login::Authenticator;
use crate::actions::thread::ThreadOrchestrator;
use crate::core::{BrowserTrait, Config, PlatformProfile, SessionState};
use crate::errors::{PublishError, Result};
use crate::types::{Credentials, PublishResult, Thread};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Owns one browser for the length of a publish operation and turns
/// everything that happens inside it into a [`PublishResult`].
pub struct SessionController<B: BrowserTrait> {
    browser: B,
    config: Config,
    state: SessionState,
}

impl<B: BrowserTrait> SessionController<B> {
    pub fn new(browser: B, config: Config) -> Self {
        Self {
            browser,
            config,
            state: SessionState::Closed,
        }
    }

    /// State of the most recent session. `Closed` once `publish` returns.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Log in and publish `content`.
    ///
    /// Failures inside the session end up in the returned result; only a
    /// browser that cannot be started is reported as `SessionUnavailable`.
    pub async fn publish(
        &mut self,
        content: impl Into<Thread>,
        credentials: &Credentials,
        profile: &PlatformProfile,
    ) -> Result<PublishResult> {
        let thread = content.into();
        let session_id = Uuid::new_v4();
        let span = info_span!("publish", session = %session_id, platform = %profile.name);
        self.run_session(thread, credentials, profile)
            .instrument(span)
            .await
    }

    async fn run_session(
        &mut self,
        thread: Thread,
        credentials: &Credentials,
        profile: &PlatformProfile,
    ) -> Result<PublishResult> {
        if let Err(e) = thread.validate().and_then(|_| profile.validate()) {
            warn!("rejected before starting a browser: {}", e);
            return Ok(PublishResult::failed(&thread, 0, &e));
        }

        self.state = SessionState::Unauthenticated;
        let tab = match self.acquire().await {
            Ok(tab) => tab,
            Err(e) => {
                if self.browser.is_running() {
                    self.release().await;
                }
                self.state = SessionState::Closed;
                return Err(PublishError::SessionUnavailable(e.to_string()));
            }
        };

        let (items_published, error) = self.drive(&tab, &thread, credentials, profile).await;
        drop(tab);
        self.release().await;

        let result = match error {
            None => {
                info!("published {} item(s)", items_published);
                PublishResult::succeeded(&thread)
            }
            Some(e) => {
                warn!("publish failed after {} item(s): {}", items_published, e);
                PublishResult::failed(&thread, items_published, &e)
            }
        };
        Ok(result)
    }

    async fn acquire(&mut self) -> Result<B::TabHandle> {
        self.browser.launch(&self.config.browser).await?;
        self.browser.new_tab().await
    }

    async fn drive(
        &mut self,
        tab: &B::TabHandle,
        thread: &Thread,
        credentials: &Credentials,
        profile: &PlatformProfile,
    ) -> (usize, Option<PublishError>) {
        let ctx = PageContext::new(&self.browser, tab, profile, &self.config);

        self.state.advance(SessionState::Authenticating);
        match Authenticator::new(ctx, credentials).run().await {
            Ok(report) => debug!(
                "authenticated (already logged in: {}, second factor: {:?})",
                report.already_logged_in, report.second_factor
            ),
            Err(e) => return (0, Some(e)),
        }
        self.state.advance(SessionState::Authenticated);

        if let Some(feed_url) = &profile.feed_url {
            if let Err(e) = ctx.navigate(feed_url).await {
                return (0, Some(e));
            }
        }

        self.state.advance(SessionState::Publishing);
        let outcome = ThreadOrchestrator::publish(ctx, thread).await;
        (outcome.items_published, outcome.error)
    }

    /// Close the browser. Teardown errors are logged, never raised.
    async fn release(&mut self) {
        if let Err(e) = self.browser.close().await {
            warn!("browser did not close cleanly: {}", e);
        }
        self.state.advance(SessionState::Closed);
    }
}

#[cfg(feature = "chrome")]
impl SessionController<crate::browser::ChromeBrowser> {
    /// Controller backed by a local Chrome.
    pub fn chrome(config: Config) -> Self {
        Self::new(crate::browser::ChromeBrowser::new(), config)
    }
}
