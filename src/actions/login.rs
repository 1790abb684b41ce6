use super::base::PageContext;
use crate::browser::navigation::NavigationManager;
use crate::core::{BrowserTrait, SecondFactorPolicy, Step};
use crate::errors::{PublishError, Result};
use crate::types::Credentials;
use tracing::{debug, info, warn};

/// States of the login flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Start,
    NavigatedHome,
    AlreadyLoggedIn,
    NeedsLogin,
    IdentifierEntered,
    SubmittedIdentifier,
    PasswordEntered,
    SubmittedCredentials,
    AwaitingResult,
    TwoFactorPending,
    TwoFactorResolved,
    /// Final check for the logged-in affordance.
    Verifying,
    LoggedIn,
    Failed,
}

impl AuthState {
    /// States that touch a login form field or control.
    pub fn is_login_field_state(&self) -> bool {
        matches!(
            self,
            AuthState::NeedsLogin
                | AuthState::IdentifierEntered
                | AuthState::SubmittedIdentifier
                | AuthState::PasswordEntered
                | AuthState::SubmittedCredentials
        )
    }
}

/// How a second-factor challenge ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecondFactorOutcome {
    NotRequired,
    Confirmed,
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct AuthReport {
    pub visited: Vec<AuthState>,
    pub already_logged_in: bool,
    pub second_factor: SecondFactorOutcome,
}

/// Drives a platform login from the home page to a verified session.
pub struct Authenticator<'a, B: BrowserTrait> {
    ctx: PageContext<'a, B>,
    credentials: &'a Credentials,
    visited: Vec<AuthState>,
    second_factor: SecondFactorOutcome,
    /// Page the credentials were submitted from.
    submitted_from: Option<String>,
}

impl<'a, B: BrowserTrait> Authenticator<'a, B> {
    pub fn new(ctx: PageContext<'a, B>, credentials: &'a Credentials) -> Self {
        Self {
            ctx,
            credentials,
            visited: Vec::new(),
            second_factor: SecondFactorOutcome::NotRequired,
            submitted_from: None,
        }
    }

    pub fn visited(&self) -> &[AuthState] {
        &self.visited
    }

    /// Run the state machine to `LoggedIn`. Any error leaves it in `Failed`.
    pub async fn run(&mut self) -> Result<AuthReport> {
        let mut state = AuthState::Start;
        loop {
            self.visited.push(state);
            if state == AuthState::LoggedIn {
                info!("{}: logged in", self.ctx.profile.name);
                return Ok(AuthReport {
                    visited: self.visited.clone(),
                    already_logged_in: !self.visited.iter().any(AuthState::is_login_field_state),
                    second_factor: self.second_factor,
                });
            }

            state = match self.advance(state).await {
                Ok(next) => next,
                Err(e) => {
                    warn!("{}: login failed in {:?}: {}", self.ctx.profile.name, state, e);
                    self.visited.push(AuthState::Failed);
                    return Err(e);
                }
            };
        }
    }

    async fn advance(&mut self, state: AuthState) -> Result<AuthState> {
        let ctx = self.ctx;
        let timing = &ctx.config.timing;

        let next = match state {
            AuthState::Start => {
                ctx.navigate(&ctx.profile.home_url).await?;
                AuthState::NavigatedHome
            }
            AuthState::NavigatedHome => {
                if ctx.is_present(Step::HomeCheck).await? {
                    AuthState::AlreadyLoggedIn
                } else {
                    AuthState::NeedsLogin
                }
            }
            AuthState::AlreadyLoggedIn => AuthState::LoggedIn,
            AuthState::NeedsLogin => {
                info!("{}: starting authentication", ctx.profile.name);
                if let Err(e) = ctx.navigate(&ctx.profile.login_url).await {
                    warn!("could not open login page, trying current page: {}", e);
                }
                ctx.pause(timing.login_page_delay()).await;
                let field = ctx.resolve(Step::IdentifierField).await?;
                ctx.browser
                    .type_text(ctx.tab, &field, &self.credentials.identifier, timing.credential_keystroke())
                    .await?;
                AuthState::IdentifierEntered
            }
            AuthState::IdentifierEntered => {
                if !ctx.profile.candidates(Step::NextControl).is_empty() {
                    ctx.pause(timing.field_delay()).await;
                    let next = ctx.resolve(Step::NextControl).await?;
                    ctx.browser.click(ctx.tab, &next).await?;
                    debug!("clicked next");
                    ctx.pause(timing.login_page_delay()).await;
                }
                AuthState::SubmittedIdentifier
            }
            AuthState::SubmittedIdentifier => {
                let field = ctx.resolve(Step::PasswordField).await?;
                ctx.browser
                    .type_text(ctx.tab, &field, &self.credentials.secret, timing.credential_keystroke())
                    .await?;
                AuthState::PasswordEntered
            }
            AuthState::PasswordEntered => {
                ctx.pause(timing.field_delay()).await;
                self.submitted_from = ctx.browser.current_url(ctx.tab).await.ok();
                self.submit_credentials().await?;
                AuthState::SubmittedCredentials
            }
            AuthState::SubmittedCredentials => {
                let outcome = match &self.submitted_from {
                    Some(from_url) => {
                        NavigationManager::await_navigation(
                            ctx.browser,
                            ctx.tab,
                            from_url,
                            timing.login_settle_timeout(),
                            timing.network_quiet(),
                            timing.probe_interval(),
                        )
                        .await?
                    }
                    None => {
                        NavigationManager::settle(
                            ctx.browser,
                            ctx.tab,
                            timing.login_settle_timeout(),
                            timing.network_quiet(),
                            timing.probe_interval(),
                        )
                        .await?
                    }
                };
                if !outcome.settled() {
                    info!("login navigation did not settle, checking state anyway");
                }
                AuthState::AwaitingResult
            }
            AuthState::AwaitingResult => {
                ctx.pause(ctx.config.second_factor.dwell()).await;
                if ctx.is_present(Step::SecondFactorField).await? {
                    AuthState::TwoFactorPending
                } else {
                    AuthState::Verifying
                }
            }
            AuthState::TwoFactorPending => {
                self.second_factor = self.await_second_factor().await?;
                if self.second_factor == SecondFactorOutcome::TimedOut
                    && ctx.config.second_factor.on_timeout == SecondFactorPolicy::Fail
                {
                    return Err(PublishError::AuthenticationFailed(format!(
                        "second-factor challenge not confirmed after {} checks",
                        ctx.config.second_factor.max_polls
                    )));
                }
                AuthState::TwoFactorResolved
            }
            AuthState::TwoFactorResolved => AuthState::Verifying,
            AuthState::Verifying => {
                ctx.pause(timing.verify_dwell()).await;
                if ctx.find(Step::HomeCheck).await?.is_none() {
                    let reason = match self.second_factor {
                        SecondFactorOutcome::TimedOut => {
                            "logged-in affordance not found after an unconfirmed second-factor challenge"
                        }
                        _ => "logged-in affordance not found after submitting credentials",
                    };
                    return Err(PublishError::AuthenticationFailed(reason.to_string()));
                }
                AuthState::LoggedIn
            }
            AuthState::LoggedIn | AuthState::Failed => state,
        };
        Ok(next)
    }

    /// Click the submit control, or submit the login form directly when no
    /// control resolves.
    async fn submit_credentials(&self) -> Result<()> {
        let ctx = self.ctx;
        if let Some(submit) = ctx.find(Step::SubmitControl).await? {
            ctx.browser.click(ctx.tab, &submit).await?;
            debug!("clicked submit");
            return Ok(());
        }

        match ctx.find(Step::LoginForm).await? {
            Some(form) => {
                ctx.browser.submit_form(ctx.tab, &form).await?;
                info!("no submit control, submitted login form directly");
                Ok(())
            }
            None => Err(PublishError::ElementNotFound {
                step: Step::SubmitControl,
            }),
        }
    }

    /// Poll for the confirmation affordance while the operator completes the
    /// challenge out of band.
    async fn await_second_factor(&self) -> Result<SecondFactorOutcome> {
        let ctx = self.ctx;
        let second_factor = &ctx.config.second_factor;
        info!(
            "second-factor challenge detected, waiting up to {} checks for confirmation",
            second_factor.max_polls
        );

        for _ in 0..second_factor.max_polls {
            if ctx.is_present(Step::SecondFactorConfirmed).await? {
                info!("second-factor challenge confirmed");
                return Ok(SecondFactorOutcome::Confirmed);
            }
            ctx.pause(second_factor.poll_interval()).await;
        }

        warn!("second-factor challenge was not confirmed");
        Ok(SecondFactorOutcome::TimedOut)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, Locator};
    use crate::testing::{test_profile, FakeBrowser, FakeElement, FakeEvent, FakeTab, Visibility};
    use std::time::Duration;

    fn creds() -> Credentials {
        Credentials::new("operator@example.com", "s3cret")
    }

    async fn login(browser: &FakeBrowser, profile: &crate::core::PlatformProfile, config: &Config) -> (Result<AuthReport>, Vec<AuthState>) {
        let credentials = creds();
        let ctx = PageContext::new(browser, &FakeTab, profile, config);
        let mut auth = Authenticator::new(ctx, &credentials);
        let result = auth.run().await;
        (result, auth.visited().to_vec())
    }

    fn second_factor_field() -> FakeElement {
        FakeElement::new("otp", Locator::css("input[maxlength=\"6\"]")).visible(Visibility::AfterLogin)
    }

    #[tokio::test(start_paused = true)]
    async fn already_logged_in_skips_login_fields() {
        let browser = FakeBrowser::already_logged_in();
        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        let report = result.unwrap();
        assert!(report.already_logged_in);
        assert_eq!(
            visited,
            vec![
                AuthState::Start,
                AuthState::NavigatedHome,
                AuthState::AlreadyLoggedIn,
                AuthState::LoggedIn
            ]
        );
        assert!(!visited.iter().any(AuthState::is_login_field_state));
        assert!(browser.typed_into("user").is_empty());
        assert_eq!(
            browser.events(),
            vec![FakeEvent::Navigate("https://social.test/home".to_string())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn full_login_walks_every_field_state() {
        let browser = FakeBrowser::standard();
        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        let report = result.unwrap();
        assert!(!report.already_logged_in);
        assert_eq!(report.second_factor, SecondFactorOutcome::NotRequired);
        assert_eq!(
            visited,
            vec![
                AuthState::Start,
                AuthState::NavigatedHome,
                AuthState::NeedsLogin,
                AuthState::IdentifierEntered,
                AuthState::SubmittedIdentifier,
                AuthState::PasswordEntered,
                AuthState::SubmittedCredentials,
                AuthState::AwaitingResult,
                AuthState::Verifying,
                AuthState::LoggedIn,
            ]
        );
        assert_eq!(browser.typed_into("user"), vec!["operator@example.com"]);
        assert_eq!(browser.typed_into("pass"), vec!["s3cret"]);
        assert_eq!(browser.clicks_on("next"), 1);
        assert_eq!(browser.clicks_on("login"), 1);
        assert!(browser
            .events()
            .contains(&FakeEvent::Navigate("https://social.test/login".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn profile_without_next_step_never_clicks_next() {
        let mut profile = test_profile();
        profile.next_control.clear();
        let browser = FakeBrowser::standard();

        let (result, _) = login(&browser, &profile, &Config::default()).await;

        result.unwrap();
        assert_eq!(browser.clicks_on("next"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_next_control_fails_fast() {
        let browser = FakeBrowser::standard().without("next");
        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        assert!(matches!(
            result.unwrap_err(),
            PublishError::ElementNotFound { step: Step::NextControl }
        ));
        assert_eq!(visited.last(), Some(&AuthState::Failed));
        assert!(browser.typed_into("pass").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn falls_back_to_form_submission() {
        let browser = FakeBrowser::standard().without("login");
        let (result, _) = login(&browser, &test_profile(), &Config::default()).await;

        result.unwrap();
        assert!(browser.events().contains(&FakeEvent::SubmitForm("form".to_string())));
    }

    #[tokio::test(start_paused = true)]
    async fn no_submit_control_and_no_form_is_element_not_found() {
        let browser = FakeBrowser::standard().without("login").without("form");
        let (result, _) = login(&browser, &test_profile(), &Config::default()).await;

        assert!(matches!(
            result.unwrap_err(),
            PublishError::ElementNotFound { step: Step::SubmitControl }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_identifier_field_fails_before_typing() {
        let browser = FakeBrowser::standard().without("user");
        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        let err = result.unwrap_err();
        assert!(err.to_string().starts_with("ElementNotFound"));
        assert_eq!(
            visited,
            vec![
                AuthState::Start,
                AuthState::NavigatedHome,
                AuthState::NeedsLogin,
                AuthState::Failed
            ]
        );
        assert!(browser.typed_into("pass").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn second_factor_confirmed_by_operator() {
        let browser = FakeBrowser::standard()
            .replace(second_factor_field())
            .replace(
                FakeElement::new("verify", Locator::button_text("verify"))
                    .visible(Visibility::After(Duration::from_secs(10))),
            );
        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        let report = result.unwrap();
        assert_eq!(report.second_factor, SecondFactorOutcome::Confirmed);
        assert!(visited.contains(&AuthState::TwoFactorPending));
        assert!(visited.contains(&AuthState::TwoFactorResolved));
        assert_eq!(visited.last(), Some(&AuthState::LoggedIn));
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_second_factor_still_verifies_by_default() {
        let browser = FakeBrowser::standard().replace(second_factor_field());
        let (result, _) = login(&browser, &test_profile(), &Config::default()).await;

        let report = result.unwrap();
        assert_eq!(report.second_factor, SecondFactorOutcome::TimedOut);
    }

    #[tokio::test(start_paused = true)]
    async fn unconfirmed_second_factor_fails_under_strict_policy() {
        let mut config = Config::default();
        config.second_factor.on_timeout = SecondFactorPolicy::Fail;
        config.second_factor.max_polls = 3;
        let browser = FakeBrowser::standard().replace(second_factor_field());

        let (result, visited) = login(&browser, &test_profile(), &config).await;

        let err = result.unwrap_err();
        assert!(matches!(err, PublishError::AuthenticationFailed(_)));
        assert!(err.to_string().contains("3 checks"));
        assert!(!visited.contains(&AuthState::Verifying));
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_challenge_is_named_when_verification_fails() {
        let browser = FakeBrowser::standard()
            .replace(second_factor_field().visible(Visibility::Always))
            .replace(
                FakeElement::new("compose", Locator::test_id("compose")).visible(Visibility::Never),
            );

        let (result, _) = login(&browser, &test_profile(), &Config::default()).await;

        let err = result.unwrap_err();
        assert!(matches!(err, PublishError::AuthenticationFailed(_)));
        assert!(err.to_string().contains("second-factor"));
    }

    #[tokio::test(start_paused = true)]
    async fn missing_logged_in_affordance_is_authentication_failure() {
        let browser = FakeBrowser::standard().replace(
            FakeElement::new("compose", Locator::test_id("compose")).visible(Visibility::Never),
        );

        let (result, visited) = login(&browser, &test_profile(), &Config::default()).await;

        assert!(result.unwrap_err().to_string().starts_with("AuthenticationFailed"));
        assert_eq!(visited.last(), Some(&AuthState::Failed));
    }

    #[tokio::test(start_paused = true)]
    async fn waits_for_the_post_login_redirect() {
        let redirect = Duration::from_secs(12);
        let browser = FakeBrowser::standard().redirect_after_login(redirect, "https://social.test/home");
        let config = Config::default();

        let start = tokio::time::Instant::now();
        let (result, _) = login(&browser, &test_profile(), &config).await;

        result.unwrap();
        assert!(start.elapsed() >= redirect + config.timing.network_quiet());
        assert_eq!(
            browser.current_url(&FakeTab).await.unwrap(),
            "https://social.test/home"
        );
    }

    #[tokio::test(start_paused = true)]
    async fn login_without_redirect_waits_out_the_settle_timeout() {
        let browser = FakeBrowser::standard().no_login_redirect();
        let config = Config::default();

        let start = tokio::time::Instant::now();
        let (result, visited) = login(&browser, &test_profile(), &config).await;

        result.unwrap();
        assert!(start.elapsed() >= config.timing.login_settle_timeout());
        assert_eq!(visited.last(), Some(&AuthState::LoggedIn));
    }
}
