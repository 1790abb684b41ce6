use crate::core::Locator;
use crate::errors::{PublishError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Logical step of the login or publishing flow that needs a UI element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Step {
    HomeCheck,
    IdentifierField,
    NextControl,
    PasswordField,
    SubmitControl,
    LoginForm,
    SecondFactorField,
    SecondFactorConfirmed,
    ComposerOpen,
    ComposerField,
    PostControl,
    TimelineItem,
    ReplyControl,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::HomeCheck => "home-check",
            Step::IdentifierField => "identifier-field",
            Step::NextControl => "next-control",
            Step::PasswordField => "password-field",
            Step::SubmitControl => "submit-control",
            Step::LoginForm => "login-form",
            Step::SecondFactorField => "second-factor-field",
            Step::SecondFactorConfirmed => "second-factor-confirmed",
            Step::ComposerOpen => "composer-open",
            Step::ComposerField => "composer-field",
            Step::PostControl => "post-control",
            Step::TimelineItem => "timeline-item",
            Step::ReplyControl => "reply-control",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-platform description of where things live on the page.
///
/// Each locator list is ordered by preference; the first candidate that
/// resolves wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformProfile {
    pub name: String,
    pub home_url: String,
    pub login_url: String,
    /// Visited after login and before the first composer is opened.
    #[serde(default)]
    pub feed_url: Option<String>,
    /// Page listing the account's latest item, used for reply chaining.
    /// Falls back to `home_url`.
    #[serde(default)]
    pub timeline_url: Option<String>,
    #[serde(default)]
    pub post_dwell_ms: Option<u64>,

    pub logged_in: Vec<Locator>,
    pub identifier_field: Vec<Locator>,
    /// Empty when the identifier and password share one form.
    #[serde(default)]
    pub next_control: Vec<Locator>,
    pub password_field: Vec<Locator>,
    pub submit_control: Vec<Locator>,
    #[serde(default)]
    pub login_form: Vec<Locator>,
    #[serde(default)]
    pub second_factor_field: Vec<Locator>,
    #[serde(default)]
    pub second_factor_confirmed: Vec<Locator>,
    pub composer_open: Vec<Locator>,
    pub composer_field: Vec<Locator>,
    pub post_control: Vec<Locator>,
    #[serde(default)]
    pub timeline_item: Vec<Locator>,
    #[serde(default)]
    pub reply_control: Vec<Locator>,
    /// Empty means the regular post control is reused inside replies.
    #[serde(default)]
    pub reply_post_control: Vec<Locator>,
}

impl PlatformProfile {
    pub fn twitter() -> Self {
        Self {
            name: "twitter".to_string(),
            home_url: "https://twitter.com/home".to_string(),
            login_url: "https://twitter.com/i/flow/login".to_string(),
            feed_url: None,
            timeline_url: None,
            post_dwell_ms: Some(2000),
            logged_in: vec![
                Locator::css("[aria-label=\"Compose\"]"),
                Locator::test_id("SideNav_NewTweet_Button"),
            ],
            identifier_field: vec![
                Locator::css("input[autocomplete=\"username\"]"),
                Locator::css("input[name=\"text\"]"),
                Locator::css("input[type=\"text\"]"),
            ],
            next_control: vec![Locator::button_text("next")],
            password_field: vec![
                Locator::css("input[name=\"password\"]"),
                Locator::css("input[type=\"password\"]"),
            ],
            submit_control: vec![
                Locator::test_id("LoginForm_Login_Button"),
                Locator::button_text("log in"),
                Locator::button_text("login"),
                Locator::button_text("sign in"),
            ],
            login_form: vec![Locator::css("form")],
            second_factor_field: vec![
                Locator::css("input[data-testid=\"ocfEnterTextTextInput\"]"),
                Locator::css("input[type=\"text\"][maxlength=\"6\"]"),
            ],
            second_factor_confirmed: vec![Locator::button_text("verify")],
            composer_open: vec![
                Locator::css("[aria-label=\"Compose\"]"),
                Locator::css("a[href=\"/compose/tweet\"]"),
            ],
            composer_field: vec![
                Locator::test_id("tweetTextarea_0"),
                Locator::css("div[aria-label=\"Tweet text\"]"),
                Locator::css("[role=\"textbox\"]"),
            ],
            post_control: vec![
                Locator::test_id("tweetButton"),
                Locator::dialog_button("post"),
            ],
            timeline_item: vec![
                Locator::css("article[data-testid=\"tweet\"]"),
                Locator::css("article"),
            ],
            reply_control: vec![Locator::test_id("reply"), Locator::label("reply")],
            reply_post_control: vec![
                Locator::test_id("tweetButton"),
                Locator::dialog_button("reply"),
            ],
        }
    }

    pub fn linkedin() -> Self {
        Self {
            name: "linkedin".to_string(),
            home_url: "https://www.linkedin.com/".to_string(),
            login_url: "https://www.linkedin.com/login".to_string(),
            feed_url: Some("https://www.linkedin.com/feed/".to_string()),
            timeline_url: Some("https://www.linkedin.com/in/me/recent-activity/all/".to_string()),
            post_dwell_ms: Some(3000),
            logged_in: vec![Locator::css("[aria-label=\"Start a post\"]")],
            identifier_field: vec![Locator::id("username")],
            next_control: Vec::new(),
            password_field: vec![Locator::id("password")],
            submit_control: vec![Locator::css("button[type=\"submit\"]")],
            login_form: vec![Locator::css("form.login__form"), Locator::css("form")],
            second_factor_field: vec![Locator::css("input[type=\"text\"][maxlength=\"6\"]")],
            second_factor_confirmed: vec![Locator::button_text("verify")],
            composer_open: vec![
                Locator::css("[aria-label=\"Start a post\"]"),
                Locator::button_text("start a post"),
            ],
            composer_field: vec![
                Locator::css("[role=\"textbox\"][aria-label*=\"What\"]"),
                Locator::css("div[role=\"textbox\"]"),
            ],
            post_control: vec![
                Locator::css("button.share-actions__primary-action"),
                Locator::dialog_button("post"),
            ],
            timeline_item: vec![Locator::css("div.feed-shared-update-v2")],
            reply_control: vec![Locator::label("comment")],
            reply_post_control: vec![
                Locator::css("button[class*=\"comments-comment-box__submit-button\"]"),
                Locator::text("form[class*=\"comments-comment-box\"] button", "comment"),
            ],
        }
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let profile: Self = serde_json::from_str(&raw).map_err(|e| {
            PublishError::InvalidInput(format!("profile {}: {}", path.as_ref().display(), e))
        })?;
        profile.validate()?;
        Ok(profile)
    }

    /// Reject profiles that cannot drive a full login and publish.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("home_url", Some(&self.home_url)), ("login_url", Some(&self.login_url))]
            .into_iter()
            .chain([
                ("feed_url", self.feed_url.as_ref()),
                ("timeline_url", self.timeline_url.as_ref()),
            ])
        {
            if let Some(value) = value {
                url::Url::parse(value).map_err(|e| {
                    PublishError::InvalidInput(format!("{}: {} ({})", self.name, field, e))
                })?;
            }
        }

        let required = [
            (Step::HomeCheck, &self.logged_in),
            (Step::IdentifierField, &self.identifier_field),
            (Step::PasswordField, &self.password_field),
            (Step::SubmitControl, &self.submit_control),
            (Step::ComposerOpen, &self.composer_open),
            (Step::ComposerField, &self.composer_field),
            (Step::PostControl, &self.post_control),
        ];
        if let Some((step, _)) = required.iter().find(|(_, list)| list.is_empty()) {
            return Err(PublishError::InvalidInput(format!(
                "{}: no locators for required step '{}'",
                self.name, step
            )));
        }
        Ok(())
    }

    pub fn candidates(&self, step: Step) -> &[Locator] {
        match step {
            Step::HomeCheck => &self.logged_in,
            Step::IdentifierField => &self.identifier_field,
            Step::NextControl => &self.next_control,
            Step::PasswordField => &self.password_field,
            Step::SubmitControl => &self.submit_control,
            Step::LoginForm => &self.login_form,
            Step::SecondFactorField => &self.second_factor_field,
            Step::SecondFactorConfirmed => &self.second_factor_confirmed,
            Step::ComposerOpen => &self.composer_open,
            Step::ComposerField => &self.composer_field,
            Step::PostControl => &self.post_control,
            Step::TimelineItem => &self.timeline_item,
            Step::ReplyControl => &self.reply_control,
        }
    }

    pub fn reply_submit_candidates(&self) -> &[Locator] {
        if self.reply_post_control.is_empty() {
            &self.post_control
        } else {
            &self.reply_post_control
        }
    }

    pub fn timeline_url(&self) -> &str {
        self.timeline_url.as_deref().unwrap_or(&self.home_url)
    }

    pub fn post_dwell(&self, default: Duration) -> Duration {
        self.post_dwell_ms.map(Duration::from_millis).unwrap_or(default)
    }

    pub fn supports_replies(&self) -> bool {
        !self.timeline_item.is_empty() && !self.reply_control.is_empty()
    }
}

/// Platforms with a built-in profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    LinkedIn,
}

impl Platform {
    pub fn profile(&self) -> PlatformProfile {
        match self {
            Platform::Twitter => PlatformProfile::twitter(),
            Platform::LinkedIn => PlatformProfile::linkedin(),
        }
    }

    /// Prefix of the environment variables holding this platform's credentials.
    pub fn env_prefix(&self) -> &'static str {
        match self {
            Platform::Twitter => "TWITTER_",
            Platform::LinkedIn => "LINKEDIN_",
        }
    }
}

impl FromStr for Platform {
    type Err = PublishError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "twitter" | "x" => Ok(Platform::Twitter),
            "linkedin" => Ok(Platform::LinkedIn),
            other => Err(PublishError::InvalidInput(format!(
                "unknown platform '{}'",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_profiles_validate() {
        PlatformProfile::twitter().validate().unwrap();
        PlatformProfile::linkedin().validate().unwrap();
    }

    #[test]
    fn linkedin_has_no_next_step_and_a_feed() {
        let profile = PlatformProfile::linkedin();
        assert!(profile.candidates(Step::NextControl).is_empty());
        assert!(profile.feed_url.is_some());
        assert_eq!(profile.post_dwell(Duration::ZERO), Duration::from_secs(3));
    }

    #[test]
    fn builtin_submit_controls_are_scoped_to_the_composer() {
        for profile in [PlatformProfile::twitter(), PlatformProfile::linkedin()] {
            let submits = profile.post_control.iter().chain(&profile.reply_post_control);
            for locator in submits.filter(|l| l.needle().is_some()) {
                // A bare `button` text match also hits feed controls like "Start a post" or "Repost".
                assert!(
                    locator
                        .base_selector()
                        .split(',')
                        .all(|part| part.trim().contains(' ')),
                    "{}: {} searches the whole page",
                    profile.name,
                    locator
                );
            }
        }

        let linkedin = PlatformProfile::linkedin();
        assert_eq!(
            linkedin.post_control[0],
            Locator::css("button.share-actions__primary-action")
        );
    }

    #[test]
    fn reply_submit_falls_back_to_post_control() {
        let mut profile = PlatformProfile::twitter();
        profile.reply_post_control.clear();
        assert_eq!(profile.reply_submit_candidates(), profile.post_control.as_slice());
        assert_eq!(profile.timeline_url(), profile.home_url);
    }

    #[test]
    fn invalid_urls_and_empty_steps_are_rejected() {
        let mut profile = PlatformProfile::twitter();
        profile.login_url = "not a url".to_string();
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("login_url"));

        let mut profile = PlatformProfile::linkedin();
        profile.post_control.clear();
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains("post-control"));
    }

    #[test]
    fn profile_round_trips_through_json() {
        let json = serde_json::to_string(&PlatformProfile::linkedin()).unwrap();
        let back: PlatformProfile = serde_json::from_str(&json).unwrap();
        assert_eq!(back.identifier_field, vec![Locator::id("username")]);
    }

    #[test]
    fn platform_names() {
        assert_eq!("X".parse::<Platform>().unwrap(), Platform::Twitter);
        assert_eq!("linkedin".parse::<Platform>().unwrap(), Platform::LinkedIn);
        assert!("myspace".parse::<Platform>().is_err());
        assert_eq!(Platform::LinkedIn.env_prefix(), "LINKEDIN_");
    }
}
