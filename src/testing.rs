//! Scripted in-memory browser for exercising the publishing flow without Chrome.

use crate::core::{BrowserConfig, BrowserTrait, ElementHandle, Locator, PageActivity, PlatformProfile};
use crate::errors::{PublishError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

/// When a fake element is present on the page.
#[derive(Debug, Clone, PartialEq)]
pub enum Visibility {
    Always,
    AfterLogin,
    ComposerOpen,
    ReplyOpen,
    AfterPosts(usize),
    After(Duration),
    Never,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickEffect {
    Nothing,
    LogIn,
    OpenComposer,
    OpenReply,
    Publish,
}

#[derive(Debug, Clone)]
pub struct FakeElement {
    pub name: String,
    pub locators: Vec<Locator>,
    pub parent: Option<String>,
    pub visibility: Visibility,
    pub attributes: HashMap<String, String>,
    pub on_click: ClickEffect,
    /// Content for which this element reports `aria-disabled="true"`.
    pub disabled_for: Vec<String>,
    pub text: Option<String>,
    /// Displays the most recently published item instead of `text`.
    pub shows_latest_post: bool,
}

impl FakeElement {
    pub fn new(name: &str, locator: Locator) -> Self {
        Self {
            name: name.to_string(),
            locators: vec![locator],
            parent: None,
            visibility: Visibility::Always,
            attributes: HashMap::new(),
            on_click: ClickEffect::Nothing,
            disabled_for: Vec::new(),
            text: None,
            shows_latest_post: false,
        }
    }

    pub fn visible(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn on_click(mut self, effect: ClickEffect) -> Self {
        self.on_click = effect;
        self
    }

    pub fn inside(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = Some(text.to_string());
        self
    }

    pub fn showing_latest_post(mut self) -> Self {
        self.shows_latest_post = true;
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FakeEvent {
    Launch,
    Navigate(String),
    Click(String),
    Type { element: String, text: String },
    SubmitForm(String),
    Close,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedItem {
    pub text: String,
    pub as_reply: bool,
}

#[derive(Debug, Default)]
struct PageState {
    launched: bool,
    logged_in: bool,
    composer_open: bool,
    replying: bool,
    last_typed: String,
    url: String,
    navigated_at: Option<Instant>,
    pending_redirect: Option<(Instant, String)>,
    published: Vec<PublishedItem>,
    events: Vec<FakeEvent>,
    close_calls: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct FakeTab;

/// A page made of named elements whose presence follows simple rules.
///
/// Clones share state, so a test can keep one clone for inspection after
/// handing the other to a session.
#[derive(Debug, Clone)]
pub struct FakeBrowser {
    elements: Arc<Vec<FakeElement>>,
    state: Arc<Mutex<PageState>>,
    started: Instant,
    fail_launch: bool,
    settles: bool,
    busy_for: Duration,
    login_redirect: Option<(Duration, String)>,
}

impl FakeBrowser {
    pub fn new(elements: Vec<FakeElement>) -> Self {
        Self {
            elements: Arc::new(elements),
            state: Arc::new(Mutex::new(PageState::default())),
            started: Instant::now(),
            fail_launch: false,
            settles: true,
            busy_for: Duration::ZERO,
            login_redirect: None,
        }
    }

    /// A site matching [`test_profile`] that requires logging in, with every
    /// step resolvable through its first candidate. Logging in lands on the
    /// home page one second after the credentials are submitted.
    pub fn standard() -> Self {
        Self::new(standard_elements())
            .redirect_after_login(Duration::from_secs(1), "https://social.test/home")
    }

    pub fn already_logged_in() -> Self {
        let browser = Self::standard();
        browser.lock().logged_in = true;
        browser
    }

    pub fn with_elements(mut self, edit: impl FnOnce(&mut Vec<FakeElement>)) -> Self {
        let mut elements = self.elements.as_ref().clone();
        edit(&mut elements);
        self.elements = Arc::new(elements);
        self
    }

    pub fn without(self, name: &str) -> Self {
        self.with_elements(|elements| elements.retain(|e| e.name != name))
    }

    pub fn replace(self, element: FakeElement) -> Self {
        self.with_elements(|elements| {
            match elements.iter_mut().find(|e| e.name == element.name) {
                Some(slot) => *slot = element,
                None => elements.push(element),
            }
        })
    }

    pub fn disable_post_for(self, text: &str) -> Self {
        let text = text.to_string();
        self.with_elements(move |elements| {
            for element in elements.iter_mut().filter(|e| e.on_click == ClickEffect::Publish) {
                element.disabled_for.push(text.clone());
            }
        })
    }

    pub fn failing_launch(mut self) -> Self {
        self.fail_launch = true;
        self
    }

    pub fn never_settles(mut self) -> Self {
        self.settles = false;
        self
    }

    /// Keep fetching resources for `period` after every navigation.
    pub fn busy_for(mut self, period: Duration) -> Self {
        self.busy_for = period;
        self
    }

    /// Change the URL to `url` once `delay` has passed after a login submit.
    pub fn redirect_after_login(mut self, delay: Duration, url: &str) -> Self {
        self.login_redirect = Some((delay, url.to_string()));
        self
    }

    pub fn no_login_redirect(mut self) -> Self {
        self.login_redirect = None;
        self
    }

    pub fn events(&self) -> Vec<FakeEvent> {
        self.lock().events.clone()
    }

    pub fn published(&self) -> Vec<PublishedItem> {
        self.lock().published.clone()
    }

    pub fn close_calls(&self) -> usize {
        self.lock().close_calls
    }

    pub fn clicks_on(&self, name: &str) -> usize {
        self.events()
            .iter()
            .filter(|e| matches!(e, FakeEvent::Click(n) if n == name))
            .count()
    }

    pub fn typed_into(&self, name: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                FakeEvent::Type { element, text } if element == name => Some(text),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, PageState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_visible(&self, element: &FakeElement, state: &PageState) -> bool {
        match &element.visibility {
            Visibility::Always => true,
            Visibility::AfterLogin => state.logged_in,
            Visibility::ComposerOpen => state.composer_open,
            Visibility::ReplyOpen => state.composer_open && state.replying,
            Visibility::AfterPosts(n) => state.published.len() >= *n,
            Visibility::After(delay) => self.started.elapsed() >= *delay,
            Visibility::Never => false,
        }
    }

    fn displayed_text(&self, element: &FakeElement, state: &PageState) -> Option<String> {
        if element.shows_latest_post {
            state.published.last().map(|item| item.text.clone())
        } else {
            element.text.clone()
        }
    }

    /// Exact locator match, or a text locator whose `within` is one of the
    /// element's own selectors and whose needle appears in its text.
    fn matches(&self, element: &FakeElement, locator: &Locator, state: &PageState) -> bool {
        if element.locators.contains(locator) {
            return true;
        }
        let (Locator::Text { within, .. }, Some(needle)) = (locator, locator.needle()) else {
            return false;
        };
        element
            .locators
            .iter()
            .any(|own| own.needle().is_none() && own.base_selector() == *within)
            && self
                .displayed_text(element, state)
                .is_some_and(|text| text.to_lowercase().contains(&needle))
    }

    fn schedule_login_redirect(&self, state: &mut PageState) {
        if let Some((delay, url)) = &self.login_redirect {
            state.pending_redirect = Some((Instant::now() + *delay, url.clone()));
        }
    }

    fn apply_redirect(state: &mut PageState) {
        if let Some((at, url)) = state.pending_redirect.take() {
            if Instant::now() >= at {
                state.url = url;
                state.navigated_at = Some(at);
            } else {
                state.pending_redirect = Some((at, url));
            }
        }
    }

    fn element(&self, handle: &ElementHandle) -> Result<&FakeElement> {
        self.elements
            .iter()
            .find(|e| e.name == handle.reference)
            .ok_or_else(|| PublishError::ScriptFailed(format!("stale handle {}", handle.reference)))
    }
}

#[async_trait]
impl BrowserTrait for FakeBrowser {
    type TabHandle = FakeTab;

    async fn launch(&mut self, _config: &BrowserConfig) -> Result<()> {
        if self.fail_launch {
            return Err(PublishError::ChromeError("no chrome binary".to_string()));
        }
        let mut state = self.lock();
        state.launched = true;
        state.events.push(FakeEvent::Launch);
        Ok(())
    }

    async fn new_tab(&self) -> Result<FakeTab> {
        Ok(FakeTab)
    }

    async fn navigate(&self, _tab: &FakeTab, url: &str) -> Result<()> {
        let mut state = self.lock();
        state.url = url.to_string();
        state.navigated_at = Some(Instant::now());
        state.pending_redirect = None;
        state.composer_open = false;
        state.replying = false;
        state.events.push(FakeEvent::Navigate(url.to_string()));
        Ok(())
    }

    async fn current_url(&self, _tab: &FakeTab) -> Result<String> {
        let mut state = self.lock();
        Self::apply_redirect(&mut state);
        Ok(state.url.clone())
    }

    async fn page_activity(&self, _tab: &FakeTab) -> Result<PageActivity> {
        let mut state = self.lock();
        Self::apply_redirect(&mut state);
        let ready_state = if self.settles { "complete" } else { "loading" };
        let since = state.navigated_at.unwrap_or(self.started).elapsed();
        let fetched = since.min(self.busy_for).as_millis() / 100;
        Ok(PageActivity {
            ready_state: ready_state.to_string(),
            resource_count: 12 + fetched as u64,
        })
    }

    async fn find_all(
        &self,
        _tab: &FakeTab,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let state = self.lock();
        Ok(self
            .elements
            .iter()
            .filter(|e| match scope {
                Some(scope) => e.parent.as_deref() == Some(scope.reference.as_str()),
                None => true,
            })
            .filter(|e| self.is_visible(e, &state))
            .filter(|e| self.matches(e, locator, &state))
            .map(|e| ElementHandle::new(e.name.clone()))
            .collect())
    }

    async fn attribute(
        &self,
        _tab: &FakeTab,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>> {
        let element = self.element(element)?;
        let state = self.lock();
        if name == "aria-disabled" && element.disabled_for.contains(&state.last_typed) {
            return Ok(Some("true".to_string()));
        }
        Ok(element.attributes.get(name).cloned())
    }

    async fn click(&self, _tab: &FakeTab, element: &ElementHandle) -> Result<()> {
        let element = self.element(element)?;
        let mut state = self.lock();
        state.events.push(FakeEvent::Click(element.name.clone()));
        match element.on_click {
            ClickEffect::Nothing => {}
            ClickEffect::LogIn => {
                state.logged_in = true;
                self.schedule_login_redirect(&mut state);
            }
            ClickEffect::OpenComposer => {
                state.composer_open = true;
                state.replying = false;
            }
            ClickEffect::OpenReply => {
                state.composer_open = true;
                state.replying = true;
            }
            ClickEffect::Publish => {
                let item = PublishedItem {
                    text: state.last_typed.clone(),
                    as_reply: state.replying,
                };
                state.published.push(item);
                state.composer_open = false;
                state.replying = false;
            }
        }
        Ok(())
    }

    async fn type_text(
        &self,
        _tab: &FakeTab,
        element: &ElementHandle,
        text: &str,
        _keystroke_delay: Duration,
    ) -> Result<()> {
        let element = self.element(element)?;
        let mut state = self.lock();
        state.last_typed = text.to_string();
        state.events.push(FakeEvent::Type {
            element: element.name.clone(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn submit_form(&self, _tab: &FakeTab, element: &ElementHandle) -> Result<()> {
        let element = self.element(element)?;
        let mut state = self.lock();
        state.logged_in = true;
        self.schedule_login_redirect(&mut state);
        state.events.push(FakeEvent::SubmitForm(element.name.clone()));
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.lock().launched
    }

    async fn close(&mut self) -> Result<()> {
        let mut state = self.lock();
        state.launched = false;
        state.close_calls += 1;
        state.events.push(FakeEvent::Close);
        Ok(())
    }
}

/// Profile whose locators line up with [`FakeBrowser::standard`].
pub fn test_profile() -> PlatformProfile {
    PlatformProfile {
        name: "fake".to_string(),
        home_url: "https://social.test/home".to_string(),
        login_url: "https://social.test/login".to_string(),
        feed_url: None,
        timeline_url: None,
        post_dwell_ms: None,
        logged_in: vec![Locator::test_id("compose")],
        identifier_field: vec![Locator::id("user"), Locator::css("input[name=\"user\"]")],
        next_control: vec![Locator::button_text("next")],
        password_field: vec![Locator::id("pass")],
        submit_control: vec![Locator::button_text("log in")],
        login_form: vec![Locator::css("form")],
        second_factor_field: vec![Locator::css("input[maxlength=\"6\"]")],
        second_factor_confirmed: vec![Locator::button_text("verify")],
        composer_open: vec![Locator::test_id("compose")],
        composer_field: vec![Locator::test_id("editor"), Locator::css("[role=\"textbox\"]")],
        post_control: vec![Locator::button_text("post")],
        timeline_item: vec![Locator::css("article")],
        reply_control: vec![Locator::test_id("reply")],
        reply_post_control: vec![Locator::button_text("reply")],
    }
}

fn standard_elements() -> Vec<FakeElement> {
    vec![
        FakeElement::new("compose", Locator::test_id("compose"))
            .visible(Visibility::AfterLogin)
            .on_click(ClickEffect::OpenComposer),
        FakeElement::new("user", Locator::id("user")),
        FakeElement::new("next", Locator::button_text("next")),
        FakeElement::new("pass", Locator::id("pass")),
        FakeElement::new("login", Locator::button_text("log in")).on_click(ClickEffect::LogIn),
        FakeElement::new("form", Locator::css("form")),
        FakeElement::new("editor", Locator::test_id("editor")).visible(Visibility::ComposerOpen),
        FakeElement::new("post", Locator::button_text("post"))
            .visible(Visibility::ComposerOpen)
            .on_click(ClickEffect::Publish),
        FakeElement::new("article", Locator::css("article"))
            .visible(Visibility::AfterPosts(1))
            .showing_latest_post(),
        FakeElement::new("reply", Locator::test_id("reply"))
            .inside("article")
            .visible(Visibility::AfterPosts(1))
            .on_click(ClickEffect::OpenReply),
        FakeElement::new("reply-post", Locator::button_text("reply"))
            .visible(Visibility::ReplyOpen)
            .on_click(ClickEffect::Publish),
    ]
}
