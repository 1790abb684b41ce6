use crate::core::{BrowserConfig, BrowserTrait, ElementHandle, Locator, PageActivity};
use crate::errors::{PublishError, Result};
use crate::utils::javascript::{self, ref_selector};
use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::de::DeserializeOwned;
use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Chrome browser implementation
pub struct ChromeBrowser {
    browser: Option<Browser>,
}

impl ChromeBrowser {
    pub fn new() -> Self {
        Self { browser: None }
    }

    fn evaluate(&self, tab: &Tab, script: &str) -> Result<serde_json::Value> {
        let result = tab
            .evaluate(script, false)
            .map_err(|e| PublishError::ScriptFailed(e.to_string()))?;
        Ok(result.value.unwrap_or(serde_json::Value::Null))
    }

    /// Evaluate a script that returns `JSON.stringify(...)` and decode it.
    fn evaluate_json<T: DeserializeOwned>(&self, tab: &Tab, script: &str) -> Result<T> {
        match self.evaluate(tab, script)? {
            serde_json::Value::String(raw) => Ok(serde_json::from_str(&raw)?),
            other => Err(PublishError::ScriptFailed(format!(
                "expected a JSON string, got {}",
                other
            ))),
        }
    }
}

impl Default for ChromeBrowser {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BrowserTrait for ChromeBrowser {
    type TabHandle = Arc<Tab>;

    async fn launch(&mut self, config: &BrowserConfig) -> Result<()> {
        let window_size_arg = format!(
            "--window-size={},{}",
            config.viewport.width, config.viewport.height
        );

        let user_agent_arg = config
            .user_agent
            .as_ref()
            .map(|ua| format!("--user-agent={}", ua));

        let mut args = vec![
            OsStr::new("--no-sandbox"),
            OsStr::new("--disable-dev-shm-usage"),
            OsStr::new(&window_size_arg),
        ];

        if let Some(ref ua_arg) = user_agent_arg {
            args.push(OsStr::new(ua_arg));
        }

        for arg in &config.args {
            args.push(OsStr::new(arg));
        }

        let launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .window_size(Some((config.viewport.width, config.viewport.height)))
            .idle_browser_timeout(config.idle_timeout())
            .args(args)
            .build()
            .map_err(|e| PublishError::SessionUnavailable(e.to_string()))?;

        let browser = Browser::new(launch_options)
            .map_err(|e| PublishError::SessionUnavailable(e.to_string()))?;

        debug!("chrome launched (headless: {})", config.headless);
        self.browser = Some(browser);
        Ok(())
    }

    async fn new_tab(&self) -> Result<Self::TabHandle> {
        let browser = self.browser.as_ref().ok_or_else(|| {
            PublishError::SessionUnavailable("browser not launched".to_string())
        })?;

        let tab = browser
            .new_tab()
            .map_err(|e| PublishError::SessionUnavailable(e.to_string()))?;

        Ok(tab)
    }

    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()> {
        tab.navigate_to(url)
            .map_err(|e| PublishError::NavigationFailed(e.to_string()))?;
        Ok(())
    }

    async fn current_url(&self, tab: &Self::TabHandle) -> Result<String> {
        Ok(tab.get_url())
    }

    async fn page_activity(&self, tab: &Self::TabHandle) -> Result<PageActivity> {
        self.evaluate_json(tab, javascript::PAGE_ACTIVITY_SCRIPT)
    }

    async fn find_all(
        &self,
        tab: &Self::TabHandle,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>> {
        let script = javascript::find_all_script(scope, locator)?;
        let refs: Vec<String> = self.evaluate_json(tab, &script)?;
        Ok(refs.into_iter().map(ElementHandle::new).collect())
    }

    async fn attribute(
        &self,
        tab: &Self::TabHandle,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>> {
        let script = javascript::attribute_script(element, name)?;
        self.evaluate_json(tab, &script)
    }

    async fn click(&self, tab: &Self::TabHandle, element: &ElementHandle) -> Result<()> {
        let selector = ref_selector(element);
        let clicked = tab
            .find_element(&selector)
            .and_then(|el| el.click().map(|_| ()));

        if let Err(e) = clicked {
            // Zero-size or covered elements reject synthesized mouse events.
            debug!("mouse click on {} failed ({}), using DOM click", element.reference, e);
            let script = javascript::click_script(element)?;
            if self.evaluate(tab, &script)?.as_bool() != Some(true) {
                return Err(PublishError::ScriptFailed(format!(
                    "element {} is gone",
                    element.reference
                )));
            }
        }
        Ok(())
    }

    async fn type_text(
        &self,
        tab: &Self::TabHandle,
        element: &ElementHandle,
        text: &str,
        keystroke_delay: Duration,
    ) -> Result<()> {
        let selector = ref_selector(element);
        let el = tab
            .find_element(&selector)
            .map_err(PublishError::from_any_error)?;
        el.focus()
            .map_err(PublishError::from_any_error)?;

        if keystroke_delay.is_zero() {
            el.type_into(text)
                .map_err(PublishError::from_any_error)?;
            return Ok(());
        }

        let mut buf = [0u8; 4];
        for ch in text.chars() {
            tab.type_str(ch.encode_utf8(&mut buf))
                .map_err(PublishError::from_any_error)?;
            tokio::time::sleep(keystroke_delay).await;
        }
        Ok(())
    }

    async fn submit_form(&self, tab: &Self::TabHandle, element: &ElementHandle) -> Result<()> {
        let script = javascript::submit_form_script(element)?;
        if self.evaluate(tab, &script)?.as_bool() != Some(true) {
            return Err(PublishError::ScriptFailed(format!(
                "no form around {}",
                element.reference
            )));
        }
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.browser.is_some()
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the handle terminates the Chrome process.
        self.browser = None;
        Ok(())
    }
}
