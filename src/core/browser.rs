use crate::core::{BrowserConfig, Locator};
use crate::errors::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

/// Opaque reference to an element located on the current page.
///
/// Handles are only meaningful to the browser that produced them and become
/// stale after the next navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    pub reference: String,
}

impl ElementHandle {
    pub fn new(reference: impl Into<String>) -> Self {
        Self {
            reference: reference.into(),
        }
    }
}

/// Snapshot of the page's loading and network activity.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PageActivity {
    pub ready_state: String,
    pub resource_count: u64,
}

impl PageActivity {
    pub fn is_loaded(&self) -> bool {
        self.ready_state == "complete"
    }
}

#[async_trait]
pub trait BrowserTrait: Send + Sync {
    type TabHandle: Send + Sync;

    /// Launch a new browser instance
    async fn launch(&mut self, config: &BrowserConfig) -> Result<()>;

    /// Create a new tab/page
    async fn new_tab(&self) -> Result<Self::TabHandle>;

    /// Start navigating to a URL. Does not wait for the page to settle.
    async fn navigate(&self, tab: &Self::TabHandle, url: &str) -> Result<()>;

    /// Get current URL
    async fn current_url(&self, tab: &Self::TabHandle) -> Result<String>;

    async fn page_activity(&self, tab: &Self::TabHandle) -> Result<PageActivity>;

    /// Every element matching `locator`, in document order, searched below
    /// `scope` or across the whole page when `scope` is `None`.
    async fn find_all(
        &self,
        tab: &Self::TabHandle,
        scope: Option<&ElementHandle>,
        locator: &Locator,
    ) -> Result<Vec<ElementHandle>>;

    async fn attribute(
        &self,
        tab: &Self::TabHandle,
        element: &ElementHandle,
        name: &str,
    ) -> Result<Option<String>>;

    async fn click(&self, tab: &Self::TabHandle, element: &ElementHandle) -> Result<()>;

    /// Focus the element and type `text` one key at a time, pausing
    /// `keystroke_delay` between keys.
    async fn type_text(
        &self,
        tab: &Self::TabHandle,
        element: &ElementHandle,
        text: &str,
        keystroke_delay: Duration,
    ) -> Result<()>;

    /// Submit the form element directly, bypassing its submit control.
    async fn submit_form(&self, tab: &Self::TabHandle, element: &ElementHandle) -> Result<()>;

    /// Check if browser is still running
    fn is_running(&self) -> bool;

    /// Close the browser
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_complete_pages_count_as_loaded() {
        let loading = PageActivity {
            ready_state: "interactive".to_string(),
            resource_count: 3,
        };
        assert!(!loading.is_loaded());

        let done = PageActivity {
            ready_state: "complete".to_string(),
            ..loading
        };
        assert!(done.is_loaded());
    }
}
