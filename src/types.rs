use crate::errors::{PublishError, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Login identifier and secret. Consumed by the login flow, never stored.
#[derive(Clone)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Read `<prefix>EMAIL` and `<prefix>PASSWORD` from the environment.
    pub fn from_env(prefix: &str) -> Result<Self> {
        let read = |suffix: &str| {
            let key = format!("{}{}", prefix, suffix);
            std::env::var(&key)
                .ok()
                .filter(|value| !value.is_empty())
                .ok_or_else(|| PublishError::InvalidInput(format!("{} is not set", key)))
        };
        Ok(Self::new(read("EMAIL")?, read("PASSWORD")?))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A single unit of text to publish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentItem(pub String);

impl ContentItem {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn text(&self) -> &str {
        &self.0
    }

    /// First `max_chars` characters, cut on a character boundary.
    pub fn preview(&self, max_chars: usize) -> String {
        self.0.chars().take(max_chars).collect()
    }
}

impl From<&str> for ContentItem {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for ContentItem {
    fn from(text: String) -> Self {
        Self(text)
    }
}

/// Ordered content items, optionally posted as a reply chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub items: Vec<ContentItem>,
    #[serde(default)]
    pub reply_chain: bool,
}

impl Thread {
    pub fn new<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<ContentItem>,
    {
        Self {
            items: items.into_iter().map(Into::into).collect(),
            reply_chain: false,
        }
    }

    pub fn single(item: impl Into<ContentItem>) -> Self {
        Self::new([item])
    }

    pub fn with_reply_chain(mut self, reply_chain: bool) -> Self {
        self.reply_chain = reply_chain;
        self
    }

    /// Parse a JSON string or array of strings. Blank entries are dropped.
    pub fn from_json(raw: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Input {
            One(String),
            Many(Vec<String>),
        }

        let input: Input = serde_json::from_str(raw)
            .map_err(|e| PublishError::InvalidInput(format!("expected a JSON string or array of strings: {}", e)))?;
        let items = match input {
            Input::One(text) => vec![text],
            Input::Many(items) => items,
        };

        let thread = Self::new(items.into_iter().filter(|text| !text.trim().is_empty()));
        thread.validate()?;
        Ok(thread)
    }

    pub fn validate(&self) -> Result<()> {
        if self.items.is_empty() {
            return Err(PublishError::InvalidInput("no content to publish".to_string()));
        }
        if let Some(index) = self.items.iter().position(|item| item.text().trim().is_empty()) {
            return Err(PublishError::InvalidInput(format!("item {} is empty", index + 1)));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<ContentItem> for Thread {
    fn from(item: ContentItem) -> Self {
        Self::single(item)
    }
}

impl From<&str> for Thread {
    fn from(text: &str) -> Self {
        Self::single(text)
    }
}

impl From<Vec<String>> for Thread {
    fn from(items: Vec<String>) -> Self {
        Self::new(items)
    }
}

pub const CONTENT_PREVIEW_CHARS: usize = 100;

/// Outcome of one publish operation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishResult {
    pub success: bool,
    pub items_published: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_preview: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(serialize_with = "rfc3339_millis")]
    pub timestamp: DateTime<Utc>,
}

impl PublishResult {
    pub fn succeeded(thread: &Thread) -> Self {
        Self {
            success: true,
            items_published: thread.len(),
            content_preview: Self::preview_for(thread),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(thread: &Thread, items_published: usize, error: &PublishError) -> Self {
        Self {
            success: false,
            items_published,
            content_preview: Self::preview_for(thread),
            error: Some(error.to_string()),
            timestamp: Utc::now(),
        }
    }

    fn preview_for(thread: &Thread) -> Option<String> {
        match thread.items.as_slice() {
            [only] => Some(only.preview(CONTENT_PREVIEW_CHARS)),
            _ => None,
        }
    }
}

fn rfc3339_millis<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_debug_hides_secret() {
        let creds = Credentials::new("me@example.com", "hunter2");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("me@example.com"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn credentials_from_env_requires_both_keys() {
        std::env::set_var("POSTFLOW_TEST_A_EMAIL", "a@example.com");
        std::env::set_var("POSTFLOW_TEST_A_PASSWORD", "pw");
        let creds = Credentials::from_env("POSTFLOW_TEST_A_").unwrap();
        assert_eq!(creds.identifier, "a@example.com");

        std::env::set_var("POSTFLOW_TEST_B_EMAIL", "b@example.com");
        let err = Credentials::from_env("POSTFLOW_TEST_B_").unwrap_err();
        assert!(err.to_string().contains("POSTFLOW_TEST_B_PASSWORD"));
    }

    #[test]
    fn thread_from_json_accepts_string_or_array() {
        let thread = Thread::from_json(r#"["First", "  ", "Second"]"#).unwrap();
        assert_eq!(thread.items, vec![ContentItem::from("First"), ContentItem::from("Second")]);
        assert!(!thread.reply_chain);

        let thread = Thread::from_json(r#""Just one""#).unwrap();
        assert_eq!(thread.len(), 1);
    }

    #[test]
    fn thread_from_json_rejects_bad_input() {
        for raw in ["not json", "[]", r#"["", " "]"#, "[1, 2]"] {
            let err = Thread::from_json(raw).unwrap_err();
            assert!(err.to_string().starts_with("InvalidInput"), "{}", raw);
        }
    }

    #[test]
    fn preview_cuts_on_char_boundary() {
        let item = ContentItem::new("héllo wörld");
        assert_eq!(item.preview(7), "héllo w");
    }

    #[test]
    fn result_serializes_camel_case() {
        let thread = Thread::new(["First", "Second"]);
        let err = PublishError::SubmitControlUnavailable("item 2".into());
        let value = serde_json::to_value(PublishResult::failed(&thread, 1, &err)).unwrap();

        assert_eq!(value["success"], false);
        assert_eq!(value["itemsPublished"], 1);
        assert_eq!(value["error"], "SubmitControlUnavailable: item 2");
        assert!(value.get("contentPreview").is_none());
        let stamp = value["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(stamp).is_ok());
        assert!(stamp.ends_with('Z'));
    }

    #[test]
    fn single_item_result_carries_preview() {
        let long = "x".repeat(150);
        let result = PublishResult::succeeded(&Thread::single(long.as_str()));
        assert_eq!(result.items_published, 1);
        assert_eq!(result.content_preview.unwrap().len(), CONTENT_PREVIEW_CHARS);
    }
}
