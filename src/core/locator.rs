use serde::{Deserialize, Serialize};
use std::fmt;

/// One strategy for finding a UI element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Locator {
    /// Element `id`
    Id(String),
    /// `data-testid` attribute
    TestId(String),
    /// Attribute match written as a CSS selector
    Css(String),
    /// Case-insensitive substring of `aria-label`
    Label(String),
    /// Elements matching `within` whose visible text or `aria-label`
    /// contains `text`, case-insensitively
    Text { within: String, text: String },
}

impl Locator {
    pub fn id(value: impl Into<String>) -> Self {
        Locator::Id(value.into())
    }

    pub fn test_id(value: impl Into<String>) -> Self {
        Locator::TestId(value.into())
    }

    pub fn css(value: impl Into<String>) -> Self {
        Locator::Css(value.into())
    }

    pub fn label(value: impl Into<String>) -> Self {
        Locator::Label(value.into())
    }

    pub fn text(within: impl Into<String>, text: impl Into<String>) -> Self {
        Locator::Text {
            within: within.into(),
            text: text.into(),
        }
    }

    /// Any button-like element whose text or label contains `text`.
    pub fn button_text(text: impl Into<String>) -> Self {
        Self::text("button, [role=\"button\"]", text)
    }

    /// Button-like element inside an open dialog whose text or label contains `text`.
    pub fn dialog_button(text: impl Into<String>) -> Self {
        Self::text(
            "[role=\"dialog\"] button, [role=\"dialog\"] [role=\"button\"]",
            text,
        )
    }

    /// CSS selecting the candidate set before any text filtering.
    pub fn base_selector(&self) -> String {
        match self {
            Locator::Id(id) => format!("[id=\"{}\"]", escape_attr(id)),
            Locator::TestId(id) => format!("[data-testid=\"{}\"]", escape_attr(id)),
            Locator::Css(css) => css.clone(),
            Locator::Label(_) => "[aria-label]".to_string(),
            Locator::Text { within, .. } => within.clone(),
        }
    }

    /// Lower-cased needle the candidate set is filtered by, if any.
    pub fn needle(&self) -> Option<String> {
        match self {
            Locator::Label(text) | Locator::Text { text, .. } => Some(text.to_lowercase()),
            _ => None,
        }
    }

    /// Whether the needle is matched against visible text as well as the label.
    pub fn matches_text(&self) -> bool {
        matches!(self, Locator::Text { .. })
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Id(id) => write!(f, "id={}", id),
            Locator::TestId(id) => write!(f, "testid={}", id),
            Locator::Css(css) => write!(f, "css={}", css),
            Locator::Label(label) => write!(f, "label~={}", label),
            Locator::Text { within, text } => write!(f, "{} text~={}", within, text),
        }
    }
}

fn escape_attr(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_selectors() {
        assert_eq!(Locator::id("username").base_selector(), "[id=\"username\"]");
        assert_eq!(
            Locator::test_id("tweetTextarea_0").base_selector(),
            "[data-testid=\"tweetTextarea_0\"]"
        );
        assert_eq!(
            Locator::css("input[type=\"password\"]").base_selector(),
            "input[type=\"password\"]"
        );
        assert_eq!(Locator::label("Compose").base_selector(), "[aria-label]");
    }

    #[test]
    fn attribute_values_are_escaped() {
        assert_eq!(
            Locator::test_id("a\"b").base_selector(),
            "[data-testid=\"a\\\"b\"]"
        );
    }

    #[test]
    fn text_needles_are_lowercased() {
        let locator = Locator::button_text("Sign In");
        assert_eq!(locator.needle().as_deref(), Some("sign in"));
        assert!(locator.matches_text());
        assert!(!Locator::label("Compose").matches_text());
        assert_eq!(Locator::css("form").needle(), None);
    }

    #[test]
    fn dialog_buttons_stay_inside_the_dialog() {
        let locator = Locator::dialog_button("Post");
        assert!(locator
            .base_selector()
            .split(',')
            .all(|part| part.trim().starts_with("[role=\"dialog\"] ")));
        assert_eq!(locator.needle().as_deref(), Some("post"));
    }

    #[test]
    fn serde_shape_is_tagged() {
        let json = serde_json::to_value(Locator::text("button", "next")).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "by": "text", "value": { "within": "button", "text": "next" } })
        );
        let back: Locator = serde_json::from_value(serde_json::json!({ "by": "id", "value": "password" })).unwrap();
        assert_eq!(back, Locator::id("password"));
    }
}
