use crate::errors::{PublishError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub browser: BrowserConfig,
    pub timing: TimingConfig,
    pub second_factor: SecondFactorConfig,
}

impl Config {
    /// Load a (possibly partial) JSON config; absent fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        serde_json::from_str(&raw).map_err(|e| {
            PublishError::InvalidInput(format!(
                "config {}: {}",
                path.as_ref().display(),
                e
            ))
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub headless: bool,
    pub viewport: Viewport,
    pub user_agent: Option<String>,
    pub args: Vec<String>,
    pub idle_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

/// Every fixed wait used by the publishing flow, in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub probe_timeout_ms: u64,
    pub probe_interval_ms: u64,
    pub navigation_timeout_ms: u64,
    pub network_quiet_ms: u64,
    pub login_settle_timeout_ms: u64,
    pub login_page_delay_ms: u64,
    pub field_delay_ms: u64,
    pub credential_keystroke_ms: u64,
    pub verify_dwell_ms: u64,
    pub composer_open_delay_ms: u64,
    pub focus_delay_ms: u64,
    pub content_keystroke_ms: u64,
    pub pre_submit_delay_ms: u64,
    pub post_dwell_ms: u64,
    pub inter_item_delay_ms: u64,
    pub reply_open_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecondFactorConfig {
    pub dwell_ms: u64,
    pub poll_interval_ms: u64,
    pub max_polls: u32,
    pub on_timeout: SecondFactorPolicy,
}

/// What to do when the second-factor poll runs out without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SecondFactorPolicy {
    /// Continue to the final login check and let it decide.
    Verify,
    /// Fail authentication immediately.
    Fail,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            viewport: Viewport::default(),
            user_agent: Some(DEFAULT_USER_AGENT.to_string()),
            args: vec![
                "--disable-gpu".to_string(),
                "--disable-setuid-sandbox".to_string(),
            ],
            idle_timeout_ms: 600_000,
        }
    }
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            probe_timeout_ms: 2000,
            probe_interval_ms: 100,
            navigation_timeout_ms: 30000,
            network_quiet_ms: 500,
            login_settle_timeout_ms: 15000,
            login_page_delay_ms: 1000,
            field_delay_ms: 500,
            credential_keystroke_ms: 50,
            verify_dwell_ms: 2000,
            composer_open_delay_ms: 1500,
            focus_delay_ms: 300,
            content_keystroke_ms: 10,
            pre_submit_delay_ms: 500,
            post_dwell_ms: 2000,
            inter_item_delay_ms: 3000,
            reply_open_delay_ms: 800,
        }
    }
}

impl Default for SecondFactorConfig {
    fn default() -> Self {
        Self {
            dwell_ms: 2000,
            poll_interval_ms: 1000,
            max_polls: 30,
            on_timeout: SecondFactorPolicy::Verify,
        }
    }
}

fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

impl BrowserConfig {
    pub fn idle_timeout(&self) -> Duration {
        ms(self.idle_timeout_ms)
    }
}

impl TimingConfig {
    pub fn probe_timeout(&self) -> Duration {
        ms(self.probe_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        ms(self.probe_interval_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        ms(self.navigation_timeout_ms)
    }

    pub fn network_quiet(&self) -> Duration {
        ms(self.network_quiet_ms)
    }

    pub fn login_settle_timeout(&self) -> Duration {
        ms(self.login_settle_timeout_ms)
    }

    pub fn login_page_delay(&self) -> Duration {
        ms(self.login_page_delay_ms)
    }

    pub fn field_delay(&self) -> Duration {
        ms(self.field_delay_ms)
    }

    pub fn credential_keystroke(&self) -> Duration {
        ms(self.credential_keystroke_ms)
    }

    pub fn verify_dwell(&self) -> Duration {
        ms(self.verify_dwell_ms)
    }

    pub fn composer_open_delay(&self) -> Duration {
        ms(self.composer_open_delay_ms)
    }

    pub fn focus_delay(&self) -> Duration {
        ms(self.focus_delay_ms)
    }

    pub fn content_keystroke(&self) -> Duration {
        ms(self.content_keystroke_ms)
    }

    pub fn pre_submit_delay(&self) -> Duration {
        ms(self.pre_submit_delay_ms)
    }

    pub fn post_dwell(&self) -> Duration {
        ms(self.post_dwell_ms)
    }

    pub fn inter_item_delay(&self) -> Duration {
        ms(self.inter_item_delay_ms)
    }

    pub fn reply_open_delay(&self) -> Duration {
        ms(self.reply_open_delay_ms)
    }
}

impl SecondFactorConfig {
    pub fn dwell(&self) -> Duration {
        ms(self.dwell_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        ms(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config: Config = serde_json::from_str(
            r#"{ "timing": { "inter_item_delay_ms": 5000 }, "second_factor": { "on_timeout": "fail" } }"#,
        )
        .unwrap();

        assert_eq!(config.timing.inter_item_delay(), Duration::from_secs(5));
        assert_eq!(config.timing.post_dwell(), Duration::from_secs(2));
        assert_eq!(config.second_factor.on_timeout, SecondFactorPolicy::Fail);
        assert_eq!(config.second_factor.max_polls, 30);
        assert!(config.browser.headless);
    }

    #[test]
    fn missing_config_file_is_an_io_error() {
        let err = Config::from_json_file("/definitely/not/here.json").unwrap_err();
        assert!(matches!(err, PublishError::Io(_)));
    }
}
