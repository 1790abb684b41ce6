use thiserror::Error;

use crate::core::Step;

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("ElementNotFound: no candidate resolved for step '{step}'")]
    ElementNotFound { step: Step },

    #[error("AuthenticationFailed: {0}")]
    AuthenticationFailed(String),

    #[error("SubmitControlUnavailable: {0}")]
    SubmitControlUnavailable(String),

    #[error("SessionUnavailable: {0}")]
    SessionUnavailable(String),

    #[error("InvalidInput: {0}")]
    InvalidInput(String),

    #[error("NavigationFailed: {0}")]
    NavigationFailed(String),

    #[error("ScriptFailed: {0}")]
    ScriptFailed(String),

    #[error("ChromeError: {0}")]
    ChromeError(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, PublishError>;

/// Coarse classification used by callers that branch on the failure
/// category rather than the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ElementNotFound,
    AuthenticationFailed,
    SubmitControlUnavailable,
    SessionUnavailable,
    InvalidInput,
    Driver,
}

impl PublishError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PublishError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            PublishError::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            PublishError::SubmitControlUnavailable(_) => ErrorKind::SubmitControlUnavailable,
            PublishError::SessionUnavailable(_) => ErrorKind::SessionUnavailable,
            PublishError::InvalidInput(_) | PublishError::Serialization(_) => {
                ErrorKind::InvalidInput
            }
            PublishError::NavigationFailed(_)
            | PublishError::ScriptFailed(_)
            | PublishError::ChromeError(_)
            | PublishError::Io(_) => ErrorKind::Driver,
        }
    }

    pub fn from_any_error<E: std::fmt::Display>(err: E) -> Self {
        PublishError::ChromeError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_starts_with_taxonomy_name() {
        let err = PublishError::ElementNotFound {
            step: Step::IdentifierField,
        };
        assert!(err.to_string().starts_with("ElementNotFound"));
        assert!(err.to_string().contains("identifier-field"));

        let err = PublishError::SubmitControlUnavailable("item 2".to_string());
        assert_eq!(err.to_string(), "SubmitControlUnavailable: item 2");
    }

    #[test]
    fn driver_failures_share_a_kind() {
        assert_eq!(
            PublishError::ScriptFailed("boom".into()).kind(),
            ErrorKind::Driver
        );
        assert_eq!(
            PublishError::from_any_error("tab crashed").kind(),
            ErrorKind::Driver
        );
        let bad_json = serde_json::from_str::<Vec<String>>("[").unwrap_err();
        assert_eq!(
            PublishError::from(bad_json).kind(),
            ErrorKind::InvalidInput
        );
    }
}
