use serde::Serialize;
use std::fmt;

/// Lifecycle of one browser session, owned by a single publish operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Publishing,
    Closed,
}

impl SessionState {
    /// Move to `next` if the lifecycle allows it. Any state may close.
    pub fn advance(&mut self, next: SessionState) -> bool {
        let allowed = matches!(
            (*self, next),
            (SessionState::Unauthenticated, SessionState::Authenticating)
                | (SessionState::Authenticating, SessionState::Authenticated)
                | (SessionState::Authenticated, SessionState::Publishing)
        ) || (next == SessionState::Closed && *self != SessionState::Closed);

        if allowed {
            tracing::debug!("session {} -> {}", self, next);
            *self = next;
        }
        allowed
    }

    pub fn is_closed(&self) -> bool {
        *self == SessionState::Closed
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Unauthenticated => "unauthenticated",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
            SessionState::Publishing => "publishing",
            SessionState::Closed => "closed",
        };
        f.write_str(name)
    }
}
