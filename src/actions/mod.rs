pub mod base;
pub mod compose;
pub mod login;
pub mod thread;

pub use base::PageContext;
pub use compose::{Composer, ComposerEntry};
pub use login::{AuthReport, AuthState, Authenticator, SecondFactorOutcome};
pub use thread::{ThreadOrchestrator, ThreadOutcome};
