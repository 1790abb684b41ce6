#[cfg(feature = "chrome")]
pub mod chrome;
pub mod navigation;
pub mod selector;
pub mod session;

#[cfg(feature = "chrome")]
pub use chrome::ChromeBrowser;
pub use navigation::{NavigationManager, NavigationOutcome};
pub use selector::{ProbeTiming, SelectorResolver};
pub use session::SessionController;
