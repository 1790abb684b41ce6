pub mod actions;
pub mod browser;
pub mod core;
pub mod errors;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
pub mod utils;

pub use browser::SessionController;
#[cfg(feature = "chrome")]
pub use browser::ChromeBrowser;
pub use crate::core::{BrowserTrait, Config, Platform, PlatformProfile};
pub use errors::{ErrorKind, PublishError};
pub use types::*;
