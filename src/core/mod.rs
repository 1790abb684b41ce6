pub mod browser;
pub mod config;
pub mod locator;
pub mod profile;
pub mod session;

pub use browser::{BrowserTrait, ElementHandle, PageActivity};
pub use config::{
    BrowserConfig, Config, SecondFactorConfig, SecondFactorPolicy, TimingConfig, Viewport,
};
pub use locator::Locator;
pub use profile::{Platform, PlatformProfile, Step};
pub use session::SessionState;
