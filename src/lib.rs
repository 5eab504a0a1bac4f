//! # storecheck
//!
//! End-to-end checks for a storefront web app. Page facades (login,
//! dashboard, cart) are written against the element engine in
//! `storecheck-core`; a YAML suite config supplies the base URL, browser
//! settings, credentials, timing and locator overrides.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storecheck::pages::{CartPage, LoginPage};
//! use storecheck::{Params, Session, SuiteConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> storecheck::Result<()> {
//! let params = Params::new().with_env();
//! let config = SuiteConfig::load_with_params("configs/storefront.yaml", &params)?;
//! let session = Session::launch(&config).await?;
//! let harness = session.harness();
//!
//! if let Some(creds) = &config.credentials {
//!     LoginPage::new(harness).login(creds).await?;
//! }
//! let cart = CartPage::new(harness);
//! cart.logout().await?;
//! cart.verify_logged_out().await?;
//!
//! session.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod pages;
mod session;

pub use config::{
    BrowserConfig, Credentials, OnFailure, ParamDef, Params, SuiteConfig, Timeouts, Viewport,
};
pub use session::Session;
pub use storecheck_core as core;

use storecheck_core::DriverError;

/// Result type for storecheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while loading a suite or driving the storefront.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("yaml parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),

    #[error(transparent)]
    Engine(#[from] storecheck_core::Error),

    #[error("option '{label}' not found (available: {})", .available.join(", "))]
    OptionNotFound { label: String, available: Vec<String> },

    #[error("expected at least {expected} visible form inputs, found {found}")]
    FormIncomplete { expected: usize, found: usize },
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Self::Engine(e.into())
    }
}
