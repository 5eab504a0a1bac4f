//! # storecheck-core
//!
//! Element resolution, click/fill interaction and state verification for
//! UI checks driven through a browser. Every wait is a bounded poll; every
//! fallback chain is an ordered list tried first-match-wins.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use storecheck_core::{EngineConfig, Harness, LocatorRegistry, Strategy};
//! use storecheck_core::eoka_driver::EokaDriver;
//!
//! # #[tokio::main]
//! # async fn main() -> storecheck_core::Result<()> {
//! let browser = eoka::Browser::launch().await.map_err(storecheck_core::DriverError::from)?;
//! let page = browser.new_page("https://shop.example.com").await.map_err(storecheck_core::DriverError::from)?;
//! let driver = EokaDriver::new(page);
//!
//! let registry = LocatorRegistry::builder()
//!     .register("checkout button", [Strategy::xpath("//button[normalize-space()='Checkout']")])
//!     .build()?;
//! let config = EngineConfig::default();
//! let harness = Harness::new(&driver, &registry, &config);
//!
//! let via = harness.click("checkout button").await?;
//! println!("clicked via {via}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod driver;
pub mod eoka_driver;
pub mod escalation;
pub mod harness;
pub mod interaction;
pub mod locator;
pub mod resolver;
pub mod scripts;
pub mod verification;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::EngineConfig;
pub use driver::{Driver, DriverError, ElementHandle, ScriptArg};
pub use escalation::{Escalation, EscalationOutcome, EscalationStep};
pub use harness::Harness;
pub use interaction::{ClickVia, FormField, InteractionEngine};
pub use locator::{Locator, LocatorRegistry, Strategy, StrategyKind};
pub use resolver::{ElementResolver, ResolvedElement};
pub use verification::{Check, Predicate, VerificationEngine, Verified};

use std::time::Duration;

/// Result type for storecheck-core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the engines. All of them are recoverable by the
/// caller; none aborts the process.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown locator: {0}")]
    UnknownLocator(String),

    #[error("element '{name}' not found within {timeout:?} (tried: {})", .strategies.join(", "))]
    ElementNotFound {
        name: String,
        strategies: Vec<String>,
        timeout: Duration,
    },

    #[error("interaction with '{name}' failed: {cause}")]
    InteractionFailed { name: String, cause: String },

    #[error("failed to fill '{field}': {cause}")]
    FillFailed { field: String, cause: String },

    #[error("form field #{index} failed: {source}")]
    FormFieldFailed {
        index: usize,
        #[source]
        source: Box<Error>,
    },

    #[error("could not verify {context} (observed url: {observed}; checks: {})", .attempted.join(", "))]
    VerificationFailed {
        context: String,
        observed: String,
        attempted: Vec<String>,
    },

    #[error("{action}: every fallback failed ({})", .attempts.join("; "))]
    EscalationExhausted {
        action: String,
        attempts: Vec<String>,
    },

    #[error("driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Whether an alternative path (another strategy, a fallback step) is
    /// worth trying after this failure.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::ElementNotFound { .. }
            | Self::InteractionFailed { .. }
            | Self::FillFailed { .. }
            | Self::FormFieldFailed { .. }
            | Self::VerificationFailed { .. } => true,
            Self::Driver(e) => e.is_transient(),
            Self::UnknownLocator(_) | Self::EscalationExhausted { .. } | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_not_found_lists_strategies() {
        let err = Error::ElementNotFound {
            name: "cart icon".into(),
            strategies: vec!["xpath=//a".into(), "css=header a".into()],
            timeout: Duration::from_secs(2),
        };
        let msg = err.to_string();
        assert!(msg.contains("cart icon"), "{}", msg);
        assert!(msg.contains("xpath=//a, css=header a"), "{}", msg);
        assert!(msg.contains("2s"), "{}", msg);
    }

    #[test]
    fn test_recoverable_classification() {
        assert!(Error::InteractionFailed {
            name: "x".into(),
            cause: "y".into()
        }
        .is_recoverable());
        assert!(Error::Driver(DriverError::StaleElement).is_recoverable());
        assert!(!Error::Driver(DriverError::Script("boom".into())).is_recoverable());
        assert!(!Error::UnknownLocator("nope".into()).is_recoverable());
        assert!(!Error::Config("bad".into()).is_recoverable());
    }

    #[test]
    fn test_form_field_failed_keeps_source() {
        use std::error::Error as _;
        let inner = Error::FillFailed {
            field: "Postcode".into(),
            cause: "stale element".into(),
        };
        let err = Error::FormFieldFailed {
            index: 2,
            source: Box::new(inner),
        };
        assert!(err.to_string().starts_with("form field #2 failed"));
        assert!(err.source().unwrap().to_string().contains("Postcode"));
    }
}
