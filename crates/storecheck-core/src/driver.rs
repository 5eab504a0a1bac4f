//! The browser capabilities the engines consume.
//!
//! The engines never create or tear down a browser. They operate against a
//! [`Driver`] supplied by the caller for the lifetime of one check.

use crate::locator::Strategy;
use crate::scripts;
use serde_json::Value;
use std::fmt;

/// Opaque handle to a live document node.
///
/// Valid only for the document it was minted in: after a navigation or a
/// DOM replacement the driver reports [`DriverError::StaleElement`] and the
/// element must be resolved again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle {
    scope: u64,
    node: u64,
}

impl ElementHandle {
    /// For driver implementations: `scope` identifies the document, `node`
    /// the element within it.
    pub fn new(scope: u64, node: u64) -> Self {
        Self { scope, node }
    }

    pub fn scope(&self) -> u64 {
        self.scope
    }

    pub fn node(&self) -> u64 {
        self.node
    }
}

impl fmt::Display for ElementHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}@{:x}", self.node, self.scope)
    }
}

/// Argument passed to [`Driver::execute_script`], visible to the script as
/// `arguments[i]`.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptArg {
    Element(ElementHandle),
    Text(String),
}

impl From<ElementHandle> for ScriptArg {
    fn from(el: ElementHandle) -> Self {
        Self::Element(el)
    }
}

impl From<&str> for ScriptArg {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for ScriptArg {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// Errors reported by a driver.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("no such element: {0}")]
    NoSuchElement(String),

    #[error("stale element reference")]
    StaleElement,

    #[error("click intercepted by {0}")]
    ClickIntercepted(String),

    #[error("element not interactable: {0}")]
    NotInteractable(String),

    #[error("invalid selector: {0}")]
    InvalidSelector(String),

    #[error("script error: {0}")]
    Script(String),

    #[error("browser error: {0}")]
    Browser(#[from] eoka::Error),
}

impl DriverError {
    /// Errors that say "not this node, not right now" rather than "the
    /// session is broken". Resolvers treat them as a miss for the current tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::NoSuchElement(_)
                | Self::StaleElement
                | Self::ClickIntercepted(_)
                | Self::NotInteractable(_)
        )
    }
}

pub type DriverResult<T> = std::result::Result<T, DriverError>;

/// Browser capability surface: navigation, querying, element state, native
/// input and script execution.
///
/// Implementations are driven strictly sequentially by one check at a time.
#[allow(async_fn_in_trait)]
pub trait Driver {
    async fn navigate(&self, url: &str) -> DriverResult<()>;

    async fn current_url(&self) -> DriverResult<String>;

    /// All nodes matching `strategy`, in document order.
    async fn query(&self, strategy: &Strategy) -> DriverResult<Vec<ElementHandle>>;

    async fn is_displayed(&self, el: ElementHandle) -> DriverResult<bool>;

    async fn is_enabled(&self, el: ElementHandle) -> DriverResult<bool>;

    async fn text(&self, el: ElementHandle) -> DriverResult<String>;

    /// Trusted click through the browser's input pipeline. Fails with
    /// `ClickIntercepted` when another node would receive it.
    async fn native_click(&self, el: ElementHandle) -> DriverResult<()>;

    /// Focus `el` and type `text` as key events.
    async fn send_keys(&self, el: ElementHandle, text: &str) -> DriverResult<()>;

    /// Run `script` as a function body with `args` bound to `arguments`.
    async fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value>;

    /// `document.readyState` ("loading", "interactive" or "complete").
    async fn ready_state(&self) -> DriverResult<String> {
        let state = self.execute_script(scripts::READY_STATE, &[]).await?;
        Ok(state.as_str().unwrap_or_default().to_string())
    }

    /// PNG of the current viewport.
    async fn screenshot(&self) -> DriverResult<Vec<u8>>;
}
