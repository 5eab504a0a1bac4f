use crate::{Error, Result};
use std::time::Duration;
use url::Url;

/// Timing and addressing shared by every engine. Passed explicitly at
/// construction; nothing is read from global state.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Ceiling for element waits.
    pub timeout: Duration,
    /// Fixed interval between poll ticks.
    pub poll_interval: Duration,
    /// Pause after scrolling an element into view.
    pub scroll_settle: Duration,
    /// Ceiling for waiting on `document.readyState == "complete"`.
    pub page_ready: Duration,
    /// Root that relative navigation paths are joined onto.
    pub base_url: Option<Url>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            scroll_settle: Duration::from_millis(500),
            page_ready: Duration::from_secs(20),
            base_url: None,
        }
    }
}

impl EngineConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_scroll_settle(mut self, settle: Duration) -> Self {
        self.scroll_settle = settle;
        self
    }

    pub fn with_page_ready(mut self, page_ready: Duration) -> Self {
        self.page_ready = page_ready;
        self
    }

    /// Set the base URL. A trailing slash is added so relative paths join
    /// underneath it rather than replacing its last segment.
    pub fn with_base_url(mut self, base: &str) -> Result<Self> {
        let mut url =
            Url::parse(base).map_err(|e| Error::Config(format!("invalid base url '{}': {}", base, e)))?;
        if !url.path().ends_with('/') {
            let path = format!("{}/", url.path());
            url.set_path(&path);
        }
        self.base_url = Some(url);
        Ok(self)
    }

    /// Resolve `path` against the base URL: `"cart"` stays under the base,
    /// `"/login"` is relative to the host root.
    pub fn url_for(&self, path: &str) -> Result<Url> {
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| Error::Config(format!("no base url to resolve '{}' against", path)))?;
        base.join(path)
            .map_err(|e| Error::Config(format!("cannot join '{}' onto {}: {}", path, base, e)))
    }

    /// Sanity checks for values coming from user config.
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval.is_zero() {
            return Err(Error::Config("poll interval must be greater than zero".into()));
        }
        if self.poll_interval > self.timeout {
            return Err(Error::Config(format!(
                "poll interval ({:?}) exceeds element timeout ({:?})",
                self.poll_interval, self.timeout
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let c = EngineConfig::default();
        assert_eq!(c.timeout, Duration::from_secs(30));
        assert_eq!(c.poll_interval, Duration::from_millis(500));
        assert!(c.base_url.is_none());
        assert!(c.validate().is_ok());
    }

    #[test]
    fn test_url_for_relative_and_rooted() {
        let c = EngineConfig::default()
            .with_base_url("https://shop.example.com/ecommerce")
            .unwrap();
        assert_eq!(
            c.url_for("cart").unwrap().as_str(),
            "https://shop.example.com/ecommerce/cart"
        );
        assert_eq!(
            c.url_for("/login").unwrap().as_str(),
            "https://shop.example.com/login"
        );
    }

    #[test]
    fn test_url_for_without_base() {
        let err = EngineConfig::default().url_for("cart").unwrap_err();
        assert!(err.to_string().contains("no base url"));
    }

    #[test]
    fn test_invalid_base_url() {
        assert!(EngineConfig::default().with_base_url("not a url").is_err());
    }

    #[test]
    fn test_validate_poll_interval() {
        let zero = EngineConfig::default().with_poll_interval(Duration::ZERO);
        assert!(zero.validate().is_err());
        let too_long = EngineConfig::default()
            .with_timeout(Duration::from_secs(1))
            .with_poll_interval(Duration::from_secs(2));
        assert!(too_long.validate().is_err());
    }
}
