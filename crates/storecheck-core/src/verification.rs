//! Application-state checks: an ordered list of independent predicates,
//! any one of which is enough.

use crate::config::EngineConfig;
use crate::driver::Driver;
use crate::locator::Strategy;
use crate::{Error, Result};
use regex::Regex;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

/// A side-effect-free observation of the current page.
#[derive(Debug, Clone)]
pub enum Predicate {
    UrlContains(String),
    UrlMatches(Regex),
    /// URL contains `contains` and none of `excludes`.
    UrlWithin {
        contains: String,
        excludes: Vec<String>,
    },
    /// At least one node matching the strategy is displayed.
    ElementVisible(Strategy),
}

/// A named predicate.
#[derive(Debug, Clone)]
pub struct Check {
    pub name: String,
    pub predicate: Predicate,
}

impl Check {
    pub fn new(name: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            name: name.into(),
            predicate,
        }
    }

    pub fn url_contains(name: impl Into<String>, needle: impl Into<String>) -> Self {
        Self::new(name, Predicate::UrlContains(needle.into()))
    }

    pub fn url_matches(name: impl Into<String>, pattern: &str) -> Result<Self> {
        let re = Regex::new(pattern)
            .map_err(|e| Error::Config(format!("invalid url pattern '{}': {}", pattern, e)))?;
        Ok(Self::new(name, Predicate::UrlMatches(re)))
    }

    pub fn url_within<I, S>(name: impl Into<String>, contains: impl Into<String>, excludes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            name,
            Predicate::UrlWithin {
                contains: contains.into(),
                excludes: excludes.into_iter().map(Into::into).collect(),
            },
        )
    }

    pub fn element_visible(name: impl Into<String>, strategy: Strategy) -> Self {
        Self::new(name, Predicate::ElementVisible(strategy))
    }
}

/// Which check confirmed the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified {
    pub check: String,
    pub position: usize,
}

pub struct VerificationEngine<'a, D> {
    driver: &'a D,
    config: &'a EngineConfig,
}

impl<'a, D: Driver> VerificationEngine<'a, D> {
    pub fn new(driver: &'a D, config: &'a EngineConfig) -> Self {
        Self { driver, config }
    }

    /// Evaluate `checks` in order against the current page and return the
    /// first that holds. `context` names the expected state in diagnostics.
    pub async fn verify(&self, checks: &[Check], context: &str) -> Result<Verified> {
        let url = match self.driver.current_url().await {
            Ok(url) => Some(url),
            Err(e) if e.is_transient() => None,
            Err(e) => return Err(e.into()),
        };
        debug!("verifying {} at {}", context, url.as_deref().unwrap_or("<unknown>"));

        for (position, check) in checks.iter().enumerate() {
            if self.holds(&check.predicate, url.as_deref()).await? {
                info!("{}: verified by {}", context, check.name);
                return Ok(Verified {
                    check: check.name.clone(),
                    position,
                });
            }
            debug!("{}: {} did not hold", context, check.name);
        }

        Err(Error::VerificationFailed {
            context: context.to_string(),
            observed: url.unwrap_or_else(|| "<unknown>".into()),
            attempted: checks.iter().map(|c| c.name.clone()).collect(),
        })
    }

    /// Repeat [`verify`](Self::verify) every poll interval until it passes
    /// or `timeout` elapses; the last failure is returned.
    pub async fn verify_within(
        &self,
        checks: &[Check],
        context: &str,
        timeout: Duration,
    ) -> Result<Verified> {
        let deadline = Instant::now() + timeout;
        loop {
            let err = match self.verify(checks, context).await {
                Ok(v) => return Ok(v),
                Err(e @ Error::VerificationFailed { .. }) => e,
                Err(e) => return Err(e),
            };
            let now = Instant::now();
            if now >= deadline {
                return Err(err);
            }
            sleep(self.config.poll_interval.min(deadline - now)).await;
        }
    }

    async fn holds(&self, predicate: &Predicate, url: Option<&str>) -> Result<bool> {
        match predicate {
            Predicate::UrlContains(needle) => Ok(url.is_some_and(|u| u.contains(needle.as_str()))),
            Predicate::UrlMatches(re) => Ok(url.is_some_and(|u| re.is_match(u))),
            Predicate::UrlWithin { contains, excludes } => Ok(url.is_some_and(|u| {
                u.contains(contains.as_str()) && !excludes.iter().any(|x| u.contains(x.as_str()))
            })),
            Predicate::ElementVisible(strategy) => {
                let handles = match self.driver.query(strategy).await {
                    Ok(h) => h,
                    Err(e) if e.is_transient() => return Ok(false),
                    Err(e) => return Err(e.into()),
                };
                for handle in handles {
                    match self.driver.is_displayed(handle).await {
                        Ok(true) => return Ok(true),
                        Ok(false) => {}
                        Err(e) if e.is_transient() => {}
                        Err(e) => return Err(e.into()),
                    }
                }
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeDriver, FakeNode};

    fn config() -> EngineConfig {
        EngineConfig::default().with_poll_interval(Duration::from_millis(500))
    }

    fn home_checks() -> Vec<Check> {
        vec![
            Check::url_within("store url", "/ecommerce", ["/cart", "/checkout"]),
            Check::element_visible(
                "products heading",
                Strategy::xpath("//h2[normalize-space()='Products']"),
            ),
            Check::element_visible("product grid", Strategy::xpath("//div[contains(@class, 'grid')]")),
        ]
    }

    #[tokio::test]
    async fn test_first_matching_check_wins() {
        let driver = FakeDriver::new("https://shop.test/login");
        let cfg = config();
        let checks = vec![
            Check::url_contains("first", "/login"),
            Check::url_contains("second", "shop.test"),
        ];
        let v = VerificationEngine::new(&driver, &cfg)
            .verify(&checks, "login page")
            .await
            .unwrap();
        assert_eq!(
            v,
            Verified {
                check: "first".into(),
                position: 0
            }
        );
    }

    #[tokio::test]
    async fn test_falls_through_to_structural_marker() {
        let driver = FakeDriver::new("https://shop.test/ecommerce/cart");
        driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//h2[normalize-space()='Products']"))
                .hidden(),
        );
        driver.add(FakeNode::new().matching(Strategy::xpath("//div[contains(@class, 'grid')]")));
        let cfg = config();
        let v = VerificationEngine::new(&driver, &cfg)
            .verify(&home_checks(), "home page")
            .await
            .unwrap();
        assert_eq!(v.check, "product grid");
        assert_eq!(v.position, 2);
    }

    #[tokio::test]
    async fn test_none_matched_reports_url_and_checks() {
        let driver = FakeDriver::new("https://shop.test/ecommerce/checkout");
        let cfg = config();
        let err = VerificationEngine::new(&driver, &cfg)
            .verify(&home_checks(), "home page")
            .await
            .unwrap_err();
        match err {
            Error::VerificationFailed {
                context,
                observed,
                attempted,
            } => {
                assert_eq!(context, "home page");
                assert_eq!(observed, "https://shop.test/ecommerce/checkout");
                assert_eq!(attempted, vec!["store url", "products heading", "product grid"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_url_matches() {
        let driver = FakeDriver::new("https://shop.test/ecommerce?order_by=dsc");
        let cfg = config();
        let checks = vec![Check::url_matches("descending", r"order_by=(dsc|desc)\b").unwrap()];
        assert!(VerificationEngine::new(&driver, &cfg)
            .verify(&checks, "sort order")
            .await
            .is_ok());
        assert!(Check::url_matches("bad", "(").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_verify_within_waits_for_state() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//h2[normalize-space()='Login']"))
                .appears_after(Duration::from_millis(1200)),
        );
        let checks = vec![Check::element_visible(
            "login heading",
            Strategy::xpath("//h2[normalize-space()='Login']"),
        )];
        let cfg = config();
        let engine = VerificationEngine::new(&driver, &cfg);
        let start = Instant::now();
        let v = engine
            .verify_within(&checks, "logged out", Duration::from_secs(3))
            .await
            .unwrap();
        assert_eq!(v.position, 0);
        assert!(start.elapsed() >= Duration::from_millis(1200));
        assert!(start.elapsed() <= Duration::from_millis(1700));
    }
}
