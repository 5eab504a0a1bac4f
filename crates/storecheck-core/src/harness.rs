//! One driver, one locator table, one config: the handles a page facade
//! needs, bundled so facades take a single argument.

use crate::config::EngineConfig;
use crate::driver::{Driver, ElementHandle};
use crate::escalation::{Escalation, EscalationOutcome};
use crate::interaction::{ClickVia, InteractionEngine};
use crate::locator::{Locator, LocatorRegistry};
use crate::resolver::{ElementResolver, ResolvedElement};
use crate::verification::VerificationEngine;
use crate::Result;

pub struct Harness<'a, D> {
    driver: &'a D,
    registry: &'a LocatorRegistry,
    config: &'a EngineConfig,
}

impl<D> Clone for Harness<'_, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<D> Copy for Harness<'_, D> {}

impl<'a, D: Driver> Harness<'a, D> {
    pub fn new(driver: &'a D, registry: &'a LocatorRegistry, config: &'a EngineConfig) -> Self {
        Self {
            driver,
            registry,
            config,
        }
    }

    pub fn driver(&self) -> &'a D {
        self.driver
    }

    pub fn registry(&self) -> &'a LocatorRegistry {
        self.registry
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn resolver(&self) -> ElementResolver<'a, D> {
        ElementResolver::new(self.driver, self.config)
    }

    pub fn engine(&self) -> InteractionEngine<'a, D> {
        InteractionEngine::new(self.driver, self.config)
    }

    pub fn verifier(&self) -> VerificationEngine<'a, D> {
        VerificationEngine::new(self.driver, self.config)
    }

    pub fn locator(&self, name: &str) -> Result<&'a Locator> {
        self.registry.locator(name)
    }

    /// Resolve a registered locator with the configured element timeout.
    pub async fn find(&self, name: &str) -> Result<ResolvedElement> {
        self.resolver().find_locator(self.locator(name)?).await
    }

    /// Every visible match of a registered locator, in document order.
    pub async fn find_all(&self, name: &str) -> Result<Vec<ElementHandle>> {
        let locator = self.locator(name)?;
        self.resolver()
            .find_all_visible_any(locator.name(), locator.strategies(), self.config.timeout)
            .await
    }

    /// Resolve then click with native-first fallback.
    pub async fn click(&self, name: &str) -> Result<ClickVia> {
        let found = self.find(name).await?;
        self.engine().click(found.handle, name).await
    }

    pub async fn escalate(&self, escalation: &Escalation) -> Result<EscalationOutcome> {
        escalation.run(self.driver, self.config).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::Strategy;
    use crate::testing::{Call, FakeDriver, FakeNode};
    use crate::Error;
    use std::time::Duration;

    fn registry() -> LocatorRegistry {
        LocatorRegistry::builder()
            .register(
                "checkout button",
                [
                    Strategy::xpath("//button[normalize-space()='Checkout']"),
                    Strategy::css("button.checkout"),
                ],
            )
            .build()
            .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_by_name() {
        let driver = FakeDriver::new("https://shop.test/ecommerce/cart");
        let id = driver.add(FakeNode::new().matching(Strategy::css("button.checkout")));
        let registry = registry();
        let config = EngineConfig::default().with_scroll_settle(Duration::ZERO);
        let harness = Harness::new(&driver, &registry, &config);

        assert_eq!(harness.click("checkout button").await.unwrap(), ClickVia::Native);
        assert_eq!(driver.calls(), vec![Call::Scroll(id), Call::NativeClick(id)]);
    }

    #[tokio::test]
    async fn test_unknown_name_fails_before_any_driver_call() {
        let driver = FakeDriver::new("about:blank");
        let registry = registry();
        let config = EngineConfig::default();
        let harness = Harness::new(&driver, &registry, &config);

        let err = harness.click("checkout butten").await.unwrap_err();
        assert!(matches!(err, Error::UnknownLocator(ref n) if n == "checkout butten"));
        assert!(driver.calls().is_empty());
    }
}
