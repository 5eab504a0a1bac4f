//! Fixed fallback chains for actions that have more than one way to happen.
//!
//! An [`Escalation`] is plain data: a name plus an ordered list of steps.
//! [`Escalation::run`] tries the steps in order and stops at the first that
//! succeeds. Every chain is finite.

use crate::config::EngineConfig;
use crate::driver::Driver;
use crate::interaction::{ClickVia, InteractionEngine};
use crate::locator::{xpath_literal, Locator, Strategy};
use crate::resolver::ElementResolver;
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub enum EscalationStep {
    /// Resolve `locator` within `timeout` and click it.
    Click { locator: Locator, timeout: Duration },
    /// For each menu trigger in order: open it, then look for `target`.
    OpenThenClick {
        menus: Vec<Strategy>,
        target: Locator,
        timeout: Duration,
    },
    /// Click the first displayed element whose own text contains `needle`,
    /// ignoring ASCII case.
    ClickText { needle: String },
    /// Navigate to `path` resolved against the base URL.
    Navigate { path: String },
}

impl EscalationStep {
    pub fn click(locator: Locator, timeout: Duration) -> Self {
        Self::Click { locator, timeout }
    }

    pub fn open_then_click(menus: Vec<Strategy>, target: Locator, timeout: Duration) -> Self {
        Self::OpenThenClick {
            menus,
            target,
            timeout,
        }
    }

    pub fn click_text(needle: impl Into<String>) -> Self {
        Self::ClickText {
            needle: needle.into(),
        }
    }

    pub fn navigate(path: impl Into<String>) -> Self {
        Self::Navigate { path: path.into() }
    }

    /// Short description used in logs and in [`Error::EscalationExhausted`].
    pub fn label(&self) -> String {
        match self {
            Self::Click { locator, .. } => format!("click {}", locator.name()),
            Self::OpenThenClick { target, menus, .. } => {
                format!("open menu ({} candidate(s)) then click {}", menus.len(), target.name())
            }
            Self::ClickText { needle } => format!("click text '{}'", needle),
            Self::Navigate { path } => format!("navigate to {}", path),
        }
    }
}

/// Which step succeeded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationOutcome {
    pub step: usize,
    pub label: String,
    /// `None` for navigation.
    pub via: Option<ClickVia>,
}

#[derive(Debug, Clone)]
pub struct Escalation {
    action: String,
    steps: Vec<EscalationStep>,
}

impl Escalation {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            steps: Vec::new(),
        }
    }

    pub fn then(mut self, step: EscalationStep) -> Self {
        self.steps.push(step);
        self
    }

    pub fn action(&self) -> &str {
        &self.action
    }

    pub fn steps(&self) -> &[EscalationStep] {
        &self.steps
    }

    /// Run the steps in order. Recoverable failures move on to the next
    /// step; anything else is returned immediately.
    pub async fn run<D: Driver>(&self, driver: &D, config: &EngineConfig) -> Result<EscalationOutcome> {
        let mut attempts = Vec::with_capacity(self.steps.len());
        for (index, step) in self.steps.iter().enumerate() {
            let label = step.label();
            debug!("{}: step {} ({})", self.action, index, label);
            match run_step(step, driver, config).await {
                Ok(via) => {
                    info!("{}: succeeded with {}", self.action, label);
                    return Ok(EscalationOutcome {
                        step: index,
                        label,
                        via,
                    });
                }
                Err(e) if e.is_recoverable() => {
                    warn!("{}: {} failed: {}", self.action, label, e);
                    attempts.push(format!("{}: {}", label, e));
                }
                Err(e) => return Err(e),
            }
        }
        Err(Error::EscalationExhausted {
            action: self.action.clone(),
            attempts,
        })
    }
}

async fn run_step<D: Driver>(
    step: &EscalationStep,
    driver: &D,
    config: &EngineConfig,
) -> Result<Option<ClickVia>> {
    let resolver = ElementResolver::new(driver, config);
    let engine = InteractionEngine::new(driver, config);

    match step {
        EscalationStep::Click { locator, timeout } => {
            let found = resolver
                .find_visible(locator.name(), locator.strategies(), *timeout)
                .await?;
            engine.click(found.handle, locator.name()).await.map(Some)
        }
        EscalationStep::OpenThenClick {
            menus,
            target,
            timeout,
        } => {
            let mut last = None;
            for menu in menus {
                let opener = match resolver
                    .find_visible("menu trigger", std::slice::from_ref(menu), *timeout)
                    .await
                {
                    Ok(found) => found,
                    Err(e) if e.is_recoverable() => {
                        debug!("menu trigger {} unavailable", menu);
                        last = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                };
                match engine.script_click(opener.handle, "menu trigger").await {
                    Ok(_) => {}
                    Err(e) if e.is_recoverable() => {
                        debug!("menu trigger {} did not open: {}", menu, e);
                        last = Some(e);
                        continue;
                    }
                    Err(e) => return Err(e),
                }
                sleep(config.poll_interval).await;

                match resolver
                    .find_visible(target.name(), target.strategies(), *timeout)
                    .await
                {
                    Ok(found) => return engine.script_click(found.handle, target.name()).await.map(Some),
                    Err(e) if e.is_recoverable() => {
                        debug!("{} not revealed by menu {}", target.name(), menu);
                        last = Some(e);
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(last.unwrap_or_else(|| Error::ElementNotFound {
                name: target.name().to_string(),
                strategies: Vec::new(),
                timeout: *timeout,
            }))
        }
        EscalationStep::ClickText { needle } => {
            let strategy = text_search(needle);
            let name = format!("text '{}'", needle);
            match resolver.find_visible_now(std::slice::from_ref(&strategy)).await? {
                Some(found) => engine.script_click(found.handle, &name).await.map(Some),
                None => Err(Error::ElementNotFound {
                    name,
                    strategies: vec![strategy.to_string()],
                    timeout: Duration::ZERO,
                }),
            }
        }
        EscalationStep::Navigate { path } => {
            let url = config.url_for(path)?;
            info!("navigating to {}", url);
            driver.navigate(url.as_str()).await?;
            Ok(None)
        }
    }
}

/// XPath matching any element whose own text contains `needle`,
/// case-insensitively over the letters of the needle.
fn text_search(needle: &str) -> Strategy {
    let lower = needle.to_ascii_lowercase();
    let upper = needle.to_ascii_uppercase();
    Strategy::xpath(format!(
        "//*[contains(translate(text(), {}, {}), {})]",
        xpath_literal(&upper),
        xpath_literal(&lower),
        xpath_literal(&lower)
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, Effect, FakeDriver, FakeNode};

    fn config() -> EngineConfig {
        EngineConfig::default()
            .with_poll_interval(Duration::from_millis(500))
            .with_scroll_settle(Duration::ZERO)
            .with_base_url("https://shop.test/ecommerce")
            .unwrap()
    }

    fn logout_button() -> Locator {
        Locator::new(
            "logout button",
            vec![Strategy::xpath("//button[normalize-space()='Logout']")],
        )
    }

    fn menus() -> Vec<Strategy> {
        vec![
            Strategy::xpath("//header//button[last()]"),
            Strategy::xpath("//button[contains(@class, 'user')]"),
        ]
    }

    fn logout() -> Escalation {
        Escalation::new("logout")
            .then(EscalationStep::click(logout_button(), Duration::from_secs(2)))
            .then(EscalationStep::open_then_click(
                menus(),
                logout_button(),
                Duration::from_secs(1),
            ))
            .then(EscalationStep::click_text("logout"))
            .then(EscalationStep::navigate("/login"))
    }

    #[tokio::test(start_paused = true)]
    async fn test_logout_through_menu() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let button = driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//button[normalize-space()='Logout']"))
                .hidden()
                .on_click(Effect::Navigate("https://shop.test/login".into())),
        );
        driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//button[contains(@class, 'user')]"))
                .on_click(Effect::Show(button)),
        );

        let outcome = logout().run(&driver, &config()).await.unwrap();
        assert_eq!(outcome.step, 1);
        assert_eq!(outcome.via, Some(ClickVia::Scripted));
        assert_eq!(driver.url(), "https://shop.test/login");
        assert!(!driver
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Navigate(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_broken_menu_moves_on_to_next_candidate() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let button = driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//button[normalize-space()='Logout']"))
                .hidden()
                .on_click(Effect::Navigate("https://shop.test/login".into())),
        );
        let broken = driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//header//button[last()]"))
                .script_click_fails(),
        );
        driver.add(
            FakeNode::new()
                .matching(Strategy::xpath("//button[contains(@class, 'user')]"))
                .on_click(Effect::Show(button)),
        );

        let chain = Escalation::new("logout")
            .then(EscalationStep::open_then_click(
                menus(),
                logout_button(),
                Duration::from_secs(1),
            ))
            .then(EscalationStep::navigate("/login"));
        let outcome = chain.run(&driver, &config()).await.unwrap();
        assert_eq!(outcome.step, 0);
        assert!(driver.calls().contains(&Call::ScriptClick(broken)));
        assert!(driver.calls().contains(&Call::ScriptClick(button)));
        assert!(!driver
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Navigate(_))));
    }

    #[test]
    fn test_chain_is_inspectable() {
        let chain = logout();
        assert_eq!(chain.action(), "logout");
        let labels: Vec<String> = chain.steps().iter().map(|s| s.label()).collect();
        assert_eq!(
            labels,
            vec![
                "click logout button".to_string(),
                "open menu (2 candidate(s)) then click logout button".to_string(),
                "click text 'logout'".to_string(),
                "navigate to /login".to_string(),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_direct_button_wins() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let button = driver.add(
            FakeNode::new().matching(Strategy::xpath("//button[normalize-space()='Logout']")),
        );
        let outcome = logout().run(&driver, &config()).await.unwrap();
        assert_eq!(outcome.step, 0);
        assert_eq!(outcome.via, Some(ClickVia::Native));
        assert!(driver.calls().contains(&Call::NativeClick(button)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_text_search_before_navigation() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let link = driver.add(FakeNode::new().matching(text_search("logout")).text("LogOut"));
        let outcome = logout().run(&driver, &config()).await.unwrap();
        assert_eq!(outcome.step, 2);
        assert_eq!(driver.calls(), vec![Call::ScriptClick(link)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_navigation() {
        let driver = FakeDriver::new("https://shop.test/ecommerce/cart");
        let outcome = logout().run(&driver, &config()).await.unwrap();
        assert_eq!(outcome.step, 3);
        assert_eq!(outcome.via, None);
        assert_eq!(
            driver.calls(),
            vec![Call::Navigate("https://shop.test/login".into())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_lists_every_attempt() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let chain = Escalation::new("open cart")
            .then(EscalationStep::click(
                Locator::new("cart icon", vec![Strategy::css("a.cart")]),
                Duration::from_secs(1),
            ))
            .then(EscalationStep::click_text("cart"));
        let err = chain.run(&driver, &config()).await.unwrap_err();
        match err {
            Error::EscalationExhausted { action, attempts } => {
                assert_eq!(action, "open cart");
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("click cart icon"));
                assert!(attempts[1].starts_with("click text 'cart'"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_config_error_is_not_swallowed() {
        let driver = FakeDriver::new("https://shop.test/ecommerce");
        let chain = Escalation::new("logout").then(EscalationStep::navigate("/login"));
        let err = chain
            .run(&driver, &EngineConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_text_search_xpath() {
        assert_eq!(
            text_search("Logout").query,
            "//*[contains(translate(text(), 'LOGOUT', 'logout'), 'logout')]"
        );
    }
}
