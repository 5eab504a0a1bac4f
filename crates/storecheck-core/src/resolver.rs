//! Polling element discovery.
//!
//! Every tick walks the strategies in declared order, so an earlier strategy
//! always wins over a later one, including when its element only shows up
//! on a later tick.

use crate::config::EngineConfig;
use crate::driver::{Driver, DriverResult, ElementHandle};
use crate::locator::{Locator, Strategy};
use crate::{Error, Result};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

/// An element returned by the resolver, with the strategy that found it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedElement {
    pub handle: ElementHandle,
    /// Position of the winning strategy in the list that was searched.
    pub strategy_index: usize,
    pub strategy: Strategy,
}

pub struct ElementResolver<'a, D> {
    driver: &'a D,
    config: &'a EngineConfig,
}

impl<'a, D: Driver> ElementResolver<'a, D> {
    pub fn new(driver: &'a D, config: &'a EngineConfig) -> Self {
        Self { driver, config }
    }

    /// Resolve a registered locator using the configured element timeout.
    pub async fn find_locator(&self, locator: &Locator) -> Result<ResolvedElement> {
        self.find_visible(locator.name(), locator.strategies(), self.config.timeout)
            .await
    }

    /// Poll until some strategy yields a visible, enabled node, or `timeout`
    /// elapses.
    pub async fn find_visible(
        &self,
        name: &str,
        strategies: &[Strategy],
        timeout: Duration,
    ) -> Result<ResolvedElement> {
        let deadline = Instant::now() + timeout;
        let mut ticks = 0u32;
        loop {
            ticks += 1;
            if let Some(found) = self.find_visible_now(strategies).await? {
                debug!(
                    "resolved '{}' via {} after {} tick(s)",
                    name, found.strategy, ticks
                );
                return Ok(found);
            }
            if !self.pause_until(deadline).await {
                break;
            }
        }
        debug!("'{}' not found after {} tick(s)", name, ticks);
        Err(not_found(name, strategies, timeout))
    }

    /// One pass over `strategies`, no waiting.
    pub async fn find_visible_now(&self, strategies: &[Strategy]) -> Result<Option<ResolvedElement>> {
        for (index, strategy) in strategies.iter().enumerate() {
            if let Some(handle) = self.first_usable(strategy).await? {
                return Ok(Some(ResolvedElement {
                    handle,
                    strategy_index: index,
                    strategy: strategy.clone(),
                }));
            }
        }
        Ok(None)
    }

    /// All visible, enabled matches of one strategy, in document order.
    /// Polls until at least one exists.
    pub async fn find_all_visible(
        &self,
        strategy: &Strategy,
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>> {
        self.find_all_visible_any(&strategy.to_string(), std::slice::from_ref(strategy), timeout)
            .await
    }

    /// Like [`find_all_visible`](Self::find_all_visible) for a locator with
    /// several strategies: the first strategy with a non-empty visible set wins.
    pub async fn find_all_visible_any(
        &self,
        name: &str,
        strategies: &[Strategy],
        timeout: Duration,
    ) -> Result<Vec<ElementHandle>> {
        let deadline = Instant::now() + timeout;
        loop {
            for strategy in strategies {
                let usable = self.all_usable(strategy).await?;
                if !usable.is_empty() {
                    debug!("'{}': {} visible match(es) via {}", name, usable.len(), strategy);
                    return Ok(usable);
                }
            }
            if !self.pause_until(deadline).await {
                break;
            }
        }
        Err(not_found(name, strategies, timeout))
    }

    /// Poll `document.readyState` until it reads "complete". Returns `false`
    /// on timeout instead of failing; callers decide whether that matters.
    pub async fn wait_for_ready_state(&self, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.driver.ready_state().await {
                Ok(state) if state == "complete" => return Ok(true),
                Ok(state) => debug!("document.readyState = {}", state),
                Err(e) if e.is_transient() => debug!("readyState unavailable: {}", e),
                Err(e) => return Err(e.into()),
            }
            if !self.pause_until(deadline).await {
                return Ok(false);
            }
        }
    }

    /// Sleep one poll interval, clipped to the deadline. Returns `false`
    /// once the deadline has passed.
    async fn pause_until(&self, deadline: Instant) -> bool {
        let now = Instant::now();
        if now >= deadline {
            return false;
        }
        sleep(self.config.poll_interval.min(deadline - now)).await;
        true
    }

    async fn first_usable(&self, strategy: &Strategy) -> Result<Option<ElementHandle>> {
        for handle in self.query(strategy).await? {
            if self.is_usable(handle).await? {
                return Ok(Some(handle));
            }
        }
        Ok(None)
    }

    async fn all_usable(&self, strategy: &Strategy) -> Result<Vec<ElementHandle>> {
        let mut out = Vec::new();
        for handle in self.query(strategy).await? {
            if self.is_usable(handle).await? {
                out.push(handle);
            }
        }
        Ok(out)
    }

    async fn query(&self, strategy: &Strategy) -> Result<Vec<ElementHandle>> {
        miss_on_transient(self.driver.query(strategy).await).map(Option::unwrap_or_default)
    }

    async fn is_usable(&self, handle: ElementHandle) -> Result<bool> {
        let displayed = miss_on_transient(self.driver.is_displayed(handle).await)?;
        if displayed != Some(true) {
            return Ok(false);
        }
        let enabled = miss_on_transient(self.driver.is_enabled(handle).await)?;
        Ok(enabled == Some(true))
    }
}

/// Transient driver errors become "nothing here this tick"; anything else
/// aborts the wait.
fn miss_on_transient<T>(result: DriverResult<T>) -> Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_transient() => {
            debug!("transient: {}", e);
            Ok(None)
        }
        Err(e) => Err(Error::Driver(e)),
    }
}

fn not_found(name: &str, strategies: &[Strategy], timeout: Duration) -> Error {
    Error::ElementNotFound {
        name: name.to_string(),
        strategies: strategies.iter().map(Strategy::to_string).collect(),
        timeout,
    }
}
