//! Semantic element names bound to ordered discovery strategies.

use crate::{Error, Result};
use serde::de::{self, MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;
use std::fmt;

/// How a strategy's query string is interpreted against the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    XPath,
    Css,
    Id,
    Name,
}

impl StrategyKind {
    /// Short name used in configs and diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::XPath => "xpath",
            Self::Css => "css",
            Self::Id => "id",
            Self::Name => "name",
        }
    }
}

const STRATEGY_KINDS: &[&str] = &["xpath", "css", "id", "name"];

/// One concrete way to locate a document node.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Strategy {
    pub kind: StrategyKind,
    pub query: String,
}

impl Strategy {
    pub fn new(kind: StrategyKind, query: impl Into<String>) -> Self {
        Self {
            kind,
            query: query.into(),
        }
    }

    pub fn xpath(query: impl Into<String>) -> Self {
        Self::new(StrategyKind::XPath, query)
    }

    pub fn css(query: impl Into<String>) -> Self {
        Self::new(StrategyKind::Css, query)
    }

    pub fn id(query: impl Into<String>) -> Self {
        Self::new(StrategyKind::Id, query)
    }

    pub fn name(query: impl Into<String>) -> Self {
        Self::new(StrategyKind::Name, query)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.kind.as_str(), self.query)
    }
}

impl<'de> Deserialize<'de> for Strategy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_map(StrategyVisitor)
    }
}

struct StrategyVisitor;

impl<'de> Visitor<'de> for StrategyVisitor {
    type Value = Strategy;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a strategy map with a single key (xpath, css, id or name)")
    }

    fn visit_map<M>(self, mut map: M) -> std::result::Result<Self::Value, M::Error>
    where
        M: MapAccess<'de>,
    {
        let key: String = map
            .next_key()?
            .ok_or_else(|| de::Error::custom("expected strategy kind key"))?;

        let kind = match key.as_str() {
            "xpath" => StrategyKind::XPath,
            "css" => StrategyKind::Css,
            "id" => StrategyKind::Id,
            "name" => StrategyKind::Name,
            other => return Err(de::Error::unknown_variant(other, STRATEGY_KINDS)),
        };
        let query: String = map.next_value()?;
        if query.trim().is_empty() {
            return Err(de::Error::custom(format!("empty {} query", key)));
        }
        if let Some(extra) = map.next_key::<String>()? {
            return Err(de::Error::custom(format!(
                "strategy has more than one key ('{}' after '{}')",
                extra, key
            )));
        }
        Ok(Strategy::new(kind, query))
    }
}

/// Quote a string as an XPath 1.0 literal. XPath has no escape syntax, so
/// strings holding both quote kinds are assembled with `concat()`.
pub fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        return format!("'{}'", s);
    }
    if !s.contains('"') {
        return format!("\"{}\"", s);
    }
    let parts: Vec<String> = s.split('\'').map(|p| format!("'{}'", p)).collect();
    format!("concat({})", parts.join(", \"'\", "))
}

/// A semantic element name bound to strategies tried in declared order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locator {
    name: String,
    strategies: Vec<Strategy>,
}

impl Locator {
    pub fn new(name: impl Into<String>, strategies: impl IntoIterator<Item = Strategy>) -> Self {
        Self {
            name: name.into(),
            strategies: strategies.into_iter().collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for (i, s) in self.strategies.iter().enumerate() {
            let sep = if i == 0 { ": " } else { " | " };
            write!(f, "{}{}", sep, s)?;
        }
        Ok(())
    }
}

/// Static table of locators. Built once at startup, read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct LocatorRegistry {
    table: HashMap<String, Locator>,
    order: Vec<String>,
}

impl LocatorRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Strategies for `name`, in the order they must be tried.
    pub fn resolve_strategies(&self, name: &str) -> Result<&[Strategy]> {
        self.locator(name).map(Locator::strategies)
    }

    pub fn locator(&self, name: &str) -> Result<&Locator> {
        self.table
            .get(name)
            .ok_or_else(|| Error::UnknownLocator(name.to_string()))
    }

    /// Locators in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Locator> {
        self.order.iter().filter_map(|n| self.table.get(n))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

/// Collects locator definitions; `build()` validates and freezes them.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    entries: Vec<Locator>,
    overrides: Vec<Locator>,
}

impl RegistryBuilder {
    /// Register a new name. Registering the same name twice is an error at `build()`.
    pub fn register(
        mut self,
        name: impl Into<String>,
        strategies: impl IntoIterator<Item = Strategy>,
    ) -> Self {
        self.entries.push(Locator::new(name, strategies));
        self
    }

    /// Replace the strategies of a registered name, or add the name if absent.
    /// Overrides apply after all registrations, in call order.
    pub fn override_strategies(
        mut self,
        name: impl Into<String>,
        strategies: impl IntoIterator<Item = Strategy>,
    ) -> Self {
        self.overrides.push(Locator::new(name, strategies));
        self
    }

    pub fn build(self) -> Result<LocatorRegistry> {
        let mut registry = LocatorRegistry::default();
        for locator in self.entries {
            if registry.table.contains_key(locator.name()) {
                return Err(Error::Config(format!(
                    "locator '{}' registered twice",
                    locator.name()
                )));
            }
            registry.order.push(locator.name.clone());
            registry.table.insert(locator.name.clone(), locator);
        }
        for locator in self.overrides {
            if !registry.table.contains_key(locator.name()) {
                registry.order.push(locator.name.clone());
            }
            registry.table.insert(locator.name.clone(), locator);
        }
        if let Some(empty) = registry.iter().find(|l| l.strategies.is_empty()) {
            return Err(Error::Config(format!(
                "locator '{}' has no strategies",
                empty.name()
            )));
        }
        Ok(registry)
    }
}
