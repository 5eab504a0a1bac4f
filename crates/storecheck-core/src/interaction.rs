//! Scroll, click and fill against resolved elements.

use crate::config::EngineConfig;
use crate::driver::{Driver, DriverError, ElementHandle, ScriptArg};
use crate::scripts;
use crate::{Error, Result};
use std::fmt;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Which path delivered a successful click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickVia {
    Native,
    Scripted,
}

impl fmt::Display for ClickVia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Native => "native click",
            Self::Scripted => "scripted click",
        })
    }
}

/// One entry of an ordered form fill.
#[derive(Debug, Clone)]
pub struct FormField {
    pub element: ElementHandle,
    pub value: String,
    pub name: String,
}

impl FormField {
    pub fn new(element: ElementHandle, value: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            element,
            value: value.into(),
            name: name.into(),
        }
    }
}

pub struct InteractionEngine<'a, D> {
    driver: &'a D,
    config: &'a EngineConfig,
}

impl<'a, D: Driver> InteractionEngine<'a, D> {
    pub fn new(driver: &'a D, config: &'a EngineConfig) -> Self {
        Self { driver, config }
    }

    /// Centre the element in the viewport and let smooth scrolling settle.
    pub async fn scroll_into_view(&self, el: ElementHandle) -> std::result::Result<(), DriverError> {
        self.driver
            .execute_script(scripts::SCROLL_INTO_VIEW, &[el.into()])
            .await?;
        if !self.config.scroll_settle.is_zero() {
            sleep(self.config.scroll_settle).await;
        }
        Ok(())
    }

    /// Scroll into view and click natively; if the native click fails,
    /// retry once with a scripted click on the same handle.
    pub async fn click(&self, el: ElementHandle, name: &str) -> Result<ClickVia> {
        if let Err(e) = self.scroll_into_view(el).await {
            debug!("scroll before clicking {} failed: {}", name, e);
        }

        let native = match self.driver.native_click(el).await {
            Ok(()) => {
                info!("clicked {} (native)", name);
                return Ok(ClickVia::Native);
            }
            Err(e) => e,
        };

        warn!("native click on {} failed ({}), using scripted click", name, native);
        match self.driver.execute_script(scripts::CLICK, &[el.into()]).await {
            Ok(_) => {
                info!("clicked {} (scripted)", name);
                Ok(ClickVia::Scripted)
            }
            Err(scripted) => Err(Error::InteractionFailed {
                name: name.to_string(),
                cause: format!("native: {}; scripted: {}", native, scripted),
            }),
        }
    }

    /// Scripted click only, for targets that are known to sit under
    /// overlays (menus, options in portals).
    pub async fn script_click(&self, el: ElementHandle, name: &str) -> Result<ClickVia> {
        self.driver
            .execute_script(scripts::CLICK, &[el.into()])
            .await
            .map_err(|e| Error::InteractionFailed {
                name: name.to_string(),
                cause: e.to_string(),
            })?;
        info!("clicked {} (scripted)", name);
        Ok(ClickVia::Scripted)
    }

    /// Assign a value from script and notify listeners with `input` then
    /// `change`. On failure the field's content is indeterminate.
    pub async fn fill(&self, el: ElementHandle, value: &str, field: &str) -> Result<()> {
        self.fill_steps(el, value)
            .await
            .map_err(|e| Error::FillFailed {
                field: field.to_string(),
                cause: e.to_string(),
            })?;
        info!("entered '{}' in {}", value, field);
        Ok(())
    }

    async fn fill_steps(&self, el: ElementHandle, value: &str) -> std::result::Result<(), DriverError> {
        self.scroll_into_view(el).await?;
        self.driver
            .execute_script(scripts::CLEAR_VALUE, &[el.into()])
            .await?;
        self.driver
            .execute_script(scripts::SET_VALUE, &[el.into(), ScriptArg::from(value)])
            .await?;
        for event in ["input", "change"] {
            self.driver
                .execute_script(scripts::DISPATCH_EVENT, &[el.into(), ScriptArg::from(event)])
                .await?;
        }
        Ok(())
    }

    /// Fill each field in order. Stops at the first failure and reports its
    /// index; fields before it keep their new values.
    pub async fn fill_ordered_fields(&self, fields: &[FormField]) -> Result<()> {
        for (index, field) in fields.iter().enumerate() {
            self.fill(field.element, &field.value, &field.name)
                .await
                .map_err(|e| Error::FormFieldFailed {
                    index,
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Type into a field with real key events. The value is not logged.
    pub async fn type_into(&self, el: ElementHandle, text: &str, field: &str) -> Result<()> {
        self.driver
            .send_keys(el, text)
            .await
            .map_err(|e| Error::FillFailed {
                field: field.to_string(),
                cause: e.to_string(),
            })?;
        info!("typed into {}", field);
        Ok(())
    }
}
