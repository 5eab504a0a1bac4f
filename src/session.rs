use crate::config::SuiteConfig;
use crate::Result;
use eoka::{Browser, StealthConfig};
use std::path::PathBuf;
use storecheck_core::eoka_driver::EokaDriver;
use storecheck_core::{Driver, EngineConfig, Harness, LocatorRegistry};
use tracing::{debug, info, warn};

/// A launched browser on the store's base URL, with the locator table and
/// engine config the facades need.
pub struct Session {
    browser: Browser,
    driver: EokaDriver,
    registry: LocatorRegistry,
    engine: EngineConfig,
    screenshot: Option<String>,
}

impl Session {
    pub async fn launch(config: &SuiteConfig) -> Result<Self> {
        let registry = config.registry()?;
        let engine = config.engine_config()?;

        let b = &config.browser;
        let stealth = StealthConfig {
            headless: b.headless,
            proxy: b.proxy.clone(),
            user_agent: b.user_agent.clone(),
            viewport_width: b.viewport.as_ref().map(|v| v.width).unwrap_or(1280),
            viewport_height: b.viewport.as_ref().map(|v| v.height).unwrap_or(720),
            ..Default::default()
        };

        debug!(
            "Launching browser (headless: {}, proxy: {:?})",
            b.headless, b.proxy
        );
        let browser = Browser::launch_with_config(stealth).await?;
        let page = browser.new_page("about:blank").await?;
        let driver = EokaDriver::new(page);

        info!("opening {}", config.base_url);
        driver.navigate(&config.base_url).await?;

        Ok(Self {
            browser,
            driver,
            registry,
            engine,
            screenshot: config.on_failure.as_ref().and_then(|f| f.screenshot.clone()),
        })
    }

    pub fn harness(&self) -> Harness<'_, EokaDriver> {
        Harness::new(&self.driver, &self.registry, &self.engine)
    }

    pub fn driver(&self) -> &EokaDriver {
        &self.driver
    }

    /// Save a screenshot if the suite asks for one on failure. `{timestamp}`
    /// in the configured path is replaced with the local time. Returns the
    /// written path.
    pub async fn capture_failure(&self) -> Option<PathBuf> {
        let template = self.screenshot.as_ref()?;
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S").to_string();
        let path = PathBuf::from(template.replace("{timestamp}", &stamp));

        let data = match self.driver.screenshot().await {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to take screenshot: {}", e);
                return None;
            }
        };
        if let Err(e) = std::fs::write(&path, data) {
            warn!("Failed to save screenshot: {}", e);
            return None;
        }
        info!("Saved failure screenshot to: {}", path.display());
        Some(path)
    }

    pub async fn close(self) -> Result<()> {
        self.browser.close().await?;
        Ok(())
    }
}
