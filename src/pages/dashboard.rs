use super::{
    visible_checks, ProductRef, BACK_TO_PRODUCTS, DETAILS_ADD_TO_CART, INCREASE_QUANTITY,
    PRODUCTS_HEADING, SORT_OPTIONS, SORT_TRIGGER,
};
use crate::{Error, Result};
use std::time::Duration;
use storecheck_core::{Check, ClickVia, Driver, ElementHandle, Harness, Locator};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

/// Product listing: sorting, cards, product details.
pub struct DashboardPage<'a, D> {
    h: Harness<'a, D>,
}

impl<'a, D: Driver> DashboardPage<'a, D> {
    pub fn new(h: Harness<'a, D>) -> Self {
        Self { h }
    }

    /// Whether the listing is showing, judged by the sort control, the
    /// products heading or the store URL, in that order.
    pub async fn is_displayed(&self) -> Result<bool> {
        let mut checks = visible_checks(&self.h, SORT_TRIGGER)?;
        checks.extend(visible_checks(&self.h, PRODUCTS_HEADING)?);
        checks.push(Check::url_within("store url", "/ecommerce", ["/cart", "/checkout"]));

        match self
            .h
            .verifier()
            .verify_within(&checks, "dashboard", self.h.config().timeout)
            .await
        {
            Ok(_) => Ok(true),
            Err(storecheck_core::Error::VerificationFailed { observed, .. }) => {
                debug!("dashboard not displayed at {}", observed);
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Poll until the document has finished loading and the sort control is
    /// visible. Returns `false` if `max_wait` elapses first.
    pub async fn wait_for_page_ready(&self, max_wait: Duration) -> Result<bool> {
        let deadline = Instant::now() + max_wait;
        let resolver = self.h.resolver();
        let trigger = self.h.registry().resolve_strategies(SORT_TRIGGER)?;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if resolver.wait_for_ready_state(remaining).await?
                && resolver.find_visible_now(trigger).await?.is_some()
            {
                debug!("dashboard ready");
                return Ok(true);
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("dashboard not ready after {:?}", max_wait);
                return Ok(false);
            }
            sleep(self.h.config().poll_interval.min(deadline - now)).await;
        }
    }

    /// Texts of the sort options. Leaves the dropdown as it found it by
    /// clicking the trigger a second time.
    pub async fn sort_options(&self) -> Result<Vec<String>> {
        let trigger = self.h.find(SORT_TRIGGER).await?;
        self.h.engine().click(trigger.handle, SORT_TRIGGER).await?;

        let options = self.h.find_all(SORT_OPTIONS).await?;
        let texts: Vec<String> = self
            .option_texts(&options)
            .await?
            .into_iter()
            .filter(|t| !t.is_empty())
            .collect();

        // Re-clicking closes the menu on the known storefront; its failure is
        // not an error.
        if let Err(e) = self.h.engine().click(trigger.handle, SORT_TRIGGER).await {
            warn!("closing sort dropdown failed: {}", e);
        }
        Ok(texts)
    }

    /// Open the sort dropdown and pick the first option whose text contains
    /// `label`, ignoring case.
    pub async fn select_sort_option(&self, label: &str) -> Result<ClickVia> {
        info!("selecting sort option '{}'", label);
        self.wait_for_page_ready(self.h.config().page_ready).await?;

        let trigger = self.h.find(SORT_TRIGGER).await?;
        self.h.engine().click(trigger.handle, SORT_TRIGGER).await?;

        let options = self.h.find_all(SORT_OPTIONS).await?;
        let texts = self.option_texts(&options).await?;
        let needle = label.to_lowercase();

        let hit = texts
            .iter()
            .position(|t| !t.is_empty() && t.to_lowercase().contains(&needle));
        match hit {
            Some(i) => Ok(self.h.engine().click(options[i], &texts[i]).await?),
            None => Err(Error::OptionNotFound {
                label: label.to_string(),
                available: texts,
            }),
        }
    }

    /// Whether the current URL carries `param` (e.g. `order_by=asc`).
    pub async fn sort_order_in_url(&self, param: &str) -> Result<bool> {
        let url = self.h.driver().current_url().await?;
        Ok(url.contains(param))
    }

    pub async fn add_product_to_cart(&self, product: &ProductRef) -> Result<ClickVia> {
        self.click_locator(&product.add_to_cart()).await
    }

    pub async fn remove_product_from_cart(&self, product: &ProductRef) -> Result<ClickVia> {
        self.click_locator(&product.remove_from_cart()).await
    }

    /// Open the product details page by clicking its image.
    pub async fn open_product(&self, product: &ProductRef) -> Result<ClickVia> {
        self.click_locator(&product.image()).await
    }

    pub async fn add_favorite(&self, product: &ProductRef) -> Result<ClickVia> {
        self.click_locator(&product.favorite()).await
    }

    /// On the details page, press `+` until the quantity (which starts at
    /// 1) reaches `quantity`.
    pub async fn increase_quantity_to(&self, quantity: u32) -> Result<()> {
        for current in 2..=quantity {
            self.h.click(INCREASE_QUANTITY).await?;
            debug!("quantity now {}", current);
        }
        Ok(())
    }

    pub async fn add_to_cart_on_details(&self) -> Result<ClickVia> {
        Ok(self.h.click(DETAILS_ADD_TO_CART).await?)
    }

    pub async fn back_to_products(&self) -> Result<ClickVia> {
        Ok(self.h.click(BACK_TO_PRODUCTS).await?)
    }

    async fn click_locator(&self, locator: &Locator) -> Result<ClickVia> {
        let found = self.h.resolver().find_locator(locator).await?;
        Ok(self.h.engine().click(found.handle, locator.name()).await?)
    }

    async fn option_texts(&self, options: &[ElementHandle]) -> Result<Vec<String>> {
        let mut texts = Vec::with_capacity(options.len());
        for option in options {
            texts.push(self.h.driver().text(*option).await?.trim().to_string());
        }
        Ok(texts)
    }
}
