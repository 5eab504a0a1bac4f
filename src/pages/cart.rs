use super::{
    visible_checks, CART_ICON, CHECKOUT_BUTTON, CHECKOUT_INPUTS, CONTINUE_BUTTON,
    CONTINUE_SHOPPING_BUTTON, FINISH_BUTTON, LOGIN_EMAIL_INPUT, LOGIN_HEADING, LOGOUT_BUTTON,
    PRODUCTS_HEADING, PRODUCT_GRID, USER_MENU,
};
use crate::{Error, Result};
use std::time::Duration;
use storecheck_core::{
    Check, ClickVia, Driver, Escalation, EscalationOutcome, EscalationStep, FormField, Harness,
    Verified,
};
use tracing::info;

const CHECKOUT_FIELDS: usize = 3;

/// Shipping details entered on the checkout form, in field order.
#[derive(Debug, Clone)]
pub struct CheckoutDetails {
    pub first_name: String,
    pub last_name: String,
    pub postcode: String,
}

impl CheckoutDetails {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        postcode: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            postcode: postcode.into(),
        }
    }
}

/// Cart, checkout and the account menu in the header.
pub struct CartPage<'a, D> {
    h: Harness<'a, D>,
}

impl<'a, D: Driver> CartPage<'a, D> {
    pub fn new(h: Harness<'a, D>) -> Self {
        Self { h }
    }

    /// Cart icon in the header, else straight to `cart` under the store root.
    pub fn open_cart_chain(&self) -> Result<Escalation> {
        Ok(Escalation::new("open cart")
            .then(EscalationStep::click(
                self.h.locator(CART_ICON)?.clone(),
                Duration::from_secs(2),
            ))
            .then(EscalationStep::navigate("cart")))
    }

    pub async fn open_cart(&self) -> Result<EscalationOutcome> {
        let chain = self.open_cart_chain()?;
        Ok(self.h.escalate(&chain).await?)
    }

    /// Checkout, fill the shipping form, continue, finish.
    pub async fn checkout(&self, details: &CheckoutDetails) -> Result<()> {
        self.h.click(CHECKOUT_BUTTON).await?;
        self.fill_checkout_form(details).await?;
        self.h.click(CONTINUE_BUTTON).await?;
        self.h.click(FINISH_BUTTON).await?;
        info!("order finished");
        Ok(())
    }

    /// Fill the first three visible, enabled text inputs in document order.
    pub async fn fill_checkout_form(&self, details: &CheckoutDetails) -> Result<()> {
        let inputs = self.h.find_all(CHECKOUT_INPUTS).await?;
        if inputs.len() < CHECKOUT_FIELDS {
            return Err(Error::FormIncomplete {
                expected: CHECKOUT_FIELDS,
                found: inputs.len(),
            });
        }
        let fields = [
            FormField::new(inputs[0], &details.first_name, "first name"),
            FormField::new(inputs[1], &details.last_name, "last name"),
            FormField::new(inputs[2], &details.postcode, "postcode"),
        ];
        self.h.engine().fill_ordered_fields(&fields).await?;
        Ok(())
    }

    pub async fn continue_shopping(&self) -> Result<ClickVia> {
        Ok(self.h.click(CONTINUE_SHOPPING_BUTTON).await?)
    }

    /// Store URL outside cart and checkout, else the products heading, else
    /// any product grid.
    pub async fn verify_back_to_home(&self) -> Result<Verified> {
        let mut checks = vec![Check::url_within(
            "store url",
            "/ecommerce",
            ["/cart", "/checkout"],
        )];
        checks.extend(visible_checks(&self.h, PRODUCTS_HEADING)?);
        checks.extend(visible_checks(&self.h, PRODUCT_GRID)?);
        self.verify(&checks, "back on home page").await
    }

    /// Direct logout button, then the user menus, then any element reading
    /// "logout", then the login page by URL.
    pub fn logout_chain(&self) -> Result<Escalation> {
        let button = self.h.locator(LOGOUT_BUTTON)?;
        let menus = self.h.registry().resolve_strategies(USER_MENU)?.to_vec();
        Ok(Escalation::new("logout")
            .then(EscalationStep::click(button.clone(), Duration::from_secs(2)))
            .then(EscalationStep::open_then_click(
                menus,
                button.clone(),
                Duration::from_secs(1),
            ))
            .then(EscalationStep::click_text("logout"))
            .then(EscalationStep::navigate("/login")))
    }

    pub async fn logout(&self) -> Result<EscalationOutcome> {
        let chain = self.logout_chain()?;
        Ok(self.h.escalate(&chain).await?)
    }

    pub async fn verify_logged_out(&self) -> Result<Verified> {
        let mut checks = vec![Check::url_contains("login url", "/login")];
        checks.extend(visible_checks(&self.h, LOGIN_HEADING)?);
        checks.extend(visible_checks(&self.h, LOGIN_EMAIL_INPUT)?);
        self.verify(&checks, "logged out").await
    }

    async fn verify(&self, checks: &[Check], context: &str) -> Result<Verified> {
        Ok(self
            .h
            .verifier()
            .verify_within(checks, context, self.h.config().timeout)
            .await?)
    }
}
