//! Page facades over the storefront, plus the locator table they resolve
//! names against.

mod cart;
mod dashboard;
mod login;

pub use cart::{CartPage, CheckoutDetails};
pub use dashboard::DashboardPage;
pub use login::LoginPage;

use crate::Result;
use std::collections::BTreeMap;
use storecheck_core::locator::xpath_literal;
use storecheck_core::{Check, Harness, Locator, LocatorRegistry, Strategy};

pub const EMAIL_INPUT: &str = "email input";
pub const PASSWORD_INPUT: &str = "password input";
pub const LOGIN_BUTTON: &str = "login button";

pub const SORT_TRIGGER: &str = "sort trigger";
pub const SORT_OPTIONS: &str = "sort options";
pub const INCREASE_QUANTITY: &str = "increase quantity";
pub const DETAILS_ADD_TO_CART: &str = "details add to cart";
pub const BACK_TO_PRODUCTS: &str = "back to products";
pub const PRODUCTS_HEADING: &str = "products heading";
pub const PRODUCT_GRID: &str = "product grid";

pub const CART_ICON: &str = "cart icon";
pub const CHECKOUT_BUTTON: &str = "checkout button";
pub const CHECKOUT_INPUTS: &str = "checkout inputs";
pub const CONTINUE_BUTTON: &str = "continue button";
pub const FINISH_BUTTON: &str = "finish button";
pub const CONTINUE_SHOPPING_BUTTON: &str = "continue shopping button";
pub const LOGOUT_BUTTON: &str = "logout button";
pub const USER_MENU: &str = "user menu";
pub const LOGIN_HEADING: &str = "login heading";
pub const LOGIN_EMAIL_INPUT: &str = "login email input";

/// The built-in storefront table with `overrides` applied on top.
pub fn storefront_registry(overrides: &BTreeMap<String, Vec<Strategy>>) -> Result<LocatorRegistry> {
    let mut builder = LocatorRegistry::builder()
        // login
        .register(EMAIL_INPUT, [Strategy::id("email")])
        .register(PASSWORD_INPUT, [Strategy::id("password")])
        .register(LOGIN_BUTTON, [Strategy::xpath("//button[@type='submit']")])
        // dashboard
        .register(
            SORT_TRIGGER,
            [
                Strategy::xpath("//button[@role='combobox']"),
                Strategy::xpath("//button[contains(normalize-space(),'Select')]"),
            ],
        )
        .register(SORT_OPTIONS, [Strategy::xpath("//*[@role='option']")])
        .register(
            INCREASE_QUANTITY,
            [Strategy::xpath("//button[normalize-space()='+']")],
        )
        .register(
            DETAILS_ADD_TO_CART,
            [Strategy::xpath("//button[contains(text(),'Add to cart')]")],
        )
        .register(
            BACK_TO_PRODUCTS,
            [
                Strategy::xpath(
                    "//button[@class='flex items-center gap-2 text-black font-semibold mb-8 cursor-pointer']",
                ),
                Strategy::xpath("//button[contains(normalize-space(),'Back')]"),
            ],
        )
        .register(
            PRODUCTS_HEADING,
            [Strategy::xpath("//h2[normalize-space()='Products']")],
        )
        .register(PRODUCT_GRID, [Strategy::xpath("//div[contains(@class, 'grid')]")])
        // cart and checkout
        .register(
            CART_ICON,
            [
                Strategy::xpath(
                    "//a[contains(@class, 'relative') and contains(@href, 'cart')]//span[@class='absolute -top-2 -right-2 bg-red-500 text-white text-xs rounded-full h-5 w-5 flex items-center justify-center']",
                ),
                Strategy::xpath("//header//a[contains(@href, 'cart')]"),
            ],
        )
        .register(
            CHECKOUT_BUTTON,
            [Strategy::xpath("//button[normalize-space()='Checkout']")],
        )
        .register(
            CHECKOUT_INPUTS,
            [Strategy::xpath("//input[@type='text' or not(@type)]")],
        )
        .register(
            CONTINUE_BUTTON,
            [Strategy::xpath("//button[normalize-space()='Continue']")],
        )
        .register(
            FINISH_BUTTON,
            [Strategy::xpath("//button[normalize-space()='Finish']")],
        )
        .register(
            CONTINUE_SHOPPING_BUTTON,
            [Strategy::xpath("//button[normalize-space()='Continue Shopping']")],
        )
        .register(
            LOGOUT_BUTTON,
            [Strategy::xpath("//button[normalize-space()='Logout']")],
        )
        .register(
            USER_MENU,
            [
                Strategy::xpath("//header//button[last()]"),
                Strategy::xpath("//button[contains(@class, 'user')]"),
                Strategy::xpath("//button[contains(@class, 'menu')]"),
            ],
        )
        .register(LOGIN_HEADING, [Strategy::xpath("//h2[normalize-space()='Login']")])
        .register(
            LOGIN_EMAIL_INPUT,
            [Strategy::xpath("//input[@type='email' or @placeholder='Email']")],
        );

    for (name, strategies) in overrides {
        builder = builder.override_strategies(name.clone(), strategies.iter().cloned());
    }
    Ok(builder.build()?)
}

/// One product card, addressed by its display name with the card's
/// position in the grid as a fallback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductRef {
    pub name: String,
    /// Positional XPath index for the fallback `//div[n]//div[1]//button[1]`.
    /// It matches any `div` that is the n-th child of its parent, so it only
    /// picks the card on the storefront's known layout.
    pub card_position: usize,
}

impl ProductRef {
    pub fn new(name: impl Into<String>, card_position: usize) -> Self {
        Self {
            name: name.into(),
            card_position,
        }
    }

    fn card(&self) -> String {
        format!(
            "//*[normalize-space()={}]/ancestor::div[.//button][1]",
            xpath_literal(&self.name)
        )
    }

    pub fn add_to_cart(&self) -> Locator {
        Locator::new(
            format!("{} add to cart", self.name),
            [
                Strategy::xpath(format!(
                    "{}//button[contains(normalize-space(),'Add to cart')]",
                    self.card()
                )),
                Strategy::xpath(format!("//div[{}]//div[1]//button[1]", self.card_position)),
            ],
        )
    }

    pub fn remove_from_cart(&self) -> Locator {
        Locator::new(
            format!("{} remove from cart", self.name),
            [
                Strategy::xpath(format!(
                    "{}//button[normalize-space()='Remove from cart']",
                    self.card()
                )),
                Strategy::xpath(format!(
                    "//div[{}]//div[1]//button[normalize-space()='Remove from cart']",
                    self.card_position
                )),
            ],
        )
    }

    pub fn image(&self) -> Locator {
        Locator::new(
            format!("{} image", self.name),
            [
                Strategy::xpath(format!("//img[@alt={}]", xpath_literal(&self.name))),
                Strategy::xpath(format!("{}//img", self.card())),
            ],
        )
    }

    pub fn favorite(&self) -> Locator {
        Locator::new(
            format!("{} favorite", self.name),
            [
                Strategy::xpath(format!("{}//span[1]//button[1]", self.card())),
                Strategy::xpath(format!(
                    "//div[@class='products grid grid-cols-1 md:grid-cols-2 lg:grid-cols-3 gap-6']//div[{}]//span[1]//button[1]",
                    self.card_position
                )),
            ],
        )
    }
}

/// One `ElementVisible` check per strategy of a registered locator.
fn visible_checks<D>(h: &Harness<'_, D>, name: &str) -> Result<Vec<Check>>
where
    D: storecheck_core::Driver,
{
    let locator = h.locator(name)?;
    Ok(locator
        .strategies()
        .iter()
        .map(|s| Check::element_visible(format!("{} ({})", name, s), s.clone()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_preserves_declared_order() {
        let registry = storefront_registry(&BTreeMap::new()).unwrap();
        let cart = registry.resolve_strategies(CART_ICON).unwrap();
        assert_eq!(cart.len(), 2);
        assert_eq!(cart[1].query, "//header//a[contains(@href, 'cart')]");
        assert_eq!(registry.resolve_strategies(USER_MENU).unwrap().len(), 3);
    }

    #[test]
    fn test_override_replaces_strategies() {
        let overrides = BTreeMap::from([(
            LOGOUT_BUTTON.to_string(),
            vec![Strategy::css("button[data-test=logout]")],
        )]);
        let registry = storefront_registry(&overrides).unwrap();
        let logout = registry.resolve_strategies(LOGOUT_BUTTON).unwrap();
        assert_eq!(logout, &[Strategy::css("button[data-test=logout]")]);
    }

    #[test]
    fn test_product_ref_prefers_name() {
        let shirt = ProductRef::new("Sample Shirt", 8);
        let add = shirt.add_to_cart();
        assert_eq!(add.strategies().len(), 2);
        assert!(add.strategies()[0].query.contains("'Sample Shirt'"));
        assert_eq!(add.strategies()[1].query, "//div[8]//div[1]//button[1]");
    }

    #[test]
    fn test_product_name_with_quote() {
        let img = ProductRef::new("Kid's Shoe", 3).image();
        assert_eq!(img.strategies()[0].query, "//img[@alt=\"Kid's Shoe\"]");
    }
}
