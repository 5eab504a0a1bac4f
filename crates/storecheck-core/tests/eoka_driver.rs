//! Engines against a real page.
//!
//! These tests require Chrome to be installed and available.
//! Run with: cargo test -p storecheck-core --test eoka_driver -- --ignored

use std::time::Duration;
use storecheck_core::eoka_driver::EokaDriver;
use storecheck_core::{
    ClickVia, Driver, DriverError, ElementResolver, EngineConfig, Error, InteractionEngine, Strategy,
};

fn chrome_available() -> bool {
    eoka::stealth::patcher::find_chrome().is_ok()
}

fn config() -> EngineConfig {
    EngineConfig::default()
        .with_timeout(Duration::from_secs(2))
        .with_poll_interval(Duration::from_millis(100))
        .with_scroll_settle(Duration::from_millis(50))
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_resolver_prefers_visible_match() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");
    page.goto(
        r##"data:text/html,
        <button id="hidden" style="display:none">Hidden</button>
        <button id="shown">Shown</button>
    "##,
    )
    .await
    .expect("Failed to navigate");

    let driver = EokaDriver::new(page);
    let cfg = config();
    let found = ElementResolver::new(&driver, &cfg)
        .find_visible(
            "target",
            &[
                Strategy::xpath("//a[@id='none']"),
                Strategy::id("hidden"),
                Strategy::css("button#shown"),
            ],
            Duration::from_secs(2),
        )
        .await
        .expect("resolve");
    assert_eq!(found.strategy_index, 2);
    assert_eq!(driver.text(found.handle).await.unwrap(), "Shown");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_overlay_forces_scripted_click() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");
    page.goto(
        r##"data:text/html,
        <button id="go" onclick="document.title='clicked'" style="position:absolute;top:10px;left:10px">Go</button>
        <div style="position:fixed;inset:0;z-index:10"></div>
    "##,
    )
    .await
    .expect("Failed to navigate");

    let driver = EokaDriver::new(page);
    let cfg = config();
    let found = ElementResolver::new(&driver, &cfg)
        .find_visible("go", &[Strategy::id("go")], Duration::from_secs(2))
        .await
        .expect("resolve");

    assert!(matches!(
        driver.native_click(found.handle).await,
        Err(DriverError::ClickIntercepted(_))
    ));
    let via = InteractionEngine::new(&driver, &cfg)
        .click(found.handle, "go button")
        .await
        .expect("click");
    assert_eq!(via, ClickVia::Scripted);
    let title: String = driver.page().evaluate("document.title").await.unwrap();
    assert_eq!(title, "clicked");

    browser.close().await.expect("Failed to close browser");
}

#[tokio::test]
#[ignore = "requires Chrome"]
async fn test_handles_go_stale_after_navigation() {
    if !chrome_available() {
        eprintln!("Chrome not found, skipping test");
        return;
    }

    let browser = eoka::Browser::launch().await.expect("Failed to launch browser");
    let page = browser
        .new_page("about:blank")
        .await
        .expect("Failed to create page");
    page.goto(r##"data:text/html,<input name="q">"##)
        .await
        .expect("Failed to navigate");

    let driver = EokaDriver::new(page);
    let handles = driver.query(&Strategy::name("q")).await.unwrap();
    assert_eq!(handles.len(), 1);

    let cfg = config();
    InteractionEngine::new(&driver, &cfg)
        .fill(handles[0], "shoes", "search")
        .await
        .expect("fill");

    driver
        .navigate(r##"data:text/html,<p>next</p>"##)
        .await
        .unwrap();
    let err = InteractionEngine::new(&driver, &cfg)
        .fill(handles[0], "boots", "search")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::FillFailed { .. }));

    browser.close().await.expect("Failed to close browser");
}
