//! [`Driver`] backed by an [`eoka::Page`].
//!
//! Queried nodes are kept in a page-side registry (`window.__storecheck`)
//! and addressed by index. The registry carries a random scope id; a fresh
//! document gets a fresh registry, so handles from the previous document
//! come back as [`DriverError::StaleElement`].

use crate::driver::{Driver, DriverError, DriverResult, ElementHandle, ScriptArg};
use crate::locator::{Strategy, StrategyKind};
use eoka::Page;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

const HANDLE_ATTR: &str = "data-storecheck-handle";

pub struct EokaDriver {
    page: Page,
}

impl EokaDriver {
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    pub fn page(&self) -> &Page {
        &self.page
    }

    /// Run `body` with `el` bound to the registered node. `body` must return
    /// a reply object.
    async fn element_call(&self, el: ElementHandle, body: &str) -> DriverResult<Value> {
        let js = format!(
            r#"(() => {{
                const r = window.__storecheck;
                if (!r || r.scope !== {scope}) return {{ stale: true }};
                const el = r.nodes[{node}];
                if (!el || !el.isConnected) return {{ stale: true }};
                {body}
            }})()"#,
            scope = el.scope(),
            node = el.node(),
        );
        let reply: Reply = self.page.evaluate(&js).await.map_err(classify)?;
        reply.into_result()
    }
}

/// What page-side snippets hand back. Exactly one field is normally set.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Reply {
    value: Value,
    stale: bool,
    error: Option<String>,
    intercepted: Option<String>,
    not_interactable: Option<String>,
}

impl Reply {
    fn into_result(self) -> DriverResult<Value> {
        if self.stale {
            return Err(DriverError::StaleElement);
        }
        if let Some(by) = self.intercepted {
            return Err(DriverError::ClickIntercepted(by));
        }
        if let Some(why) = self.not_interactable {
            return Err(DriverError::NotInteractable(why));
        }
        if let Some(e) = self.error {
            return Err(DriverError::Script(e));
        }
        Ok(self.value)
    }
}

#[derive(Debug, Deserialize)]
struct QueryReply {
    #[serde(default)]
    scope: u64,
    #[serde(default)]
    ids: Vec<u64>,
    error: Option<String>,
}

fn classify(e: eoka::Error) -> DriverError {
    match e {
        eoka::Error::ElementNotFound(what) => DriverError::NoSuchElement(what),
        other => DriverError::Browser(other),
    }
}

fn query_js(strategy: &Strategy) -> String {
    let q = Value::String(strategy.query.clone());
    let lookup = match strategy.kind {
        StrategyKind::XPath => format!(
            r#"const snap = document.evaluate({q}, document, null, XPathResult.ORDERED_NODE_SNAPSHOT_TYPE, null);
                    for (let i = 0; i < snap.snapshotLength; i++) {{
                        const n = snap.snapshotItem(i);
                        if (n.nodeType === 1) found.push(n);
                    }}"#
        ),
        StrategyKind::Css => format!("found = Array.from(document.querySelectorAll({q}));"),
        StrategyKind::Id => format!("const n = document.getElementById({q}); if (n) found.push(n);"),
        StrategyKind::Name => format!("found = Array.from(document.getElementsByName({q}));"),
    };
    format!(
        r#"(() => {{
            let r = window.__storecheck;
            if (!r) {{
                r = window.__storecheck = {{
                    scope: Math.floor(Math.random() * 9007199254740990) + 1,
                    nodes: []
                }};
            }}
            let found = [];
            try {{
                {lookup}
            }} catch (e) {{
                return {{ error: String(e) }};
            }}
            const ids = found.map(n => {{
                let i = r.nodes.indexOf(n);
                if (i < 0) {{ i = r.nodes.length; r.nodes.push(n); }}
                return i;
            }});
            return {{ scope: r.scope, ids }};
        }})()"#
    )
}

/// Arguments as JSON: elements become `{ el: true, scope, node }`, values
/// become `{ v }`.
fn encode_args(args: &[ScriptArg]) -> Value {
    Value::Array(
        args.iter()
            .map(|a| match a {
                ScriptArg::Element(el) => json!({ "el": true, "scope": el.scope(), "node": el.node() }),
                ScriptArg::Text(s) => json!({ "v": s }),
            })
            .collect(),
    )
}

fn script_js(script: &str, args: &[ScriptArg]) -> String {
    format!(
        r#"(() => {{
            const r = window.__storecheck;
            const args = [];
            for (const a of {args}) {{
                if (!a.el) {{ args.push(a.v); continue; }}
                const n = r && r.scope === a.scope ? r.nodes[a.node] : null;
                if (!n || !n.isConnected) return {{ stale: true }};
                args.push(n);
            }}
            try {{
                const v = (function() {{ {script} }}).apply(null, args);
                return {{ value: v === undefined ? null : v }};
            }} catch (e) {{
                return {{ error: String(e) }};
            }}
        }})()"#,
        args = encode_args(args),
    )
}

impl Driver for EokaDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        debug!("goto {}", url);
        self.page.goto(url).await.map(|_| ()).map_err(classify)
    }

    async fn current_url(&self) -> DriverResult<String> {
        self.page.url().await.map_err(classify)
    }

    async fn query(&self, strategy: &Strategy) -> DriverResult<Vec<ElementHandle>> {
        let reply: QueryReply = self
            .page
            .evaluate(&query_js(strategy))
            .await
            .map_err(classify)?;
        if let Some(e) = reply.error {
            return Err(DriverError::InvalidSelector(format!("{}: {}", strategy, e)));
        }
        Ok(reply
            .ids
            .into_iter()
            .map(|id| ElementHandle::new(reply.scope, id))
            .collect())
    }

    async fn is_displayed(&self, el: ElementHandle) -> DriverResult<bool> {
        let v = self
            .element_call(
                el,
                r#"const s = getComputedStyle(el);
                const rect = el.getBoundingClientRect();
                return { value: s.display !== 'none' && s.visibility !== 'hidden'
                    && (rect.width > 0 || rect.height > 0) };"#,
            )
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn is_enabled(&self, el: ElementHandle) -> DriverResult<bool> {
        let v = self
            .element_call(el, "return { value: !el.disabled };")
            .await?;
        Ok(v.as_bool().unwrap_or(false))
    }

    async fn text(&self, el: ElementHandle) -> DriverResult<String> {
        let v = self
            .element_call(
                el,
                "return { value: (el.innerText || el.textContent || '').trim() };",
            )
            .await?;
        Ok(v.as_str().unwrap_or_default().to_string())
    }

    async fn native_click(&self, el: ElementHandle) -> DriverResult<()> {
        let token = format!("{:x}-{}", el.scope(), el.node());
        let mark = format!(
            r#"const rect = el.getBoundingClientRect();
            if (rect.width === 0 && rect.height === 0) return {{ not_interactable: 'element has no size' }};
            if (el.disabled) return {{ not_interactable: 'element is disabled' }};
            const hit = document.elementFromPoint(rect.left + rect.width / 2, rect.top + rect.height / 2);
            if (hit && hit !== el && !el.contains(hit)) return {{ intercepted: hit.outerHTML.slice(0, 120) }};
            el.setAttribute('{HANDLE_ATTR}', {token});
            return {{ value: true }};"#,
            token = Value::String(token.clone()),
        );
        self.element_call(el, &mark).await?;

        let selector = format!("[{}=\"{}\"]", HANDLE_ATTR, token);
        let clicked = self.page.click(&selector).await.map(|_| ()).map_err(classify);

        let unmark = format!("el.removeAttribute('{HANDLE_ATTR}'); return {{ value: true }};");
        if let Err(e) = self.element_call(el, &unmark).await {
            debug!("could not clear click marker on {}: {}", el, e);
        }
        clicked
    }

    async fn send_keys(&self, el: ElementHandle, text: &str) -> DriverResult<()> {
        self.element_call(
            el,
            r#"el.focus();
            if (document.activeElement !== el) return { not_interactable: 'element cannot take focus' };
            return { value: true };"#,
        )
        .await?;
        self.page.type_text(text).await.map(|_| ()).map_err(classify)
    }

    async fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        let reply: Reply = self
            .page
            .evaluate(&script_js(script, args))
            .await
            .map_err(classify)?;
        reply.into_result()
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        self.page.screenshot().await.map_err(classify)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_args() {
        let args = vec![
            ScriptArg::Element(ElementHandle::new(7, 3)),
            ScriptArg::from("change"),
        ];
        assert_eq!(
            encode_args(&args),
            json!([
                { "el": true, "scope": 7, "node": 3 },
                { "v": "change" }
            ])
        );
    }

    #[test]
    fn test_query_js_quotes_selector() {
        let js = query_js(&Strategy::xpath("//button[normalize-space()='Add to Cart']"));
        assert!(js.contains(r#"document.evaluate("//button[normalize-space()='Add to Cart']""#));
        let js = query_js(&Strategy::css(r#"input[name="q"]"#));
        assert!(js.contains(r#"querySelectorAll("input[name=\"q\"]")"#));
    }

    #[test]
    fn test_reply_mapping() {
        let stale: Reply = serde_json::from_value(json!({ "stale": true })).unwrap();
        assert!(matches!(stale.into_result(), Err(DriverError::StaleElement)));

        let blocked: Reply = serde_json::from_value(json!({ "intercepted": "<div>" })).unwrap();
        assert!(matches!(
            blocked.into_result(),
            Err(DriverError::ClickIntercepted(ref by)) if by == "<div>"
        ));

        let ok: Reply = serde_json::from_value(json!({ "value": "complete" })).unwrap();
        assert_eq!(ok.into_result().unwrap(), json!("complete"));
    }
}
