//! In-memory [`Driver`] for exercising the engines without a browser.
//!
//! The fake keeps a flat list of nodes in document order. Each node declares
//! which strategies match it, so tests describe *what the page looks like*
//! instead of writing selectors an engine would have to evaluate. The
//! snippets in [`scripts`](crate::scripts) are interpreted; every observable
//! action is appended to a call log.

use crate::driver::{Driver, DriverError, DriverResult, ElementHandle, ScriptArg};
use crate::locator::Strategy;
use crate::scripts;
use serde_json::Value;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::time::Instant;

pub type NodeId = usize;

/// How a node reacts to a native click.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NativeClick {
    #[default]
    Works,
    /// Another node (an overlay, a sticky header) receives the click.
    Intercepted,
    NotInteractable,
}

/// Side effect of a successful click on a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Navigate(String),
    Show(NodeId),
    Hide(NodeId),
}

/// A recorded driver interaction. Clicks are recorded on every attempt,
/// including ones that fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Navigate(String),
    Scroll(NodeId),
    NativeClick(NodeId),
    ScriptClick(NodeId),
    ClearValue(NodeId),
    SetValue(NodeId, String),
    Event(NodeId, String),
    SendKeys(NodeId, String),
}

#[derive(Debug, Clone, Default)]
pub struct FakeNode {
    strategies: Vec<Strategy>,
    text: String,
    value: String,
    hidden: bool,
    disabled: bool,
    appears_after: Option<Duration>,
    native_click: NativeClick,
    script_click_fails: bool,
    effects: Vec<Effect>,
    events: Vec<String>,
}

impl FakeNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `strategy` match this node. May be called several times.
    pub fn matching(mut self, strategy: Strategy) -> Self {
        self.strategies.push(strategy);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.value = value.into();
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Absent from the document until `delay` after the driver was created.
    pub fn appears_after(mut self, delay: Duration) -> Self {
        self.appears_after = Some(delay);
        self
    }

    pub fn native_click(mut self, behaviour: NativeClick) -> Self {
        self.native_click = behaviour;
        self
    }

    pub fn script_click_fails(mut self) -> Self {
        self.script_click_fails = true;
        self
    }

    pub fn on_click(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

struct State {
    url: String,
    ready_state: String,
    scope: u64,
    nodes: Vec<FakeNode>,
    broken_queries: Vec<Strategy>,
    calls: Vec<Call>,
}

pub struct FakeDriver {
    created: Instant,
    state: Mutex<State>,
}

impl FakeDriver {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            created: Instant::now(),
            state: Mutex::new(State {
                url: url.into(),
                ready_state: "complete".into(),
                scope: 1,
                nodes: Vec::new(),
                broken_queries: Vec::new(),
                calls: Vec::new(),
            }),
        }
    }

    /// Append a node to the document.
    pub fn add(&self, node: FakeNode) -> NodeId {
        let mut state = self.lock();
        state.nodes.push(node);
        state.nodes.len() - 1
    }

    /// The handle a query would return for `id` in the current document.
    pub fn handle(&self, id: NodeId) -> ElementHandle {
        ElementHandle::new(self.lock().scope, id as u64)
    }

    pub fn set_ready_state(&self, state: &str) {
        self.lock().ready_state = state.to_string();
    }

    /// Make queries with `strategy` fail as an invalid selector.
    pub fn fail_queries_for(&self, strategy: Strategy) {
        self.lock().broken_queries.push(strategy);
    }

    pub fn url(&self) -> String {
        self.lock().url.clone()
    }

    pub fn value(&self, id: NodeId) -> String {
        self.lock().nodes[id].value.clone()
    }

    /// Events dispatched on `id`, in order.
    pub fn events(&self, id: NodeId) -> Vec<String> {
        self.lock().nodes[id].events.clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn present(&self, node: &FakeNode) -> bool {
        node.appears_after
            .map_or(true, |delay| self.created.elapsed() >= delay)
    }

    /// Look up a live node, enforcing handle scope.
    fn live(&self, state: &State, el: ElementHandle) -> DriverResult<NodeId> {
        let id = el.node() as NodeId;
        if el.scope() != state.scope {
            return Err(DriverError::StaleElement);
        }
        match state.nodes.get(id) {
            Some(node) if self.present(node) => Ok(id),
            _ => Err(DriverError::StaleElement),
        }
    }

    fn apply_effects(state: &mut State, id: NodeId) {
        let effects = state.nodes[id].effects.clone();
        for effect in effects {
            match effect {
                Effect::Navigate(url) => {
                    state.url = url;
                    state.scope += 1;
                }
                Effect::Show(target) => {
                    if let Some(n) = state.nodes.get_mut(target) {
                        n.hidden = false;
                    }
                }
                Effect::Hide(target) => {
                    if let Some(n) = state.nodes.get_mut(target) {
                        n.hidden = true;
                    }
                }
            }
        }
    }
}

fn element_arg(args: &[ScriptArg], i: usize) -> DriverResult<ElementHandle> {
    match args.get(i) {
        Some(ScriptArg::Element(el)) => Ok(*el),
        other => Err(DriverError::Script(format!(
            "arguments[{}] is not an element: {:?}",
            i, other
        ))),
    }
}

fn text_arg(args: &[ScriptArg], i: usize) -> DriverResult<String> {
    match args.get(i) {
        Some(ScriptArg::Text(s)) => Ok(s.clone()),
        other => Err(DriverError::Script(format!(
            "arguments[{}] is not a string: {:?}",
            i, other
        ))),
    }
}

impl Driver for FakeDriver {
    async fn navigate(&self, url: &str) -> DriverResult<()> {
        let mut state = self.lock();
        state.url = url.to_string();
        state.scope += 1;
        state.calls.push(Call::Navigate(url.to_string()));
        Ok(())
    }

    async fn current_url(&self) -> DriverResult<String> {
        Ok(self.url())
    }

    async fn query(&self, strategy: &Strategy) -> DriverResult<Vec<ElementHandle>> {
        let state = self.lock();
        if state.broken_queries.contains(strategy) {
            return Err(DriverError::InvalidSelector(strategy.to_string()));
        }
        Ok(state
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.strategies.contains(strategy) && self.present(n))
            .map(|(id, _)| ElementHandle::new(state.scope, id as u64))
            .collect())
    }

    async fn is_displayed(&self, el: ElementHandle) -> DriverResult<bool> {
        let state = self.lock();
        let id = self.live(&state, el)?;
        Ok(!state.nodes[id].hidden)
    }

    async fn is_enabled(&self, el: ElementHandle) -> DriverResult<bool> {
        let state = self.lock();
        let id = self.live(&state, el)?;
        Ok(!state.nodes[id].disabled)
    }

    async fn text(&self, el: ElementHandle) -> DriverResult<String> {
        let state = self.lock();
        let id = self.live(&state, el)?;
        Ok(state.nodes[id].text.clone())
    }

    async fn native_click(&self, el: ElementHandle) -> DriverResult<()> {
        let mut state = self.lock();
        let id = self.live(&state, el)?;
        state.calls.push(Call::NativeClick(id));
        let node = &state.nodes[id];
        match node.native_click {
            NativeClick::Intercepted => {
                return Err(DriverError::ClickIntercepted("<div class=\"overlay\">".into()))
            }
            NativeClick::NotInteractable => {
                return Err(DriverError::NotInteractable("element is not ready".into()))
            }
            NativeClick::Works if node.hidden || node.disabled => {
                return Err(DriverError::NotInteractable("hidden or disabled".into()))
            }
            NativeClick::Works => {}
        }
        Self::apply_effects(&mut state, id);
        Ok(())
    }

    async fn send_keys(&self, el: ElementHandle, text: &str) -> DriverResult<()> {
        let mut state = self.lock();
        let id = self.live(&state, el)?;
        state.nodes[id].value.push_str(text);
        state.calls.push(Call::SendKeys(id, text.to_string()));
        Ok(())
    }

    async fn execute_script(&self, script: &str, args: &[ScriptArg]) -> DriverResult<Value> {
        let mut state = self.lock();
        match script {
            scripts::READY_STATE => return Ok(Value::String(state.ready_state.clone())),
            scripts::SCROLL_INTO_VIEW => {
                let id = self.live(&state, element_arg(args, 0)?)?;
                state.calls.push(Call::Scroll(id));
            }
            scripts::CLICK => {
                let id = self.live(&state, element_arg(args, 0)?)?;
                state.calls.push(Call::ScriptClick(id));
                if state.nodes[id].script_click_fails {
                    return Err(DriverError::Script("click() threw".into()));
                }
                Self::apply_effects(&mut state, id);
            }
            scripts::CLEAR_VALUE => {
                let id = self.live(&state, element_arg(args, 0)?)?;
                state.nodes[id].value.clear();
                state.calls.push(Call::ClearValue(id));
            }
            scripts::SET_VALUE => {
                let id = self.live(&state, element_arg(args, 0)?)?;
                let value = text_arg(args, 1)?;
                state.nodes[id].value = value.clone();
                state.calls.push(Call::SetValue(id, value));
            }
            scripts::DISPATCH_EVENT => {
                let id = self.live(&state, element_arg(args, 0)?)?;
                let event = text_arg(args, 1)?;
                state.nodes[id].events.push(event.clone());
                state.calls.push(Call::Event(id, event));
            }
            other => {
                return Err(DriverError::Script(format!(
                    "fake driver cannot run: {}",
                    other
                )))
            }
        }
        Ok(Value::Null)
    }

    async fn screenshot(&self) -> DriverResult<Vec<u8>> {
        Ok(b"\x89PNG\r\n\x1a\n".to_vec())
    }
}
