//! JavaScript snippets executed through [`Driver::execute_script`](crate::Driver::execute_script).
//!
//! Each one is a function body; `arguments[0]` is the target element where
//! one is needed.

/// Scroll the element to the vertical centre of the viewport.
pub const SCROLL_INTO_VIEW: &str =
    "arguments[0].scrollIntoView({behavior: 'smooth', block: 'center'});";

/// Click dispatched from script. Bypasses hit-testing, so overlays cannot
/// intercept it.
pub const CLICK: &str = "arguments[0].click();";

pub const CLEAR_VALUE: &str = "arguments[0].value = '';";

/// `arguments[1]` is the new value.
pub const SET_VALUE: &str = "arguments[0].value = arguments[1];";

/// Dispatch a bubbling event named `arguments[1]`.
pub const DISPATCH_EVENT: &str =
    "arguments[0].dispatchEvent(new Event(arguments[1], { bubbles: true }));";

pub const READY_STATE: &str = "return document.readyState;";
