//! The decoded session-restore document
//!
//! A session document is schemaless JSON; only a handful of fields matter
//! here (`selectedWindow`, `windows`, `session`, `_closedWindows` and the
//! per-window/per-tab fields). Everything else passes through load and save
//! untouched, in its original key order. All indices exposed by this module
//! are 1-based, matching what the browser itself stores.

use serde::Serialize;
use serde_json::{Map, Value};

/// URL sentinel of a crash-recovery wrapper document
const SESSIONRESTORE_URL: &str = "about:sessionrestore";

/// A tab's active navigation entry, possibly synthesized
///
/// Tabs that never committed a navigation have no `entries`; their pending
/// `userTypedValue` (or nothing at all) stands in for the current entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryInfo {
    pub url: String,
    pub title: Option<String>,
}

/// The tab's current history entry, or a placeholder for uncommitted tabs
pub fn current_entry(tab: &Value) -> EntryInfo {
    let entries = tab.get("entries").and_then(Value::as_array);
    if let Some(entries) = entries.filter(|e| !e.is_empty()) {
        let index = tab.get("index").and_then(Value::as_u64).unwrap_or(1) as usize;
        let entry = &entries[index.clamp(1, entries.len()) - 1];
        return EntryInfo {
            url: json_str(entry.get("url")).unwrap_or_else(|| "about:blank".to_string()),
            title: json_str(entry.get("title")),
        };
    }
    match json_str(tab.get("userTypedValue")) {
        Some(url) => EntryInfo {
            title: Some(json_str(tab.get("title")).unwrap_or_else(|| "Loading...".to_string())),
            url,
        },
        None => EntryInfo {
            url: "about:blank".to_string(),
            title: Some(json_str(tab.get("title")).unwrap_or_else(|| "New tab".to_string())),
        },
    }
}

fn json_str(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str).map(str::to_string)
}

/// Decoded root object of a session file
#[derive(Debug, Clone)]
pub struct SessionDocument(Value);

impl SessionDocument {
    pub fn new(root: Value) -> Self {
        SessionDocument(root)
    }

    pub fn root(&self) -> &Value {
        &self.0
    }

    pub fn root_mut(&mut self) -> &mut Value {
        &mut self.0
    }

    /// The `session` metadata map, if present
    pub fn session_meta(&self) -> Option<&Map<String, Value>> {
        self.0.get("session").and_then(Value::as_object)
    }

    /// Raw `selectedWindow` value; may violate the 1..=count invariant
    pub fn selected_window_raw(&self) -> i64 {
        self.0
            .get("selectedWindow")
            .and_then(Value::as_i64)
            .unwrap_or(1)
    }

    pub fn set_selected_window(&mut self, n: usize) {
        if let Some(root) = self.0.as_object_mut() {
            root.insert("selectedWindow".to_string(), Value::from(n));
        }
    }

    pub fn window_count(&self) -> usize {
        self.windows().map_or(0, Vec::len)
    }

    fn windows(&self) -> Option<&Vec<Value>> {
        self.0.get("windows").and_then(Value::as_array)
    }

    /// Window at a 1-based index
    pub fn window(&self, n: usize) -> Option<&Value> {
        self.windows()?.get(n.checked_sub(1)?)
    }

    /// Mutable window at a 1-based index
    pub fn window_mut(&mut self, n: usize) -> Option<&mut Value> {
        self.0
            .get_mut("windows")
            .and_then(Value::as_array_mut)?
            .get_mut(n.checked_sub(1)?)
    }

    /// Remove and return the window at a 1-based index
    pub fn remove_window(&mut self, n: usize) -> Option<Value> {
        let windows = self.0.get_mut("windows").and_then(Value::as_array_mut)?;
        if n < 1 || n > windows.len() {
            return None;
        }
        Some(windows.remove(n - 1))
    }

    /// Append a window snapshot to `_closedWindows`, creating it if absent
    pub fn push_closed_window(&mut self, window: Value) {
        if let Some(root) = self.0.as_object_mut() {
            root.entry("_closedWindows")
                .or_insert_with(|| Value::Array(Vec::new()));
            if let Some(closed) = root.get_mut("_closedWindows").and_then(Value::as_array_mut) {
                closed.push(window);
            }
        }
    }

    /// Extract the nested session buried in a crash-recovery wrapper
    ///
    /// After a crash the browser may save a self-referential snapshot: a
    /// single window with a single `about:sessionrestore` tab whose form
    /// data holds the real previous session. The shape match is exact on
    /// purpose; anything else returns None and the document is left alone.
    pub fn crash_recovery_payload(&self) -> Option<Value> {
        let windows = self.windows()?;
        if windows.len() != 1 {
            return None;
        }
        let tabs = windows[0].get("tabs")?.as_array()?;
        if tabs.len() != 1 {
            return None;
        }
        let tab = &tabs[0];
        let entries = tab.get("entries")?.as_array()?;
        if entries.len() != 1 {
            return None;
        }
        if entries[0].get("url")?.as_str()? != SESSIONRESTORE_URL {
            return None;
        }
        let formdata = tab.get("formdata")?;
        if formdata.get("url")?.as_str()? != SESSIONRESTORE_URL {
            return None;
        }
        formdata.get("id")?.get("sessionData").cloned()
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

/// Tabs of a window; empty when the field is absent
pub fn window_tabs(window: &Value) -> &[Value] {
    window
        .get("tabs")
        .and_then(Value::as_array)
        .map_or(&[], Vec::as_slice)
}

/// Raw `selected` value of a window; may violate the 1..=count invariant
pub fn window_selected_raw(window: &Value) -> i64 {
    window.get("selected").and_then(Value::as_i64).unwrap_or(1)
}
