//! Shutdown checkpoint flags and their lifecycle interpretation
//!
//! `sessionCheckpoints.json` records which observer topics fired during the
//! browser's last run as a flat map of booleans. Walking the canonical
//! firing order turns that map into a one-line lifecycle phase ("Running",
//! "Stopped", ...) plus trailers for anything unusual.

use serde_json::{Map, Value};

use crate::error::SessionError;

/// Observer topics in the order the browser fires them
const CHECKPOINT_ORDER: [&str; 9] = [
    "profile-after-change",
    "final-ui-startup",
    "sessionstore-windows-restored",
    "quit-application-granted",
    "quit-application",
    "sessionstore-final-state-write-complete",
    "profile-change-net-teardown",
    "profile-change-teardown",
    "profile-before-change",
];

/// Topics legitimately absent on some clean runs
const CHECKPOINT_SKIPPABLE: [&str; 2] = [
    "sessionstore-windows-restored",
    "sessionstore-final-state-write-complete",
];

fn checkpoint_label(name: &'static str) -> &'static str {
    match name {
        "profile-after-change" => "Starting",
        "final-ui-startup" => "Started, Loading session",
        "sessionstore-windows-restored" => "Running",
        "quit-application-granted" => "Stopping",
        "quit-application" => "Hidden",
        "sessionstore-final-state-write-complete" => "Session saved",
        "profile-change-net-teardown" => "Session saved, Connections closed",
        "profile-change-teardown" => "Session saved, Connections closed, Profile closing",
        "profile-before-change" => "Stopped",
        _ => name,
    }
}

/// Parsed contents of a checkpoint file
///
/// Absent entries mean the checkpoint was not reached. Key order is kept so
/// rewriting the file disturbs nothing but the values.
#[derive(Debug, Clone, Default)]
pub struct CheckpointMap(Map<String, Value>);

impl CheckpointMap {
    /// Build from a decoded checkpoint file; the root must be an object
    pub fn from_value(value: Value, path: &std::path::Path) -> Result<Self, SessionError> {
        match value {
            Value::Object(map) => Ok(CheckpointMap(map)),
            other => Err(SessionError::format(
                path,
                format!("expected a JSON object of checkpoint flags, got {}", type_name(&other)),
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mark every canonical checkpoint as reached
    pub fn mark_all_reached(&mut self) {
        for name in CHECKPOINT_ORDER {
            self.0.insert(name.to_string(), Value::Bool(true));
        }
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone())
    }

    /// Human-readable lifecycle phase for this set of flags
    ///
    /// Walks the canonical order over a working copy: a true flag advances
    /// the state and is consumed; an absent skippable flag is recorded as
    /// skipped; anything else stops the scan. Skipped and leftover entries
    /// (out-of-order or explicitly false) are appended as trailers.
    pub fn describe(&self) -> String {
        let mut state = String::from("Init");
        let mut rest = self.0.clone();
        let mut skipped: Vec<&str> = Vec::new();

        for event in CHECKPOINT_ORDER {
            if rest.is_empty() {
                break;
            }
            if rest.get(event) == Some(&Value::Bool(true)) {
                state = format!("{} ({})", checkpoint_label(event), event);
                rest.shift_remove(event);
                continue;
            }
            if CHECKPOINT_SKIPPABLE.contains(&event) {
                if !rest.contains_key(event) {
                    skipped.push(event);
                }
                continue;
            }
            break;
        }

        if !skipped.is_empty() {
            state.push_str("; skipped: ");
            state.push_str(&skipped.join(", "));
        }
        if !rest.is_empty() {
            let leftovers: Vec<String> = rest
                .iter()
                .map(|(k, v)| {
                    if matches!(v, Value::Bool(false)) {
                        format!("not {}", k)
                    } else {
                        k.clone()
                    }
                })
                .collect();
            state.push_str("; ");
            state.push_str(&leftovers.join(", "));
        }
        state
    }
}

fn type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
