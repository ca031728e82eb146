//! Structural diff rendering for dry-run previews
//!
//! JSON documents are flattened into deterministic `path = value` lines so
//! that a plain unified line diff shows exactly which fields a mutation
//! would touch, without drowning the reader in nested syntax.

use colored::Colorize;
use serde_json::Value;
use similar::TextDiff;

/// Flatten a JSON value into `name[path] = value` lines
///
/// Arrays contribute a length line plus one dump per element; objects a
/// key-list line plus one dump per key in sorted order. Scalars print as
/// JSON. Sorting makes the output stable regardless of document key order.
pub fn dump_for_diff(value: &Value, name: &str) -> Vec<String> {
    let mut lines = Vec::new();
    dump(value, name, &mut lines);
    lines
}

fn dump(value: &Value, name: &str, lines: &mut Vec<String>) {
    match value {
        Value::Array(items) => {
            lines.push(format!("{}.len() = {}", name, items.len()));
            for (i, item) in items.iter().enumerate() {
                dump(item, &format!("{}[{}]", name, i), lines);
            }
        }
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            lines.push(format!("{}.keys() = [{}]", name, keys.join(", ")));
            let mut sorted = keys;
            sorted.sort_unstable();
            for key in sorted {
                dump(&map[key], &format!("{}[{:?}]", name, key), lines);
            }
        }
        scalar => lines.push(format!("{} = {}", name, scalar)),
    }
}

/// Print a colored unified diff between two dumps
pub fn print_unified(old: &[String], new: &[String], old_label: &str, new_label: &str) {
    let old_text = old.join("\n");
    let new_text = new.join("\n");
    let diff = TextDiff::from_lines(&old_text, &new_text);
    let unified = diff
        .unified_diff()
        .context_radius(3)
        .header(old_label, new_label)
        .to_string();
    for line in unified.lines() {
        if line.starts_with("+++") || line.starts_with("---") {
            println!("{}", line.bold());
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else {
            println!("{}", line);
        }
    }
}
