//! Load, mutate, and save session state
//!
//! One store owns the decoded session document, the optional checkpoint
//! map, and the metadata captured at load time. A run performs at most one
//! mutation; `save()` rewrites each file's full contents in place. The
//! browser is assumed not to be running - concurrent modification is not
//! detected.

use std::fs::{self, OpenOptions};
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde_json::{Map, Value};

use crate::error::SessionError;
use crate::format::SessionFormat;
use crate::locator::ResolvedProfile;
use crate::models::{current_entry, window_selected_raw, window_tabs, CheckpointMap, SessionDocument};

/// Metadata of the most recently modified underlying file, for display
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub size: u64,
    pub modified: DateTime<Local>,
    /// `uid:gid` on unix, `-` elsewhere
    pub owner: String,
    /// `ls -l` style mode string on unix, `-` elsewhere
    pub mode: String,
}

impl FileInfo {
    fn capture(path: &Path) -> Result<FileInfo, SessionError> {
        let meta = fs::metadata(path)?;
        let modified = DateTime::<Local>::from(meta.modified()?);
        #[cfg(unix)]
        let (owner, mode) = {
            use std::os::unix::fs::MetadataExt;
            (
                format!("{}:{}", meta.uid(), meta.gid()),
                mode_string(meta.mode()),
            )
        };
        #[cfg(not(unix))]
        let (owner, mode) = ("-".to_string(), "-".to_string());
        Ok(FileInfo {
            path: path.to_path_buf(),
            size: meta.len(),
            modified,
            owner,
            mode,
        })
    }
}

/// Render unix mode bits the way `ls -l` does
#[cfg(unix)]
fn mode_string(mode: u32) -> String {
    let kind = match mode & 0o170000 {
        0o040000 => 'd',
        0o020000 => 'c',
        0o060000 => 'b',
        0o100000 => '-',
        0o010000 => 'p',
        0o120000 => 'l',
        0o140000 => 's',
        _ => '?',
    };
    let mut out = String::with_capacity(10);
    out.push(kind);
    let triplets = [
        (mode >> 6 & 7, mode & 0o4000 != 0, 's'),
        (mode >> 3 & 7, mode & 0o2000 != 0, 's'),
        (mode & 7, mode & 0o1000 != 0, 't'),
    ];
    for (bits, special, special_char) in triplets {
        out.push(if bits & 4 != 0 { 'r' } else { '-' });
        out.push(if bits & 2 != 0 { 'w' } else { '-' });
        let x = bits & 1 != 0;
        out.push(match (x, special) {
            (_, true) if x => special_char,
            (_, true) => special_char.to_ascii_uppercase(),
            (true, false) => 'x',
            (false, false) => '-',
        });
    }
    out
}

/// In-memory session state bound to its on-disk files
#[derive(Debug)]
pub struct SessionStore {
    profile: ResolvedProfile,
    document: SessionDocument,
    checkpoints: Option<CheckpointMap>,
    file_info: FileInfo,
    want_write: bool,
}

impl SessionStore {
    /// Read and decode the resolved files
    ///
    /// With `want_write` the data file is opened read-write so permission
    /// problems surface before any mutation. A missing checkpoint file is
    /// not an error.
    pub fn load(profile: ResolvedProfile, want_write: bool) -> Result<SessionStore, SessionError> {
        let bytes = read_file(&profile.data_path, want_write)?;
        let root = profile.format.decode(&profile.data_path, &bytes)?;
        let document = SessionDocument::new(root);

        let checkpoints = match &profile.checkpoint_path {
            Some(path) if path.is_file() => {
                let bytes = read_file(path, want_write)?;
                let value = SessionFormat::PlainJson.decode(path, &bytes)?;
                Some(CheckpointMap::from_value(value, path)?)
            }
            _ => None,
        };

        let mut file_info = FileInfo::capture(&profile.data_path)?;
        if let Some(path) = profile.checkpoint_path.as_deref().filter(|p| p.is_file()) {
            let other = FileInfo::capture(path)?;
            if other.modified > file_info.modified {
                file_info = other;
            }
        }

        Ok(SessionStore {
            profile,
            document,
            checkpoints,
            file_info,
            want_write,
        })
    }

    pub fn document(&self) -> &SessionDocument {
        &self.document
    }

    pub fn checkpoints(&self) -> Option<&CheckpointMap> {
        self.checkpoints.as_ref()
    }

    pub fn file_info(&self) -> &FileInfo {
        &self.file_info
    }

    pub fn data_path(&self) -> &Path {
        &self.profile.data_path
    }

    pub fn checkpoint_path(&self) -> Option<&Path> {
        self.profile.checkpoint_path.as_deref()
    }

    /// Window index to operate on: explicit request or the document's own
    /// selection clamped into valid range
    pub fn resolve_window(&self, requested: Option<usize>) -> Result<usize, SessionError> {
        let count = self.document.window_count();
        match requested {
            Some(n) => {
                if n >= 1 && n <= count {
                    Ok(n)
                } else {
                    Err(SessionError::Range {
                        what: "window",
                        value: n as i64,
                        max: count,
                    })
                }
            }
            None => {
                let fallback = self.document.selected_window_raw().max(1) as usize;
                let fallback = fallback.min(count);
                if fallback == 0 {
                    return Err(SessionError::Range {
                        what: "window",
                        value: self.document.selected_window_raw(),
                        max: count,
                    });
                }
                Ok(fallback)
            }
        }
    }

    /// Tab index within a validated window: explicit request or the
    /// window's own selection clamped into valid range
    pub fn resolve_tab(&self, window: usize, requested: Option<usize>) -> Result<usize, SessionError> {
        let Some(win) = self.document.window(window) else {
            return Err(SessionError::Range {
                what: "window",
                value: window as i64,
                max: self.document.window_count(),
            });
        };
        let count = window_tabs(win).len();
        match requested {
            Some(n) => {
                if n >= 1 && n <= count {
                    Ok(n)
                } else {
                    Err(SessionError::Range {
                        what: "tab",
                        value: n as i64,
                        max: count,
                    })
                }
            }
            None => {
                let fallback = window_selected_raw(win).max(1) as usize;
                let fallback = fallback.min(count);
                if fallback == 0 {
                    return Err(SessionError::Range {
                        what: "tab",
                        value: window_selected_raw(win),
                        max: count,
                    });
                }
                Ok(fallback)
            }
        }
    }

    /// Make window `n` the selected window
    pub fn select_window(&mut self, n: usize) -> Result<(), SessionError> {
        debug_assert!(self.want_write, "store loaded read-only");
        let count = self.document.window_count();
        if n < 1 || n > count {
            return Err(SessionError::Range {
                what: "window",
                value: n as i64,
                max: count,
            });
        }
        self.document.set_selected_window(n);
        Ok(())
    }

    /// Make tab `n` the selected tab of window `window`
    pub fn select_tab(&mut self, window: usize, n: usize) -> Result<(), SessionError> {
        debug_assert!(self.want_write, "store loaded read-only");
        let window_count = self.document.window_count();
        let Some(win) = self.document.window_mut(window) else {
            return Err(SessionError::Range {
                what: "window",
                value: window as i64,
                max: window_count,
            });
        };
        let count = window_tabs(win).len();
        if n < 1 || n > count {
            return Err(SessionError::Range {
                what: "tab",
                value: n as i64,
                max: count,
            });
        }
        if let Some(obj) = win.as_object_mut() {
            obj.insert("selected".to_string(), Value::from(n));
        }
        Ok(())
    }

    /// Close window `window`, appending its snapshot to `_closedWindows`
    ///
    /// The index must already be validated; `resolve_window` is the
    /// supported way to obtain one.
    pub fn close_window(&mut self, window: usize) {
        debug_assert!(self.want_write, "store loaded read-only");
        let mut removed = self
            .document
            .remove_window(window)
            .expect("validated window index");

        let count = self.document.window_count();
        let selected = self.document.selected_window_raw();
        if count > 0 && selected > count as i64 {
            self.document.set_selected_window(count);
        }

        let info = {
            let tabs = window_tabs(&removed);
            if tabs.is_empty() {
                None
            } else {
                let idx = (window_selected_raw(&removed).max(1) as usize).min(tabs.len());
                Some(current_entry(&tabs[idx - 1]))
            }
        };
        if let Some(obj) = removed.as_object_mut() {
            obj.shift_remove("busy");
            obj.insert("closedAt".to_string(), Value::from(Utc::now().timestamp()));
            if let Some(title) = info.and_then(|i| i.title) {
                obj.insert("title".to_string(), Value::String(title));
            }
        }
        self.document.push_closed_window(removed);
    }

    /// Close tab `tab` of window `window`, logging it in `_closedTabs`
    ///
    /// Indices must already be validated, as with `close_window`.
    pub fn close_tab(&mut self, window: usize, tab: usize) {
        debug_assert!(self.want_write, "store loaded read-only");
        let win = self
            .document
            .window_mut(window)
            .expect("validated window index");
        let obj = win.as_object_mut().expect("window is an object");

        let removed = {
            let tabs = obj
                .get_mut("tabs")
                .and_then(Value::as_array_mut)
                .expect("validated tab index");
            let removed = tabs.remove(tab - 1);
            let count = tabs.len();
            let selected = obj.get("selected").and_then(Value::as_i64).unwrap_or(1);
            if count > 0 && selected > count as i64 {
                obj.insert("selected".to_string(), Value::from(count));
            }
            removed
        };

        let info = current_entry(&removed);
        let image = removed.get("image").cloned();
        let mut record = Map::new();
        record.insert("closedAt".to_string(), Value::from(Utc::now().timestamp()));
        record.insert("pos".to_string(), Value::from(tab));
        record.insert("state".to_string(), removed);
        if let Some(title) = info.title {
            record.insert("title".to_string(), Value::String(title));
        }
        if let Some(image) = image {
            record.insert("image".to_string(), image);
        }

        obj.entry("_closedTabs")
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Some(closed) = obj.get_mut("_closedTabs").and_then(Value::as_array_mut) {
            closed.push(Value::Object(record));
        }
    }

    /// Repair the saved state after a crash or unclean shutdown
    ///
    /// Marks every checkpoint reached, forces `session.state` to stopped,
    /// drops the crash counter, and unwraps a crash-recovery wrapper
    /// document when the exact shape is present.
    pub fn fix(&mut self) {
        debug_assert!(self.want_write, "store loaded read-only");
        if let Some(checkpoints) = &mut self.checkpoints {
            checkpoints.mark_all_reached();
        }

        if let Some(session) = self
            .document
            .root_mut()
            .get_mut("session")
            .and_then(Value::as_object_mut)
        {
            if session.contains_key("state") {
                session.insert("state".to_string(), Value::String("stopped".to_string()));
            }
            session.shift_remove("recentCrashes");
        }

        if let Some(payload) = self.document.crash_recovery_payload() {
            self.document = SessionDocument::new(payload);
        }
    }

    /// Rewrite each underlying file's full contents
    pub fn save(&self) -> Result<(), SessionError> {
        debug_assert!(self.want_write, "store loaded read-only");
        let bytes = self.profile.format.encode(self.document.root())?;
        fs::write(&self.profile.data_path, bytes)?;

        if let (Some(path), Some(checkpoints)) =
            (self.profile.checkpoint_path.as_deref(), &self.checkpoints)
        {
            let bytes = SessionFormat::PlainJson.encode(&checkpoints.to_value())?;
            fs::write(path, bytes)?;
        }
        Ok(())
    }
}

fn read_file(path: &Path, want_write: bool) -> Result<Vec<u8>, SessionError> {
    let mut file = OpenOptions::new()
        .read(true)
        .write(want_write)
        .open(path)?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn store_from(root: Value, checkpoints: Option<Value>) -> (TempDir, SessionStore) {
        let dir = TempDir::new().unwrap();
        let data_path = dir.path().join("sessionstore.js");
        std::fs::write(&data_path, serde_json::to_vec(&root).unwrap()).unwrap();
        let checkpoint_path = checkpoints.map(|value| {
            let path = dir.path().join("sessionCheckpoints.json");
            std::fs::write(&path, serde_json::to_vec(&value).unwrap()).unwrap();
            path
        });
        let profile = ResolvedProfile {
            data_path,
            format: SessionFormat::PlainJson,
            checkpoint_path,
        };
        let store = SessionStore::load(profile, true).unwrap();
        (dir, store)
    }

    fn three_tab_doc() -> Value {
        json!({
            "selectedWindow": 1,
            "session": {"state": "running", "recentCrashes": 2},
            "windows": [{
                "selected": 2,
                "tabs": [
                    {"entries": [{"url": "https://one.example/", "title": "One"}], "index": 1},
                    {"entries": [{"url": "https://two.example/", "title": "Two"}], "index": 1},
                    {"entries": [{"url": "https://three.example/", "title": "Three"}], "index": 1}
                ]
            }],
            "_closedWindows": []
        })
    }

    #[test]
    fn test_resolve_window_defaults_to_clamped_selection() {
        let mut root = three_tab_doc();
        root["selectedWindow"] = json!(7);
        let (_dir, store) = store_from(root, None);
        assert_eq!(store.resolve_window(None).unwrap(), 1);
    }

    #[test]
    fn test_resolve_window_rejects_out_of_range_request() {
        let (_dir, store) = store_from(three_tab_doc(), None);
        let err = store.resolve_window(Some(2)).unwrap_err();
        assert!(matches!(err, SessionError::Range { what: "window", value: 2, max: 1 }));
    }

    #[test]
    fn test_resolve_tab_defaults_to_window_selection() {
        let (_dir, store) = store_from(three_tab_doc(), None);
        assert_eq!(store.resolve_tab(1, None).unwrap(), 2);
        assert_eq!(store.resolve_tab(1, Some(3)).unwrap(), 3);
        assert!(store.resolve_tab(1, Some(4)).is_err());
    }

    #[test]
    fn test_select_tab_roundtrip() {
        let (_dir, mut store) = store_from(three_tab_doc(), None);
        store.select_tab(1, 3).unwrap();
        store.save().unwrap();

        let reloaded = SessionStore::load(
            ResolvedProfile {
                data_path: store.data_path().to_path_buf(),
                format: SessionFormat::PlainJson,
                checkpoint_path: None,
            },
            false,
        )
        .unwrap();
        assert_eq!(
            window_selected_raw(reloaded.document().window(1).unwrap()),
            3
        );
    }

    #[test]
    fn test_close_tab_logs_and_clamps() {
        let (_dir, mut store) = store_from(three_tab_doc(), None);
        store.select_tab(1, 3).unwrap();
        store.close_tab(1, 3);

        let win = store.document().window(1).unwrap();
        assert_eq!(window_tabs(win).len(), 2);
        assert_eq!(window_selected_raw(win), 2);

        let closed = win["_closedTabs"].as_array().unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["pos"], json!(3));
        assert_eq!(closed[0]["title"], json!("Three"));
        assert_eq!(
            closed[0]["state"]["entries"][0]["url"],
            json!("https://three.example/")
        );
        assert!(closed[0]["closedAt"].is_i64());
    }

    #[test]
    fn test_close_window_logs_and_clamps() {
        let root = json!({
            "selectedWindow": 2,
            "windows": [
                {"selected": 1, "tabs": [{"entries": [{"url": "https://a.example/", "title": "A"}], "index": 1}], "busy": true},
                {"selected": 1, "tabs": [{"entries": [{"url": "https://b.example/", "title": "B"}], "index": 1}]}
            ],
            "_closedWindows": []
        });
        let (_dir, mut store) = store_from(root, None);
        store.close_window(2);

        assert_eq!(store.document().window_count(), 1);
        assert_eq!(store.document().selected_window_raw(), 1);

        let closed = store.document().root()["_closedWindows"].as_array().unwrap();
        assert_eq!(closed.len(), 1);
        assert_eq!(closed[0]["title"], json!("B"));
        assert!(closed[0].get("busy").is_none());
        assert!(closed[0]["closedAt"].is_i64());
    }

    #[test]
    fn test_close_window_strips_busy_flag() {
        let root = json!({
            "selectedWindow": 1,
            "windows": [
                {"selected": 1, "tabs": [{"entries": [{"url": "https://a.example/", "title": "A"}], "index": 1}], "busy": true},
                {"selected": 1, "tabs": []}
            ]
        });
        let (_dir, mut store) = store_from(root, None);
        store.close_window(1);
        let closed = store.document().root()["_closedWindows"].as_array().unwrap();
        assert!(closed[0].get("busy").is_none());
    }

    #[test]
    fn test_fix_repairs_session_metadata() {
        let checkpoints = json!({"profile-after-change": true});
        let (_dir, mut store) = store_from(three_tab_doc(), Some(checkpoints));
        store.fix();

        let session = store.document().session_meta().unwrap();
        assert_eq!(session["state"], json!("stopped"));
        assert!(!session.contains_key("recentCrashes"));
        assert_eq!(
            store.checkpoints().unwrap().describe(),
            "Stopped (profile-before-change)"
        );
        // window data untouched
        assert_eq!(window_tabs(store.document().window(1).unwrap()).len(), 3);
    }

    #[test]
    fn test_fix_unwraps_crash_recovery_wrapper() {
        let inner = json!({
            "selectedWindow": 1,
            "windows": [{"selected": 1, "tabs": [
                {"entries": [{"url": "https://real.example/", "title": "Real"}], "index": 1},
                {"entries": [{"url": "https://real2.example/", "title": "Real2"}], "index": 1}
            ]}]
        });
        let root = json!({
            "selectedWindow": 1,
            "windows": [{
                "selected": 1,
                "tabs": [{
                    "entries": [{"url": "about:sessionrestore"}],
                    "index": 1,
                    "formdata": {"url": "about:sessionrestore", "id": {"sessionData": inner}}
                }]
            }]
        });
        let (_dir, mut store) = store_from(root, None);
        store.fix();
        let win = store.document().window(1).unwrap();
        assert_eq!(window_tabs(win).len(), 2);
        assert_eq!(
            current_entry(&window_tabs(win)[0]).url,
            "https://real.example/"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_mode_string() {
        assert_eq!(mode_string(0o100644), "-rw-r--r--");
        assert_eq!(mode_string(0o040755), "drwxr-xr-x");
        assert_eq!(mode_string(0o104755), "-rwsr-xr-x");
        assert_eq!(mode_string(0o101644), "-rw-r--r-T");
    }
}
