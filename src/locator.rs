//! Locate session and checkpoint files on disk
//!
//! A user input can be a session file, a profile directory, a bare profile
//! name, or nothing. Profile directories are probed across the layout
//! variants the browser has used over the years, newest first; with no
//! input the platform's standard profile parent is globbed for recognized
//! profile names. The resolved pair is computed once and threaded through
//! the run explicitly.

use std::path::{Path, PathBuf};

use crate::error::SessionError;
use crate::format::SessionFormat;

pub const SESSIONSTORE_FILE: &str = "sessionstore.js";
pub const CHECKPOINTS_FILE: &str = "sessionCheckpoints.json";
pub const BACKUP_DIR: &str = "sessionstore-backups";

/// Profile-directory layouts, probed in this order
const LAYOUT_VARIANTS: [(&str, SessionFormat); 3] = [
    (
        "sessionstore-backups/recovery.jsonlz4",
        SessionFormat::CompressedJson,
    ),
    ("sessionstore-backups/recovery.js", SessionFormat::PlainJson),
    ("sessionstore.js", SessionFormat::PlainJson),
];

/// Profile-name suffixes recognized when globbing the profile parent
const PROFILE_MARKERS: [&str; 2] = ["default-release", "default"];

/// A resolved session file with its container format and checkpoint sibling
#[derive(Debug, Clone)]
pub struct ResolvedProfile {
    pub data_path: PathBuf,
    pub format: SessionFormat,
    pub checkpoint_path: Option<PathBuf>,
}

/// Resolve a user-supplied path, profile directory, or profile name
pub fn resolve(user_input: Option<&str>) -> Result<ResolvedProfile, SessionError> {
    if let Some(input) = user_input {
        let path = Path::new(input);
        if path.is_file() {
            return resolve_file(path);
        }
        if path.is_dir() {
            return probe_profile_dir(path)?.ok_or_else(|| not_found(&[path.to_path_buf()]));
        }
        // not an existing path: treat as a profile name under the standard parent
        return resolve_from_profile_parent(Some(input));
    }
    resolve_from_profile_parent(None)
}

/// Use an explicit file as the session data file
///
/// The checkpoint file is looked up next to it; a file inside
/// `sessionstore-backups/` pairs with the checkpoint file of the enclosing
/// profile directory.
fn resolve_file(path: &Path) -> Result<ResolvedProfile, SessionError> {
    let format = SessionFormat::from_path(path);
    ensure_available(format)?;

    let checkpoint_path = path
        .parent()
        .map(|dir| {
            if dir.file_name().is_some_and(|n| n == BACKUP_DIR) {
                dir.parent().unwrap_or(dir).join(CHECKPOINTS_FILE)
            } else {
                dir.join(CHECKPOINTS_FILE)
            }
        })
        .filter(|p| p.is_file());

    Ok(ResolvedProfile {
        data_path: path.to_path_buf(),
        format,
        checkpoint_path,
    })
}

/// Probe a profile directory for the first existing layout variant
pub fn probe_profile_dir(dir: &Path) -> Result<Option<ResolvedProfile>, SessionError> {
    for (relative, format) in LAYOUT_VARIANTS {
        let data_path = dir.join(relative);
        if !data_path.is_file() {
            continue;
        }
        ensure_available(format)?;
        let checkpoint_path = Some(dir.join(CHECKPOINTS_FILE)).filter(|p| p.is_file());
        return Ok(Some(ResolvedProfile {
            data_path,
            format,
            checkpoint_path,
        }));
    }
    Ok(None)
}

/// Glob the platform profile parent for matching profiles and probe each
fn resolve_from_profile_parent(name: Option<&str>) -> Result<ResolvedProfile, SessionError> {
    let roots = profile_roots();
    let markers: Vec<&str> = match name {
        Some(name) => vec![name],
        None => PROFILE_MARKERS.to_vec(),
    };

    for root in &roots {
        for marker in &markers {
            for dir in candidate_dirs(root, marker) {
                if let Some(resolved) = probe_profile_dir(&dir)? {
                    return Ok(resolved);
                }
            }
        }
    }
    Err(not_found(&roots))
}

/// Candidate profile directories under a root for one name marker
///
/// Matches both `<root>/<marker>` itself and the browser's salted
/// `<root>/*.<marker>` directories, in alphabetical order.
fn candidate_dirs(root: &Path, marker: &str) -> Vec<PathBuf> {
    let mut dirs = Vec::new();
    let exact = root.join(marker);
    if exact.is_dir() {
        dirs.push(exact);
    }
    let pattern = root.join(format!("*.{}", marker));
    if let Ok(paths) = glob::glob(&pattern.to_string_lossy()) {
        dirs.extend(paths.flatten().filter(|p| p.is_dir()));
    }
    dirs
}

/// Platform-standard Firefox profile parent directories
fn profile_roots() -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if cfg!(target_os = "windows") {
        if let Some(config) = dirs::config_dir() {
            roots.push(config.join("Mozilla").join("Firefox").join("Profiles"));
        }
    } else if cfg!(target_os = "macos") {
        if let Some(home) = dirs::home_dir() {
            roots.push(home.join("Library/Application Support/Firefox/Profiles"));
        }
    } else if let Some(home) = dirs::home_dir() {
        roots.push(home.join(".mozilla/firefox"));
    }
    roots
}

fn ensure_available(format: SessionFormat) -> Result<(), SessionError> {
    if format.available() {
        Ok(())
    } else {
        Err(SessionError::Configuration(
            "found an lz4-compressed session file but this build has no lz4 support \
             (rebuild with the `lz4` feature)"
                .to_string(),
        ))
    }
}

fn not_found(searched: &[PathBuf]) -> SessionError {
    let searched = searched
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ");
    SessionError::NotFound { searched }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn profile_with(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            let path = dir.path().join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, b"{}").unwrap();
        }
        dir
    }

    #[test]
    fn test_primary_file_only() {
        let dir = profile_with(&["sessionstore.js"]);
        let resolved = probe_profile_dir(dir.path()).unwrap().unwrap();
        assert_eq!(resolved.data_path, dir.path().join("sessionstore.js"));
        assert_eq!(resolved.format, SessionFormat::PlainJson);
        assert!(resolved.checkpoint_path.is_none());
    }

    #[test]
    fn test_legacy_backup_beats_primary() {
        let dir = profile_with(&[
            "sessionstore.js",
            "sessionstore-backups/recovery.js",
            "sessionCheckpoints.json",
        ]);
        let resolved = probe_profile_dir(dir.path()).unwrap().unwrap();
        assert_eq!(
            resolved.data_path,
            dir.path().join("sessionstore-backups/recovery.js")
        );
        assert_eq!(
            resolved.checkpoint_path,
            Some(dir.path().join("sessionCheckpoints.json"))
        );
    }

    #[cfg(feature = "lz4")]
    #[test]
    fn test_compressed_backup_beats_everything() {
        let dir = profile_with(&[
            "sessionstore.js",
            "sessionstore-backups/recovery.js",
            "sessionstore-backups/recovery.jsonlz4",
        ]);
        let resolved = probe_profile_dir(dir.path()).unwrap().unwrap();
        assert_eq!(
            resolved.data_path,
            dir.path().join("sessionstore-backups/recovery.jsonlz4")
        );
        assert_eq!(resolved.format, SessionFormat::CompressedJson);
    }

    #[cfg(not(feature = "lz4"))]
    #[test]
    fn test_compressed_backup_without_lz4_is_a_configuration_error() {
        let dir = profile_with(&["sessionstore-backups/recovery.jsonlz4"]);
        let err = probe_profile_dir(dir.path()).unwrap_err();
        assert!(matches!(err, SessionError::Configuration(_)));
    }

    #[test]
    fn test_empty_profile_dir_resolves_nothing() {
        let dir = TempDir::new().unwrap();
        assert!(probe_profile_dir(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_direct_file_pairs_checkpoints_from_same_dir() {
        let dir = profile_with(&["sessionstore.js", "sessionCheckpoints.json"]);
        let resolved = resolve_file(&dir.path().join("sessionstore.js")).unwrap();
        assert_eq!(
            resolved.checkpoint_path,
            Some(dir.path().join("sessionCheckpoints.json"))
        );
    }

    #[test]
    fn test_backup_file_pairs_checkpoints_from_profile_root() {
        let dir = profile_with(&[
            "sessionstore-backups/recovery.js",
            "sessionCheckpoints.json",
        ]);
        let resolved = resolve_file(&dir.path().join("sessionstore-backups/recovery.js")).unwrap();
        assert_eq!(
            resolved.checkpoint_path,
            Some(dir.path().join("sessionCheckpoints.json"))
        );
    }

    #[test]
    fn test_resolve_missing_path_without_profiles_is_not_found() {
        // an input that exists nowhere falls back to the profile parent scan;
        // a nonsense marker cannot match any profile there
        let err = resolve(Some("no-such-profile-name-zzz")).unwrap_err();
        assert!(matches!(
            err,
            SessionError::NotFound { .. } | SessionError::Configuration(_)
        ));
    }
}
