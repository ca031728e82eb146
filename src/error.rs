//! Error taxonomy for session-file access
//!
//! Every variant aborts the run; nothing is downgraded or retried. The CLI
//! layer wraps these in `anyhow` for context, but matches on `Range` to
//! route out-of-bounds indices through the usage-error exit path.

use std::path::PathBuf;

/// Errors surfaced by the session-file core
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No resolvable session file for the given input
    #[error("no session file found (searched {searched})")]
    NotFound { searched: String },

    /// A file exists but its content violates the expected container format
    #[error("{}: {reason}", .path.display())]
    Format { path: PathBuf, reason: String },

    /// The file matched but the runtime lacks the capability to process it
    #[error("{0}")]
    Configuration(String),

    /// A user-specified or defaulted window/tab index is out of bounds
    #[error("invalid {what} index ({value}) - must be in range 1-{max}")]
    Range {
        what: &'static str,
        value: i64,
        max: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Shorthand for a format violation at a known path
    pub fn format(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        SessionError::Format {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_error_display() {
        let err = SessionError::Range {
            what: "window",
            value: 7,
            max: 3,
        };
        assert_eq!(
            err.to_string(),
            "invalid window index (7) - must be in range 1-3"
        );
    }

    #[test]
    fn test_format_error_display() {
        let err = SessionError::format("/tmp/sessionstore.js", "bad magic header");
        assert!(err.to_string().contains("sessionstore.js"));
        assert!(err.to_string().contains("bad magic header"));
    }

    #[test]
    fn test_not_found_display() {
        let err = SessionError::NotFound {
            searched: "~/.mozilla/firefox".to_string(),
        };
        assert!(err.to_string().contains("searched ~/.mozilla/firefox"));
    }
}
