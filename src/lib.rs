// mozsession - Firefox session-restore inspection and repair
// View or patch saved windows, tabs, and shutdown checkpoints while the
// browser is not running

pub mod cli;
pub mod error;
pub mod format;
pub mod locator;
pub mod models;
pub mod store;
pub mod ui;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use error::SessionError;
pub use format::SessionFormat;
pub use locator::ResolvedProfile;
pub use models::{CheckpointMap, SessionDocument};
pub use store::SessionStore;
