pub mod checkpoint;
pub mod session;

pub use checkpoint::CheckpointMap;
pub use session::{current_entry, window_selected_raw, window_tabs, EntryInfo, SessionDocument};
