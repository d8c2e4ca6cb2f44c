//! Live code context for mentor conversations
//!
//! Combines:
//! - Watched-file filter (which workspace paths count as source)
//! - Bounded store of the most recently written files
//! - Prompt rendering of the store
//! - The filesystem watcher that keeps the store current

mod filter;
mod format;
mod store;
mod watcher;

pub use filter::{EXCLUDED_DIRS, WATCHED_EXTENSIONS, should_track};
pub use format::render;
pub use store::{
    ContextStore, DEFAULT_MAX_FILE_CHARS, DEFAULT_MAX_FILES, TrackedFile, Upserted,
    truncate_content,
};
pub use watcher::{ChangeHandler, WorkspaceWatcher};

/// Rendered view of the store for `context_sync`
///
/// Returns the tracked paths (most recent first) and the rendered context.
#[must_use]
pub fn sync_view(store: &ContextStore) -> (Vec<String>, String) {
    let snapshot = store.snapshot();
    let files = snapshot.iter().map(|(path, _)| path.clone()).collect();
    (files, render(&snapshot))
}
