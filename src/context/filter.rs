//! Watched-file predicate

use std::path::{Component, Path};

/// Source-code extensions worth tracking (without the leading dot)
pub const WATCHED_EXTENSIONS: &[&str] = &[
    "py", "js", "ts", "jsx", "tsx", "java", "cpp", "c", "go", "rs", "rb", "php", "swift", "kt",
];

/// Dependency, cache and virtual-env directory names that are never tracked
pub const EXCLUDED_DIRS: &[&str] = &["node_modules", "__pycache__", ".venv", "venv"];

/// Decide whether a workspace-relative path is a trackable source file
///
/// Rejects any path with a segment starting with `.` or equal to one of
/// [`EXCLUDED_DIRS`], then accepts only [`WATCHED_EXTENSIONS`].
#[must_use]
pub fn should_track(path: &Path) -> bool {
    for component in path.components() {
        let Component::Normal(segment) = component else {
            continue;
        };
        let segment = segment.to_string_lossy();
        if segment.starts_with('.') || EXCLUDED_DIRS.contains(&segment.as_ref()) {
            return false;
        }
    }

    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| WATCHED_EXTENSIONS.contains(&ext))
}
