//! Render tracked files into a prompt block

use std::fmt::Write as _;
use std::sync::Arc;

use super::TrackedFile;

/// Render a snapshot as one text block, in snapshot order
///
/// Each file becomes a `### File: <path>` header followed by a fenced copy of
/// its content; files are separated by a blank line. An empty snapshot renders
/// to an empty string, which callers treat as "no context".
#[must_use]
pub fn render(snapshot: &[(String, Arc<TrackedFile>)]) -> String {
    let mut out = String::new();
    for (i, (path, file)) in snapshot.iter().enumerate() {
        if i > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(out, "### File: {path}\n```\n{}\n```", file.content);
    }
    out
}
