//! Recency lookup over terminal device nodes.

use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, warn};

/// The device node under `dir` whose name starts with `prefix` and which
/// was modified most recently. Unreadable entries are skipped.
pub fn most_recent_device(dir: &Path, prefix: &str) -> Option<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot list device directory");
            return None;
        }
    };

    let mut best: Option<(SystemTime, PathBuf)> = None;
    for entry in entries.flatten() {
        if !entry.file_name().to_string_lossy().starts_with(prefix) {
            continue;
        }
        let Ok(modified) = entry.metadata().and_then(|m| m.modified()) else {
            continue;
        };
        if best.as_ref().map_or(true, |(t, _)| modified > *t) {
            best = Some((modified, entry.path()));
        }
    }

    let found = best.map(|(_, path)| path);
    debug!(device = ?found, "most recent device");
    found
}
