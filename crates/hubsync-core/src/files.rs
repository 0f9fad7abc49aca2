//! Reading and writing the exported event tree.
//!
//! Layout of an export directory:
//!
//! ```text
//! <dir>/Summer Sale.json          one enriched event per file
//! <dir>/Summer Sale-1.json        second event with the same name
//! <dir>/snapshots/<id>.json       snapshot plus its root content items
//! ```

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

use crate::error::{Result, SyncError};
use crate::model::EventWithEditions;

pub const SNAPSHOT_DIR: &str = "snapshots";

fn unsafe_chars() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^A-Za-z0-9 _.\-]+").ok()).as_ref()
}

/// File stem for an event name, with anything unsafe for a path replaced.
pub fn sanitize_file_stem(name: &str) -> String {
    let cleaned = match unsafe_chars() {
        Some(re) => re.replace_all(name, "_").into_owned(),
        None => name.replace(['/', '\\'], "_"),
    };
    let cleaned = cleaned.trim().trim_matches('.').to_string();
    if cleaned.is_empty() {
        "event".to_string()
    } else {
        cleaned
    }
}

/// `<stem>.json`, or `<stem>-<n>.json` for the n-th repeat of the same stem.
pub fn unique_file_name(taken: &mut HashSet<String>, name: &str) -> String {
    let stem = sanitize_file_stem(name);
    let mut candidate = format!("{}.json", stem);
    let mut n = 1;
    while taken.contains(&candidate.to_lowercase()) {
        candidate = format!("{}-{}.json", stem, n);
        n += 1;
    }
    taken.insert(candidate.to_lowercase());
    candidate
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;
    }
    let body = serde_json::to_string_pretty(value).map_err(|e| SyncError::json(path, e))?;
    std::fs::write(path, body).map_err(|e| SyncError::io(path, e))
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let raw = std::fs::read_to_string(path).map_err(|e| SyncError::io(path, e))?;
    serde_json::from_str(&raw).map_err(|e| SyncError::json(path, e))
}

/// Event files directly inside `dir`, sorted by file name.
pub fn read_event_files(dir: &Path) -> Result<Vec<(PathBuf, EventWithEditions)>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf());
            SyncError::io(path, std::io::Error::other(e.to_string()))
        })?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path.to_path_buf());
        }
    }
    paths.sort();

    let mut events = Vec::with_capacity(paths.len());
    for path in paths {
        let event = read_json(&path)?;
        debug!("Read event file {}", path.display());
        events.push((path, event));
    }
    Ok(events)
}
