//! Persistent translation table between source-hub and destination-hub ids.
//!
//! Each resource kind has its own table. Entries are only ever added or
//! overwritten; nothing is removed. The table is the record of what earlier
//! runs migrated, so it is saved at the end of every import (successful or
//! not) and loaded at the start of the next one.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::{Result, SyncError};
use crate::hub::ResourceKind;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ContentMapping {
    events: BTreeMap<String, String>,
    editions: BTreeMap<String, String>,
    slots: BTreeMap<String, String>,
    content_items: BTreeMap<String, String>,
    snapshots: BTreeMap<String, String>,
}

impl ContentMapping {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: ResourceKind) -> &BTreeMap<String, String> {
        match kind {
            ResourceKind::Event => &self.events,
            ResourceKind::Edition => &self.editions,
            ResourceKind::Slot => &self.slots,
            ResourceKind::ContentItem => &self.content_items,
            ResourceKind::Snapshot => &self.snapshots,
        }
    }

    fn table_mut(&mut self, kind: ResourceKind) -> &mut BTreeMap<String, String> {
        match kind {
            ResourceKind::Event => &mut self.events,
            ResourceKind::Edition => &mut self.editions,
            ResourceKind::Slot => &mut self.slots,
            ResourceKind::ContentItem => &mut self.content_items,
            ResourceKind::Snapshot => &mut self.snapshots,
        }
    }

    /// Destination id for a source id of the given kind.
    pub fn get(&self, kind: ResourceKind, source_id: &str) -> Option<&str> {
        self.table(kind).get(source_id).map(String::as_str)
    }

    /// Record (or overwrite) a source -> destination pair.
    pub fn register(&mut self, kind: ResourceKind, source_id: &str, dest_id: &str) {
        let previous = self
            .table_mut(kind)
            .insert(source_id.to_string(), dest_id.to_string());
        if let Some(previous) = previous.filter(|p| p != dest_id) {
            debug!("{} mapping {} changed: {} -> {}", kind, source_id, previous, dest_id);
        }
    }

    pub fn get_event(&self, source_id: &str) -> Option<&str> {
        self.get(ResourceKind::Event, source_id)
    }

    pub fn register_event(&mut self, source_id: &str, dest_id: &str) {
        self.register(ResourceKind::Event, source_id, dest_id)
    }

    pub fn get_edition(&self, source_id: &str) -> Option<&str> {
        self.get(ResourceKind::Edition, source_id)
    }

    pub fn register_edition(&mut self, source_id: &str, dest_id: &str) {
        self.register(ResourceKind::Edition, source_id, dest_id)
    }

    pub fn get_slot(&self, source_id: &str) -> Option<&str> {
        self.get(ResourceKind::Slot, source_id)
    }

    pub fn register_slot(&mut self, source_id: &str, dest_id: &str) {
        self.register(ResourceKind::Slot, source_id, dest_id)
    }

    pub fn get_content_item(&self, source_id: &str) -> Option<&str> {
        self.get(ResourceKind::ContentItem, source_id)
    }

    pub fn register_content_item(&mut self, source_id: &str, dest_id: &str) {
        self.register(ResourceKind::ContentItem, source_id, dest_id)
    }

    pub fn get_snapshot(&self, source_id: &str) -> Option<&str> {
        self.get(ResourceKind::Snapshot, source_id)
    }

    pub fn register_snapshot(&mut self, source_id: &str, dest_id: &str) {
        self.register(ResourceKind::Snapshot, source_id, dest_id)
    }

    pub fn len(&self) -> usize {
        self.events.len()
            + self.editions.len()
            + self.slots.len()
            + self.content_items.len()
            + self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Write the mapping to `path`, replacing any previous file atomically.
    pub fn save(&self, path: &Path) -> Result<()> {
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir).map_err(|e| SyncError::io(dir, e))?;

        let mut file = tempfile::NamedTempFile::new_in(dir).map_err(|e| SyncError::io(dir, e))?;
        serde_json::to_writer_pretty(&mut file, self).map_err(|e| SyncError::json(path, e))?;
        file.flush().map_err(|e| SyncError::io(path, e))?;
        file.persist(path)
            .map_err(|e| SyncError::io(path, e.error))?;

        debug!("Saved {} mapping entries to {}", self.len(), path.display());
        Ok(())
    }

    /// Replace the contents with the mapping stored at `path`.
    ///
    /// Returns whether a file was found and parsed. A missing or unreadable
    /// file leaves the mapping untouched so the caller can start fresh.
    pub fn load(&mut self, path: &Path) -> bool {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return false,
            Err(e) => {
                warn!("Could not read mapping file {}: {}", path.display(), e);
                return false;
            }
        };

        match serde_json::from_str::<ContentMapping>(&raw) {
            Ok(loaded) => {
                *self = loaded;
                true
            }
            Err(e) => {
                warn!("Ignoring malformed mapping file {}: {}", path.display(), e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn tables_are_independent() {
        let mut mapping = ContentMapping::new();
        mapping.register_event("a", "event-dest");
        mapping.register_snapshot("a", "snap-dest");

        assert_eq!(mapping.get_event("a"), Some("event-dest"));
        assert_eq!(mapping.get_snapshot("a"), Some("snap-dest"));
        assert_eq!(mapping.get_edition("a"), None);
        assert_eq!(mapping.get_slot("a"), None);
        assert_eq!(mapping.get_content_item("a"), None);
        assert_eq!(mapping.len(), 2);
    }

    #[test]
    fn register_overwrites() {
        let mut mapping = ContentMapping::new();
        mapping.register_edition("src", "first");
        mapping.register_edition("src", "second");
        assert_eq!(mapping.get_edition("src"), Some("second"));
        assert_eq!(mapping.len(), 1);
    }

    #[test]
    fn save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("event-hub.json");

        let mut mapping = ContentMapping::new();
        mapping.register_event("e1", "e2");
        mapping.register_edition("ed1", "ed2");
        mapping.register_slot("s1", "s2");
        mapping.register_content_item("c1", "c2");
        mapping.register_snapshot("sn1", "sn2");
        mapping.save(&path).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["contentItems"]["c1"], "c2");

        let mut loaded = ContentMapping::new();
        assert!(loaded.load(&path));
        assert_eq!(loaded, mapping);
    }

    #[test]
    fn load_missing_or_corrupt_file_starts_fresh() {
        let dir = tempdir().unwrap();
        let mut mapping = ContentMapping::new();
        mapping.register_event("keep", "me");

        assert!(!mapping.load(&dir.path().join("absent.json")));

        let corrupt = dir.path().join("corrupt.json");
        std::fs::write(&corrupt, "{ not json").unwrap();
        assert!(!mapping.load(&corrupt));
        assert_eq!(mapping.get_event("keep"), Some("me"));
    }

    #[test]
    fn load_accepts_partial_tables() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{ "snapshots": { "old": "new" } }"#).unwrap();

        let mut mapping = ContentMapping::new();
        assert!(mapping.load(&path));
        assert_eq!(mapping.get_snapshot("old"), Some("new"));
        assert!(mapping.get_event("old").is_none());
    }
}
