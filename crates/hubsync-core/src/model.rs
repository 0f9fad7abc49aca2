//! Hub resources as they are exchanged with the hub and written to disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Publishing state of an edition.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublishingStatus {
    #[default]
    Draft,
    Scheduled,
    Scheduling,
    Published,
    Publishing,
    /// Transient; only entered when this engine unschedules an edition.
    Unscheduling,
}

impl PublishingStatus {
    /// True for every state past `DRAFT` except `UNSCHEDULING`.
    pub fn is_scheduled(self) -> bool {
        matches!(
            self,
            Self::Published | Self::Publishing | Self::Scheduling | Self::Scheduled
        )
    }

    /// Scheduled but not yet publishing, so it can still be unscheduled.
    pub fn is_pending_publish(self) -> bool {
        matches!(self, Self::Scheduled | Self::Scheduling)
    }
}

/// Anything with a start/end window.
pub trait TimeRange {
    fn start(&self) -> DateTime<Utc>;
    fn end(&self) -> DateTime<Utc>;
    fn set_start(&mut self, start: DateTime<Utc>);
    fn set_end(&mut self, end: DateTime<Utc>);
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brief: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Edition {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_end_date: Option<bool>,
    #[serde(default)]
    pub publishing_status: PublishingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_date: Option<DateTime<Utc>>,
}

impl Edition {
    pub fn is_scheduled(&self) -> bool {
        self.publishing_status.is_scheduled()
    }
}

macro_rules! impl_time_range {
    ($ty:ty) => {
        impl TimeRange for $ty {
            fn start(&self) -> DateTime<Utc> {
                self.start
            }
            fn end(&self) -> DateTime<Utc> {
                self.end
            }
            fn set_start(&mut self, start: DateTime<Utc>) {
                self.start = start;
            }
            fn set_end(&mut self, end: DateTime<Utc>) {
                self.end = end;
            }
        }
    };
}

impl_time_range!(Event);
impl_time_range!(Edition);

/// A slot of an edition. `slot_id` is the content item the slot was created from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slot_id: String,
    #[serde(default)]
    pub content: Value,
}

/// Edition enriched with its slots, as exported.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EditionWithSlots {
    #[serde(flatten)]
    pub edition: Edition,
    #[serde(default)]
    pub slots: Vec<Slot>,
}

/// Event enriched with its editions, as exported. One of these per event file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EventWithEditions {
    #[serde(flatten)]
    pub event: Event,
    #[serde(default)]
    pub editions: Vec<EditionWithSlots>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRootItem {
    pub id: String,
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<String>,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_root: Option<String>,
    #[serde(default)]
    pub root_content_items: Vec<SnapshotRootItem>,
}

/// Request body for creating a snapshot of a content item subtree.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewSnapshot {
    pub comment: String,
    pub created_from: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub content_root: String,
}

impl NewSnapshot {
    /// A generated snapshot rooted at `content_item_id`.
    pub fn generated_for(content_item_id: impl Into<String>) -> Self {
        Self {
            comment: String::new(),
            created_from: "content-item".to_string(),
            kind: "GENERATED".to_string(),
            content_root: content_item_id.into(),
        }
    }
}

/// Snapshot file written by the exporter under `snapshots/`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotExport {
    #[serde(flatten)]
    pub snapshot: Snapshot,
    #[serde(default)]
    pub content_items: Vec<Value>,
}
