//! The capability set a content hub exposes to the engine.
//!
//! The engine never talks HTTP itself. Anything implementing [`ContentHub`]
//! can be exported from or imported into; see `test_utils::MemoryHub` for an
//! in-memory implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::model::{Edition, Event, NewSnapshot, Slot, Snapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    Event,
    Edition,
    Slot,
    Snapshot,
    ContentItem,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Event => "Event",
            Self::Edition => "Edition",
            Self::Slot => "Slot",
            Self::Snapshot => "Snapshot",
            Self::ContentItem => "Content item",
        };
        f.write_str(name)
    }
}

/// Severity of an entry in a structured rejection.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum HubErrorLevel {
    Warning,
    Error,
    #[serde(other)]
    Other,
}

/// One entry of a structured rejection body (`{"errors": [...]}`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HubErrorItem {
    pub level: HubErrorLevel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

impl HubErrorItem {
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: HubErrorLevel::Warning,
            code: Some(code.into()),
            message: message.into(),
        }
    }

    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: HubErrorLevel::Error,
            code: Some(code.into()),
            message: message.into(),
        }
    }
}

impl fmt::Display for HubErrorItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.code {
            Some(code) => write!(f, "{}: {}", code, self.message),
            None => f.write_str(&self.message),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HubError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    /// The hub refused the request and explained why.
    #[error("Request rejected by hub (status {status}, {} issue(s))", .errors.len())]
    Rejected {
        status: u16,
        errors: Vec<HubErrorItem>,
    },

    /// A non-success response without a structured error body.
    #[error("Hub returned status {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected response from hub: {0}")]
    Decode(String),
}

impl HubError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// The error list of a structured rejection, if this is one.
    pub fn structured_errors(&self) -> Option<&[HubErrorItem]> {
        match self {
            Self::Rejected { errors, .. } => Some(errors),
            _ => None,
        }
    }
}

pub type HubResult<T> = std::result::Result<T, HubError>;

/// Operations on events, editions, slots, snapshots and content items.
#[async_trait]
pub trait ContentHub: Send + Sync {
    /// Identifier of the hub, used to derive the default mapping file.
    fn hub_id(&self) -> &str;

    async fn list_events(&self) -> HubResult<Vec<Event>>;
    async fn get_event(&self, id: &str) -> HubResult<Event>;
    async fn create_event(&self, event: &Event) -> HubResult<Event>;
    async fn update_event(&self, event: &Event) -> HubResult<Event>;

    async fn list_editions(&self, event_id: &str) -> HubResult<Vec<Edition>>;
    async fn get_edition(&self, id: &str) -> HubResult<Edition>;
    async fn create_edition(&self, event_id: &str, edition: &Edition) -> HubResult<Edition>;
    async fn update_edition(&self, edition: &Edition) -> HubResult<Edition>;
    async fn schedule_edition(
        &self,
        id: &str,
        ignore_warnings: bool,
        last_modified_date: Option<DateTime<Utc>>,
    ) -> HubResult<()>;
    async fn unschedule_edition(&self, id: &str) -> HubResult<()>;

    async fn list_slots(&self, edition_id: &str) -> HubResult<Vec<Slot>>;
    async fn get_slot(&self, edition_id: &str, slot_id: &str) -> HubResult<Slot>;
    /// Create a slot in an edition, anchored on an existing content item.
    async fn create_slot(&self, edition_id: &str, content_item_id: &str) -> HubResult<Slot>;
    async fn update_slot(&self, edition_id: &str, slot: &Slot) -> HubResult<Slot>;

    async fn get_snapshot(&self, id: &str) -> HubResult<Snapshot>;
    async fn create_snapshot(&self, snapshot: &NewSnapshot) -> HubResult<Snapshot>;

    async fn get_content_item(&self, id: &str) -> HubResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_error_items() {
        let items: Vec<HubErrorItem> = serde_json::from_value(json!([
            { "level": "WARNING", "code": "EDITION_CONTAINS_EMPTY_SLOTS", "message": "empty slot" },
            { "level": "ERROR", "message": "start date in the past" },
            { "level": "INFO", "message": "fyi" }
        ]))
        .unwrap();

        assert_eq!(items[0].level, HubErrorLevel::Warning);
        assert_eq!(items[0].to_string(), "EDITION_CONTAINS_EMPTY_SLOTS: empty slot");
        assert_eq!(items[1].level, HubErrorLevel::Error);
        assert_eq!(items[1].to_string(), "start date in the past");
        assert_eq!(items[2].level, HubErrorLevel::Other);
    }

    #[test]
    fn only_rejections_are_structured() {
        let rejected = HubError::Rejected {
            status: 400,
            errors: vec![HubErrorItem::warning("W", "careful")],
        };
        assert_eq!(rejected.structured_errors().map(|e| e.len()), Some(1));
        assert!(HubError::Transport("reset".into()).structured_errors().is_none());
        assert!(HubError::Http {
            status: 502,
            body: "bad gateway".into()
        }
        .structured_errors()
        .is_none());
    }
}
