//! In-memory [`ContentHub`] for tests and dry runs.
//!
//! `MemoryHub` keeps every resource in a mutex-guarded map, records each
//! call it receives, and can be told to fail specific operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use crate::hub::{ContentHub, HubError, HubResult, ResourceKind};
use crate::model::{Edition, Event, NewSnapshot, PublishingStatus, Slot, Snapshot, SnapshotRootItem};

#[derive(Default)]
struct HubState {
    next_id: u64,
    events: BTreeMap<String, Event>,
    editions: BTreeMap<String, Edition>,
    // edition id -> slots in creation order
    slots: BTreeMap<String, Vec<Slot>>,
    snapshots: BTreeMap<String, Snapshot>,
    content_items: BTreeMap<String, Value>,
    calls: Vec<String>,
    failures: HashMap<String, VecDeque<HubError>>,
    // edition id -> remaining fetches that still report UNSCHEDULING
    unscheduling: HashMap<String, u32>,
    unschedule_delay: u32,
}

impl HubState {
    fn new_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}-{}", prefix, self.next_id)
    }

    fn call(&mut self, op: &str, args: &[&str]) -> HubResult<()> {
        let entry = if args.is_empty() {
            op.to_string()
        } else {
            format!("{}:{}", op, args.join(":"))
        };
        self.calls.push(entry);
        match self.failures.get_mut(op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

pub struct MemoryHub {
    hub_id: String,
    state: Mutex<HubState>,
}

impl MemoryHub {
    pub fn new(hub_id: impl Into<String>) -> Self {
        Self {
            hub_id: hub_id.into(),
            state: Mutex::new(HubState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, HubState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // ---------- seeding ----------

    pub fn insert_event(&self, event: Event) {
        self.state().events.insert(event.id.clone(), event);
    }

    pub fn insert_edition(&self, event_id: &str, mut edition: Edition) {
        edition.event_id = Some(event_id.to_string());
        let mut state = self.state();
        state.slots.entry(edition.id.clone()).or_default();
        state.editions.insert(edition.id.clone(), edition);
    }

    pub fn insert_slot(&self, edition_id: &str, slot: Slot) {
        self.state()
            .slots
            .entry(edition_id.to_string())
            .or_default()
            .push(slot);
    }

    pub fn insert_snapshot(&self, snapshot: Snapshot) {
        self.state().snapshots.insert(snapshot.id.clone(), snapshot);
    }

    /// Store a content item; its `id` field is the key.
    pub fn insert_content_item(&self, item: Value) {
        let id = item
            .get("id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        self.state().content_items.insert(id, item);
    }

    // ---------- behaviour ----------

    /// Make the next call to `op` (a trait method name) fail with `err`.
    /// Queued failures are consumed in order.
    pub fn fail_next(&self, op: &str, err: HubError) {
        self.state()
            .failures
            .entry(op.to_string())
            .or_default()
            .push_back(err);
    }

    /// After an unschedule, the edition reports `UNSCHEDULING` for this many fetches.
    pub fn set_unschedule_delay(&self, fetches: u32) {
        self.state().unschedule_delay = fetches;
    }

    // ---------- inspection ----------

    /// Every call received, as `op` or `op:arg:arg`.
    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Calls to `op` only.
    pub fn calls_to(&self, op: &str) -> Vec<String> {
        self.state()
            .calls
            .iter()
            .filter(|c| c.as_str() == op || c.starts_with(&format!("{}:", op)))
            .cloned()
            .collect()
    }

    /// Calls that change hub state.
    pub fn mutating_calls(&self) -> Vec<String> {
        const MUTATING: [&str; 8] = [
            "create_event",
            "update_event",
            "create_edition",
            "update_edition",
            "schedule_edition",
            "unschedule_edition",
            "create_slot",
            "update_slot",
        ];
        self.state()
            .calls
            .iter()
            .filter(|c| {
                MUTATING.contains(&c.split(':').next().unwrap_or_default())
                    || c.starts_with("create_snapshot")
            })
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    pub fn event(&self, id: &str) -> Option<Event> {
        self.state().events.get(id).cloned()
    }

    pub fn events(&self) -> Vec<Event> {
        self.state().events.values().cloned().collect()
    }

    pub fn edition(&self, id: &str) -> Option<Edition> {
        self.state().editions.get(id).cloned()
    }

    pub fn editions_of(&self, event_id: &str) -> Vec<Edition> {
        self.state()
            .editions
            .values()
            .filter(|e| e.event_id.as_deref() == Some(event_id))
            .cloned()
            .collect()
    }

    pub fn slots_of(&self, edition_id: &str) -> Vec<Slot> {
        self.state().slots.get(edition_id).cloned().unwrap_or_default()
    }

    pub fn snapshot(&self, id: &str) -> Option<Snapshot> {
        self.state().snapshots.get(id).cloned()
    }

    pub fn snapshot_count(&self) -> usize {
        self.state().snapshots.len()
    }
}

#[async_trait]
impl ContentHub for MemoryHub {
    fn hub_id(&self) -> &str {
        &self.hub_id
    }

    async fn list_events(&self) -> HubResult<Vec<Event>> {
        let mut state = self.state();
        state.call("list_events", &[])?;
        Ok(state.events.values().cloned().collect())
    }

    async fn get_event(&self, id: &str) -> HubResult<Event> {
        let mut state = self.state();
        state.call("get_event", &[id])?;
        state
            .events
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::Event, id))
    }

    async fn create_event(&self, event: &Event) -> HubResult<Event> {
        let mut state = self.state();
        state.call("create_event", &[&event.name])?;
        let mut created = event.clone();
        created.id = state.new_id("event");
        state.events.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_event(&self, event: &Event) -> HubResult<Event> {
        let mut state = self.state();
        state.call("update_event", &[&event.id])?;
        if !state.events.contains_key(&event.id) {
            return Err(HubError::not_found(ResourceKind::Event, &event.id));
        }
        state.events.insert(event.id.clone(), event.clone());
        Ok(event.clone())
    }

    async fn list_editions(&self, event_id: &str) -> HubResult<Vec<Edition>> {
        let mut state = self.state();
        state.call("list_editions", &[event_id])?;
        Ok(state
            .editions
            .values()
            .filter(|e| e.event_id.as_deref() == Some(event_id))
            .cloned()
            .collect())
    }

    async fn get_edition(&self, id: &str) -> HubResult<Edition> {
        let mut state = self.state();
        state.call("get_edition", &[id])?;

        let settled = match state.unscheduling.get_mut(id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                false
            }
            Some(_) => true,
            None => false,
        };
        if settled {
            state.unscheduling.remove(id);
            if let Some(edition) = state.editions.get_mut(id) {
                edition.publishing_status = PublishingStatus::Draft;
            }
        }

        state
            .editions
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::Edition, id))
    }

    async fn create_edition(&self, event_id: &str, edition: &Edition) -> HubResult<Edition> {
        let mut state = self.state();
        state.call("create_edition", &[event_id, &edition.name])?;
        if !state.events.contains_key(event_id) {
            return Err(HubError::not_found(ResourceKind::Event, event_id));
        }
        let mut created = edition.clone();
        created.id = state.new_id("edition");
        created.event_id = Some(event_id.to_string());
        created.publishing_status = PublishingStatus::Draft;
        created.last_modified_date = Some(Utc::now());
        state.slots.insert(created.id.clone(), Vec::new());
        state.editions.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn update_edition(&self, edition: &Edition) -> HubResult<Edition> {
        let mut state = self.state();
        state.call("update_edition", &[&edition.id])?;
        let Some(existing) = state.editions.get(&edition.id).cloned() else {
            return Err(HubError::not_found(ResourceKind::Edition, &edition.id));
        };
        let mut updated = edition.clone();
        updated.publishing_status = existing.publishing_status;
        updated.event_id = existing.event_id;
        updated.last_modified_date = Some(Utc::now());
        state.editions.insert(updated.id.clone(), updated.clone());
        Ok(updated)
    }

    async fn schedule_edition(
        &self,
        id: &str,
        ignore_warnings: bool,
        _last_modified_date: Option<DateTime<Utc>>,
    ) -> HubResult<()> {
        let mut state = self.state();
        state.call("schedule_edition", &[id, &ignore_warnings.to_string()])?;
        match state.editions.get_mut(id) {
            Some(edition) => {
                edition.publishing_status = PublishingStatus::Scheduled;
                Ok(())
            }
            None => Err(HubError::not_found(ResourceKind::Edition, id)),
        }
    }

    async fn unschedule_edition(&self, id: &str) -> HubResult<()> {
        let mut guard = self.state();
        let state = &mut *guard;
        state.call("unschedule_edition", &[id])?;
        let delay = state.unschedule_delay;
        let Some(edition) = state.editions.get_mut(id) else {
            return Err(HubError::not_found(ResourceKind::Edition, id));
        };
        if delay == 0 {
            edition.publishing_status = PublishingStatus::Draft;
        } else {
            edition.publishing_status = PublishingStatus::Unscheduling;
            state.unscheduling.insert(id.to_string(), delay);
        }
        Ok(())
    }

    async fn list_slots(&self, edition_id: &str) -> HubResult<Vec<Slot>> {
        let mut state = self.state();
        state.call("list_slots", &[edition_id])?;
        state
            .slots
            .get(edition_id)
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::Edition, edition_id))
    }

    async fn get_slot(&self, edition_id: &str, slot_id: &str) -> HubResult<Slot> {
        let mut state = self.state();
        state.call("get_slot", &[edition_id, slot_id])?;
        state
            .slots
            .get(edition_id)
            .and_then(|slots| slots.iter().find(|s| s.id == slot_id))
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::Slot, slot_id))
    }

    async fn create_slot(&self, edition_id: &str, content_item_id: &str) -> HubResult<Slot> {
        let mut state = self.state();
        state.call("create_slot", &[edition_id, content_item_id])?;
        if !state.editions.contains_key(edition_id) {
            return Err(HubError::not_found(ResourceKind::Edition, edition_id));
        }
        let content = state
            .content_items
            .get(content_item_id)
            .and_then(|item| item.get("body"))
            .cloned()
            .unwrap_or(Value::Null);
        let slot = Slot {
            id: state.new_id("slot"),
            slot_id: content_item_id.to_string(),
            content,
        };
        state
            .slots
            .entry(edition_id.to_string())
            .or_default()
            .push(slot.clone());
        Ok(slot)
    }

    async fn update_slot(&self, edition_id: &str, slot: &Slot) -> HubResult<Slot> {
        let mut state = self.state();
        state.call("update_slot", &[edition_id, &slot.id])?;
        let existing = state
            .slots
            .get_mut(edition_id)
            .and_then(|slots| slots.iter_mut().find(|s| s.id == slot.id));
        match existing {
            Some(existing) => {
                existing.content = slot.content.clone();
                Ok(existing.clone())
            }
            None => Err(HubError::not_found(ResourceKind::Slot, &slot.id)),
        }
    }

    async fn get_snapshot(&self, id: &str) -> HubResult<Snapshot> {
        let mut state = self.state();
        state.call("get_snapshot", &[id])?;
        state
            .snapshots
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::Snapshot, id))
    }

    async fn create_snapshot(&self, snapshot: &NewSnapshot) -> HubResult<Snapshot> {
        let mut state = self.state();
        state.call("create_snapshot", &[&snapshot.content_root])?;
        let created = Snapshot {
            id: state.new_id("snapshot"),
            comment: Some(snapshot.comment.clone()),
            created_from: Some(snapshot.created_from.clone()),
            kind: Some(snapshot.kind.clone()),
            content_root: Some(snapshot.content_root.clone()),
            root_content_items: vec![SnapshotRootItem {
                id: snapshot.content_root.clone(),
                rest: Default::default(),
            }],
        };
        state.snapshots.insert(created.id.clone(), created.clone());
        Ok(created)
    }

    async fn get_content_item(&self, id: &str) -> HubResult<Value> {
        let mut state = self.state();
        state.call("get_content_item", &[id])?;
        state
            .content_items
            .get(id)
            .cloned()
            .ok_or_else(|| HubError::not_found(ResourceKind::ContentItem, id))
    }
}
