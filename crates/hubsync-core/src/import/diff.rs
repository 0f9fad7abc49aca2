//! Change detection between a source resource and its destination copy.

use crate::mapping::ContentMapping;
use crate::model::{Edition, Event, Slot};

use super::slots::map_known_references;

pub fn should_update_event(real: &Event, source: &Event) -> bool {
    real.name != source.name
        || real.brief != source.brief
        || real.comment != source.comment
        || real.start != source.start
        || real.end != source.end
}

/// True if the edition's fields or any slot body differ.
///
/// Slot bodies are compared after substituting every reference the mapping
/// already knows, so an unchanged body is not reported as changed merely
/// because its ids are source-side.
pub fn should_update_edition(
    real: &Edition,
    real_slots: &[Slot],
    source: &Edition,
    source_slots: &[Slot],
    mapping: &ContentMapping,
) -> bool {
    if real.name != source.name
        || real.comment != source.comment
        || real.start != source.start
        || real.end != source.end
        || real.active_end_date != source.active_end_date
    {
        return true;
    }

    if real_slots.len() != source_slots.len() {
        return true;
    }

    source_slots.iter().any(|source_slot| {
        let dest_id = mapping.get_slot(&source_slot.id);
        let counterpart = dest_id.and_then(|id| real_slots.iter().find(|s| s.id == id));
        match counterpart {
            Some(dest) => dest.content != map_known_references(&source_slot.content, mapping),
            None => true,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::CONTENT_REFERENCE_SCHEMA;
    use crate::model::PublishingStatus;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    fn event() -> Event {
        Event {
            id: "e".into(),
            name: "Summer".into(),
            start: Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2030, 7, 1, 0, 0, 0).unwrap(),
            comment: None,
            brief: Some("brief".into()),
        }
    }

    fn edition() -> Edition {
        Edition {
            id: "ed".into(),
            name: "Week 1".into(),
            start: Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2030, 6, 8, 0, 0, 0).unwrap(),
            comment: None,
            active_end_date: Some(false),
            publishing_status: PublishingStatus::Draft,
            event_id: None,
            last_modified_date: None,
        }
    }

    fn slot(id: &str, snapshot: &str) -> Slot {
        Slot {
            id: id.into(),
            slot_id: "item".into(),
            content: json!({
                "hero": {
                    "_meta": { "schema": CONTENT_REFERENCE_SCHEMA, "rootContentItemId": "item" },
                    "id": snapshot
                }
            }),
        }
    }

    #[test]
    fn event_fields() {
        let real = event();
        assert!(!should_update_event(&real, &event()));

        let mut renamed = event();
        renamed.id = "other-hub-id".into();
        assert!(!should_update_event(&real, &renamed));
        renamed.name = "Winter".into();
        assert!(should_update_event(&real, &renamed));

        let mut brief = event();
        brief.brief = None;
        assert!(should_update_event(&real, &brief));
    }

    #[test]
    fn edition_fields() {
        let mapping = ContentMapping::new();
        let real = edition();
        assert!(!should_update_edition(&real, &[], &edition(), &[], &mapping));

        let mut status_only = edition();
        status_only.publishing_status = PublishingStatus::Scheduled;
        assert!(!should_update_edition(&real, &[], &status_only, &[], &mapping));

        let mut ends_later = edition();
        ends_later.active_end_date = Some(true);
        assert!(should_update_edition(&real, &[], &ends_later, &[], &mapping));
    }

    #[test]
    fn slots_compare_after_mapping() {
        let mut mapping = ContentMapping::new();
        mapping.register_slot("src-slot", "dst-slot");
        mapping.register_snapshot("src-snap", "dst-snap");

        let source = [slot("src-slot", "src-snap")];
        let synced = [slot("dst-slot", "dst-snap")];
        assert!(!should_update_edition(&edition(), &synced, &edition(), &source, &mapping));

        let stale = [slot("dst-slot", "old-snap")];
        assert!(should_update_edition(&edition(), &stale, &edition(), &source, &mapping));

        // unmapped source slot
        let mut fresh = ContentMapping::new();
        fresh.register_snapshot("src-snap", "dst-snap");
        assert!(should_update_edition(&edition(), &synced, &edition(), &source, &fresh));

        assert!(should_update_edition(&edition(), &[], &edition(), &source, &mapping));
    }
}
