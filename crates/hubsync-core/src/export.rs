//! Export of events, with their editions and slots, from a source hub.
//!
//! Partial failures never abort an export: an event whose editions cannot be
//! listed, an edition whose slots cannot be listed, or a snapshot that cannot
//! be fetched is logged and left out. Only listing the events themselves and
//! writing event files are fatal.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::action_log::ActionLog;
use crate::dependency::DependencyScanner;
use crate::error::Result;
use crate::files::{sanitize_file_stem, unique_file_name, write_json, SNAPSHOT_DIR};
use crate::hub::ContentHub;
use crate::model::{
    Edition, EditionWithSlots, Event, EventWithEditions, Slot, SnapshotExport, TimeRange,
};

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// Export only this event.
    pub id: Option<String>,
    /// Also export every snapshot referenced from slot content.
    pub snapshots: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub events: usize,
    pub editions: usize,
    pub slots: usize,
    pub snapshots: usize,
    pub files: Vec<PathBuf>,
}

/// Keep the items whose window intersects `[from, to]`. Either bound may be open.
pub fn filter_events<T: TimeRange>(
    events: Vec<T>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Vec<T> {
    events
        .into_iter()
        .filter(|event| {
            let ends_before = from.is_some_and(|from| event.end() < from);
            let starts_after = to.is_some_and(|to| event.start() > to);
            !ends_before && !starts_after
        })
        .collect()
}

/// Attach slots to each edition. Editions whose slots cannot be listed are dropped.
pub async fn enrich_editions<H: ContentHub + ?Sized>(
    hub: &H,
    editions: Vec<Edition>,
    log: &mut ActionLog,
) -> Vec<EditionWithSlots> {
    let mut enriched = Vec::with_capacity(editions.len());
    for edition in editions {
        match hub.list_slots(&edition.id).await {
            Ok(slots) => enriched.push(EditionWithSlots { edition, slots }),
            Err(err) => log.warn(format!(
                "Could not list slots of edition {}, edition omitted: {}",
                edition.id, err
            )),
        }
    }
    enriched
}

/// Attach editions (with slots) to each event. Events whose editions cannot
/// be listed are dropped.
pub async fn enrich_events<H: ContentHub + ?Sized>(
    hub: &H,
    events: Vec<Event>,
    log: &mut ActionLog,
) -> Vec<EventWithEditions> {
    let mut enriched = Vec::with_capacity(events.len());
    for event in events {
        let editions = match hub.list_editions(&event.id).await {
            Ok(editions) => editions,
            Err(err) => {
                log.warn(format!(
                    "Could not list editions of event {}, event omitted: {}",
                    event.id, err
                ));
                continue;
            }
        };
        let editions = enrich_editions(hub, editions, log).await;
        enriched.push(EventWithEditions { event, editions });
    }
    enriched
}

/// Add the id of every snapshot referenced from `slots` to `found`.
pub fn locate_snapshots(slots: &[Slot], found: &mut BTreeSet<String>) {
    for slot in slots {
        for dependency in DependencyScanner::scan(&slot.content) {
            if let Some(id) = dependency.id {
                found.insert(id);
            }
        }
    }
}

/// Write one file per snapshot under `<out_dir>/snapshots/`.
///
/// Returns the number of snapshots written; failures are logged and skipped.
pub async fn export_snapshots<H: ContentHub + ?Sized>(
    hub: &H,
    out_dir: &Path,
    ids: &BTreeSet<String>,
    log: &mut ActionLog,
) -> usize {
    let mut written = 0;
    let mut taken = HashSet::new();
    for id in ids {
        match export_snapshot(hub, out_dir, id, &mut taken).await {
            Ok(path) => {
                debug!("Wrote snapshot {} to {}", id, path.display());
                written += 1;
            }
            Err(err) => log.warn(format!("Snapshot {} skipped: {}", id, err)),
        }
    }
    written
}

async fn export_snapshot<H: ContentHub + ?Sized>(
    hub: &H,
    out_dir: &Path,
    id: &str,
    taken: &mut HashSet<String>,
) -> Result<PathBuf> {
    let snapshot = hub.get_snapshot(id).await?;

    let mut content_items = Vec::with_capacity(snapshot.root_content_items.len());
    for root in &snapshot.root_content_items {
        let item = hub.get_content_item(&root.id).await?;
        let nested = DependencyScanner::scan(&item);
        if !nested.is_empty() {
            debug!(
                "Content item {} of snapshot {} references {} further item(s), not followed",
                root.id,
                id,
                nested.len()
            );
        }
        content_items.push(item);
    }

    let file_name = unique_file_name(taken, id);
    if file_name != format!("{}.json", sanitize_file_stem(id)) {
        debug!("Snapshot {} collides with an earlier file name, using {}", id, file_name);
    }
    let path = out_dir.join(SNAPSHOT_DIR).join(file_name);
    write_json(
        &path,
        &SnapshotExport {
            snapshot,
            content_items,
        },
    )?;
    Ok(path)
}

/// Export events from `hub` into `out_dir`, one file per event.
pub async fn export_events<H: ContentHub + ?Sized>(
    hub: &H,
    out_dir: &Path,
    options: &ExportOptions,
    log: &mut ActionLog,
) -> Result<ExportSummary> {
    let events = match &options.id {
        Some(id) => vec![hub.get_event(id).await?],
        None => hub.list_events().await?,
    };
    let listed = events.len();
    let events = filter_events(events, options.from, options.to);
    log.comment(format!(
        "Exporting {} of {} event(s) from hub {}",
        events.len(),
        listed,
        hub.hub_id()
    ));

    let enriched = enrich_events(hub, events, log).await;

    let mut summary = ExportSummary::default();
    let mut taken = HashSet::new();
    let mut snapshot_ids = BTreeSet::new();
    for event in &enriched {
        let path = out_dir.join(unique_file_name(&mut taken, &event.event.name));
        write_json(&path, event)?;
        info!("Exported event '{}' to {}", event.event.name, path.display());

        summary.events += 1;
        summary.editions += event.editions.len();
        for edition in &event.editions {
            summary.slots += edition.slots.len();
            if options.snapshots {
                locate_snapshots(&edition.slots, &mut snapshot_ids);
            }
        }
        summary.files.push(path);
    }

    if options.snapshots {
        log.comment(format!("Exporting {} snapshot(s)", snapshot_ids.len()));
        summary.snapshots = export_snapshots(hub, out_dir, &snapshot_ids, log).await;
    }

    log.comment(format!(
        "Exported {} event(s), {} edition(s), {} slot(s), {} snapshot(s)",
        summary.events, summary.editions, summary.slots, summary.snapshots
    ));
    Ok(summary)
}
