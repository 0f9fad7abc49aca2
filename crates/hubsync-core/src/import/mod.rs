//! Import of an exported event tree into a destination hub.
//!
//! Events, editions and slots are matched against the destination in the
//! same order of preference: the persisted [`ContentMapping`], then (when
//! enabled) a resource with the same id, then a newly created one. Existing
//! resources are only touched when their content differs.

mod diff;
mod schedule;
mod slots;

pub use diff::{should_update_edition, should_update_event};
pub use schedule::{
    bound_time_range, bound_time_range_at, prepare_edition_for_schedule,
    prepare_edition_for_schedule_at, schedule_edition, skip_schedule_if_needed,
    skip_schedule_if_needed_at, INSTANT_ALLOWANCE, SCHEDULE_END_ALLOWANCE,
    SCHEDULE_START_ALLOWANCE,
};
pub use slots::{map_known_references, rewrite_snapshots};

use hubsync_config::ImportSettings;
use std::fmt;
use std::future::Future;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::action_log::{ActionLog, LogAction};
use crate::error::{Result, SyncError};
use crate::files::read_event_files;
use crate::hub::{ContentHub, HubResult, ResourceKind};
use crate::mapping::ContentMapping;
use crate::model::{
    Edition, EditionWithSlots, Event, EventWithEditions, PublishingStatus, Slot,
};
use crate::retry::{poll_until, PollConfig};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Mapping file loaded before and saved after the run. `None` keeps the
    /// mapping in memory only.
    pub map_file: Option<PathBuf>,
    /// Fall back to destination resources whose id equals the source id.
    pub original_ids: bool,
    /// Schedule editions that are scheduled in the source.
    pub schedule: bool,
    /// Also schedule editions whose window has already ended.
    pub catchup: bool,
    /// Backoff for waiting out `UNSCHEDULING`.
    pub poll: PollConfig,
}

impl From<&ImportSettings> for ImportOptions {
    fn from(settings: &ImportSettings) -> Self {
        Self {
            map_file: None,
            original_ids: settings.original_ids,
            schedule: settings.schedule,
            catchup: settings.catchup,
            poll: PollConfig::from(&settings.unschedule_poll),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeCounts {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

impl fmt::Display for ChangeCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} skipped",
            self.created, self.updated, self.skipped
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub events: ChangeCounts,
    pub editions: ChangeCounts,
    pub slots: ChangeCounts,
    pub snapshots_created: usize,
    pub editions_scheduled: usize,
    /// Editions left alone because they could not be unscheduled.
    pub editions_abandoned: usize,
}

impl fmt::Display for ImportSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Events: {}. Editions: {}, {} scheduled, {} abandoned. Slots: {}. Snapshots: {} created.",
            self.events,
            self.editions,
            self.editions_scheduled,
            self.editions_abandoned,
            self.slots,
            self.snapshots_created
        )
    }
}

/// Drives an import against one destination hub.
///
/// The mapping and the action log are passed through every step rather than
/// held here, so a caller can inspect both after a failed run.
pub struct Synchronizer<'a, H: ContentHub + ?Sized> {
    hub: &'a H,
    options: ImportOptions,
}

impl<'a, H: ContentHub + ?Sized> Synchronizer<'a, H> {
    pub fn new(hub: &'a H, options: ImportOptions) -> Self {
        Self { hub, options }
    }

    pub fn options(&self) -> &ImportOptions {
        &self.options
    }

    /// Import every event file in `dir`.
    ///
    /// The mapping file (if any) is saved whether or not the import succeeds,
    /// so progress made before a failure is kept for the next run.
    pub async fn import_directory(&self, dir: &Path, log: &mut ActionLog) -> Result<ImportSummary> {
        let mut mapping = ContentMapping::new();
        if let Some(path) = &self.options.map_file {
            if mapping.load(path) {
                log.comment(format!(
                    "Loaded mapping from {} ({} entries)",
                    path.display(),
                    mapping.len()
                ));
            } else {
                log.comment(format!("Starting with an empty mapping for {}", path.display()));
            }
        }

        let result = self.import_from(dir, &mut mapping, log).await;
        if let Err(err) = &result {
            log.error(format!("Import failed: {}", err));
        }

        if let Some(path) = &self.options.map_file {
            match mapping.save(path) {
                Ok(()) => log.comment(format!("Saved mapping to {}", path.display())),
                Err(err) => {
                    log.error(format!("Could not save mapping: {}", err));
                    if result.is_ok() {
                        return Err(err);
                    }
                }
            }
        }

        result
    }

    async fn import_from(
        &self,
        dir: &Path,
        mapping: &mut ContentMapping,
        log: &mut ActionLog,
    ) -> Result<ImportSummary> {
        let files = read_event_files(dir)?;
        log.comment(format!(
            "Importing {} event file(s) from {}",
            files.len(),
            dir.display()
        ));
        let events = files.into_iter().map(|(_, event)| event).collect();
        self.import_events(events, mapping, log).await
    }

    /// Import `events` in order. The first error aborts the batch.
    pub async fn import_events(
        &self,
        events: Vec<EventWithEditions>,
        mapping: &mut ContentMapping,
        log: &mut ActionLog,
    ) -> Result<ImportSummary> {
        let mut summary = ImportSummary::default();
        for event in events {
            self.import_event(event, mapping, log, &mut summary).await?;
        }
        log.comment(summary.to_string());
        Ok(summary)
    }

    async fn import_event(
        &self,
        event: EventWithEditions,
        mapping: &mut ContentMapping,
        log: &mut ActionLog,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let EventWithEditions {
            event: source,
            mut editions,
        } = event;
        info!("Importing event '{}' ({})", source.name, source.id);

        let hub = self.hub;
        let existing = self
            .resolve(ResourceKind::Event, &source.id, mapping, log, move |id| async move {
                hub.get_event(&id).await
            })
            .await;

        let dest = match existing {
            None => {
                let created = self.hub.create_event(&source).await?;
                mapping.register_event(&source.id, &created.id);
                log.add_action(LogAction::EventCreate, &[&source.id, &created.id]);
                summary.events.created += 1;
                created
            }
            Some(real) => {
                mapping.register_event(&source.id, &real.id);
                self.update_event(&real, &source, log, summary).await?
            }
        };

        editions.sort_by_key(|e| e.edition.end);
        for edition in editions {
            self.import_edition(&dest, edition, mapping, log, summary)
                .await?;
        }
        Ok(())
    }

    async fn update_event(
        &self,
        real: &Event,
        source: &Event,
        log: &mut ActionLog,
        summary: &mut ImportSummary,
    ) -> Result<Event> {
        if !should_update_event(real, source) {
            debug!("Event {} unchanged", real.id);
            summary.events.skipped += 1;
            return Ok(real.clone());
        }

        let mut proposed = source.clone();
        proposed.id = real.id.clone();
        bound_time_range(real, &mut proposed);
        let updated = self.hub.update_event(&proposed).await?;
        log.add_action(LogAction::EventUpdate, &[&source.id, &updated.id]);
        summary.events.updated += 1;
        Ok(updated)
    }

    async fn import_edition(
        &self,
        dest_event: &Event,
        edition: EditionWithSlots,
        mapping: &mut ContentMapping,
        log: &mut ActionLog,
        summary: &mut ImportSummary,
    ) -> Result<()> {
        let EditionWithSlots {
            edition: mut source,
            slots,
        } = edition;

        if !self.options.schedule && source.is_scheduled() {
            source.publishing_status = PublishingStatus::Draft;
        }
        if skip_schedule_if_needed(&mut source, self.options.catchup) {
            log.comment(format!(
                "Edition {} ended at {}, it will not be scheduled",
                source.id, source.end
            ));
        }
        let wants_schedule = source.is_scheduled();

        let hub = self.hub;
        let existing = self
            .resolve(ResourceKind::Edition, &source.id, mapping, log, move |id| async move {
                hub.get_edition(&id).await
            })
            .await;

        let dest = match existing {
            None => {
                let mut proposed = source.clone();
                prepare_edition_for_schedule(&mut proposed, false);
                let created = self.hub.create_edition(&dest_event.id, &proposed).await?;
                mapping.register_edition(&source.id, &created.id);
                log.add_action(LogAction::EditionCreate, &[&source.id, &created.id]);
                summary.editions.created += 1;
                created
            }
            Some(real) => {
                mapping.register_edition(&source.id, &real.id);
                let real_slots = self.hub.list_slots(&real.id).await?;
                let schedule_required = wants_schedule && !real.is_scheduled();
                if !schedule_required
                    && !should_update_edition(&real, &real_slots, &source, &slots, mapping)
                {
                    debug!("Edition {} unchanged", real.id);
                    summary.editions.skipped += 1;
                    return Ok(());
                }

                let status = real.publishing_status;
                let real = if status.is_pending_publish() || status == PublishingStatus::Unscheduling {
                    match self.unschedule(&real, log).await {
                        Some(settled) => settled,
                        None => {
                            summary.editions_abandoned += 1;
                            return Ok(());
                        }
                    }
                } else if status.is_scheduled() {
                    log.comment(format!(
                        "Edition {} is {:?} and can no longer change, skipped",
                        real.id, status
                    ));
                    summary.editions.skipped += 1;
                    return Ok(());
                } else {
                    real
                };

                let mut proposed = source.clone();
                proposed.id = real.id.clone();
                proposed.event_id = real.event_id.clone();
                proposed.last_modified_date = real.last_modified_date;
                bound_time_range(&real, &mut proposed);
                prepare_edition_for_schedule(&mut proposed, false);
                let updated = self.hub.update_edition(&proposed).await?;
                log.add_action(LogAction::EditionUpdate, &[&source.id, &updated.id]);
                summary.editions.updated += 1;
                updated
            }
        };

        let created_snapshots = self
            .import_slots(&dest.id, slots, mapping, log, summary)
            .await?;

        if wants_schedule && !dest.is_scheduled() {
            let mut current = self.hub.get_edition(&dest.id).await?;
            if created_snapshots {
                let mut moved = current.clone();
                prepare_edition_for_schedule(&mut moved, true);
                if moved.start != current.start {
                    current = self.hub.update_edition(&moved).await?;
                    log.add_action(LogAction::EditionUpdate, &[&source.id, &current.id]);
                }
            }
            schedule_edition(self.hub, &current, log).await?;
            log.comment(format!("Scheduled edition {}", current.id));
            summary.editions_scheduled += 1;
        }
        Ok(())
    }

    /// Returns true if rewriting slot bodies created any snapshot.
    async fn import_slots(
        &self,
        dest_edition_id: &str,
        slots: Vec<Slot>,
        mapping: &mut ContentMapping,
        log: &mut ActionLog,
        summary: &mut ImportSummary,
    ) -> Result<bool> {
        let mut created_snapshots = false;

        for source in slots {
            let hub = self.hub;
            let edition_id = dest_edition_id.to_string();
            let existing = self
                .resolve(ResourceKind::Slot, &source.id, mapping, log, move |id| {
                    let edition_id = edition_id.clone();
                    async move { hub.get_slot(&edition_id, &id).await }
                })
                .await;

            let (mut dest, created) = match existing {
                Some(slot) => {
                    mapping.register_slot(&source.id, &slot.id);
                    (slot, false)
                }
                None => {
                    let anchor = mapping
                        .get_content_item(&source.slot_id)
                        .unwrap_or(source.slot_id.as_str())
                        .to_string();
                    let slot = self.hub.create_slot(dest_edition_id, &anchor).await?;
                    mapping.register_slot(&source.id, &slot.id);
                    log.add_action(LogAction::SlotCreate, &[&source.id, &slot.id]);
                    summary.slots.created += 1;
                    (slot, true)
                }
            };

            let mut content = source.content;
            let before = mapping.len();
            if rewrite_snapshots(&mut content, mapping, self.hub, log).await? {
                created_snapshots = true;
                summary.snapshots_created += mapping.len() - before;
            }

            if !created && dest.content == content {
                debug!("Slot {} unchanged", dest.id);
                summary.slots.skipped += 1;
                continue;
            }

            dest.content = content;
            self.hub.update_slot(dest_edition_id, &dest).await?;
            if !created {
                log.add_action(LogAction::SlotUpdate, &[&source.id, &dest.id]);
                summary.slots.updated += 1;
            }
        }

        Ok(created_snapshots)
    }

    /// Unschedule `edition` and wait for the hub to settle.
    ///
    /// Returns the settled edition, or `None` (after logging) if the edition
    /// must be left alone.
    async fn unschedule(&self, edition: &Edition, log: &mut ActionLog) -> Option<Edition> {
        if edition.publishing_status != PublishingStatus::Unscheduling {
            if let Err(err) = self.hub.unschedule_edition(&edition.id).await {
                log.warn(format!(
                    "Failed to unschedule edition {}, update abandoned: {}",
                    edition.id, err
                ));
                return None;
            }
            log.comment(format!("Unscheduled edition {}", edition.id));
        }

        let hub = self.hub;
        let id = edition.id.as_str();
        let polled = poll_until(
            &format!("unschedule {}", id),
            &self.options.poll,
            || hub.get_edition(id),
            |e: &Edition| e.publishing_status != PublishingStatus::Unscheduling,
        )
        .await;

        match polled {
            Ok(Some(settled)) => Some(settled),
            Ok(None) => {
                let err = SyncError::UnscheduleTimeout {
                    edition_id: edition.id.clone(),
                    attempts: self.options.poll.max_attempts,
                };
                log.warn(format!("{}, update abandoned", err));
                None
            }
            Err(err) => {
                log.warn(format!(
                    "Failed to refetch edition {} after unscheduling, update abandoned: {}",
                    id, err
                ));
                None
            }
        }
    }

    /// Find the destination counterpart of a source resource, if any.
    async fn resolve<T, F, Fut>(
        &self,
        kind: ResourceKind,
        source_id: &str,
        mapping: &ContentMapping,
        log: &mut ActionLog,
        fetch: F,
    ) -> Option<T>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = HubResult<T>>,
    {
        if let Some(dest_id) = mapping.get(kind, source_id) {
            match fetch(dest_id.to_string()).await {
                Ok(found) => return Some(found),
                Err(err) => log.warn(format!(
                    "Mapped {} {} for source {} could not be fetched: {}",
                    kind, dest_id, source_id, err
                )),
            }
        }

        if self.options.original_ids {
            match fetch(source_id.to_string()).await {
                Ok(found) => {
                    debug!("Found {} {} by its original id", kind, source_id);
                    return Some(found);
                }
                Err(err) => debug!("No {} with original id {}: {}", kind, source_id, err),
            }
        }

        None
    }
}
