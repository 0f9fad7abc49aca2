//! Edition time windows and the scheduling handshake with the hub.

use chrono::{DateTime, Duration, Utc};

use crate::action_log::ActionLog;
use crate::hub::{ContentHub, HubErrorLevel, HubResult};
use crate::model::{Edition, PublishingStatus, TimeRange};

/// Slack when deciding whether a start time has already been reached.
pub const INSTANT_ALLOWANCE: Duration = Duration::seconds(5);
/// Minimum lead time before a scheduled edition may start.
pub const SCHEDULE_START_ALLOWANCE: Duration = Duration::seconds(60);
/// Minimum lead time before a scheduled edition may end.
pub const SCHEDULE_END_ALLOWANCE: Duration = Duration::seconds(120);

/// Keep `proposed` from rewinding the window of the existing resource `real`.
pub fn bound_time_range(real: &impl TimeRange, proposed: &mut impl TimeRange) {
    bound_time_range_at(real, proposed, Utc::now())
}

pub fn bound_time_range_at(real: &impl TimeRange, proposed: &mut impl TimeRange, now: DateTime<Utc>) {
    if proposed.end() < real.end() {
        proposed.set_end(real.end());
    }

    // NOTE: the "existing" start is read from the proposed range, so the
    // first comparison can never hold. Kept as is pending product input.
    let existing_start = proposed.start();
    if proposed.start() < existing_start || existing_start <= now + INSTANT_ALLOWANCE {
        proposed.set_start(real.start());
    }
}

/// Downgrade a scheduled edition that has already ended, unless catching up.
///
/// Returns true if the status was changed.
pub fn skip_schedule_if_needed(edition: &mut Edition, catchup: bool) -> bool {
    skip_schedule_if_needed_at(edition, catchup, Utc::now())
}

pub fn skip_schedule_if_needed_at(edition: &mut Edition, catchup: bool, now: DateTime<Utc>) -> bool {
    if edition.is_scheduled() && edition.end < now && !catchup {
        edition.publishing_status = PublishingStatus::Draft;
        return true;
    }
    false
}

/// Move the window of an edition about to be scheduled far enough into the future.
///
/// Applies when the edition is scheduled, or always with `force`.
pub fn prepare_edition_for_schedule(edition: &mut Edition, force: bool) {
    prepare_edition_for_schedule_at(edition, force, Utc::now())
}

pub fn prepare_edition_for_schedule_at(edition: &mut Edition, force: bool, now: DateTime<Utc>) {
    if !force && !edition.is_scheduled() {
        return;
    }

    let min_start = now + SCHEDULE_START_ALLOWANCE;
    if edition.start < min_start {
        edition.start = min_start;
    }

    let min_end = (now + SCHEDULE_END_ALLOWANCE).max(edition.start + INSTANT_ALLOWANCE);
    if edition.end < min_end {
        edition.end = min_end;
    }
}

/// Schedule an edition, retrying once with warnings ignored if the hub
/// rejects it with a structured error list.
pub async fn schedule_edition<H: ContentHub + ?Sized>(
    hub: &H,
    edition: &Edition,
    log: &mut ActionLog,
) -> HubResult<()> {
    let first = hub
        .schedule_edition(&edition.id, false, edition.last_modified_date)
        .await;

    let err = match first {
        Ok(()) => return Ok(()),
        Err(err) => err,
    };
    let Some(items) = err.structured_errors() else {
        return Err(err);
    };

    for item in items {
        match item.level {
            HubErrorLevel::Warning => {
                log.warn(format!("Scheduling edition {}: {}", edition.id, item))
            }
            HubErrorLevel::Error => {
                log.error(format!("Scheduling edition {}: {}", edition.id, item))
            }
            HubErrorLevel::Other => {
                log.comment(format!("Scheduling edition {}: {}", edition.id, item))
            }
        }
    }

    log.comment(format!(
        "Retrying schedule of edition {} with warnings ignored",
        edition.id
    ));
    hub.schedule_edition(&edition.id, true, edition.last_modified_date)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::{HubError, HubErrorItem};
    use crate::model::Event;
    use crate::test_utils::MemoryHub;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 5, day, hour, 0, 0).unwrap()
    }

    fn event(start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event {
            id: "e".into(),
            name: "e".into(),
            start,
            end,
            comment: None,
            brief: None,
        }
    }

    fn edition(status: PublishingStatus, start: DateTime<Utc>, end: DateTime<Utc>) -> Edition {
        Edition {
            id: "ed".into(),
            name: "ed".into(),
            start,
            end,
            comment: None,
            active_end_date: None,
            publishing_status: status,
            event_id: None,
            last_modified_date: None,
        }
    }

    #[test]
    fn end_never_moves_earlier() {
        let now = at(1, 0);
        let real = event(at(10, 0), at(20, 0));
        let mut proposed = event(at(12, 0), at(15, 0));
        bound_time_range_at(&real, &mut proposed, now);
        assert_eq!(proposed.end, at(20, 0));
        // future proposed start is kept
        assert_eq!(proposed.start, at(12, 0));

        let mut later = event(at(12, 0), at(25, 0));
        bound_time_range_at(&real, &mut later, now);
        assert_eq!(later.end, at(25, 0));
    }

    #[test]
    fn started_window_keeps_existing_start() {
        let now = at(15, 0);
        let real = event(at(10, 0), at(20, 0));

        let mut proposed = event(at(12, 0), at(20, 0));
        bound_time_range_at(&real, &mut proposed, now);
        assert_eq!(proposed.start, at(10, 0));

        // within the instant allowance counts as started
        let mut proposed = event(now + Duration::seconds(3), at(20, 0));
        bound_time_range_at(&real, &mut proposed, now);
        assert_eq!(proposed.start, at(10, 0));

        let mut proposed = event(at(16, 0), at(20, 0));
        bound_time_range_at(&real, &mut proposed, now);
        assert_eq!(proposed.start, at(16, 0));
    }

    #[test]
    fn ended_scheduled_edition_is_downgraded() {
        let now = at(15, 0);
        let mut ended = edition(PublishingStatus::Scheduled, at(1, 0), at(2, 0));
        assert!(skip_schedule_if_needed_at(&mut ended, false, now));
        assert_eq!(ended.publishing_status, PublishingStatus::Draft);

        let mut catchup = edition(PublishingStatus::Published, at(1, 0), at(2, 0));
        assert!(!skip_schedule_if_needed_at(&mut catchup, true, now));
        assert_eq!(catchup.publishing_status, PublishingStatus::Published);

        let mut running = edition(PublishingStatus::Scheduled, at(1, 0), at(20, 0));
        assert!(!skip_schedule_if_needed_at(&mut running, false, now));
    }

    #[test]
    fn prepare_moves_window_into_future() {
        let now = at(15, 0);

        let mut past = edition(PublishingStatus::Scheduled, at(1, 0), at(2, 0));
        prepare_edition_for_schedule_at(&mut past, false, now);
        assert_eq!(past.start, now + SCHEDULE_START_ALLOWANCE);
        assert_eq!(past.end, now + SCHEDULE_END_ALLOWANCE);

        let mut future = edition(PublishingStatus::Scheduled, at(20, 0), at(21, 0));
        prepare_edition_for_schedule_at(&mut future, false, now);
        assert_eq!(future.start, at(20, 0));
        assert_eq!(future.end, at(21, 0));

        let mut draft = edition(PublishingStatus::Draft, at(1, 0), at(2, 0));
        prepare_edition_for_schedule_at(&mut draft, false, now);
        assert_eq!(draft.start, at(1, 0));

        prepare_edition_for_schedule_at(&mut draft, true, now);
        assert_eq!(draft.start, now + SCHEDULE_START_ALLOWANCE);
        assert!(draft.end > draft.start);
    }

    fn scheduled_hub() -> (MemoryHub, Edition) {
        let hub = MemoryHub::new("dest");
        hub.insert_event(event(at(1, 0), at(30, 0)));
        let ed = edition(PublishingStatus::Draft, at(20, 0), at(21, 0));
        hub.insert_edition("e", ed.clone());
        (hub, ed)
    }

    #[tokio::test]
    async fn retries_once_ignoring_warnings() {
        let (hub, ed) = scheduled_hub();
        hub.fail_next(
            "schedule_edition",
            HubError::Rejected {
                status: 400,
                errors: vec![
                    HubErrorItem::warning("EDITION_CONTAINS_EMPTY_SLOTS", "empty slot"),
                    HubErrorItem::error("SLOT_LOCKED", "slot locked"),
                ],
            },
        );
        let mut log = ActionLog::new("test");

        schedule_edition(&hub, &ed, &mut log).await.unwrap();

        assert_eq!(
            hub.calls_to("schedule_edition"),
            vec!["schedule_edition:ed:false", "schedule_edition:ed:true"]
        );
        assert_eq!(log.warnings().len(), 1);
        assert!(log.warnings()[0].contains("EDITION_CONTAINS_EMPTY_SLOTS"));
        assert_eq!(log.errors().len(), 1);
        assert!(log.errors()[0].contains("SLOT_LOCKED"));
        assert_eq!(hub.edition("ed").unwrap().publishing_status, PublishingStatus::Scheduled);
    }

    #[tokio::test]
    async fn second_rejection_propagates() {
        let (hub, ed) = scheduled_hub();
        let rejection = HubError::Rejected {
            status: 400,
            errors: vec![HubErrorItem::warning("W", "warning")],
        };
        hub.fail_next("schedule_edition", rejection.clone());
        hub.fail_next("schedule_edition", rejection);
        let mut log = ActionLog::new("test");

        let err = schedule_edition(&hub, &ed, &mut log).await.unwrap_err();

        assert!(matches!(err, HubError::Rejected { .. }));
        assert_eq!(hub.calls_to("schedule_edition").len(), 2);
    }

    #[tokio::test]
    async fn unstructured_failure_is_not_retried() {
        let (hub, ed) = scheduled_hub();
        hub.fail_next("schedule_edition", HubError::Transport("connection reset".into()));
        let mut log = ActionLog::new("test");

        let err = schedule_edition(&hub, &ed, &mut log).await.unwrap_err();

        assert!(matches!(err, HubError::Transport(_)));
        assert_eq!(hub.calls_to("schedule_edition").len(), 1);
    }
}
