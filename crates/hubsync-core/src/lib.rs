//! Event, edition and slot synchronization engine for hubsync.
//!
//! This crate moves scheduled content between two installations of a
//! content hub. Events contain editions, editions contain slots, and slot
//! bodies embed references to content snapshots. The engine:
//!
//! - **Re-identifies resources** across the two hubs through a persisted
//!   [`ContentMapping`], so repeated runs only touch what changed.
//! - **Rewrites embedded references** found by the [`DependencyScanner`],
//!   creating destination snapshots on demand.
//! - **Drives edition scheduling** (unschedule, update, reschedule) while
//!   tolerating partial failures.
//!
//! # Usage
//!
//! ```ignore
//! use hubsync_core::{export::{export_events, ExportOptions}, import::{ImportOptions, Synchronizer}};
//!
//! // Source side
//! export_events(&source_hub, &out_dir, &ExportOptions::default(), &mut log).await?;
//!
//! // Destination side
//! let sync = Synchronizer::new(&dest_hub, ImportOptions::default());
//! let summary = sync.import_directory(&out_dir, &mut log).await?;
//! ```

pub mod action_log;
pub mod dependency;
pub mod error;
pub mod export;
pub mod files;
pub mod hub;
pub mod import;
pub mod mapping;
pub mod model;
pub mod retry;
pub mod test_utils;

pub use action_log::{ActionLog, LogAction, LogEntry};
pub use dependency::{ContentDependency, DependencyKind, DependencyScanner};
pub use error::{Result, SyncError};
pub use export::{ExportOptions, ExportSummary};
pub use hub::{ContentHub, HubError, HubErrorItem, HubErrorLevel, HubResult, ResourceKind};
pub use import::{ImportOptions, ImportSummary, Synchronizer};
pub use mapping::ContentMapping;
pub use model::{
    Edition, EditionWithSlots, Event, EventWithEditions, NewSnapshot, PublishingStatus, Slot,
    Snapshot, SnapshotExport, SnapshotRootItem, TimeRange,
};
pub use retry::PollConfig;
