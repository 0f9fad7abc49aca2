//! Slot bodies and the snapshot references embedded in them.

use serde_json::Value;

use crate::action_log::{ActionLog, LogAction};
use crate::dependency::DependencyScanner;
use crate::error::Result;
use crate::hub::ContentHub;
use crate::mapping::ContentMapping;
use crate::model::NewSnapshot;

/// Point every snapshot reference in `content` at a destination snapshot.
///
/// Unmapped snapshots are created on the destination from the (mapped) root
/// content item and recorded in `mapping`. Returns true if any snapshot was
/// created.
pub async fn rewrite_snapshots<H: ContentHub + ?Sized>(
    content: &mut Value,
    mapping: &mut ContentMapping,
    hub: &H,
    log: &mut ActionLog,
) -> Result<bool> {
    let mut created_any = false;

    for mut dependency in DependencyScanner::scan(content) {
        let Some(source_snapshot) = dependency.id.clone() else {
            log.warn(format!(
                "Reference at '{}' has no id, left unchanged",
                dependency.pointer
            ));
            continue;
        };
        let Some(source_item) = dependency.root_content_item_id.clone() else {
            log.warn(format!(
                "Reference to snapshot {} at '{}' has no root content item, left unchanged",
                source_snapshot, dependency.pointer
            ));
            continue;
        };

        let dest_item = mapping
            .get_content_item(&source_item)
            .unwrap_or(source_item.as_str())
            .to_string();

        let dest_snapshot = match mapping.get_snapshot(&source_snapshot) {
            Some(existing) => existing.to_string(),
            None => {
                let created = hub
                    .create_snapshot(&NewSnapshot::generated_for(dest_item.as_str()))
                    .await?;
                mapping.register_snapshot(&source_snapshot, &created.id);
                log.add_action(LogAction::SnapshotCreate, &[&source_snapshot, &created.id]);
                created_any = true;
                created.id
            }
        };

        dependency.set_id(content, &dest_snapshot);
        dependency.set_root_content_item_id(content, &dest_item);
    }

    Ok(created_any)
}

/// `content` with every reference already known to `mapping` substituted.
///
/// Creates nothing. Used to compare a source slot body against what the
/// destination currently holds.
pub fn map_known_references(content: &Value, mapping: &ContentMapping) -> Value {
    let mut mapped = content.clone();
    for mut dependency in DependencyScanner::scan(content) {
        if let Some(dest) = dependency.id.as_deref().and_then(|id| mapping.get_snapshot(id)) {
            let dest = dest.to_string();
            dependency.set_id(&mut mapped, &dest);
        }
        if let Some(dest) = dependency
            .root_content_item_id
            .as_deref()
            .and_then(|id| mapping.get_content_item(id))
        {
            let dest = dest.to_string();
            dependency.set_root_content_item_id(&mut mapped, &dest);
        }
    }
    mapped
}
