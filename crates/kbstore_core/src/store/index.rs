//! `index.json` load/save.
//!
//! The index is a rebuildable cache of record summaries. A missing or broken
//! index loads as empty; it is never a hard failure.

use super::document::{read_document, write_document, DocumentRead};
use super::{StoreLayout, StoreResult};
use crate::model::knowledge_base::KbSummary;
use log::warn;

/// Loads index entries in stored order.
///
/// Items that are not objects with a non-empty `id` are skipped. Entries
/// without a name get the id as name.
pub fn load_index(layout: &StoreLayout) -> Vec<KbSummary> {
    let items = match read_document::<serde_json::Value>(&layout.index_path()) {
        DocumentRead::Missing => return Vec::new(),
        DocumentRead::Malformed(reason) => {
            warn!("event=index_load module=store status=error error={reason}");
            return Vec::new();
        }
        DocumentRead::Loaded(serde_json::Value::Array(items)) => items,
        DocumentRead::Loaded(_) => {
            warn!("event=index_load module=store status=error error=not_an_array");
            return Vec::new();
        }
    };

    let mut entries = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value::<KbSummary>(item) {
            Ok(mut entry) if !entry.id.is_empty() => {
                if entry.name.is_empty() {
                    entry.name = entry.id.clone();
                }
                entries.push(entry);
            }
            Ok(_) => {
                warn!("event=index_entry_skip module=store position={position} error=empty_id");
            }
            Err(err) => {
                warn!("event=index_entry_skip module=store position={position} error={err}");
            }
        }
    }
    entries
}

/// Overwrites the index with `entries`, creating the storage root if needed.
pub fn save_index(layout: &StoreLayout, entries: &[KbSummary]) -> StoreResult<()> {
    layout.ensure_root()?;
    write_document(&layout.index_path(), entries)
}
