//! Dataset merger.
//!
//! Concatenates adapter output batches into the single unfiltered collection
//! the filter engine works over. Order is preserved: records keep their
//! batch-internal order, batches keep their arrival order, so the merged
//! order is stable for the life of a session.
//!
//! No id-based deduplication is performed. Duplicate ids can only appear if
//! incremental offset bookkeeping goes wrong, so an append logs a warning
//! when it sees one instead of silently papering over the bug.

use crate::record::NormalizedRecord;
use std::collections::HashSet;
use tracing::warn;

/// Merge batches into one collection, order-preserving.
pub fn merge(batches: Vec<Vec<NormalizedRecord>>) -> Vec<NormalizedRecord> {
    let mut merged = Vec::with_capacity(batches.iter().map(Vec::len).sum());
    for batch in batches {
        append_batch(&mut merged, batch);
    }
    merged
}

/// Append one batch to an existing collection.
///
/// Previously merged records are untouched; new records go at the end.
pub fn append_batch(all: &mut Vec<NormalizedRecord>, batch: Vec<NormalizedRecord>) {
    let existing: HashSet<&str> = all.iter().map(|r| r.id.as_str()).collect();
    for record in &batch {
        if existing.contains(record.id.as_str()) {
            warn!(id = %record.id, "Duplicate record id appended to merged collection");
        }
    }
    all.extend(batch);
}

/// Whether every id in the collection is distinct.
pub fn ids_are_unique(records: &[NormalizedRecord]) -> bool {
    let mut seen = HashSet::with_capacity(records.len());
    records.iter().all(|r| seen.insert(r.id.as_str()))
}
