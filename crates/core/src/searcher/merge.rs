//! Merging stored and freshly found candidates by info_hash.

use std::collections::HashSet;

use crate::stream::StreamCandidate;

/// Merge `incoming` into `existing`, deduplicating by info_hash.
///
/// Existing entries always win. An incoming entry is appended only when its
/// (case-insensitive) info_hash is not present yet; duplicates inside
/// `incoming` collapse to the first occurrence. Entries without an info_hash
/// are dropped from `incoming`. Output order is not meaningful.
pub fn merge_by_info_hash(
    existing: Vec<StreamCandidate>,
    incoming: Vec<StreamCandidate>,
) -> Vec<StreamCandidate> {
    let mut seen: HashSet<String> = existing
        .iter()
        .map(|c| c.info_hash.to_lowercase())
        .collect();

    let mut merged = existing;
    for candidate in incoming {
        if !candidate.has_info_hash() {
            continue;
        }
        if seen.insert(candidate.info_hash.to_lowercase()) {
            merged.push(candidate);
        }
    }
    merged
}
