//! Reconciliation of rule-based and statistical entity spans.

use std::cmp::Ordering;

use parley_core::{Entity, EntityFamily, EntitySource};

/// Merge both extractor outputs into one span-disjoint list ordered by start.
///
/// Candidates are walked by start offset, longest first. A candidate that
/// overlaps kept entities replaces them only if it beats every one of them:
/// within the temporal family the rule-based source wins, otherwise the
/// higher confidence wins and ties keep what was already kept. Empty or
/// out-of-bounds spans are dropped.
pub fn merge_entities(rule: Vec<Entity>, statistical: Vec<Entity>, char_len: usize) -> Vec<Entity> {
    let mut candidates: Vec<Entity> = rule
        .into_iter()
        .chain(statistical)
        .filter(|e| e.is_within(char_len))
        .collect();

    candidates.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then(b.len().cmp(&a.len()))
            .then(source_rank(a.source).cmp(&source_rank(b.source)))
            .then(b.confidence.total_cmp(&a.confidence))
    });

    let mut kept: Vec<Entity> = Vec::new();
    for candidate in candidates {
        let overlapping: Vec<usize> = kept
            .iter()
            .enumerate()
            .filter(|(_, k)| k.overlaps(&candidate))
            .map(|(i, _)| i)
            .collect();

        if overlapping.is_empty() {
            kept.push(candidate);
            continue;
        }
        if overlapping.iter().all(|&i| beats(&candidate, &kept[i])) {
            for i in overlapping.into_iter().rev() {
                kept.remove(i);
            }
            kept.push(candidate);
        }
    }

    kept.sort_by_key(|e| e.start);
    kept
}

fn source_rank(source: EntitySource) -> u8 {
    match source {
        EntitySource::Rule => 0,
        EntitySource::Statistical => 1,
    }
}

fn is_temporal(e: &Entity) -> bool {
    e.label.family() == EntityFamily::Temporal
}

/// Whether `challenger` should replace the already kept `incumbent`.
fn beats(challenger: &Entity, incumbent: &Entity) -> bool {
    if is_temporal(challenger) && is_temporal(incumbent) && challenger.source != incumbent.source
    {
        return challenger.source == EntitySource::Rule;
    }
    challenger.confidence.total_cmp(&incumbent.confidence) == Ordering::Greater
}
