//! Snapshot diffing.

use super::events::{push_unique, ChangeEvent, MutationSets};
use crate::query::FetchRequest;
use crate::snapshot::ResultSnapshot;
use crate::types::Item;

/// Compute the ordered change events between two snapshots.
///
/// Events are produced in a fixed order: section deletes, section inserts, row
/// deletes, row inserts, then moves and updates. Moves and updates are only
/// reported when the transaction produced no row inserts or deletes, since an
/// insert or delete already implies a shift of every later row.
///
/// Updated items are reclassified against both snapshots first:
/// - absent from `new`: becomes a delete if it still satisfies the predicate
/// - absent from `old`: becomes an insert if it satisfies the predicate
/// - present in both and satisfying the predicate: a move when one of its
///   changed keys is a sort key, otherwise an update
/// - present in both but failing the predicate: dropped without an event
pub fn diff_snapshots(
    old: &ResultSnapshot,
    new: &ResultSnapshot,
    mutations: MutationSets,
    request: &FetchRequest,
) -> Vec<ChangeEvent> {
    let MutationSets {
        mut inserted,
        updated: candidates,
        mut deleted,
    } = mutations;
    let mut events = Vec::new();

    for (index, section) in old.sections().iter().enumerate() {
        if new.section_index(section.name()).is_none() {
            events.push(ChangeEvent::SectionDelete {
                section: section.clone(),
                index,
            });
        }
    }

    for (index, section) in new.sections().iter().enumerate() {
        if old.section_index(section.name()).is_none() {
            events.push(ChangeEvent::SectionInsert {
                section: section.clone(),
                index,
            });
        }
    }

    let mut updated = Vec::new();
    let mut moved = Vec::new();
    for item in candidates {
        let in_old = old.index_path_for(&item).is_some();
        let in_new = new.index_path_for(&item).is_some();
        let satisfies = request.evaluate_predicate(&item);

        if !in_new {
            if satisfies {
                push_unique(&mut deleted, item);
            } else {
                log_dropped(&item, in_old, in_new);
            }
        } else if !in_old {
            if satisfies {
                push_unique(&mut inserted, item);
            } else {
                log_dropped(&item, in_old, in_new);
            }
        } else if !satisfies {
            log_dropped(&item, in_old, in_new);
        } else if request.sorts_by_any(&item.changed_keys) {
            moved.push(item);
        } else {
            updated.push(item);
        }
    }

    for item in &deleted {
        if let Some(old_path) = old.index_path_for(item) {
            events.push(ChangeEvent::RowDelete {
                item: item.clone(),
                old_path,
            });
        }
    }

    for item in &inserted {
        if let Some(new_path) = new.index_path_for(item) {
            events.push(ChangeEvent::RowInsert {
                item: item.clone(),
                new_path,
            });
        }
    }

    if inserted.is_empty() && deleted.is_empty() {
        for item in moved {
            let old_path = old.index_path_for(&item);
            let new_path = new.index_path_for(&item);
            events.push(ChangeEvent::RowMove {
                item,
                old_path,
                new_path,
            });
        }

        for item in updated {
            if let Some(path) = new.index_path_for(&item) {
                events.push(ChangeEvent::RowUpdate { item, path });
            }
        }
    }

    events
}

fn log_dropped(item: &Item, in_old: bool, in_new: bool) {
    tracing::debug!(
        target: "fetched_results::diff",
        id = %item.id,
        in_old,
        in_new,
        "updated item fails the predicate; dropped from tracking without an event"
    );
}
