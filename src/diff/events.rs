//! Change events and the mutation sets that drive them.

use crate::snapshot::Section;
use crate::types::{ChangeKind, IndexPath, Item, ItemId};
use serde::{Deserialize, Serialize};

/// One structural or content change between two snapshots.
///
/// Section indices and old index paths refer to the old snapshot; inserts and
/// new index paths refer to the new one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    SectionInsert {
        section: Section,
        index: usize,
    },
    SectionDelete {
        section: Section,
        index: usize,
    },
    RowInsert {
        item: Item,
        new_path: IndexPath,
    },
    RowDelete {
        item: Item,
        old_path: IndexPath,
    },
    /// Either endpoint may be absent when it could not be resolved.
    RowMove {
        item: Item,
        old_path: Option<IndexPath>,
        new_path: Option<IndexPath>,
    },
    RowUpdate {
        item: Item,
        path: IndexPath,
    },
}

impl ChangeEvent {
    pub fn kind(&self) -> ChangeKind {
        match self {
            ChangeEvent::SectionInsert { .. } | ChangeEvent::RowInsert { .. } => ChangeKind::Insert,
            ChangeEvent::SectionDelete { .. } | ChangeEvent::RowDelete { .. } => ChangeKind::Delete,
            ChangeEvent::RowMove { .. } => ChangeKind::Move,
            ChangeEvent::RowUpdate { .. } => ChangeKind::Update,
        }
    }

    pub fn is_section_change(&self) -> bool {
        matches!(
            self,
            ChangeEvent::SectionInsert { .. } | ChangeEvent::SectionDelete { .. }
        )
    }

    /// The item a row event refers to.
    pub fn item(&self) -> Option<&Item> {
        match self {
            ChangeEvent::RowInsert { item, .. }
            | ChangeEvent::RowDelete { item, .. }
            | ChangeEvent::RowMove { item, .. }
            | ChangeEvent::RowUpdate { item, .. } => Some(item),
            ChangeEvent::SectionInsert { .. } | ChangeEvent::SectionDelete { .. } => None,
        }
    }

    /// Index path in the old snapshot, if the event has one.
    pub fn old_path(&self) -> Option<IndexPath> {
        match self {
            ChangeEvent::RowDelete { old_path, .. } => Some(*old_path),
            ChangeEvent::RowMove { old_path, .. } => *old_path,
            ChangeEvent::RowUpdate { path, .. } => Some(*path),
            _ => None,
        }
    }

    /// Index path in the new snapshot, if the event has one.
    pub fn new_path(&self) -> Option<IndexPath> {
        match self {
            ChangeEvent::RowInsert { new_path, .. } => Some(*new_path),
            ChangeEvent::RowMove { new_path, .. } => *new_path,
            ChangeEvent::RowUpdate { path, .. } => Some(*path),
            _ => None,
        }
    }
}

/// Items inserted, updated and deleted by one or more store transactions,
/// already filtered to the controller's entity and resolved into its context.
///
/// Order is preserved and drives event order. Each identity appears at most
/// once per list. Sets from consecutive transactions combine with [`Self::merge`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MutationSets {
    pub inserted: Vec<Item>,
    pub updated: Vec<Item>,
    pub deleted: Vec<Item>,
}

impl MutationSets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }

    pub fn insert(&mut self, item: Item) {
        push_unique(&mut self.inserted, item);
    }

    pub fn update(&mut self, item: Item) {
        push_unique(&mut self.updated, item);
    }

    pub fn delete(&mut self, item: Item) {
        push_unique(&mut self.deleted, item);
    }

    /// True if `id` is currently recorded as inserted or updated.
    pub fn tracks(&self, id: ItemId) -> bool {
        contains_id(&self.inserted, id) || contains_id(&self.updated, id)
    }

    /// Fold the sets of a later transaction into these, so that one diff
    /// covers both:
    /// - inserted then deleted cancels out
    /// - deleted then inserted becomes an update of every field
    /// - an inserted item stays inserted, with its newest values
    /// - repeated updates keep the newest values and all changed keys
    pub fn merge(&mut self, later: MutationSets) {
        for item in later.deleted {
            self.merge_delete(item);
        }
        for item in later.inserted {
            self.merge_insert(item);
        }
        for item in later.updated {
            self.merge_update(item);
        }
    }

    fn merge_insert(&mut self, item: Item) {
        match take_id(&mut self.deleted, item.id) {
            Some(_) => {
                let keys: Vec<String> = item.fields.keys().cloned().collect();
                replace_or_push(&mut self.updated, item.with_changed_keys(keys));
            }
            None => replace_or_push(&mut self.inserted, item),
        }
    }

    fn merge_update(&mut self, item: Item) {
        if let Some(existing) = self.inserted.iter_mut().find(|i| i.id == item.id) {
            *existing = item.with_changed_keys(Vec::<String>::new());
        } else if let Some(existing) = self.updated.iter_mut().find(|i| i.id == item.id) {
            let mut keys = std::mem::take(&mut existing.changed_keys);
            keys.extend(item.changed_keys.iter().cloned());
            *existing = item.with_changed_keys(keys);
        } else {
            self.updated.push(item);
        }
    }

    fn merge_delete(&mut self, item: Item) {
        if take_id(&mut self.inserted, item.id).is_some() {
            return;
        }
        take_id(&mut self.updated, item.id);
        replace_or_push(&mut self.deleted, item);
    }
}

fn take_id(items: &mut Vec<Item>, id: ItemId) -> Option<Item> {
    let position = items.iter().position(|i| i.id == id)?;
    Some(items.remove(position))
}

fn replace_or_push(items: &mut Vec<Item>, item: Item) {
    match items.iter_mut().find(|i| i.id == item.id) {
        Some(existing) => *existing = item,
        None => items.push(item),
    }
}

/// Append unless an item with the same identity is already present.
pub(crate) fn push_unique(items: &mut Vec<Item>, item: Item) {
    if !contains_id(items, item.id) {
        items.push(item);
    }
}

pub(crate) fn contains_id(items: &[Item], id: ItemId) -> bool {
    items.iter().any(|i| i.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mutation_sets_dedupe_by_identity() {
        let mut sets = MutationSets::new();
        assert!(sets.is_empty());

        sets.insert(Item::new(ItemId(1), "person").with("name", "Ann"));
        sets.insert(Item::new(ItemId(1), "person").with("name", "Anne"));
        sets.delete(Item::new(ItemId(2), "person"));

        assert_eq!(sets.inserted.len(), 1);
        assert_eq!(sets.inserted[0].value("name").as_str(), Some("Ann"));
        assert_eq!(sets.len(), 2);
    }

    fn person(id: u64, name: &str) -> Item {
        Item::new(ItemId(id), "person").with("name", name).with("age", 30)
    }

    fn ids(items: &[Item]) -> Vec<u64> {
        items.iter().map(|i| i.id.0).collect()
    }

    #[test]
    fn test_merge_keeps_changes_from_both_transactions() {
        let mut sets = MutationSets::new();
        sets.insert(person(3, "Cy"));

        let mut later = MutationSets::new();
        later.delete(person(1, "Bob"));
        sets.merge(later);

        assert_eq!(ids(&sets.inserted), vec![3]);
        assert_eq!(ids(&sets.deleted), vec![1]);
        assert!(sets.updated.is_empty());
    }

    #[test]
    fn test_merge_insert_then_delete_cancels() {
        let mut sets = MutationSets::new();
        sets.insert(person(3, "Cy"));

        let mut later = MutationSets::new();
        later.delete(person(3, "Cy"));
        sets.merge(later);

        assert!(sets.is_empty());
    }

    #[test]
    fn test_merge_delete_then_insert_becomes_update() {
        let mut sets = MutationSets::new();
        sets.delete(person(1, "Bob"));

        let mut later = MutationSets::new();
        later.insert(person(1, "Bobby"));
        sets.merge(later);

        assert!(sets.inserted.is_empty());
        assert!(sets.deleted.is_empty());
        assert_eq!(ids(&sets.updated), vec![1]);
        assert!(sets.updated[0].changed_keys.contains("name"));
        assert!(sets.updated[0].changed_keys.contains("age"));
    }

    #[test]
    fn test_merge_updates_accumulate_keys() {
        let mut sets = MutationSets::new();
        sets.update(person(1, "Bob").with_changed_keys(["age"]));
        sets.insert(person(2, "Ann"));

        let mut later = MutationSets::new();
        later.update(person(1, "Bo").with_changed_keys(["name"]));
        later.update(person(2, "Anne").with_changed_keys(["name"]));
        sets.merge(later);

        assert_eq!(sets.updated.len(), 1);
        assert_eq!(sets.updated[0].value("name").as_str(), Some("Bo"));
        assert!(sets.updated[0].changed_keys.contains("age"));
        assert!(sets.updated[0].changed_keys.contains("name"));

        // Still an insert, with the newest values.
        assert_eq!(ids(&sets.inserted), vec![2]);
        assert_eq!(sets.inserted[0].value("name").as_str(), Some("Anne"));
        assert!(sets.inserted[0].changed_keys.is_empty());
    }

    #[test]
    fn test_merge_update_then_delete_is_delete() {
        let mut sets = MutationSets::new();
        sets.update(person(1, "Bob").with_changed_keys(["age"]));
        assert!(sets.tracks(ItemId(1)));

        let mut later = MutationSets::new();
        later.delete(person(1, "Bob"));
        sets.merge(later);

        assert!(sets.updated.is_empty());
        assert_eq!(ids(&sets.deleted), vec![1]);
        assert!(!sets.tracks(ItemId(1)));
    }

    #[test]
    fn test_event_paths_and_kind() {
        let item = Item::new(ItemId(1), "person");
        let moved = ChangeEvent::RowMove {
            item: item.clone(),
            old_path: Some(IndexPath::new(0, 1)),
            new_path: None,
        };
        assert_eq!(moved.kind(), ChangeKind::Move);
        assert_eq!(moved.old_path(), Some(IndexPath::new(0, 1)));
        assert_eq!(moved.new_path(), None);
        assert_eq!(moved.item().map(|i| i.id), Some(ItemId(1)));

        let section = ChangeEvent::SectionInsert {
            section: Section::new(Some("A".into()), "A", 0, 1),
            index: 0,
        };
        assert!(section.is_section_change());
        assert!(section.item().is_none());
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = ChangeEvent::RowInsert {
            item: Item::new(ItemId(3), "person"),
            new_path: IndexPath::new(0, 2),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "row_insert");
        assert_eq!(json["new_path"]["item"], 2);
    }
}
