//! Immutable result snapshots.

use super::section::{Section, SectionInfo};
use crate::types::{IndexPath, Item, ItemId};
use std::sync::OnceLock;

/// One materialization of a query: ordered items plus their sections.
///
/// Snapshots are never patched. A change produces a new snapshot which
/// replaces the old one wholesale.
#[derive(Clone, Debug)]
pub struct ResultSnapshot {
    items: Vec<Item>,
    sections: Vec<Section>,
    /// Lazily computed index titles, one per section.
    index_titles: OnceLock<Vec<String>>,
}

impl ResultSnapshot {
    pub fn new(items: Vec<Item>, sections: Vec<Section>) -> Self {
        Self {
            items,
            sections,
            index_titles: OnceLock::new(),
        }
    }

    /// A snapshot with one unnamed section spanning all items.
    pub fn single_section(items: Vec<Item>) -> Self {
        let section = Section::new(None, "", 0, items.len());
        Self::new(items, vec![section])
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    /// True if section ranges are contiguous, in order, and cover exactly the items.
    pub fn is_partitioned(&self) -> bool {
        let mut next = 0;
        for section in &self.sections {
            if section.start() != next {
                return false;
            }
            next += section.number_of_objects();
        }
        next == self.items.len()
    }

    /// Items covered by the section at `index`. Sections that overrun the item
    /// sequence are clipped to it.
    pub fn section_items(&self, index: usize) -> &[Item] {
        match self.sections.get(index) {
            Some(section) => {
                let end = section.range().end.min(self.items.len());
                let start = section.start().min(end);
                &self.items[start..end]
            }
            None => &[],
        }
    }

    pub fn section_info(&self, index: usize) -> Option<SectionInfo<'_>> {
        let section = self.sections.get(index)?;
        Some(SectionInfo::new(section, self.section_items(index)))
    }

    /// Index of the section with the given name.
    pub fn section_index(&self, name: Option<&str>) -> Option<usize> {
        self.sections.iter().position(|s| s.name() == name)
    }

    /// Flat position of the item with this identity.
    pub fn index_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Index path for a flat position.
    pub fn index_path_at(&self, index: usize) -> Option<IndexPath> {
        self.sections
            .iter()
            .enumerate()
            .find(|(_, section)| section.contains_index(index))
            .map(|(s, section)| IndexPath::new(s, index - section.start()))
    }

    /// Index path of the item with the same identity as `item`.
    pub fn index_path_for(&self, item: &Item) -> Option<IndexPath> {
        self.index_of(item.id).and_then(|i| self.index_path_at(i))
    }

    pub fn get_object_at(&self, path: IndexPath) -> Option<&Item> {
        let section = self.sections.get(path.section)?;
        if path.item >= section.number_of_objects() {
            return None;
        }
        self.items.get(section.start() + path.item)
    }

    /// Item at `path`.
    ///
    /// # Panics
    ///
    /// Panics if `path` does not address an item of this snapshot.
    pub fn object_at(&self, path: IndexPath) -> &Item {
        match self.get_object_at(path) {
            Some(item) => item,
            None => panic!(
                "index path {} out of range ({} sections, {} items)",
                path,
                self.sections.len(),
                self.items.len()
            ),
        }
    }

    /// Index titles for all sections, computed once per snapshot.
    pub fn section_index_titles<F>(&self, title_for: F) -> &[String]
    where
        F: Fn(Option<&str>) -> String,
    {
        self.index_titles
            .get_or_init(|| self.sections.iter().map(|s| title_for(s.name())).collect())
    }
}

impl PartialEq for ResultSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items && self.sections == other.sections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;
    use std::cell::Cell;

    fn item(id: u64) -> Item {
        Item::new(ItemId(id), "thing").with("n", id as i64)
    }

    fn grouped() -> ResultSnapshot {
        ResultSnapshot::new(
            vec![item(1), item(2), item(3), item(4)],
            vec![
                Section::new(Some("a".into()), "A", 0, 1),
                Section::new(Some("b".into()), "B", 1, 3),
            ],
        )
    }

    #[test]
    fn test_index_paths() {
        let snapshot = grouped();
        assert!(snapshot.is_partitioned());
        assert_eq!(snapshot.index_path_for(&item(1)), Some(IndexPath::new(0, 0)));
        assert_eq!(snapshot.index_path_for(&item(3)), Some(IndexPath::new(1, 1)));
        assert_eq!(snapshot.index_path_for(&item(9)), None);
        assert_eq!(snapshot.object_at(IndexPath::new(1, 2)).id, ItemId(4));
        assert_eq!(snapshot.get_object_at(IndexPath::new(0, 1)), None);
        assert_eq!(snapshot.get_object_at(IndexPath::new(2, 0)), None);
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn test_object_at_out_of_range_panics() {
        grouped().object_at(IndexPath::new(0, 5));
    }

    #[test]
    fn test_section_info_slices() {
        let snapshot = grouped();
        let info = snapshot.section_info(1).unwrap();
        assert_eq!(info.name(), Some("b"));
        assert_eq!(info.number_of_objects(), 3);
        assert_eq!(info.objects()[0].id, ItemId(2));
        assert!(snapshot.section_info(2).is_none());
        assert_eq!(snapshot.section_index(Some("b")), Some(1));
        assert_eq!(snapshot.section_index(None), None);
    }

    #[test]
    fn test_partition_detection() {
        let gap = ResultSnapshot::new(
            vec![item(1), item(2)],
            vec![Section::new(None, "", 1, 1)],
        );
        assert!(!gap.is_partitioned());

        let short = ResultSnapshot::new(vec![item(1), item(2)], vec![Section::new(None, "", 0, 1)]);
        assert!(!short.is_partitioned());

        assert!(ResultSnapshot::single_section(Vec::new()).is_partitioned());
    }

    #[test]
    fn test_index_titles_computed_once() {
        let snapshot = grouped();
        let calls = Cell::new(0);
        let titles = snapshot.section_index_titles(|name| {
            calls.set(calls.get() + 1);
            name.unwrap_or_default().to_uppercase()
        });
        assert_eq!(titles, ["A", "B"]);

        snapshot.section_index_titles(|_| {
            calls.set(calls.get() + 1);
            String::new()
        });
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_equality_ignores_title_cache() {
        let a = grouped();
        let b = grouped();
        a.section_index_titles(|_| "x".to_string());
        assert_eq!(a, b);
    }
}
