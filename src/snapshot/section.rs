//! Sections: named contiguous ranges over a snapshot's items.

use crate::query::Predicate;
use crate::types::Item;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// A named, contiguous range over the items of one [`super::ResultSnapshot`].
///
/// Sections carry no reference to their snapshot. Item access goes through
/// [`SectionInfo`], which borrows the snapshot for its lifetime.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Section {
    name: Option<String>,
    index_title: String,
    start: usize,
    len: usize,
    /// Filter selecting exactly this section's group (None when ungrouped).
    #[serde(default)]
    predicate: Option<Predicate>,
}

impl Section {
    pub fn new(
        name: Option<String>,
        index_title: impl Into<String>,
        start: usize,
        len: usize,
    ) -> Self {
        Self {
            name,
            index_title: index_title.into(),
            start,
            len,
            predicate: None,
        }
    }

    pub(crate) fn with_predicate(mut self, predicate: Option<Predicate>) -> Self {
        self.predicate = predicate;
        self
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn index_title(&self) -> &str {
        &self.index_title
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn number_of_objects(&self) -> usize {
        self.len
    }

    /// Range of flat item indices covered by this section.
    pub fn range(&self) -> Range<usize> {
        self.start..self.start + self.len
    }

    pub fn contains_index(&self, index: usize) -> bool {
        index >= self.start && index < self.start + self.len
    }

    pub fn predicate(&self) -> Option<&Predicate> {
        self.predicate.as_ref()
    }

    /// True if the item belongs to this section's group.
    /// Ungrouped sections accept every item.
    pub fn accepts(&self, item: &Item) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.evaluate(item))
    }
}

/// A section together with the slice of items it covers.
#[derive(Clone, Copy, Debug)]
pub struct SectionInfo<'a> {
    section: &'a Section,
    objects: &'a [Item],
}

impl<'a> SectionInfo<'a> {
    pub(crate) fn new(section: &'a Section, objects: &'a [Item]) -> Self {
        Self { section, objects }
    }

    pub fn section(&self) -> &'a Section {
        self.section
    }

    pub fn name(&self) -> Option<&'a str> {
        self.section.name()
    }

    pub fn index_title(&self) -> &'a str {
        self.section.index_title()
    }

    pub fn number_of_objects(&self) -> usize {
        self.objects.len()
    }

    pub fn objects(&self) -> &'a [Item] {
        self.objects
    }
}

/// Default index title: the first character of the name, uppercased.
///
/// An empty name yields an empty title; an absent name yields `None`.
pub fn default_index_title(name: Option<&str>) -> Option<String> {
    let name = name?;
    Some(
        name.chars()
            .next()
            .map(|c| c.to_uppercase().collect())
            .unwrap_or_default(),
    )
}
