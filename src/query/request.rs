//! Fetch requests: what to fetch, in what order, and how to section it.

use crate::query::Predicate;
use crate::types::{Item, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// One sort key with its direction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortDescriptor {
    pub key: String,
    pub ascending: bool,
}

impl SortDescriptor {
    pub fn ascending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: true,
        }
    }

    pub fn descending(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ascending: false,
        }
    }

    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let ordering = a.value(&self.key).total_cmp(b.value(&self.key));
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// Description of a query: entity, filter, ordering, sectioning and paging.
///
/// Requests are values; derived requests (count, per-section) are clones with
/// the relevant fields replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FetchRequest {
    /// Entity type to fetch.
    pub entity: String,

    /// Filter (None = every item of the entity).
    #[serde(default)]
    pub predicate: Option<Predicate>,

    /// Ordering, most significant first.
    #[serde(default)]
    pub sort_descriptors: Vec<SortDescriptor>,

    /// Key whose value partitions results into sections (None = one section).
    /// The first sort descriptor is expected to order by this key.
    #[serde(default)]
    pub section_key_path: Option<String>,

    /// Number of leading results to skip.
    #[serde(default)]
    pub fetch_offset: usize,

    /// Maximum number of results (None = unlimited).
    #[serde(default)]
    pub fetch_limit: Option<usize>,
}

impl FetchRequest {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            predicate: None,
            sort_descriptors: Vec::new(),
            section_key_path: None,
            fetch_offset: 0,
            fetch_limit: None,
        }
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicate = Some(predicate);
        self
    }

    /// Append a sort descriptor.
    pub fn sorted_by(mut self, descriptor: SortDescriptor) -> Self {
        self.sort_descriptors.push(descriptor);
        self
    }

    pub fn with_section_key_path(mut self, key_path: impl Into<String>) -> Self {
        self.section_key_path = Some(key_path.into());
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.fetch_offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.fetch_limit = Some(limit);
        self
    }

    /// True if the item satisfies the predicate (an absent predicate matches all).
    pub fn evaluate_predicate(&self, item: &Item) -> bool {
        self.predicate.as_ref().map_or(true, |p| p.evaluate(item))
    }

    /// True if the item is of the requested entity and satisfies the predicate.
    pub fn matches(&self, item: &Item) -> bool {
        item.entity == self.entity && self.evaluate_predicate(item)
    }

    /// Order two items by the sort descriptors, falling back to identity.
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        self.sort_descriptors
            .iter()
            .map(|d| d.compare(a, b))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or_else(|| a.id.cmp(&b.id))
    }

    /// True if any of `keys` is used by a sort descriptor.
    pub fn sorts_by_any(&self, keys: &BTreeSet<String>) -> bool {
        self.sort_descriptors.iter().any(|d| keys.contains(&d.key))
    }

    /// The request used for grouped counts: no paging, no sectioning.
    pub fn count_request(&self) -> FetchRequest {
        FetchRequest {
            fetch_offset: 0,
            fetch_limit: None,
            section_key_path: None,
            ..self.clone()
        }
    }

    /// The request restricted to one group: predicate AND-ed with equality on
    /// the group value, or with an is-null test when the value is `Null`.
    pub fn section_request(&self, key_path: &str, value: &Value) -> FetchRequest {
        let group = if value.is_null() {
            Predicate::is_null(key_path)
        } else {
            Predicate::equals(key_path, value.clone())
        };
        let predicate = match &self.predicate {
            Some(existing) => group.and(existing.clone()),
            None => group,
        };
        FetchRequest {
            predicate: Some(predicate),
            ..self.count_request()
        }
    }
}
