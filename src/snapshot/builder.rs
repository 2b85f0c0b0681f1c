//! Snapshot construction from a fetch request.

use super::result::ResultSnapshot;
use super::section::{default_index_title, Section};
use crate::error::Result;
use crate::query::{FetchRequest, QueryEngine};
use crate::types::Value;
use std::collections::HashSet;

/// Hook consulted for a section's index title before the default rule.
pub type IndexTitleHook<'a> = &'a dyn Fn(Option<&str>) -> Option<String>;

/// Builds [`ResultSnapshot`]s by running a request against a query engine.
///
/// Any query failure aborts the build; no partial snapshot is produced.
pub struct SnapshotBuilder<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    request: &'a FetchRequest,
    title_hook: Option<IndexTitleHook<'a>>,
}

impl<'a, E: QueryEngine + ?Sized> SnapshotBuilder<'a, E> {
    pub fn new(engine: &'a E, request: &'a FetchRequest) -> Self {
        Self {
            engine,
            request,
            title_hook: None,
        }
    }

    /// Override index titles per section name.
    pub fn with_title_hook(mut self, hook: IndexTitleHook<'a>) -> Self {
        self.title_hook = Some(hook);
        self
    }

    /// Index title for a section name: hook first, then the default rule.
    pub fn index_title(&self, name: Option<&str>) -> String {
        self.title_hook
            .and_then(|hook| hook(name))
            .or_else(|| default_index_title(name))
            .unwrap_or_default()
    }

    pub fn build(&self) -> Result<ResultSnapshot> {
        match self.request.section_key_path.as_deref() {
            Some(key_path) => self.build_grouped(key_path),
            None => {
                let items = self.engine.execute(self.request)?;
                tracing::debug!(
                    target: "fetched_results::snapshot",
                    entity = %self.request.entity,
                    items = items.len(),
                    "built unsectioned snapshot"
                );
                Ok(ResultSnapshot::single_section(items))
            }
        }
    }

    fn build_grouped(&self, key_path: &str) -> Result<ResultSnapshot> {
        let groups = self
            .engine
            .execute_grouped_count(&self.request.count_request(), key_path)?;

        let limit = self.request.fetch_limit;
        let mut offset = self.request.fetch_offset;
        let mut fetched = 0usize;
        let mut sections = Vec::new();
        let mut taken: HashSet<Option<String>> = HashSet::new();

        for group in groups {
            if limit.map_or(false, |limit| fetched >= limit) {
                break;
            }

            // Skip whole groups until the offset lands inside one.
            if offset >= group.count {
                offset -= group.count;
                continue;
            }

            let mut count = group.count - offset;
            offset = 0;
            if let Some(limit) = limit {
                count = count.min(limit - fetched);
            }

            let name = distinct_name(section_name(&group.value), &group.value, &taken);
            taken.insert(name.clone());
            let scoped = self.request.section_request(key_path, &group.value);
            let title = self.index_title(name.as_deref());

            let section = Section::new(name, title, fetched, count);
            sections.push(section.with_predicate(scoped.predicate));
            fetched += count;
        }

        let items = self.engine.execute(self.request)?;
        if items.len() != fetched {
            tracing::warn!(
                target: "fetched_results::snapshot",
                entity = %self.request.entity,
                key_path,
                sectioned = fetched,
                items = items.len(),
                "section counts disagree with fetched items; is the first sort key the section key?"
            );
        }

        tracing::debug!(
            target: "fetched_results::snapshot",
            entity = %self.request.entity,
            key_path,
            sections = sections.len(),
            items = items.len(),
            "built sectioned snapshot"
        );

        Ok(ResultSnapshot::new(items, sections))
    }
}

/// Section name for a group value. `Null` groups have no name.
fn section_name(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Keep section names unique when distinct values render alike, e.g. `1`
/// and `"1"`. A colliding name gets the value's kind appended.
fn distinct_name(
    name: Option<String>,
    value: &Value,
    taken: &HashSet<Option<String>>,
) -> Option<String> {
    if !taken.contains(&name) {
        return name;
    }

    let base = format!("{} ({})", name.as_deref().unwrap_or(""), kind_label(value));
    let mut candidate = base.clone();
    let mut suffix = 2;
    while taken.contains(&Some(candidate.clone())) {
        candidate = format!("{} {}", base, suffix);
        suffix += 1;
    }

    tracing::debug!(
        target: "fetched_results::snapshot",
        original = ?name,
        renamed = %candidate,
        "section name collision"
    );
    Some(candidate)
}

fn kind_label(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResultsError;
    use crate::query::GroupCount;
    use crate::types::{Item, ItemId};

    /// Engine returning canned results.
    struct Canned {
        groups: Vec<GroupCount>,
        items: usize,
        fail: bool,
    }

    impl QueryEngine for Canned {
        fn execute(&self, request: &FetchRequest) -> Result<Vec<Item>> {
            if self.fail {
                return Err(ResultsError::Query("boom".into()));
            }
            let all: Vec<Item> = (0..self.items as u64)
                .map(|i| Item::new(ItemId(i), "thing"))
                .collect();
            let skipped = all.into_iter().skip(request.fetch_offset);
            Ok(match request.fetch_limit {
                Some(limit) => skipped.take(limit).collect(),
                None => skipped.collect(),
            })
        }

        fn execute_grouped_count(&self, _: &FetchRequest, _: &str) -> Result<Vec<GroupCount>> {
            Ok(self.groups.clone())
        }
    }

    fn canned(counts: &[(&str, usize)]) -> Canned {
        Canned {
            groups: counts.iter().map(|(v, c)| GroupCount::new(*v, *c)).collect(),
            items: counts.iter().map(|(_, c)| c).sum(),
            fail: false,
        }
    }

    fn layout(snapshot: &ResultSnapshot) -> Vec<(Option<String>, usize, usize)> {
        snapshot
            .sections()
            .iter()
            .map(|s| (s.name().map(String::from), s.start(), s.number_of_objects()))
            .collect()
    }

    fn grouped_request() -> FetchRequest {
        FetchRequest::new("thing").with_section_key_path("group")
    }

    #[test]
    fn test_unsectioned_single_section() {
        let engine = canned(&[("x", 3)]);
        let request = FetchRequest::new("thing");
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert_eq!(layout(&snapshot), vec![(None, 0, 3)]);
        assert_eq!(snapshot.sections()[0].index_title(), "");
    }

    #[test]
    fn test_grouped_without_paging() {
        let engine = canned(&[("apple", 2), ("banana", 1), ("cherry", 3)]);
        let request = grouped_request();
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert!(snapshot.is_partitioned());
        assert_eq!(
            layout(&snapshot),
            vec![
                (Some("apple".into()), 0, 2),
                (Some("banana".into()), 2, 1),
                (Some("cherry".into()), 3, 3),
            ]
        );
        assert_eq!(snapshot.sections()[1].index_title(), "B");
    }

    #[test]
    fn test_offset_skips_whole_groups_then_trims() {
        let engine = canned(&[("a", 2), ("b", 3), ("c", 2)]);
        let request = grouped_request().with_offset(3);
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert!(snapshot.is_partitioned());
        assert_eq!(
            layout(&snapshot),
            vec![(Some("b".into()), 0, 2), (Some("c".into()), 2, 2)]
        );
    }

    #[test]
    fn test_offset_equal_to_group_skips_it() {
        let engine = canned(&[("a", 2), ("b", 1)]);
        let request = grouped_request().with_offset(2);
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert_eq!(layout(&snapshot), vec![(Some("b".into()), 0, 1)]);
    }

    #[test]
    fn test_limit_clips_and_stops() {
        let engine = canned(&[("a", 2), ("b", 3), ("c", 2)]);
        let request = grouped_request().with_offset(1).with_limit(3);
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert!(snapshot.is_partitioned());
        assert_eq!(
            layout(&snapshot),
            vec![(Some("a".into()), 0, 1), (Some("b".into()), 1, 2)]
        );
    }

    #[test]
    fn test_zero_limit_yields_no_sections() {
        let engine = canned(&[("a", 2)]);
        let request = grouped_request().with_limit(0);
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert!(snapshot.sections().is_empty());
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_null_group_has_no_name() {
        let engine = Canned {
            groups: vec![GroupCount::new(Value::Null, 1), GroupCount::new(7, 1)],
            items: 2,
            fail: false,
        };
        let request = grouped_request();
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert_eq!(
            layout(&snapshot),
            vec![(None, 0, 1), (Some("7".into()), 1, 1)]
        );
        assert_eq!(snapshot.sections()[0].index_title(), "");
        assert!(matches!(
            snapshot.sections()[0].predicate(),
            Some(crate::query::Predicate::IsNull { .. })
        ));
    }

    #[test]
    fn test_alike_values_get_distinct_names() {
        let engine = Canned {
            groups: vec![
                GroupCount::new(1, 1),
                GroupCount::new(true, 1),
                GroupCount::new("1", 1),
                GroupCount::new("true", 1),
            ],
            items: 4,
            fail: false,
        };
        let request = grouped_request();
        let snapshot = SnapshotBuilder::new(&engine, &request).build().unwrap();
        assert_eq!(
            layout(&snapshot),
            vec![
                (Some("1".into()), 0, 1),
                (Some("true".into()), 1, 1),
                (Some("1 (text)".into()), 2, 1),
                (Some("true (text)".into()), 3, 1),
            ]
        );
        assert_eq!(snapshot.section_index(Some("1 (text)")), Some(2));
        assert_eq!(snapshot.sections()[2].index_title(), "1");
    }

    #[test]
    fn test_title_hook_overrides_default() {
        let engine = canned(&[("apple", 1), ("banana", 1)]);
        let request = grouped_request();
        let hook = |name: Option<&str>| match name {
            Some("apple") => Some("🍎".to_string()),
            _ => None,
        };
        let snapshot = SnapshotBuilder::new(&engine, &request)
            .with_title_hook(&hook)
            .build()
            .unwrap();
        assert_eq!(snapshot.sections()[0].index_title(), "🍎");
        assert_eq!(snapshot.sections()[1].index_title(), "B");
    }

    #[test]
    fn test_query_failure_aborts() {
        let mut engine = canned(&[("a", 1)]);
        engine.fail = true;
        let request = grouped_request();
        let result = SnapshotBuilder::new(&engine, &request).build();
        assert!(matches!(result, Err(ResultsError::Query(_))));
    }
}
