//! Observer callbacks for controller changes.

use crate::diff::ChangeEvent;
use crate::error::ResultsError;
use crate::snapshot::Section;
use crate::types::ChangeKind;

/// Receives change notifications from a [`super::FetchedResultsController`].
///
/// Every method has a no-op default; implement only what you need. Callbacks
/// for one rebuild arrive as `will_change_content`, then one call per event in
/// order, then `did_change_content`. Nothing is called when a rebuild produces
/// no events.
pub trait ResultsObserver {
    fn will_change_content(&self) {}

    /// A row was inserted, deleted, moved or updated.
    fn did_change_object(&self, _event: &ChangeEvent) {}

    /// A section was inserted or deleted.
    fn did_change_section(&self, _section: &Section, _index: usize, _kind: ChangeKind) {}

    fn did_change_content(&self) {}

    /// Index title override for a section name. `None` falls back to the
    /// default rule.
    fn section_index_title(&self, _name: Option<&str>) -> Option<String> {
        None
    }

    /// A rebuild triggered by a store change failed. The controller keeps its
    /// previous results.
    fn did_fail(&self, _error: &ResultsError) {}
}
