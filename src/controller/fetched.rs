//! The fetched results controller.

use super::observer::ResultsObserver;
use crate::diff::{diff_snapshots, ChangeEvent, MutationSets};
use crate::error::{Result, ResultsError};
use crate::query::{FetchRequest, QueryEngine};
use crate::snapshot::{default_index_title, ResultSnapshot, SectionInfo, SnapshotBuilder};
use crate::store::{ChangeSource, ChangeSubscription, StoreChanges, SubscriptionConfig};
use crate::types::{ChangeKind, IndexPath, Item};
use crossbeam_channel::TryRecvError;
use std::sync::{Arc, Weak};

/// Whether the controller holds results yet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ControllerState {
    /// No successful fetch yet; queries fail and store changes are ignored.
    Unfetched,
    Fetched,
}

/// Keeps a sectioned, ordered view of a query in sync with a store and reports
/// each change to an observer.
///
/// The controller subscribes to the store on construction and unsubscribes
/// when dropped. It is not meant to be shared across threads; callers feed it
/// notifications from one context via [`Self::process_pending`] or
/// [`Self::handle_changes`].
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let request = FetchRequest::new("person")
///     .with_predicate(Predicate::at_least("age", 18))
///     .sorted_by(SortDescriptor::ascending("name"));
///
/// let mut controller = FetchedResultsController::new(Arc::clone(&store), request);
/// controller.set_observer(&observer);
/// controller.perform_fetch()?;
///
/// store.insert(Item::new(ItemId(3), "person").with("name", "Cy").with("age", 25))?;
/// controller.process_pending()?; // observer receives RowInsert at [0, 2]
/// ```
pub struct FetchedResultsController<S: QueryEngine + ChangeSource> {
    store: Arc<S>,
    request: FetchRequest,
    subscription: ChangeSubscription,
    snapshot: Option<ResultSnapshot>,
    observer: Option<Weak<dyn ResultsObserver>>,
    /// Changes not yet reflected in `snapshot`, kept across failed rebuilds.
    pending: MutationSets,
}

impl<S: QueryEngine + ChangeSource> FetchedResultsController<S> {
    pub fn new(store: Arc<S>, request: FetchRequest) -> Self {
        Self::with_config(store, request, SubscriptionConfig::default())
    }

    /// Create with a custom subscription configuration. The subscription is
    /// always restricted to the request's entity.
    pub fn with_config(store: Arc<S>, request: FetchRequest, config: SubscriptionConfig) -> Self {
        let config = SubscriptionConfig {
            entity: Some(request.entity.clone()),
            ..config
        };
        let subscription = store.subscribe(config);

        Self {
            store,
            request,
            subscription,
            snapshot: None,
            observer: None,
            pending: MutationSets::new(),
        }
    }

    pub fn request(&self) -> &FetchRequest {
        &self.request
    }

    pub fn state(&self) -> ControllerState {
        if self.snapshot.is_some() {
            ControllerState::Fetched
        } else {
            ControllerState::Unfetched
        }
    }

    /// Attach an observer. The controller keeps only a weak reference.
    pub fn set_observer<O: ResultsObserver + 'static>(&mut self, observer: &Arc<O>) {
        let weak: Weak<dyn ResultsObserver> = Arc::downgrade(observer) as Weak<dyn ResultsObserver>;
        self.observer = Some(weak);
    }

    pub fn clear_observer(&mut self) {
        self.observer = None;
    }

    fn observer(&self) -> Option<Arc<dyn ResultsObserver>> {
        self.observer.as_ref().and_then(Weak::upgrade)
    }

    /// Run the query and install the results.
    ///
    /// Queued store notifications are discarded; the fresh results already
    /// reflect them. On failure the previous results (if any) stay, and the
    /// queued changes are kept for the next rebuild.
    pub fn perform_fetch(&mut self) -> Result<()> {
        let queued: Vec<StoreChanges> = self.subscription.receiver.try_iter().collect();
        let discarded = queued.len();

        let snapshot = match self.build_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                for changes in &queued {
                    self.absorb(changes);
                }
                return Err(e);
            }
        };

        tracing::debug!(
            target: "fetched_results::controller",
            entity = %self.request.entity,
            items = snapshot.len(),
            sections = snapshot.section_count(),
            discarded,
            "fetched"
        );

        self.snapshot = Some(snapshot);
        self.pending = MutationSets::new();
        Ok(())
    }

    fn build_snapshot(&self) -> Result<ResultSnapshot> {
        let observer = self.observer();
        let hook = |name: Option<&str>| observer.as_ref().and_then(|o| o.section_index_title(name));
        SnapshotBuilder::new(self.store.as_ref(), &self.request)
            .with_title_hook(&hook)
            .build()
    }

    // --- Queries ---

    /// The current snapshot.
    pub fn snapshot(&self) -> Result<&ResultSnapshot> {
        self.snapshot.as_ref().ok_or(ResultsError::NotFetched)
    }

    pub fn fetched_objects(&self) -> Result<&[Item]> {
        Ok(self.snapshot()?.items())
    }

    pub fn sections(&self) -> Result<Vec<SectionInfo<'_>>> {
        let snapshot = self.snapshot()?;
        Ok((0..snapshot.section_count())
            .filter_map(|i| snapshot.section_info(i))
            .collect())
    }

    pub fn section_info(&self, index: usize) -> Result<Option<SectionInfo<'_>>> {
        Ok(self.snapshot()?.section_info(index))
    }

    /// Item at `path`.
    ///
    /// # Panics
    ///
    /// Panics if the controller is unfetched or `path` is out of range.
    pub fn object_at(&self, path: IndexPath) -> &Item {
        match &self.snapshot {
            Some(snapshot) => snapshot.object_at(path),
            None => panic!("object_at({}) called before perform_fetch", path),
        }
    }

    pub fn get_object_at(&self, path: IndexPath) -> Option<&Item> {
        self.snapshot.as_ref()?.get_object_at(path)
    }

    pub fn index_path_for(&self, item: &Item) -> Option<IndexPath> {
        self.snapshot.as_ref()?.index_path_for(item)
    }

    /// Index titles for all sections, computed on first access per snapshot.
    pub fn section_index_titles(&self) -> &[String] {
        let Some(snapshot) = &self.snapshot else {
            return &[];
        };
        let observer = self.observer();
        snapshot.section_index_titles(|name| {
            observer
                .as_ref()
                .and_then(|o| o.section_index_title(name))
                .or_else(|| default_index_title(name))
                .unwrap_or_default()
        })
    }

    /// Section for an index title. Titles map one-to-one onto sections.
    pub fn section_for_section_index_title(&self, _title: &str, index: usize) -> usize {
        index
    }

    // --- Change handling ---

    /// Drain every queued store notification and apply them as one change.
    ///
    /// The queued transactions are merged and diffed once against the current
    /// store contents, so the observer sees a single begin/end bracket for
    /// the whole batch. A failed rebuild is reported to the observer and its
    /// changes are retried on the next call.
    ///
    /// Returns the number of notifications applied (0 before the first fetch
    /// or after a failed rebuild), or [`ResultsError::SubscriptionLost`] once
    /// the store has dropped the subscription. Notifications buffered before
    /// the drop are still applied.
    pub fn process_pending(&mut self) -> Result<usize> {
        let mut received = 0;
        let mut lost = false;
        loop {
            match self.subscription.try_recv() {
                Ok(changes) => {
                    received += 1;
                    if self.snapshot.is_some() {
                        self.absorb(&changes);
                    }
                }
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!(
                        target: "fetched_results::controller",
                        entity = %self.request.entity,
                        "change subscription disconnected"
                    );
                    lost = true;
                    break;
                }
            }
        }

        let applied = if self.snapshot.is_none() {
            if received > 0 {
                tracing::trace!(
                    target: "fetched_results::controller",
                    received,
                    "ignoring changes before first fetch"
                );
            }
            0
        } else {
            match self.apply_pending() {
                Ok(_) => received,
                Err(_) => 0,
            }
        };

        if lost {
            return Err(ResultsError::SubscriptionLost);
        }
        Ok(applied)
    }

    /// Apply one transaction's changes, together with any changes left over
    /// from a failed rebuild. Returns the number of events emitted.
    ///
    /// Ignored (returns 0) before the first successful fetch or when nothing
    /// relevant changed. On a failed rebuild the previous results stay and the
    /// changes are kept for the next attempt.
    pub fn handle_changes(&mut self, changes: &StoreChanges) -> Result<usize> {
        if self.snapshot.is_none() {
            tracing::trace!(
                target: "fetched_results::controller",
                "ignoring changes before first fetch"
            );
            return Ok(0);
        }
        self.absorb(changes);
        self.apply_pending()
    }

    /// Merge a notification into the pending mutation sets.
    fn absorb(&mut self, changes: &StoreChanges) {
        let mutations = self.relevant_mutations(changes);
        self.pending.merge(mutations);
    }

    /// Rebuild, diff against the current snapshot with the pending sets,
    /// notify, then adopt the new results.
    fn apply_pending(&mut self) -> Result<usize> {
        let Some(old) = self.snapshot.as_ref() else {
            return Ok(0);
        };
        if self.pending.is_empty() {
            return Ok(0);
        }

        let new = match self.build_snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(
                    target: "fetched_results::controller",
                    entity = %self.request.entity,
                    error = %e,
                    pending = self.pending.len(),
                    "rebuild failed; keeping previous results"
                );
                if let Some(observer) = self.observer() {
                    observer.did_fail(&e);
                }
                return Err(e);
            }
        };

        let mutations = std::mem::take(&mut self.pending);
        let events = diff_snapshots(old, &new, mutations, &self.request);
        self.emit(&events);

        tracing::debug!(
            target: "fetched_results::controller",
            entity = %self.request.entity,
            events = events.len(),
            items = new.len(),
            "applied store changes"
        );

        self.snapshot = Some(new);
        Ok(events.len())
    }

    /// Filter a notification to this request's entity and resolve each item.
    /// Inserted and deleted items must also satisfy the predicate; updated
    /// items are judged later against both snapshots. A deleted item that is
    /// already pending as inserted or updated is always kept.
    fn relevant_mutations(&self, changes: &StoreChanges) -> MutationSets {
        let mut mutations = MutationSets::new();

        for item in self.resolve_all(&changes.inserted) {
            if self.request.evaluate_predicate(&item) {
                mutations.insert(item);
            }
        }
        for item in self.resolve_all(&changes.updated) {
            mutations.update(item);
        }
        for item in self.resolve_all(&changes.deleted) {
            if self.request.evaluate_predicate(&item) || self.pending.tracks(item.id) {
                mutations.delete(item);
            }
        }
        mutations
    }

    fn resolve_all(&self, items: &[Item]) -> Vec<Item> {
        items
            .iter()
            .filter(|item| item.entity == self.request.entity)
            .filter_map(|item| {
                let resolved = self.store.resolve(item);
                if resolved.is_none() {
                    tracing::trace!(
                        target: "fetched_results::controller",
                        id = %item.id,
                        "no counterpart for changed item; skipping"
                    );
                }
                resolved
            })
            .collect()
    }

    fn emit(&self, events: &[ChangeEvent]) {
        let Some(observer) = self.observer() else {
            return;
        };

        let mut began = false;
        for event in events {
            if !began {
                observer.will_change_content();
                began = true;
            }
            tracing::trace!(target: "fetched_results::controller", ?event, "emitting change");
            match event {
                ChangeEvent::SectionInsert { section, index } => {
                    observer.did_change_section(section, *index, ChangeKind::Insert)
                }
                ChangeEvent::SectionDelete { section, index } => {
                    observer.did_change_section(section, *index, ChangeKind::Delete)
                }
                _ => observer.did_change_object(event),
            }
        }
        if began {
            observer.did_change_content();
        }
    }
}

impl<S: QueryEngine + ChangeSource> Drop for FetchedResultsController<S> {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription.id);
    }
}
