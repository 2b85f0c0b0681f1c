//! # Fetched Results
//!
//! A live, optionally sectioned view over the results of a query against a
//! mutable store, with minimal change reporting when the store changes.
//!
//! ## Core Concepts
//!
//! - **Requests**: entity, predicate, sort order, section key path, offset and limit
//! - **Snapshots**: an ordered item list partitioned into contiguous sections
//! - **Diffs**: section and row events between two snapshots, in a fixed order
//! - **Controller**: owns the current snapshot, rebuilds it on each store
//!   transaction and reports the difference to an observer
//!
//! ## Example
//!
//! ```ignore
//! use fetched_results::{
//!     FetchRequest, FetchedResultsController, Item, ItemId, MemoryStore, Predicate,
//!     SortDescriptor,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! store.insert(Item::new(ItemId(1), "person").with("name", "Ann").with("age", 30))?;
//!
//! let request = FetchRequest::new("person")
//!     .with_predicate(Predicate::at_least("age", 18))
//!     .sorted_by(SortDescriptor::ascending("name"))
//!     .with_section_key_path("initial");
//!
//! let mut controller = FetchedResultsController::new(Arc::clone(&store), request);
//! controller.set_observer(&observer);
//! controller.perform_fetch()?;
//!
//! // Later, after the store commits:
//! controller.process_pending()?;
//! ```

pub mod controller;
pub mod diff;
pub mod error;
pub mod query;
pub mod snapshot;
pub mod store;
pub mod types;

// Re-exports
pub use controller::{ControllerState, FetchedResultsController, ResultsObserver};
pub use diff::{diff_snapshots, ChangeEvent, MutationSets};
pub use error::{Result, ResultsError};
pub use query::{Comparison, FetchRequest, GroupCount, Predicate, QueryEngine, SortDescriptor};
pub use snapshot::{
    default_index_title, IndexTitleHook, ResultSnapshot, Section, SectionInfo, SnapshotBuilder,
};
pub use store::{
    ChangeBroadcaster, ChangeSource, ChangeSubscription, MemoryStore, StoreChanges,
    SubscriptionConfig, SubscriptionId, Transaction,
};
pub use types::*;
