//! Reference in-memory store.
//!
//! [`MemoryStore`] implements both collaborators a controller needs:
//! - [`crate::QueryEngine`]: filtering, sorting, paging and grouped counts
//! - [`ChangeSource`]: one [`StoreChanges`] notification per committed
//!   [`Transaction`], delivered over bounded channels
//!
//! # Example
//!
//! ```ignore
//! let store = MemoryStore::new();
//! let handle = store.subscribe(SubscriptionConfig::for_entity("person"));
//!
//! let mut txn = Transaction::new();
//! txn.insert(Item::new(ItemId(1), "person").with("name", "Ann"));
//! store.commit(txn)?;
//!
//! let changes = handle.recv()?;
//! assert_eq!(changes.inserted.len(), 1);
//! ```

mod broadcast;
mod changes;
mod memory;

pub use broadcast::{
    ChangeBroadcaster, ChangeSource, ChangeSubscription, SubscriptionConfig, SubscriptionId,
};
pub use changes::StoreChanges;
pub use memory::{MemoryStore, Transaction};
