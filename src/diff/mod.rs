//! Change computation between two result snapshots.
//!
//! [`diff_snapshots`] is pure: it takes the old and new snapshots plus the
//! transaction's mutation sets and returns the ordered [`ChangeEvent`]s an
//! observer applies to keep a mirrored list in sync.

mod engine;
mod events;

pub use engine::diff_snapshots;
pub use events::{ChangeEvent, MutationSets};
