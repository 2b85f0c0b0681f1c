//! Result snapshots and their construction.
//!
//! A [`ResultSnapshot`] is the pair (ordered items, ordered sections) produced by
//! one full recomputation. [`SnapshotBuilder`] produces them from a
//! [`crate::FetchRequest`], applying offset and limit across sections.

mod builder;
mod result;
mod section;

pub use builder::{IndexTitleHook, SnapshotBuilder};
pub use result::ResultSnapshot;
pub use section::{default_index_title, Section, SectionInfo};
