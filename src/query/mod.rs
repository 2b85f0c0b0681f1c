//! Query description and the engine interface that executes it.
//!
//! A [`FetchRequest`] names an entity, filters it with a [`Predicate`], orders it
//! with [`SortDescriptor`]s and optionally partitions it into sections by a key.
//! Execution is delegated to a [`QueryEngine`].

mod engine;
mod predicate;
mod request;

pub use engine::{GroupCount, QueryEngine};
pub use predicate::{Comparison, Predicate};
pub use request::{FetchRequest, SortDescriptor};
