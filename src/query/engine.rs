//! Query engine interface.

use crate::error::Result;
use crate::query::FetchRequest;
use crate::types::{Item, Value};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Number of matching items for one distinct group value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub value: Value,
    pub count: usize,
}

impl GroupCount {
    pub fn new(value: impl Into<Value>, count: usize) -> Self {
        Self {
            value: value.into(),
            count,
        }
    }
}

/// Executes fetch requests against a backing store.
///
/// Implementations must honor the request's ordering and support predicate
/// AND-composition. Failures are reported as [`crate::ResultsError::Query`].
pub trait QueryEngine {
    /// Run the request, returning matching items in request order with
    /// offset and limit applied.
    fn execute(&self, request: &FetchRequest) -> Result<Vec<Item>>;

    /// Count matching items per distinct value of `key_path`, in the order the
    /// request's sorting would first produce each value.
    fn execute_grouped_count(&self, request: &FetchRequest, key_path: &str)
        -> Result<Vec<GroupCount>>;

    /// Re-resolve an item reported by a change notification into this engine's
    /// context. `None` means there is no counterpart and the item is skipped.
    fn resolve(&self, item: &Item) -> Option<Item> {
        Some(item.clone())
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn execute(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        (**self).execute(request)
    }

    fn execute_grouped_count(
        &self,
        request: &FetchRequest,
        key_path: &str,
    ) -> Result<Vec<GroupCount>> {
        (**self).execute_grouped_count(request, key_path)
    }

    fn resolve(&self, item: &Item) -> Option<Item> {
        (**self).resolve(item)
    }
}
