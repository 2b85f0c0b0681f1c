//! In-memory store implementing the query engine and change source.

use super::broadcast::{
    ChangeBroadcaster, ChangeSource, ChangeSubscription, SubscriptionConfig, SubscriptionId,
};
use super::changes::StoreChanges;
use crate::error::{Result, ResultsError};
use crate::query::{FetchRequest, GroupCount, QueryEngine};
use crate::types::{Item, ItemId, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

/// A staged write.
#[derive(Clone, Debug)]
enum Operation {
    Insert(Item),
    Update { id: ItemId, key: String, value: Value },
    Delete(ItemId),
}

/// A batch of writes committed atomically by [`MemoryStore::commit`].
#[derive(Clone, Debug, Default)]
pub struct Transaction {
    operations: Vec<Operation>,
}

impl Transaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, item: Item) -> &mut Self {
        self.operations.push(Operation::Insert(item));
        self
    }

    /// Set one field of an existing item.
    pub fn update(
        &mut self,
        id: ItemId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> &mut Self {
        self.operations.push(Operation::Update {
            id,
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, id: ItemId) -> &mut Self {
        self.operations.push(Operation::Delete(id));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Thread-safe in-memory item table.
///
/// Every successful commit that changes something publishes one
/// [`StoreChanges`] to subscribers.
pub struct MemoryStore {
    items: RwLock<BTreeMap<ItemId, Item>>,
    broadcaster: ChangeBroadcaster,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            items: RwLock::new(BTreeMap::new()),
            broadcaster: ChangeBroadcaster::new(),
        }
    }

    pub fn get(&self, id: ItemId) -> Option<Item> {
        self.items.read().get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn subscription_count(&self) -> usize {
        self.broadcaster.subscription_count()
    }

    /// Insert one item in its own transaction.
    pub fn insert(&self, item: Item) -> Result<StoreChanges> {
        let mut txn = Transaction::new();
        txn.insert(item);
        self.commit(txn)
    }

    /// Update one field in its own transaction.
    pub fn update(
        &self,
        id: ItemId,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<StoreChanges> {
        let mut txn = Transaction::new();
        txn.update(id, key, value);
        self.commit(txn)
    }

    /// Delete one item in its own transaction.
    pub fn delete(&self, id: ItemId) -> Result<StoreChanges> {
        let mut txn = Transaction::new();
        txn.delete(id);
        self.commit(txn)
    }

    /// Validate and apply a transaction, then notify subscribers.
    ///
    /// On error nothing is applied and nothing is published.
    pub fn commit(&self, txn: Transaction) -> Result<StoreChanges> {
        let changes = {
            let mut items = self.items.write();

            // id -> staged value (None = deleted), in first-touch order
            let mut staged: BTreeMap<ItemId, Option<Item>> = BTreeMap::new();
            let mut order = Vec::new();

            for operation in txn.operations {
                let id = match &operation {
                    Operation::Insert(item) => item.id,
                    Operation::Update { id, .. } | Operation::Delete(id) => *id,
                };
                let current = match staged.get(&id) {
                    Some(value) => value.clone(),
                    None => {
                        order.push(id);
                        items.get(&id).cloned()
                    }
                };

                let next = match operation {
                    Operation::Insert(mut item) => {
                        if current.is_some() {
                            return Err(ResultsError::ItemExists(id));
                        }
                        item.changed_keys.clear();
                        Some(item)
                    }
                    Operation::Update { key, value, .. } => {
                        let mut item = current.ok_or(ResultsError::ItemNotFound(id))?;
                        item.fields.insert(key, value);
                        Some(item)
                    }
                    Operation::Delete(_) => {
                        current.ok_or(ResultsError::ItemNotFound(id))?;
                        None
                    }
                };
                staged.insert(id, next);
            }

            let mut changes = StoreChanges::default();
            for id in order {
                let after = staged.remove(&id).flatten();
                let before = items.get(&id).cloned();
                match (before, after) {
                    (None, Some(item)) => {
                        items.insert(id, item.clone());
                        changes.inserted.push(item);
                    }
                    (Some(before), None) => {
                        items.remove(&id);
                        changes.deleted.push(before);
                    }
                    (Some(before), Some(item)) => {
                        let changed = changed_keys(&before, &item);
                        if !changed.is_empty() {
                            changes.updated.push(item.clone().with_changed_keys(changed));
                            items.insert(id, item);
                        }
                    }
                    (None, None) => {}
                }
            }
            changes
        };

        tracing::debug!(
            target: "fetched_results::store",
            inserted = changes.inserted.len(),
            updated = changes.updated.len(),
            deleted = changes.deleted.len(),
            "committed transaction"
        );

        if !changes.is_empty() {
            self.broadcaster.broadcast(&changes);
        }
        Ok(changes)
    }

    fn matching(&self, request: &FetchRequest) -> Vec<Item> {
        let mut matches: Vec<Item> = self
            .items
            .read()
            .values()
            .filter(|item| request.matches(item))
            .cloned()
            .collect();
        matches.sort_by(|a, b| request.compare(a, b));
        matches
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys whose values differ between two versions of an item.
fn changed_keys(before: &Item, after: &Item) -> BTreeSet<String> {
    before
        .fields
        .keys()
        .chain(after.fields.keys())
        .filter(|key| before.value(key) != after.value(key))
        .cloned()
        .collect()
}

impl QueryEngine for MemoryStore {
    fn execute(&self, request: &FetchRequest) -> Result<Vec<Item>> {
        let matches = self.matching(request).into_iter().skip(request.fetch_offset);
        Ok(match request.fetch_limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }

    fn execute_grouped_count(
        &self,
        request: &FetchRequest,
        key_path: &str,
    ) -> Result<Vec<GroupCount>> {
        let mut groups: Vec<GroupCount> = Vec::new();
        let mut positions: BTreeMap<Value, usize> = BTreeMap::new();

        for item in self.matching(request) {
            let value = item.value(key_path);
            match positions.get(value) {
                Some(&position) => groups[position].count += 1,
                None => {
                    positions.insert(value.clone(), groups.len());
                    groups.push(GroupCount::new(value.clone(), 1));
                }
            }
        }
        Ok(groups)
    }

    /// Current committed version of the item, keeping the reported changed
    /// keys. Items no longer stored (deleted) resolve to themselves.
    fn resolve(&self, item: &Item) -> Option<Item> {
        match self.items.read().get(&item.id) {
            Some(current) => {
                let keys = item.changed_keys.iter().cloned();
                Some(current.clone().with_changed_keys(keys))
            }
            None => Some(item.clone()),
        }
    }
}

impl ChangeSource for MemoryStore {
    fn subscribe(&self, config: SubscriptionConfig) -> ChangeSubscription {
        self.broadcaster.subscribe(config)
    }

    fn unsubscribe(&self, id: SubscriptionId) {
        self.broadcaster.unsubscribe(id);
    }
}
