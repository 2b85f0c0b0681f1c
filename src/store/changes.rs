//! Change notifications published after each committed transaction.

use crate::types::Item;
use serde::{Deserialize, Serialize};

/// Items touched by one committed transaction.
///
/// Updated items carry the keys that changed in `Item::changed_keys`.
/// Deleted items carry their last committed values.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreChanges {
    pub inserted: Vec<Item>,
    pub updated: Vec<Item>,
    pub deleted: Vec<Item>,
}

impl StoreChanges {
    pub fn is_empty(&self) -> bool {
        self.inserted.is_empty() && self.updated.is_empty() && self.deleted.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inserted.len() + self.updated.len() + self.deleted.len()
    }

    /// Only the items of the given entity.
    pub fn for_entity(&self, entity: &str) -> StoreChanges {
        let keep = |items: &[Item]| -> Vec<Item> {
            items.iter().filter(|i| i.entity == entity).cloned().collect()
        };
        StoreChanges {
            inserted: keep(&self.inserted),
            updated: keep(&self.updated),
            deleted: keep(&self.deleted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemId;

    #[test]
    fn test_for_entity() {
        let changes = StoreChanges {
            inserted: vec![Item::new(ItemId(1), "person"), Item::new(ItemId(2), "pet")],
            updated: vec![Item::new(ItemId(3), "pet")],
            deleted: vec![Item::new(ItemId(4), "person")],
        };
        let people = changes.for_entity("person");
        assert_eq!(people.len(), 2);
        assert!(people.updated.is_empty());
        assert!(changes.for_entity("plant").is_empty());
    }
}
