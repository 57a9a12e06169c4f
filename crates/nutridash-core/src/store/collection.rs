// ── Ordered item collection ──
//
// Insertion-ordered map from id to item plus a cached snapshot that
// readers clone cheaply. Every mutation rebuilds the snapshot.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::model::Item;

#[derive(Debug, Clone, Default)]
pub(crate) struct CachedCollection {
    by_id: IndexMap<String, Arc<Item>>,
    snapshot: Arc<Vec<Arc<Item>>>,
}

impl CachedCollection {
    /// Merge crawled items by id. A repeated id keeps its first position
    /// and takes the last value.
    pub(crate) fn from_items(items: impl IntoIterator<Item = Item>) -> Self {
        let mut by_id = IndexMap::new();
        for item in items {
            by_id.insert(item.id.clone(), Arc::new(item));
        }
        let mut collection = Self {
            by_id,
            snapshot: Arc::default(),
        };
        collection.rebuild_snapshot();
        collection
    }

    /// Replace in place, or prepend when the id is new. Returns `true` if new.
    pub(crate) fn upsert(&mut self, item: Arc<Item>) -> bool {
        let is_new = if let Some(slot) = self.by_id.get_mut(&item.id) {
            *slot = item;
            false
        } else {
            self.by_id.shift_insert(0, item.id.clone(), item);
            true
        };
        self.rebuild_snapshot();
        is_new
    }

    pub(crate) fn remove(&mut self, id: &str) -> Option<Arc<Item>> {
        let removed = self.by_id.shift_remove(id);
        if removed.is_some() {
            self.rebuild_snapshot();
        }
        removed
    }

    pub(crate) fn get(&self, id: &str) -> Option<Arc<Item>> {
        self.by_id.get(id).cloned()
    }

    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<Item>>> {
        Arc::clone(&self.snapshot)
    }

    pub(crate) fn len(&self) -> usize {
        self.by_id.len()
    }

    fn rebuild_snapshot(&mut self) {
        self.snapshot = Arc::new(self.by_id.values().cloned().collect());
    }
}
