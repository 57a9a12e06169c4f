// ── CRUD mutations ──
//
// Backend first, cache second. Nothing local changes unless the backend
// call succeeds; there's no optimistic update to roll back.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info};

use nutridash_api::ApiClient;

use crate::error::CoreError;
use crate::model::{Item, ResourceKind};
use crate::store::CollectionCache;

/// Outcome of [`Mutator::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct Updated {
    pub item: Arc<Item>,
    /// Only the submitted fields are known; `item.name` is empty unless
    /// the payload set it.
    pub partial: bool,
}

impl Updated {
    fn full(item: Item) -> Self {
        Self {
            item: Arc::new(item),
            partial: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Mutator {
    api: Arc<ApiClient>,
    cache: Arc<CollectionCache>,
}

impl Mutator {
    pub fn new(api: Arc<ApiClient>, cache: Arc<CollectionCache>) -> Self {
        Self { api, cache }
    }

    /// Create an item and prepend it to the cache.
    ///
    /// Returns `None` when the backend didn't echo the item and the payload
    /// has no `id` to build one from. The cache for `kind` is invalidated
    /// in that case and the caller should reload page 0.
    pub async fn create(
        &self,
        kind: ResourceKind,
        payload: &Value,
    ) -> Result<Option<Arc<Item>>, CoreError> {
        let returned = self.api.create(kind.create_segments(), payload).await?;
        match returned.or_else(|| Item::from_payload(payload)) {
            Some(item) => {
                let item = Arc::new(item);
                self.cache.apply_upsert(kind, Arc::clone(&item));
                info!(%kind, id = %item.id, "created {}", kind.singular());
                Ok(Some(item))
            }
            None => {
                debug!(%kind, "create confirmed without an item, invalidating");
                self.cache.invalidate(kind);
                Ok(None)
            }
        }
    }

    /// Update an item and replace it in the cache.
    ///
    /// If the backend confirms without echoing the item, the payload is
    /// merged over the cached copy, or over `known` (a row the caller is
    /// showing) when nothing is cached. With neither, the result carries
    /// only the payload fields and is marked partial; it is not written
    /// to the cache.
    pub async fn update(
        &self,
        kind: ResourceKind,
        id: &str,
        payload: &Value,
        known: Option<&Arc<Item>>,
    ) -> Result<Updated, CoreError> {
        let returned = self.api.update(kind.path(), id, payload).await?;
        let updated = match returned {
            Some(item) => Updated::full(item),
            None => match self.cache.get(kind, id).or_else(|| known.cloned()) {
                Some(existing) => Updated::full(existing.merged_with(payload)),
                None => Updated {
                    item: Arc::new(Item::new(id, "").merged_with(payload)),
                    partial: true,
                },
            },
        };
        if updated.partial {
            debug!(%kind, id, "update confirmed without an item, invalidating");
            self.cache.invalidate(kind);
        } else {
            self.cache.apply_upsert(kind, Arc::clone(&updated.item));
        }
        info!(%kind, id, "updated {}", kind.singular());
        Ok(updated)
    }

    pub async fn delete(&self, kind: ResourceKind, id: &str) -> Result<(), CoreError> {
        self.api.delete(kind.path(), id).await?;
        self.cache.apply_delete(kind, id);
        info!(%kind, id, "deleted {}", kind.singular());
        Ok(())
    }
}
