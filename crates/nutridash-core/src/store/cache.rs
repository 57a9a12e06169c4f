// ── Per-kind collection cache ──
//
// One complete, ordered copy of every item of a resource kind, built on
// first use by crawling listing pages. Mutations patch the cached copy so
// browsing never refetches after create/update/delete.
//
// Every slot carries a generation counter. A crawl records the generation
// it started under and is only stored if nothing invalidated or mutated the
// slot in the meantime, so a racing crawl can never overwrite newer state.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use nutridash_api::ApiClient;

use super::CachedCollection;
use crate::config::CrawlSettings;
use crate::error::CoreError;
use crate::model::{Item, ResourceKind};

#[derive(Debug, Default)]
struct Slot {
    collection: Option<CachedCollection>,
    generation: u64,
}

/// Shared cache of full collections, one per [`ResourceKind`].
///
/// Constructed once per application session and shared by reference
/// (`Arc`) between the fetcher, the mutator, and every list session.
pub struct CollectionCache {
    api: Arc<ApiClient>,
    crawl: CrawlSettings,
    sort: Option<String>,
    slots: DashMap<ResourceKind, Slot>,
    /// Serializes crawls per kind so concurrent callers share one.
    build_gates: DashMap<ResourceKind, Arc<Mutex<()>>>,
}

impl CollectionCache {
    pub fn new(api: Arc<ApiClient>, crawl: CrawlSettings, sort: Option<String>) -> Self {
        Self {
            api,
            crawl,
            sort,
            slots: DashMap::new(),
            build_gates: DashMap::new(),
        }
    }

    /// Full item list for `kind`, crawling the backend if not cached.
    ///
    /// Cancelling `cancel` aborts the crawl with [`CoreError::Cancelled`]
    /// and leaves the cache untouched.
    pub async fn get_or_build(
        &self,
        kind: ResourceKind,
        cancel: &CancellationToken,
    ) -> Result<Arc<Vec<Arc<Item>>>, CoreError> {
        if let Some(snapshot) = self.peek(kind) {
            return Ok(snapshot);
        }

        let gate = self.gate(kind);
        let _building = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(CoreError::Cancelled),
            guard = gate.lock() => guard,
        };

        // Someone else finished the crawl while we waited.
        if let Some(snapshot) = self.peek(kind) {
            return Ok(snapshot);
        }

        let generation = self.generation(kind);
        let items = self.crawl(kind, cancel).await?;
        let collection = CachedCollection::from_items(items);
        let snapshot = collection.snapshot();

        let mut slot = self.slots.entry(kind).or_default();
        if slot.generation == generation {
            info!(%kind, items = collection.len(), "collection cached");
            slot.collection = Some(collection);
        } else {
            debug!(%kind, "collection changed during crawl, result not cached");
        }
        Ok(snapshot)
    }

    /// Cached list for `kind` without touching the network.
    pub fn peek(&self, kind: ResourceKind) -> Option<Arc<Vec<Arc<Item>>>> {
        self.slots
            .get(&kind)
            .and_then(|slot| slot.collection.as_ref().map(CachedCollection::snapshot))
    }

    /// One cached item by id.
    pub fn get(&self, kind: ResourceKind, id: &str) -> Option<Arc<Item>> {
        self.slots
            .get(&kind)
            .and_then(|slot| slot.collection.as_ref().and_then(|c| c.get(id)))
    }

    /// Drop the cached list; the next `get_or_build` crawls from scratch.
    pub fn invalidate(&self, kind: ResourceKind) {
        let mut slot = self.slots.entry(kind).or_default();
        slot.collection = None;
        slot.generation += 1;
        debug!(%kind, "collection invalidated");
    }

    /// Replace-or-prepend by id.
    ///
    /// With nothing cached there is nothing to patch; the next crawl reads
    /// the backend, which already has the item.
    pub fn apply_upsert(&self, kind: ResourceKind, item: Arc<Item>) {
        let mut slot = self.slots.entry(kind).or_default();
        slot.generation += 1;
        if let Some(collection) = slot.collection.as_mut() {
            collection.upsert(item);
        }
    }

    pub fn apply_delete(&self, kind: ResourceKind, id: &str) {
        let mut slot = self.slots.entry(kind).or_default();
        slot.generation += 1;
        if let Some(collection) = slot.collection.as_mut() {
            collection.remove(id);
        }
    }

    pub fn sort(&self) -> Option<&str> {
        self.sort.as_deref()
    }

    pub fn api(&self) -> &Arc<ApiClient> {
        &self.api
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn gate(&self, kind: ResourceKind) -> Arc<Mutex<()>> {
        Arc::clone(self.build_gates.entry(kind).or_default().value())
    }

    fn generation(&self, kind: ResourceKind) -> u64 {
        self.slots.get(&kind).map_or(0, |slot| slot.generation)
    }

    /// Page through `/{kind}/all` until the backend reports the last page.
    ///
    /// Starts at the bulk page size and drops to the normal crawl size if
    /// the backend rejects it. Hitting `max_pages` is an error; a
    /// truncated list is never returned.
    async fn crawl(
        &self,
        kind: ResourceKind,
        cancel: &CancellationToken,
    ) -> Result<Vec<Item>, CoreError> {
        let mut size = self.crawl.bulk_page_size;
        let mut page: u32 = 0;
        let mut items = Vec::new();

        loop {
            if page >= self.crawl.max_pages {
                warn!(%kind, pages = page, items = items.len(), "crawl guard tripped");
                return Err(CoreError::IncompleteCrawl {
                    kind,
                    pages: page,
                    items: items.len(),
                });
            }

            let request = self
                .api
                .list_page(kind.path(), page, size, self.sort.as_deref());
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(CoreError::Cancelled),
                result = request => result,
            };

            match result {
                Ok(batch) => {
                    debug!(%kind, page, size, count = batch.content.len(), last = batch.last, "crawled page");
                    let exhausted = batch.last || batch.content.is_empty();
                    items.extend(batch.content);
                    if exhausted {
                        return Ok(items);
                    }
                    page += 1;
                }
                Err(err) if page == 0 && size != self.crawl.page_size && refuses_bulk(&err) => {
                    debug!(%kind, size, error = %err, "bulk page size refused, falling back");
                    size = self.crawl.page_size;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}

/// A 4xx that isn't about the session: the backend won't serve pages
/// that large.
fn refuses_bulk(err: &nutridash_api::Error) -> bool {
    !err.is_unauthorized() && err.status().is_some_and(|s| (400..500).contains(&s))
}

impl std::fmt::Debug for CollectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionCache")
            .field("crawl", &self.crawl)
            .field("kinds", &self.slots.len())
            .finish_non_exhaustive()
    }
}
