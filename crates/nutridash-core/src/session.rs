// ── List session ──
//
// One screen's list: a browse list grown by infinite scroll, a debounced
// search that replaces it while a query is active, summary stats, and the
// CRUD operations that keep all three consistent. Parameterized by
// resource kind, so the Clinical, Ingredients, and Meals screens all use
// the same state machine.

use std::collections::HashSet;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{CoreError, FailureClass};
use crate::model::{Item, PageWindow, ResourceKind};
use crate::mutations::{Mutator, Updated};
use crate::paging::PagedFetcher;
use crate::scroll::{InfiniteScroll, ScrollTicket};
use crate::search::{SearchController, SearchState};
use crate::stats::{StatsLoader, StatsState};

/// Everything a list screen renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ListView {
    pub kind: ResourceKind,
    /// Paginated rows loaded so far, in cache order.
    pub browse: Arc<Vec<Arc<Item>>>,
    /// Number of the most recently loaded page.
    pub page: usize,
    pub last: bool,
    pub loading: bool,
    /// User-facing message of the last failed page load.
    pub error: Option<String>,
    /// Trimmed query text; empty means browsing.
    pub query: String,
    pub search: SearchState,
}

impl ListView {
    fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            browse: Arc::default(),
            page: 0,
            last: false,
            loading: false,
            error: None,
            query: String::new(),
            search: SearchState::Idle,
        }
    }

    pub fn is_searching(&self) -> bool {
        !self.query.is_empty()
    }

    /// Rows to render: the browse list while the query is empty, otherwise
    /// the results of the search for exactly the current query (empty while
    /// that search is pending or failed).
    pub fn displayed(&self) -> Arc<Vec<Arc<Item>>> {
        if self.query.is_empty() {
            return Arc::clone(&self.browse);
        }
        match &self.search {
            SearchState::Ready { query, results } if *query == self.query => Arc::clone(results),
            _ => Arc::default(),
        }
    }
}

pub struct ListSession {
    kind: Mutex<ResourceKind>,
    fetcher: PagedFetcher,
    mutator: Mutator,
    search: SearchController,
    scroll: InfiniteScroll,
    stats: StatsLoader,
    page_size: NonZeroUsize,
    view: Arc<watch::Sender<ListView>>,
    cancel: CancellationToken,
    /// Cancels page loads; replaced whenever the kind changes.
    loads: Mutex<CancellationToken>,
}

impl ListSession {
    /// Must be called from within a Tokio runtime.
    pub fn new(
        kind: ResourceKind,
        fetcher: PagedFetcher,
        mutator: Mutator,
        search: SearchController,
        stats: StatsLoader,
        page_size: NonZeroUsize,
        cancel: CancellationToken,
    ) -> Self {
        let (view, _) = watch::channel(ListView::new(kind));
        let view = Arc::new(view);
        tokio::spawn(forward_search(
            search.subscribe(),
            Arc::clone(&view),
            cancel.clone(),
        ));
        Self {
            kind: Mutex::new(kind),
            fetcher,
            mutator,
            search,
            scroll: InfiniteScroll::new(),
            stats,
            page_size,
            view,
            loads: Mutex::new(cancel.child_token()),
            cancel,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        *self.kind.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view(&self) -> ListView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ListView> {
        self.view.subscribe()
    }

    pub fn search(&self) -> &SearchController {
        &self.search
    }

    pub fn scroll(&self) -> &InfiniteScroll {
        &self.scroll
    }

    pub fn stats(&self) -> StatsState {
        self.stats.state()
    }

    pub fn subscribe_stats(&self) -> watch::Receiver<StatsState> {
        self.stats.subscribe()
    }

    // ── Paging ───────────────────────────────────────────────────────

    /// Reset pagination and load page 0 into the browse list.
    ///
    /// Returns `false` if a newer reload or a kind switch superseded it.
    pub async fn load_first_page(&self) -> Result<bool, CoreError> {
        let ticket = self.scroll.restart();
        self.load(ticket, true).await
    }

    /// The sentinel scrolled into view. Loads and appends the next page
    /// unless a query is active, a load is outstanding, or the list is
    /// complete. Returns `true` if a page was appended.
    pub async fn on_sentinel_visible(&self) -> Result<bool, CoreError> {
        let query_active = self.view.borrow().is_searching();
        let Some(ticket) = self.scroll.try_begin(query_active) else {
            return Ok(false);
        };
        self.load(ticket, false).await
    }

    /// Drop the cached collection, reload page 0, and refresh stats.
    pub async fn refresh(&self) -> Result<bool, CoreError> {
        let kind = self.kind();
        self.fetcher.cache().invalidate(kind);
        let (loaded, _) = tokio::join!(self.load_first_page(), self.stats.reload(kind));
        loaded
    }

    /// Point the session at another kind (Clinical screen tab switch).
    ///
    /// Cancels outstanding loads and searches, drops the previous kind's
    /// cached collection, and loads the new kind from page 0.
    pub async fn switch_kind(&self, kind: ResourceKind) -> Result<bool, CoreError> {
        let previous = std::mem::replace(
            &mut *self.kind.lock().unwrap_or_else(PoisonError::into_inner),
            kind,
        );
        self.restart_loads();
        self.search.clear();
        self.scroll.reset();
        if previous != kind {
            self.fetcher.cache().invalidate(previous);
        }
        self.view.send_replace(ListView::new(kind));
        debug!(from = %previous, to = %kind, "switched kind");

        let (loaded, _) = tokio::join!(self.load_first_page(), self.stats.reload(kind));
        loaded
    }

    // ── Search ───────────────────────────────────────────────────────

    /// Feed the search box. Empty or whitespace-only text reverts the
    /// display to the browse list immediately.
    pub fn set_query(&self, query: &str) {
        let query = query.trim();
        self.search.input(self.kind(), query);
        let search = self.search.state();
        self.view.send_modify(|view| {
            query.clone_into(&mut view.query);
            view.search = search;
        });
    }

    /// Wait for the current search to settle and return the view.
    pub async fn search_settled(&self) -> ListView {
        self.search.settled().await;
        let search = self.search.state();
        self.view.send_if_modified(|view| {
            if view.search == search {
                return false;
            }
            view.search = search;
            true
        });
        self.view()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Create an item and prepend it to the browse list.
    ///
    /// If the backend returned nothing usable the list is reloaded from
    /// page 0 instead, and `None` is returned.
    pub async fn create(&self, payload: &Value) -> Result<Option<Arc<Item>>, CoreError> {
        let kind = self.kind();
        let created = self.mutator.create(kind, payload).await?;
        match &created {
            Some(item) => {
                let item = Arc::clone(item);
                self.view.send_modify(|view| {
                    view.browse = Arc::new(upserted(&view.browse, item));
                });
            }
            None => {
                if let Err(err) = self.load_first_page().await {
                    debug!(%kind, error = %err, "reload after create failed");
                }
            }
        }
        self.stats.reload(kind).await;
        Ok(created)
    }

    /// Update an item in place in the browse list and search results.
    pub async fn update(&self, id: &str, payload: &Value) -> Result<Updated, CoreError> {
        let kind = self.kind();
        let known = self.shown(id);
        let updated = self.mutator.update(kind, id, payload, known.as_ref()).await?;
        if updated.partial {
            return Ok(updated);
        }
        let replacement = Arc::clone(&updated.item);
        self.view.send_if_modified(|view| {
            let Some(pos) = view.browse.iter().position(|i| i.id == replacement.id) else {
                return false;
            };
            let mut next = view.browse.as_ref().clone();
            next[pos] = replacement;
            view.browse = Arc::new(next);
            true
        });
        self.search.replace_result(&updated.item);
        Ok(updated)
    }

    /// Delete an item from the backend, the browse list, and the search
    /// results.
    pub async fn delete(&self, id: &str) -> Result<(), CoreError> {
        let kind = self.kind();
        self.mutator.delete(kind, id).await?;
        self.view.send_if_modified(|view| {
            if !view.browse.iter().any(|i| i.id == id) {
                return false;
            }
            view.browse = Arc::new(view.browse.iter().filter(|i| i.id != id).cloned().collect());
            true
        });
        self.search.remove_result(id);
        self.stats.reload(kind).await;
        Ok(())
    }

    /// Cancel every outstanding load and search.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    // ── Private helpers ──────────────────────────────────────────────

    fn loads(&self) -> MutexGuard<'_, CancellationToken> {
        self.loads.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The row with `id` in the browse list or the search results.
    fn shown(&self, id: &str) -> Option<Arc<Item>> {
        let view = self.view.borrow();
        let search: &[Arc<Item>] = match &view.search {
            SearchState::Ready { results, .. } => results.as_slice(),
            _ => &[],
        };
        view.browse
            .iter()
            .chain(search)
            .find(|i| i.id == id)
            .cloned()
    }

    fn restart_loads(&self) {
        let mut loads = self.loads();
        loads.cancel();
        *loads = self.cancel.child_token();
    }

    async fn load(&self, ticket: ScrollTicket, replace: bool) -> Result<bool, CoreError> {
        let kind = self.kind();
        let cancel = self.loads().clone();
        self.view.send_modify(|view| view.loading = true);

        let result = if replace {
            self.fetcher
                .fetch_page(kind, ticket.page, self.page_size, &cancel)
                .await
        } else {
            let shown = self.view.borrow().browse.len();
            self.fetcher
                .fetch_after(kind, shown, ticket.page, self.page_size, &cancel)
                .await
        };

        match result {
            Ok(window) => Ok(self.apply_page(ticket, window, replace)),
            Err(err) => {
                let terminal = err.failure_class() == FailureClass::Unauthorized;
                let message = (!err.is_cancelled()).then(|| err.user_message());
                self.view.send_if_modified(|view| {
                    if !self.scroll.fail(ticket, terminal) {
                        return false;
                    }
                    view.loading = false;
                    if message.is_some() {
                        view.error = message;
                    }
                    true
                });
                Err(err)
            }
        }
    }

    /// Apply a loaded page unless its ticket went stale.
    ///
    /// The epoch check runs under the view lock so a concurrent switch or
    /// restart can't interleave between check and write.
    fn apply_page(&self, ticket: ScrollTicket, window: PageWindow, replace: bool) -> bool {
        self.view.send_if_modified(|view| {
            if !self.scroll.complete(ticket, window.last) {
                return false;
            }
            if replace {
                view.browse = Arc::new(window.items);
            } else {
                view.browse = Arc::new(appended(&view.browse, window.items));
            }
            view.page = window.number;
            view.last = window.last;
            view.loading = false;
            view.error = None;
            true
        })
    }
}

impl Drop for ListSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// `existing` followed by the rows of `page` not already present.
fn appended(existing: &[Arc<Item>], page: Vec<Arc<Item>>) -> Vec<Arc<Item>> {
    let seen: HashSet<&str> = existing.iter().map(|i| i.id.as_str()).collect();
    let fresh: Vec<_> = page
        .into_iter()
        .filter(|i| !seen.contains(i.id.as_str()))
        .collect();
    let mut next = existing.to_vec();
    next.extend(fresh);
    next
}

/// Replace by id in place, or prepend.
fn upserted(existing: &[Arc<Item>], item: Arc<Item>) -> Vec<Arc<Item>> {
    let mut next = existing.to_vec();
    if let Some(pos) = next.iter().position(|i| i.id == item.id) {
        next[pos] = item;
    } else {
        next.insert(0, item);
    }
    next
}

/// Mirror search state changes into the view.
async fn forward_search(
    mut rx: watch::Receiver<SearchState>,
    view: Arc<watch::Sender<ListView>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
        let state = rx.borrow_and_update().clone();
        view.send_if_modified(|view| {
            if view.search == state {
                return false;
            }
            view.search = state;
            true
        });
    }
}
