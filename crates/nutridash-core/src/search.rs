// ── Debounced search ──
//
// Keystrokes become at most one in-flight backend search. Each input takes
// a new sequence id and a fresh cancellation token and cancels whatever
// came before. A task publishes only while its sequence id is still the
// latest and its token is live, so a slow early response can never
// overwrite a later one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use nutridash_api::ApiClient;

use crate::error::CoreError;
use crate::model::{Item, ResourceKind};

/// Observable search state.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum SearchState {
    /// Empty query; the browse list is displayed.
    #[default]
    Idle,
    /// Waiting out the debounce delay.
    Debouncing { query: String },
    /// Request in flight.
    Searching { query: String },
    Ready {
        query: String,
        results: Arc<Vec<Arc<Item>>>,
    },
    /// The latest search failed; results are cleared.
    Failed { query: String, message: String },
}

impl SearchState {
    pub fn query(&self) -> Option<&str> {
        match self {
            Self::Idle => None,
            Self::Debouncing { query }
            | Self::Searching { query }
            | Self::Ready { query, .. }
            | Self::Failed { query, .. } => Some(query),
        }
    }

    pub fn results(&self) -> Option<&Arc<Vec<Arc<Item>>>> {
        match self {
            Self::Ready { results, .. } => Some(results),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    /// No timer or request is pending.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Idle | Self::Ready { .. } | Self::Failed { .. })
    }
}

#[derive(Debug, Default)]
struct Latest {
    seq: u64,
    cancel: Option<CancellationToken>,
}

struct Shared {
    api: Arc<ApiClient>,
    state: watch::Sender<SearchState>,
    latest: Mutex<Latest>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Latest> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Publish `next` if `seq` is still the newest live search.
    fn publish(&self, seq: u64, cancel: &CancellationToken, next: SearchState) -> bool {
        let latest = self.lock();
        if latest.seq != seq || cancel.is_cancelled() {
            return false;
        }
        self.state.send_replace(next);
        true
    }
}

pub struct SearchController {
    shared: Arc<Shared>,
    debounce: Duration,
    parent: CancellationToken,
}

impl SearchController {
    /// `parent` cancels every search this controller starts.
    pub fn new(api: Arc<ApiClient>, debounce: Duration, parent: CancellationToken) -> Self {
        let (state, _) = watch::channel(SearchState::Idle);
        Self {
            shared: Arc::new(Shared {
                api,
                state,
                latest: Mutex::new(Latest::default()),
            }),
            debounce,
            parent,
        }
    }

    /// Feed the current query text. Whitespace-only text clears the search.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn input(&self, kind: ResourceKind, query: &str) {
        let query = query.trim();
        let mut latest = self.shared.lock();
        latest.seq += 1;
        if let Some(previous) = latest.cancel.take() {
            previous.cancel();
        }

        if query.is_empty() {
            self.shared.state.send_replace(SearchState::Idle);
            return;
        }

        let token = self.parent.child_token();
        latest.cancel = Some(token.clone());
        let seq = latest.seq;
        self.shared.state.send_replace(SearchState::Debouncing {
            query: query.to_owned(),
        });
        drop(latest);

        tokio::spawn(run_search(
            Arc::clone(&self.shared),
            kind,
            query.to_owned(),
            seq,
            token,
            self.debounce,
        ));
    }

    /// Cancel anything pending and return to [`SearchState::Idle`].
    pub fn clear(&self) {
        let mut latest = self.shared.lock();
        latest.seq += 1;
        if let Some(previous) = latest.cancel.take() {
            previous.cancel();
        }
        self.shared.state.send_replace(SearchState::Idle);
    }

    pub fn state(&self) -> SearchState {
        self.shared.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.shared.state.subscribe()
    }

    /// Wait until no debounce or request is pending.
    pub async fn settled(&self) -> SearchState {
        let mut rx = self.shared.state.subscribe();
        rx.wait_for(SearchState::is_settled)
            .await
            .map_or(SearchState::Idle, |state| state.clone())
    }

    /// Swap an updated item into the displayed results, if present.
    pub fn replace_result(&self, item: &Arc<Item>) {
        self.shared.state.send_if_modified(|state| {
            let SearchState::Ready { results, .. } = state else {
                return false;
            };
            let Some(pos) = results.iter().position(|r| r.id == item.id) else {
                return false;
            };
            let mut next = results.as_ref().clone();
            next[pos] = Arc::clone(item);
            *results = Arc::new(next);
            true
        });
    }

    /// Drop a deleted item from the displayed results, if present.
    pub fn remove_result(&self, id: &str) {
        self.shared.state.send_if_modified(|state| {
            let SearchState::Ready { results, .. } = state else {
                return false;
            };
            if !results.iter().any(|r| r.id == id) {
                return false;
            }
            *results = Arc::new(results.iter().filter(|r| r.id != id).cloned().collect());
            true
        });
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Some(pending) = self.shared.lock().cancel.take() {
            pending.cancel();
        }
    }
}

async fn run_search(
    shared: Arc<Shared>,
    kind: ResourceKind,
    query: String,
    seq: u64,
    cancel: CancellationToken,
    debounce: Duration,
) {
    tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        () = tokio::time::sleep(debounce) => {}
    }

    let searching = SearchState::Searching {
        query: query.clone(),
    };
    if !shared.publish(seq, &cancel, searching) {
        return;
    }
    debug!(%kind, %query, seq, "searching");

    let result = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = shared.api.search(kind.path(), &query) => result,
    };

    let next = match result {
        Ok(items) => SearchState::Ready {
            query,
            results: Arc::new(items.into_iter().map(Arc::new).collect()),
        },
        Err(err) => {
            let err = CoreError::from(err);
            if err.is_cancelled() {
                return;
            }
            warn!(%kind, %query, error = %err, "search failed");
            SearchState::Failed {
                query,
                message: err.user_message(),
            }
        }
    };
    if !shared.publish(seq, &cancel, next) {
        debug!(%kind, seq, "superseded search result dropped");
    }
}
