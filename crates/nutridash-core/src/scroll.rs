// ── Infinite scroll ──
//
// Decides when a visible sentinel should load the next page. The busy flag
// keeps triggers from overlapping; the epoch makes completions from before
// a restart harmless.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScrollState {
    /// Page the next trigger will request.
    pub next_page: usize,
    /// Terminal: set once a page reported `last = true`.
    pub last: bool,
    /// A page request is outstanding.
    pub busy: bool,
}

/// Permission to load one page, issued by [`InfiniteScroll::try_begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollTicket {
    pub page: usize,
    epoch: u64,
}

#[derive(Debug, Default)]
struct Inner {
    state: ScrollState,
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct InfiniteScroll {
    inner: Mutex<Inner>,
}

impl InfiniteScroll {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ScrollState {
        self.lock().state
    }

    /// Called when the sentinel becomes visible. Returns a ticket only if
    /// no query is active, nothing is loading, and more pages exist.
    pub fn try_begin(&self, query_active: bool) -> Option<ScrollTicket> {
        if query_active {
            return None;
        }
        let mut inner = self.lock();
        if inner.state.busy || inner.state.last {
            return None;
        }
        inner.state.busy = true;
        Some(ScrollTicket {
            page: inner.state.next_page,
            epoch: inner.epoch,
        })
    }

    /// Reset pagination and claim page 0 for an explicit reload.
    ///
    /// Any ticket issued before this call is stale from now on.
    pub fn restart(&self) -> ScrollTicket {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.state = ScrollState {
            next_page: 0,
            last: false,
            busy: true,
        };
        ScrollTicket {
            page: 0,
            epoch: inner.epoch,
        }
    }

    /// Record a loaded page. Returns `false` for a stale ticket, whose
    /// items the caller must discard.
    pub fn complete(&self, ticket: ScrollTicket, last: bool) -> bool {
        let mut inner = self.lock();
        if inner.epoch != ticket.epoch {
            return false;
        }
        inner.state = ScrollState {
            next_page: ticket.page + 1,
            last,
            busy: false,
        };
        true
    }

    /// Release the busy flag after a failed load. A `terminal` failure
    /// (expired session) stops further triggers until a restart. Returns
    /// `false` for a stale ticket.
    pub fn fail(&self, ticket: ScrollTicket, terminal: bool) -> bool {
        let mut inner = self.lock();
        if inner.epoch != ticket.epoch {
            return false;
        }
        inner.state.busy = false;
        if terminal {
            inner.state.last = true;
        }
        true
    }

    /// Forget all progress and in-flight tickets.
    pub fn reset(&self) {
        let mut inner = self.lock();
        inner.epoch += 1;
        inner.state = ScrollState::default();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
