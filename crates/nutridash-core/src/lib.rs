//! List, search, and cache layer between `nutridash-api` and UI consumers.
//!
//! One generic [`ListSession`] replaces the per-screen list logic of the
//! Clinical, Ingredients, and Meals screens:
//!
//! - **[`CollectionCache`]**: one ordered, id-keyed copy of every item of a
//!   [`ResourceKind`], rebuilt lazily by crawling backend pages.
//! - **[`PagedFetcher`]**: stable zero-indexed page slices over the cache.
//! - **[`SearchController`]**: debounced server-side search where a newer
//!   keystroke cancels and supersedes every older request.
//! - **[`InfiniteScroll`]**: next-page trigger with a busy guard, disabled
//!   while a query is active.
//! - **[`Mutator`]**: create/update/delete applied locally only after the
//!   backend confirms.
//!
//! A [`Dashboard`] owns the API client and the cache for the whole
//! application session and vends sessions per resource kind.

pub mod config;
pub mod dashboard;
pub mod error;
pub mod model;
pub mod mutations;
pub mod paging;
pub mod scroll;
pub mod search;
pub mod session;
pub mod stats;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{CrawlSettings, DashboardConfig, TlsVerification};
pub use dashboard::Dashboard;
pub use error::{CoreError, FailureClass};
pub use model::{Item, PageWindow, ResourceKind};
pub use mutations::{Mutator, Updated};
pub use paging::PagedFetcher;
pub use scroll::{InfiniteScroll, ScrollState, ScrollTicket};
pub use search::{SearchController, SearchState};
pub use session::{ListSession, ListView};
pub use stats::{StatsLoader, StatsState};
pub use store::CollectionCache;
