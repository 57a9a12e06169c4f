// ── Collection store ──
//
// `CachedCollection` is the ordered, id-keyed list for one kind;
// `CollectionCache` owns one per kind and knows how to crawl the backend.

mod cache;
mod collection;

pub use cache::CollectionCache;
pub(crate) use collection::CachedCollection;
