// ── Paged fetcher ──
//
// Zero-indexed page windows over the collection cache. Once a kind is
// cached, every page is a slice; the backend is only touched to build it.

use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::model::{Item, PageWindow, ResourceKind};
use crate::store::CollectionCache;

#[derive(Debug, Clone)]
pub struct PagedFetcher {
    cache: Arc<CollectionCache>,
}

impl PagedFetcher {
    pub fn new(cache: Arc<CollectionCache>) -> Self {
        Self { cache }
    }

    /// Page `page` of `kind` at `size` items per page.
    ///
    /// Out-of-range pages are empty and terminal. Cache-build failures
    /// propagate; check [`CoreError::failure_class`] to tell an expired
    /// session from a retryable hiccup.
    pub async fn fetch_page(
        &self,
        kind: ResourceKind,
        page: usize,
        size: NonZeroUsize,
        cancel: &CancellationToken,
    ) -> Result<PageWindow, CoreError> {
        let all = self.cache.get_or_build(kind, cancel).await?;
        Ok(slice_page(&all, page, size))
    }

    /// The `size` items after the first `offset`, reported as page `page`.
    ///
    /// Infinite scroll appends with the number of rows already shown as the
    /// offset, so mutations that shift the cache never open a gap.
    pub async fn fetch_after(
        &self,
        kind: ResourceKind,
        offset: usize,
        page: usize,
        size: NonZeroUsize,
        cancel: &CancellationToken,
    ) -> Result<PageWindow, CoreError> {
        let all = self.cache.get_or_build(kind, cancel).await?;
        Ok(slice_from(&all, offset, size, page))
    }

    pub fn cache(&self) -> &Arc<CollectionCache> {
        &self.cache
    }
}

/// `items[page*size .. page*size+size]`, with `last` once the slice end
/// reaches the collection end.
pub fn slice_page(all: &[Arc<Item>], page: usize, size: NonZeroUsize) -> PageWindow {
    slice_from(all, page.saturating_mul(size.get()), size, page)
}

/// `items[offset .. offset+size]` numbered `page`.
pub fn slice_from(
    all: &[Arc<Item>],
    offset: usize,
    size: NonZeroUsize,
    page: usize,
) -> PageWindow {
    let end = offset.saturating_add(size.get());
    if offset >= all.len() {
        return PageWindow::empty_last(page);
    }
    PageWindow {
        items: all[offset..end.min(all.len())].to_vec(),
        number: page,
        last: end >= all.len(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn collection(n: usize) -> Vec<Arc<Item>> {
        (0..n)
            .map(|i| Arc::new(Item::new(i.to_string(), format!("item {i}"))))
            .collect()
    }

    fn size(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn pages_cover_collection_exactly_once() {
        for len in [0, 1, 7, 20, 21] {
            let all = collection(len);
            for n in 1..=25 {
                let mut seen = Vec::new();
                let mut page = 0;
                loop {
                    let window = slice_page(&all, page, size(n));
                    assert_eq!(window.number, page);
                    seen.extend(window.items.iter().map(|i| i.id.clone()));
                    if window.last {
                        break;
                    }
                    page += 1;
                }
                let expected: Vec<String> = all.iter().map(|i| i.id.clone()).collect();
                assert_eq!(seen, expected, "len={len} size={n}");
                assert_eq!(seen.iter().collect::<HashSet<_>>().len(), len);
            }
        }
    }

    #[test]
    fn exact_multiple_is_last_on_final_full_page() {
        let all = collection(20);
        assert!(!slice_page(&all, 0, size(10)).last);
        let second = slice_page(&all, 1, size(10));
        assert!(second.last);
        assert_eq!(second.items.len(), 10);
    }

    #[test]
    fn offset_window_follows_shifted_collection() {
        let mut all = collection(5);
        assert_eq!(slice_page(&all, 0, size(2)).items.len(), 2);
        // Row 0 deleted after page 0 was shown: row 2 is now at index 1.
        all.remove(0);
        let next = slice_from(&all, 1, size(2), 1);
        let ids: Vec<_> = next.items.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, ["2", "3"]);
        assert_eq!(next.number, 1);
        assert!(!next.last);
        assert!(slice_from(&all, 3, size(2), 2).last);
    }

    #[test]
    fn out_of_range_is_empty_and_terminal() {
        let all = collection(3);
        let window = slice_page(&all, 5, size(10));
        assert!(window.items.is_empty());
        assert!(window.last);

        let huge = slice_page(&all, usize::MAX, size(usize::MAX));
        assert!(huge.items.is_empty());
        assert!(huge.last);
    }
}
