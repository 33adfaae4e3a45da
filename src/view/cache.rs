//! Bounded cache of rendered pages
//!
//! Eviction follows insertion order: the page whose bitmap arrived
//! longest ago goes first, no matter how often it was painted since.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::render::Bitmap;

/// Default number of rendered pages kept around
pub const DEFAULT_PAGE_CACHE_LIMIT: usize = 20;

/// Insertion-ordered page bitmap cache.
///
/// Backed by an `LruCache` that is only ever read with `peek`, so the
/// recency order it maintains is exactly the order of `insert` calls.
pub struct RenderedPageCache {
    cache: LruCache<usize, Bitmap>,
}

impl RenderedPageCache {
    /// Create a cache holding at most `limit` pages (at least one)
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            cache: LruCache::new(
                NonZeroUsize::new(limit).unwrap_or(NonZeroUsize::MIN),
            ),
        }
    }

    /// Look up a page without changing the eviction order
    #[must_use]
    pub fn get(&self, page: usize) -> Option<&Bitmap> {
        self.cache.peek(&page)
    }

    #[must_use]
    pub fn contains(&self, page: usize) -> bool {
        self.cache.contains(&page)
    }

    /// Insert or replace `page`, making it the newest entry.
    /// Returns the page evicted to stay within the limit, if any.
    pub fn insert(&mut self, page: usize, bitmap: Bitmap) -> Option<usize> {
        match self.cache.push(page, bitmap) {
            Some((evicted, _)) if evicted != page => Some(evicted),
            _ => None,
        }
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }

    /// Cached pages from oldest to newest
    #[must_use]
    pub fn insertion_order(&self) -> Vec<usize> {
        self.cache.iter().rev().map(|(page, _)| *page).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.cache.cap().get()
    }
}

impl Default for RenderedPageCache {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_CACHE_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use crate::render::WHITE;

    fn bitmap() -> Bitmap {
        Bitmap::solid(Size::new(2, 2), WHITE)
    }

    #[test]
    fn cache_insert_and_get() {
        let mut cache = RenderedPageCache::new(10);
        assert_eq!(cache.insert(3, bitmap()), None);

        assert!(cache.contains(3));
        assert!(cache.get(3).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn evicts_oldest_inserted_not_least_recently_read() {
        let mut cache = RenderedPageCache::new(2);
        cache.insert(0, bitmap());
        cache.insert(1, bitmap());

        // Reading page 0 must not save it.
        assert!(cache.get(0).is_some());
        assert_eq!(cache.insert(2, bitmap()), Some(0));

        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(0));
        assert_eq!(cache.insertion_order(), vec![1, 2]);
    }

    #[test]
    fn reinsert_moves_page_to_newest_once() {
        let mut cache = RenderedPageCache::new(3);
        for page in 0..3 {
            cache.insert(page, bitmap());
        }

        assert_eq!(cache.insert(0, bitmap()), None);
        assert_eq!(cache.insertion_order(), vec![1, 2, 0]);
        assert_eq!(cache.insert(5, bitmap()), Some(1));
        assert_eq!(cache.insertion_order(), vec![2, 0, 5]);
    }

    #[test]
    fn size_never_exceeds_limit() {
        let mut cache = RenderedPageCache::new(4);
        for i in 0..50 {
            cache.insert((i * 7) % 11, bitmap());
            assert!(cache.len() <= 4);
            let order = cache.insertion_order();
            let mut dedup = order.clone();
            dedup.sort_unstable();
            dedup.dedup();
            assert_eq!(dedup.len(), order.len());
        }
    }

    #[test]
    fn zero_limit_becomes_one() {
        let cache = RenderedPageCache::new(0);
        assert_eq!(cache.limit(), 1);
    }

    #[test]
    fn clear_empties_cache() {
        let mut cache = RenderedPageCache::default();
        for i in 0..5 {
            cache.insert(i, bitmap());
        }
        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.limit(), DEFAULT_PAGE_CACHE_LIMIT);
    }
}
