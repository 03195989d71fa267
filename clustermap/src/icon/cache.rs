use crate::error::ClusterError;
use crate::icon::badge::{draw_badge, BadgeStyle};
use crate::icon::{BadgeImage, SizeBucket, DEFAULT_SIZE_BUCKETS};
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of badges kept in the cache.
pub const DEFAULT_ICON_CACHE_CAPACITY: usize = 80;

struct CacheEntry {
    image: Arc<BadgeImage>,
    last_access: u64,
}

/// Bounded cache of rendered badge images, keyed by the [`SizeBucket`] of the cluster size.
///
/// Once more than `capacity` badges are stored, the least recently accessed one is evicted.
/// The cache is owned by the map thread and is not synchronized.
pub struct IconCache {
    capacity: usize,
    buckets: Vec<usize>,
    entries: HashMap<SizeBucket, CacheEntry, ahash::RandomState>,
    access_counter: u64,
}

impl Default for IconCache {
    fn default() -> Self {
        Self::new(DEFAULT_ICON_CACHE_CAPACITY, DEFAULT_SIZE_BUCKETS.to_vec())
    }
}

impl IconCache {
    /// Creates an empty cache. `buckets` must be sorted in ascending order.
    pub fn new(capacity: usize, buckets: Vec<usize>) -> Self {
        Self {
            capacity: capacity.max(1),
            buckets,
            entries: HashMap::default(),
            access_counter: 0,
        }
    }

    /// Returns the badge for clusters of `size` items.
    ///
    /// If the badge for the size bucket is not cached yet, it is rendered with `render` and
    /// stored. If rendering fails, a default badge is returned instead and nothing is cached,
    /// so the next request will try to render the badge again.
    pub fn get(
        &mut self,
        size: usize,
        render: impl FnOnce(SizeBucket) -> Result<BadgeImage, ClusterError>,
    ) -> Arc<BadgeImage> {
        let bucket = self.bucket(size);
        let access = self.next_access();

        if let Some(entry) = self.entries.get_mut(&bucket) {
            entry.last_access = access;
            return entry.image.clone();
        }

        let image = match render(bucket) {
            Ok(image) => Arc::new(image),
            Err(err) => {
                log::warn!("Failed to render badge for {bucket}: {err}");
                return Arc::new(fallback_badge(bucket));
            }
        };

        self.entries.insert(
            bucket,
            CacheEntry {
                image: image.clone(),
                last_access: access,
            },
        );
        self.evict_excess();

        image
    }

    /// Returns the cached badge for `size` without rendering it or updating its access time.
    pub fn peek(&self, size: usize) -> Option<Arc<BadgeImage>> {
        self.entries
            .get(&self.bucket(size))
            .map(|entry| entry.image.clone())
    }

    /// Bucket used as the cache key for clusters of `size` items.
    pub fn bucket(&self, size: usize) -> SizeBucket {
        SizeBucket::for_size(size, &self.buckets)
    }

    /// Number of cached badges.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no badges are cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Maximum number of cached badges.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting the least recently used badges if needed.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        self.evict_excess();
    }

    /// Changes the size buckets. All cached badges are dropped since their keys change.
    ///
    /// Returns true if the buckets differ from the previous ones.
    pub fn set_buckets(&mut self, buckets: Vec<usize>) -> bool {
        if buckets == self.buckets {
            return false;
        }

        self.buckets = buckets;
        self.evict_all();
        true
    }

    /// Releases all cached badges.
    pub fn evict_all(&mut self) {
        self.entries.clear();
    }

    fn next_access(&mut self) -> u64 {
        self.access_counter += 1;
        self.access_counter
    }

    // Linear scan for the oldest access stamp. The map never holds more than `capacity + 1`
    // entries when this runs after an insert, and the stamps give exact LRU order.
    fn evict_excess(&mut self) {
        while self.entries.len() > self.capacity {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.last_access)
                .map(|(bucket, _)| *bucket)
            else {
                return;
            };

            log::trace!("Evicting badge {oldest} from icon cache");
            self.entries.remove(&oldest);
        }
    }
}

fn fallback_badge(bucket: SizeBucket) -> BadgeImage {
    draw_badge(bucket, &BadgeStyle::default()).unwrap_or_else(|_| BadgeImage {
        bytes: vec![0; 4],
        dimensions: (1, 1),
    })
}
