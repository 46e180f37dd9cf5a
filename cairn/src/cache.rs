//! Bounded in-memory node cache.

use std::num::NonZeroUsize;

use lru::LruCache;

use crate::identifier::NodeIdentifier;

/// Default number of node bodies kept resident.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Bounded LRU cache from identifier to node body.
///
/// The cache is write-through: the engine persists a node before caching
/// it, so eviction is silent and a miss only costs a storage fetch. A miss
/// is always legal, including for identifiers that were cached moments
/// earlier.
#[derive(Debug)]
pub struct NodeCache<N> {
    entries: LruCache<NodeIdentifier, N>,
}

impl<N> NodeCache<N> {
    /// Creates a cache holding up to [`DEFAULT_CACHE_CAPACITY`] nodes.
    pub fn new() -> NodeCache<N> {
        NodeCache::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Creates a cache holding up to `capacity` nodes.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn with_capacity(capacity: usize) -> NodeCache<N> {
        assert!(capacity > 0, "cache capacity must be non-zero");
        NodeCache {
            entries: LruCache::new(NonZeroUsize::new(capacity).expect("non-zero capacity")),
        }
    }

    /// Returns the cached node for `id`, marking it most recently used.
    pub fn get(&mut self, id: &NodeIdentifier) -> Option<&N> {
        self.entries.get(id)
    }

    /// Caches `node` under `id`, evicting the least recently used entry
    /// once the capacity is exceeded.
    pub fn put(&mut self, id: NodeIdentifier, node: N) {
        self.entries.put(id, node);
    }

    /// Drops the cached node for `id`, if any.
    pub fn remove(&mut self, id: &NodeIdentifier) -> Option<N> {
        self.entries.pop(id)
    }

    /// Drops every cached node.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn contains(&self, id: &NodeIdentifier) -> bool {
        self.entries.contains(id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}

impl<N> Default for NodeCache<N> {
    fn default() -> Self {
        NodeCache::new()
    }
}
