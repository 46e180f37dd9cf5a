//! Spatial index engine: traversal, node caching, read/write bookkeeping.
//!
//! The engine is agnostic to the concrete indexing strategy layered on top.
//! A flavor (grid, R-tree, ...) implements [`IndexPolicy`] for its node type
//! and drives the engine through the query and insert entry points; the
//! engine owns the traversal, the resident root slot, the bounded node
//! cache and the statistics counters.
//!
//! # Node residency
//!
//! Three tiers hold node bodies:
//!
//! 1. the resident root slot: the root node never round-trips through
//!    storage; it reaches the backing store only on [`flush`](IndexEngine::flush),
//! 2. the bounded LRU cache: write-through, so eviction is silent,
//! 3. the [`Storage`] backend.
//!
//! Reads count only when tier 3 serves them; writes count only when a put
//! reaches tier 3. Skipping `flush` before dropping the engine loses the
//! root's latest state.
//!
//! # Locking policy
//!
//! [`read_node`](IndexEngine::read_node) holds the identifier's read lock
//! across the storage fetch, so traversals operate on consistent per-node
//! snapshots. Mutation paths are expected to hold the identifier's write
//! lock across their whole read-modify-write and to read through
//! [`read_node_for_update`](IndexEngine::read_node_for_update), which skips
//! the read lock (the per-node lock is not reentrant). No cross-node
//! atomicity is provided; a concurrent structural change may or may not be
//! observed by an in-flight query.

use parking_lot::{Mutex, RwLock};

use crate::cache::{NodeCache, DEFAULT_CACHE_CAPACITY};
use crate::error::{SpatialError, SpatialResult};
use crate::identifier::NodeIdentifier;
use crate::node::{DataEntry, Node};
use crate::shape::{Point, Region, Shape};
use crate::statistics::Statistics;
use crate::storage::Storage;
use crate::visitor::Visitor;

/// The geometric predicate a query applies to data entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Match entries fully enclosed by the query shape.
    Containment,
    /// Match entries overlapping the query shape.
    Intersection,
}

impl QueryMode {
    /// Applies the predicate: does `query` accept `shape`?
    pub fn matches(&self, query: &Shape, shape: &Shape) -> bool {
        match self {
            QueryMode::Containment => query.contains(shape),
            QueryMode::Intersection => query.intersects(shape),
        }
    }
}

/// Strategy hooks a concrete index flavor plugs into the engine.
///
/// The engine locates the target of an insertion by containment and
/// establishes node-level intersection with a query before calling into the
/// policy; everything flavor-specific (how entries land in nodes, how the
/// index grows, what "structurally valid" means) lives here.
pub trait IndexPolicy<N: Node + Clone, T> {
    /// Inserts an entry whose shape the root's region contains.
    fn insert(&self, engine: &IndexEngine<N>, entry: DataEntry<T>) -> SpatialResult<()>;

    /// Inserts an entry falling outside the root's region, typically by
    /// growing or rebuilding the index.
    fn insert_out_of_bounds(&self, engine: &IndexEngine<N>, entry: DataEntry<T>)
        -> SpatialResult<()>;

    /// Reports the entries of `node` matching `query` under `mode` to
    /// `visitor`. The engine has already established that the node's region
    /// intersects the query.
    fn visit_data(
        &self,
        node: &N,
        query: &Shape,
        mode: QueryMode,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()>;

    /// Checks the structural consistency of the index.
    fn is_index_valid(&self, engine: &IndexEngine<N>) -> SpatialResult<bool>;
}

/// A partially explored node during traversal: the node body plus the index
/// of the next child to examine.
struct Cursor<N> {
    node: N,
    next_child: usize,
}

/// The generic traversal and node-caching core.
///
/// All methods take `&self`; shared mutable state (root slot, cache) lives
/// behind internal locks, so one engine instance is shared freely across
/// threads.
pub struct IndexEngine<N: Node + Clone> {
    dimension: usize,
    infinite_region: Region,
    root: RwLock<NodeIdentifier>,
    /// The one node always kept in memory, bypassing storage.
    root_node: RwLock<Option<N>>,
    cache: Mutex<NodeCache<N>>,
    storage: Box<dyn Storage<N>>,
    statistics: Statistics,
}

impl<N: Node + Clone> IndexEngine<N> {
    /// Creates an engine of the given dimensionality rooted at `root`.
    pub fn new(
        dimension: usize,
        root: NodeIdentifier,
        storage: Box<dyn Storage<N>>,
    ) -> SpatialResult<IndexEngine<N>> {
        IndexEngine::with_cache_capacity(dimension, root, storage, DEFAULT_CACHE_CAPACITY)
    }

    /// Creates an engine with an explicit node-cache capacity.
    pub fn with_cache_capacity(
        dimension: usize,
        root: NodeIdentifier,
        storage: Box<dyn Storage<N>>,
        cache_capacity: usize,
    ) -> SpatialResult<IndexEngine<N>> {
        if root.dimension() != dimension {
            return Err(SpatialError::DimensionMismatch {
                expected: dimension,
                actual: root.dimension(),
            });
        }
        Ok(IndexEngine {
            dimension,
            infinite_region: Region::infinite(dimension),
            root: RwLock::new(root),
            root_node: RwLock::new(None),
            cache: Mutex::new(NodeCache::with_capacity(cache_capacity)),
            storage,
            statistics: Statistics::new(),
        })
    }

    /// Rehydrates an engine over a pre-populated storage, locating the root
    /// through the storage's recorded bounds and loading it into the
    /// resident slot.
    pub fn from_storage(storage: Box<dyn Storage<N>>) -> SpatialResult<IndexEngine<N>> {
        IndexEngine::from_storage_with_cache_capacity(storage, DEFAULT_CACHE_CAPACITY)
    }

    /// Rehydrates with an explicit node-cache capacity.
    pub fn from_storage_with_cache_capacity(
        storage: Box<dyn Storage<N>>,
        cache_capacity: usize,
    ) -> SpatialResult<IndexEngine<N>> {
        let bounds = storage.bounds()?.ok_or_else(|| {
            SpatialError::InvalidOperation("Storage has no recorded bounds to locate a root".into())
        })?;
        let root = storage.find_unique_instance(&NodeIdentifier::new(bounds.clone()))?;
        root.set_valid(true);

        let engine = IndexEngine::with_cache_capacity(bounds.dimension(), root, storage, cache_capacity)?;
        let root_id = engine.root();
        if let Some(node) = engine.storage.get(&root_id)? {
            engine.statistics.record_read();
            *engine.root_node.write() = Some(node);
        }
        log::debug!("rehydrated spatial index over bounds {}", bounds);
        Ok(engine)
    }

    /// Dimensionality every shape entering this engine must have.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// The all-covering region of this engine's dimensionality.
    pub fn infinite_region(&self) -> &Region {
        &self.infinite_region
    }

    /// The current root identifier.
    pub fn root(&self) -> NodeIdentifier {
        self.root.read().clone()
    }

    /// Replaces the root identifier, emptying the resident slot. Used by
    /// flavors that rebuild the index over new bounds.
    pub fn set_root(&self, root: NodeIdentifier) -> SpatialResult<()> {
        if root.dimension() != self.dimension {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimension,
                actual: root.dimension(),
            });
        }
        let mut current = self.root.write();
        *self.root_node.write() = None;
        *current = root;
        Ok(())
    }

    /// The engine's operation counters.
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// The backing store.
    pub fn storage(&self) -> &dyn Storage<N> {
        self.storage.as_ref()
    }

    /// Number of node bodies currently held by the LRU cache. The resident
    /// root is not part of the cache.
    pub fn cached_nodes(&self) -> usize {
        self.cache.lock().len()
    }

    fn check_dimension(&self, actual: usize) -> SpatialResult<()> {
        if actual != self.dimension {
            return Err(SpatialError::DimensionMismatch {
                expected: self.dimension,
                actual,
            });
        }
        Ok(())
    }

    /// Returns the node for `id`, or `None` when storage has no entry.
    ///
    /// Resolution order: resident root slot, LRU cache, storage. Only a
    /// storage fetch moves the read counter; the fetch happens under the
    /// identifier's read lock.
    pub fn read_node(&self, id: &NodeIdentifier) -> SpatialResult<Option<N>> {
        self.lookup(id, true)
    }

    /// Like [`read_node`](IndexEngine::read_node) but without taking the
    /// identifier's read lock. For mutation paths that already hold the
    /// identifier's write lock; the per-node lock is not reentrant, so
    /// reading through `read_node` there would time out against the
    /// caller's own guard.
    pub fn read_node_for_update(&self, id: &NodeIdentifier) -> SpatialResult<Option<N>> {
        self.lookup(id, false)
    }

    fn lookup(&self, id: &NodeIdentifier, take_lock: bool) -> SpatialResult<Option<N>> {
        {
            let root = self.root.read();
            if *id == *root {
                if let Some(node) = self.root_node.read().as_ref() {
                    return Ok(Some(node.clone()));
                }
            }
        }
        if let Some(node) = self.cache.lock().get(id) {
            return Ok(Some(node.clone()));
        }
        let _guard = if take_lock { Some(id.read_lock()?) } else { None };
        match self.storage.get(id)? {
            Some(node) => {
                self.statistics.record_read();
                self.cache.lock().put(id.clone(), node.clone());
                Ok(Some(node))
            }
            None => Ok(None),
        }
    }

    /// Stores `node`. A write to the root lands in the resident slot only;
    /// it reaches storage when [`flush`](IndexEngine::flush) runs. Any
    /// other write goes through storage, moves the write counter and
    /// refreshes the cache.
    pub fn write_node(&self, node: N) -> SpatialResult<()> {
        {
            let root = self.root.read();
            if *node.identifier() == *root {
                *self.root_node.write() = Some(node);
                return Ok(());
            }
        }
        self.storage.put(&node)?;
        self.statistics.record_write();
        self.cache.lock().put(node.identifier().clone(), node);
        Ok(())
    }

    /// Removes the node for `id` from the cache and storage. Deleting the
    /// root empties the resident slot instead.
    pub fn delete_node(&self, id: &NodeIdentifier) -> SpatialResult<()> {
        {
            let root = self.root.read();
            if *id == *root {
                *self.root_node.write() = None;
                return Ok(());
            }
        }
        self.cache.lock().remove(id);
        self.storage.remove(id)
    }

    /// Pushes the resident root to storage, then flushes the storage's own
    /// buffers. The only path by which the root reaches the backing store.
    pub fn flush(&self) -> SpatialResult<()> {
        let resident = self.root_node.read().clone();
        if let Some(node) = resident {
            self.storage.put(&node)?;
            self.statistics.record_write();
        }
        self.storage.flush()?;
        log::debug!("flushed spatial index");
        Ok(())
    }

    /// Drops every stored node, the cache, the resident root and resets the
    /// counters. The root identifier stays; the flavor rebuilds its node.
    pub fn clear(&self) -> SpatialResult<()> {
        self.storage.clear()?;
        self.cache.lock().clear();
        *self.root_node.write() = None;
        self.statistics.reset();
        log::info!("cleared spatial index");
        Ok(())
    }

    /// Visits data fully enclosed by `query`.
    pub fn containment_query<T>(
        &self,
        query: &Shape,
        policy: &dyn IndexPolicy<N, T>,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        self.check_dimension(query.dimension())?;
        self.traverse(query, QueryMode::Containment, policy, visitor)
    }

    /// Visits data overlapping `query`.
    pub fn intersection_query<T>(
        &self,
        query: &Shape,
        policy: &dyn IndexPolicy<N, T>,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        self.check_dimension(query.dimension())?;
        self.traverse(query, QueryMode::Intersection, policy, visitor)
    }

    /// Visits data overlapping `point`, as an intersection query over the
    /// degenerate region whose corners both equal the point.
    pub fn point_location_query<T>(
        &self,
        point: &Point,
        policy: &dyn IndexPolicy<N, T>,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        self.check_dimension(point.dimension())?;
        let query = Shape::from(Region::from_point(point));
        self.traverse(&query, QueryMode::Intersection, policy, visitor)
    }

    /// Inserts `item` under `shape`. Shapes the root's region contains go
    /// to the policy's in-bounds hook; anything else goes to the
    /// out-of-bounds hook.
    pub fn insert_data<T>(
        &self,
        policy: &dyn IndexPolicy<N, T>,
        item: T,
        shape: Shape,
    ) -> SpatialResult<()> {
        self.check_dimension(shape.dimension())?;
        let root = self.root();
        let entry = DataEntry::new(item, shape);
        if root.to_shape().contains(entry.shape()) {
            policy.insert(self, entry)
        } else {
            log::debug!(
                "shape {} falls outside index bounds {}",
                entry.shape(),
                root
            );
            policy.insert_out_of_bounds(self, entry)
        }
    }

    /// Iterative depth-first walk over the nodes intersecting `query`.
    ///
    /// Two explicit stacks replace recursion: `pending` holds freshly
    /// discovered nodes, `backtrack` holds nodes mid-exploration. Each
    /// iteration either visits a pending node or resumes a backtracked one,
    /// then descends into its first not-yet-examined child whose region
    /// intersects the query; remaining children are found on resumption.
    /// Children are examined in stored order; identifiers whose validity
    /// flag is unset are skipped (their data is not ready for reading), and
    /// a valid child missing from storage is a corrupt reference.
    fn traverse<T>(
        &self,
        query: &Shape,
        mode: QueryMode,
        policy: &dyn IndexPolicy<N, T>,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        let root = self.root();
        if !query.intersects(&root.to_shape()) {
            return Ok(());
        }
        let root_node = match self.read_node(&root)? {
            Some(node) => node,
            None => return Ok(()),
        };

        let mut pending: Vec<Cursor<N>> = vec![Cursor {
            node: root_node,
            next_child: 0,
        }];
        let mut backtrack: Vec<Cursor<N>> = Vec::new();

        while !pending.is_empty() || !backtrack.is_empty() {
            let mut cursor = match pending.pop() {
                Some(cursor) => {
                    visitor.visit_node(&cursor.node);
                    if visitor.is_data_visitor() {
                        policy.visit_data(&cursor.node, query, mode, visitor)?;
                    }
                    cursor
                }
                None => match backtrack.pop() {
                    Some(cursor) => cursor,
                    None => break,
                },
            };

            while cursor.next_child < cursor.node.children_count() {
                let child = cursor.node.child_identifier(cursor.next_child).clone();
                cursor.next_child += 1;
                if !child.is_valid() {
                    continue;
                }
                if !query.intersects(&child.to_shape()) {
                    continue;
                }
                let child_node = self
                    .read_node(&child)?
                    .ok_or_else(|| SpatialError::NodeNotFound(child.to_string()))?;
                pending.push(Cursor {
                    node: child_node,
                    next_child: 0,
                });
                backtrack.push(cursor);
                break;
            }
        }
        Ok(())
    }
}
