//! # Cairn - Generic Spatial Index Engine
//!
//! Cairn is the traversal and node-caching core for tree-shaped spatial
//! indexes. A concrete index flavor (a grid, an R-tree, ...) supplies the
//! node representation and the insertion strategy; cairn supplies the
//! n-dimensional geometry, the region-keyed node identity with per-node
//! locking, the iterative query traversal, a bounded node cache and the
//! bookkeeping against a pluggable storage backend.
//!
//! ## Features
//!
//! - **N-Dimensional Geometry**: points and axis-aligned regions with
//!   intersection, containment, touch, distance and merge operations
//! - **Pluggable Storage**: nodes page between memory and a [`Storage`]
//!   backend; in-memory and page-file backends ship with the crate
//! - **Root Residency**: the root node stays in memory and reaches storage
//!   only on `flush`
//! - **Bounded Node Cache**: an LRU working set over storage, a miss is
//!   always legal and re-fetches
//! - **Per-Node Locking**: every node identifier doubles as a bounded-wait
//!   reader/writer lock
//! - **Iterative Traversal**: depth-first over two explicit stacks, safe on
//!   pathologically deep trees
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use cairn::{IndexEngine, MemoryStorage, NodeIdentifier, Region, Shape};
//!
//! let bounds = Region::new(vec![0.0, 0.0], vec![100.0, 100.0]);
//! let root = NodeIdentifier::with_validity(bounds, true);
//! let engine = IndexEngine::new(2, root, Box::new(MemoryStorage::new()))?;
//!
//! // a flavor implementing IndexPolicy drives insertion and data visits
//! engine.insert_data(&flavor, feature, Shape::from(mbr))?;
//! engine.intersection_query(&query, &flavor, &mut visitor)?;
//! engine.flush()?;
//! ```
//!
//! The bundled two-level grid flavor lives in the `cairn_grid` crate.

pub mod cache;
pub mod engine;
pub mod error;
pub mod identifier;
pub mod index;
pub mod node;
pub mod shape;
pub mod statistics;
pub mod storage;
pub mod visitor;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::{NodeCache, DEFAULT_CACHE_CAPACITY};
pub use engine::{IndexEngine, IndexPolicy, QueryMode};
pub use error::{SpatialError, SpatialResult};
pub use identifier::{NodeIdentifier, NodeReadGuard, NodeWriteGuard, DEFAULT_LOCK_TIMEOUT};
pub use index::{EntryComparator, IndexProperties, SpatialIndex};
pub use node::{DataEntry, Node};
pub use shape::{Point, Region, Shape, EPSILON};
pub use statistics::{Statistics, StatisticsSnapshot};
pub use storage::disk::DiskStorage;
pub use storage::memory::MemoryStorage;
pub use storage::Storage;
pub use visitor::{CollectingVisitor, Visitor};
