//! Pluggable node persistence.
//!
//! Storage owns the durable representation of every node except the
//! engine's resident root. Two backends ship with the crate:
//! [`MemoryStorage`](memory::MemoryStorage) for transient indexes and
//! [`DiskStorage`](disk::DiskStorage) for page-file persistence.

pub mod disk;
pub mod memory;

use crate::error::SpatialResult;
use crate::identifier::NodeIdentifier;
use crate::node::Node;
use crate::shape::Region;

/// Contract between the index engine and a persistence backend.
///
/// Nodes are keyed by their identifier's region. All methods take `&self`;
/// implementations are internally synchronized and shared freely across
/// threads. Every operation on a disposed storage other than `dispose`
/// itself fails with [`SpatialError::Disposed`](crate::SpatialError::Disposed).
pub trait Storage<N: Node>: Send + Sync {
    /// Inserts or replaces the node stored under `node.identifier()`.
    fn put(&self, node: &N) -> SpatialResult<()>;

    /// Returns the node stored under `id`, or `None` when the key is
    /// absent. An absent key is a normal signal, never an error; callers
    /// decide whether it means "rebuild" or "stale reference".
    fn get(&self, id: &NodeIdentifier) -> SpatialResult<Option<N>>;

    /// Removes the node stored under `id`. Removing an absent key is a
    /// no-op.
    fn remove(&self, id: &NodeIdentifier) -> SpatialResult<()>;

    /// Drops every stored node. Feature types and bounds are kept.
    fn clear(&self) -> SpatialResult<()>;

    /// Forces buffered writes and bookkeeping into durable form.
    fn flush(&self) -> SpatialResult<()>;

    /// Releases underlying resources. Idempotent; a second call is a
    /// no-op.
    fn dispose(&self) -> SpatialResult<()>;

    /// Canonicalizes `id` to the storage's authoritative instance for the
    /// same region, so callers looking up equal regions share one handle
    /// (and with it the validity flag and lock). Identifiers for regions
    /// this storage has never stored pass through unchanged.
    fn find_unique_instance(&self, id: &NodeIdentifier) -> SpatialResult<NodeIdentifier>;

    /// Returns the registered feature-type names, in registration order.
    fn feature_types(&self) -> SpatialResult<Vec<String>>;

    /// Registers a feature-type name. Registering a name twice is a
    /// no-op.
    fn add_feature_type(&self, name: &str) -> SpatialResult<()>;

    /// Drops every registered feature-type name.
    fn clear_feature_types(&self) -> SpatialResult<()>;

    /// Records the overall spatial extent of the stored data, so extent
    /// queries need no tree walk.
    fn set_bounds(&self, bounds: &Region) -> SpatialResult<()>;

    /// Returns the recorded extent, or `None` when never set.
    fn bounds(&self) -> SpatialResult<Option<Region>>;
}
