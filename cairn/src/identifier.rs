//! Region-keyed node identity.
//!
//! A [`NodeIdentifier`] names a tree node by the region it covers and
//! doubles as the node's concurrency primitive: it carries a validity flag
//! and a per-node reader/writer lock with a bounded acquisition wait.
//! Identifiers are cheap `Arc`-backed handles; cloning one shares the flag
//! and the lock.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{SpatialError, SpatialResult};
use crate::shape::{Region, Shape};

/// Default bound on lock acquisition waits: five minutes.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Identifies a node by its bounding region.
///
/// Equality and hashing are defined over the region only: two identifiers
/// with equal regions are the same identifier as far as caches and storage
/// are concerned, even when they were created independently. Structurally
/// distinct nodes that share identical bounds therefore alias one another;
/// [`Storage::find_unique_instance`](crate::storage::Storage::find_unique_instance)
/// leans on this to canonicalize handles.
///
/// The validity flag marks whether the node's stored data is ready for
/// reading. Traversals skip children whose identifier is not valid.
///
/// The embedded lock is not reentrant: acquiring it twice from one thread
/// blocks until the timeout trips. Acquisition never blocks forever; a
/// wait beyond the timeout fails with
/// [`SpatialError::LockTimeout`](crate::SpatialError::LockTimeout).
#[derive(Clone)]
pub struct NodeIdentifier {
    inner: Arc<IdentifierInner>,
}

struct IdentifierInner {
    region: Region,
    valid: AtomicBool,
    lock: RwLock<()>,
}

/// Shared-access guard for a node, released on drop.
pub struct NodeReadGuard<'a> {
    _guard: RwLockReadGuard<'a, ()>,
}

/// Exclusive-access guard for a node, released on drop.
pub struct NodeWriteGuard<'a> {
    _guard: RwLockWriteGuard<'a, ()>,
}

impl NodeIdentifier {
    /// Creates an identifier for `region`, initially not valid.
    pub fn new(region: Region) -> NodeIdentifier {
        NodeIdentifier::with_validity(region, false)
    }

    /// Creates an identifier with an explicit validity flag.
    pub fn with_validity(region: Region, valid: bool) -> NodeIdentifier {
        NodeIdentifier {
            inner: Arc::new(IdentifierInner {
                region,
                valid: AtomicBool::new(valid),
                lock: RwLock::new(()),
            }),
        }
    }

    /// Returns the region this identifier covers.
    pub fn region(&self) -> &Region {
        &self.inner.region
    }

    /// Returns the covered region as an owned shape.
    pub fn to_shape(&self) -> Shape {
        Shape::Region(self.inner.region.clone())
    }

    /// Returns the dimensionality of the covered region.
    pub fn dimension(&self) -> usize {
        self.inner.region.dimension()
    }

    /// Returns true once the node's stored data is ready for reading.
    pub fn is_valid(&self) -> bool {
        self.inner.valid.load(Ordering::Acquire)
    }

    /// Flips the validity flag on every handle sharing this identity.
    pub fn set_valid(&self, valid: bool) {
        self.inner.valid.store(valid, Ordering::Release);
    }

    /// Acquires the shared lock, waiting up to [`DEFAULT_LOCK_TIMEOUT`].
    pub fn read_lock(&self) -> SpatialResult<NodeReadGuard<'_>> {
        self.read_lock_for(DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquires the shared lock, waiting up to `timeout`.
    pub fn read_lock_for(&self, timeout: Duration) -> SpatialResult<NodeReadGuard<'_>> {
        match self.inner.lock.try_read_for(timeout) {
            Some(guard) => Ok(NodeReadGuard { _guard: guard }),
            None => Err(self.lock_timeout(timeout)),
        }
    }

    /// Acquires the exclusive lock, waiting up to [`DEFAULT_LOCK_TIMEOUT`].
    pub fn write_lock(&self) -> SpatialResult<NodeWriteGuard<'_>> {
        self.write_lock_for(DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquires the exclusive lock, waiting up to `timeout`.
    pub fn write_lock_for(&self, timeout: Duration) -> SpatialResult<NodeWriteGuard<'_>> {
        match self.inner.lock.try_write_for(timeout) {
            Some(guard) => Ok(NodeWriteGuard { _guard: guard }),
            None => Err(self.lock_timeout(timeout)),
        }
    }

    /// Returns true while no reader holds the lock.
    pub fn is_writable(&self) -> bool {
        !self.inner.lock.is_locked() || self.inner.lock.is_locked_exclusive()
    }

    /// Returns true while any reader or a writer holds the lock.
    pub fn is_locked(&self) -> bool {
        self.inner.lock.is_locked()
    }

    fn lock_timeout(&self, timeout: Duration) -> SpatialError {
        log::warn!(
            "lock wait exceeded {:?} for node {}",
            timeout,
            self.inner.region
        );
        SpatialError::LockTimeout {
            region: self.inner.region.to_string(),
            timeout,
        }
    }
}

impl PartialEq for NodeIdentifier {
    fn eq(&self, other: &Self) -> bool {
        self.inner.region == other.inner.region
    }
}

impl Eq for NodeIdentifier {}

impl Hash for NodeIdentifier {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.region.hash(state);
    }
}

impl fmt::Debug for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeIdentifier")
            .field("region", &self.inner.region)
            .field("valid", &self.is_valid())
            .finish()
    }
}

impl fmt::Display for NodeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.region)
    }
}

/// Persisted form: region and validity. Lock state is runtime-only and a
/// deserialized identifier starts with a fresh, unheld lock.
#[derive(Serialize, Deserialize)]
struct IdentifierState {
    region: Region,
    valid: bool,
}

impl Serialize for NodeIdentifier {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        IdentifierState {
            region: self.inner.region.clone(),
            valid: self.is_valid(),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeIdentifier {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let state = IdentifierState::deserialize(deserializer)?;
        Ok(NodeIdentifier::with_validity(state.region, state.valid))
    }
}
