//! In-memory storage backend.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{SpatialError, SpatialResult};
use crate::identifier::NodeIdentifier;
use crate::node::Node;
use crate::shape::Region;
use crate::storage::Storage;

/// Transient storage backend keeping every node in a concurrent map.
///
/// Cloning the handle shares the underlying store, so a caller can keep a
/// handle for inspection while the engine owns another.
pub struct MemoryStorage<N> {
    inner: Arc<MemoryStorageInner<N>>,
}

struct MemoryStorageInner<N> {
    nodes: DashMap<NodeIdentifier, N>,
    feature_types: RwLock<Vec<String>>,
    bounds: RwLock<Option<Region>>,
    disposed: AtomicBool,
}

impl<N> Clone for MemoryStorage<N> {
    fn clone(&self) -> Self {
        MemoryStorage {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N> MemoryStorage<N> {
    pub fn new() -> MemoryStorage<N> {
        MemoryStorage {
            inner: Arc::new(MemoryStorageInner {
                nodes: DashMap::new(),
                feature_types: RwLock::new(Vec::new()),
                bounds: RwLock::new(None),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Number of stored nodes.
    pub fn len(&self) -> usize {
        self.inner.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.nodes.is_empty()
    }

    fn ensure_open(&self) -> SpatialResult<()> {
        if self.inner.disposed.load(Ordering::Acquire) {
            Err(SpatialError::Disposed)
        } else {
            Ok(())
        }
    }
}

impl<N> Default for MemoryStorage<N> {
    fn default() -> Self {
        MemoryStorage::new()
    }
}

impl<N: Node + Clone> Storage<N> for MemoryStorage<N> {
    fn put(&self, node: &N) -> SpatialResult<()> {
        self.ensure_open()?;
        // the first stored identifier stays the canonical instance
        match self.inner.nodes.entry(node.identifier().clone()) {
            Entry::Occupied(mut occupied) => {
                occupied.insert(node.clone());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(node.clone());
            }
        }
        Ok(())
    }

    fn get(&self, id: &NodeIdentifier) -> SpatialResult<Option<N>> {
        self.ensure_open()?;
        Ok(self.inner.nodes.get(id).map(|entry| entry.value().clone()))
    }

    fn remove(&self, id: &NodeIdentifier) -> SpatialResult<()> {
        self.ensure_open()?;
        self.inner.nodes.remove(id);
        Ok(())
    }

    fn clear(&self) -> SpatialResult<()> {
        self.ensure_open()?;
        self.inner.nodes.clear();
        Ok(())
    }

    fn flush(&self) -> SpatialResult<()> {
        // nothing is buffered
        self.ensure_open()
    }

    fn dispose(&self) -> SpatialResult<()> {
        if !self.inner.disposed.swap(true, Ordering::AcqRel) {
            self.inner.nodes.clear();
            self.inner.feature_types.write().clear();
            *self.inner.bounds.write() = None;
            log::debug!("disposed in-memory spatial storage");
        }
        Ok(())
    }

    fn find_unique_instance(&self, id: &NodeIdentifier) -> SpatialResult<NodeIdentifier> {
        self.ensure_open()?;
        Ok(self
            .inner
            .nodes
            .get(id)
            .map(|entry| entry.key().clone())
            .unwrap_or_else(|| id.clone()))
    }

    fn feature_types(&self) -> SpatialResult<Vec<String>> {
        self.ensure_open()?;
        Ok(self.inner.feature_types.read().clone())
    }

    fn add_feature_type(&self, name: &str) -> SpatialResult<()> {
        self.ensure_open()?;
        let mut feature_types = self.inner.feature_types.write();
        if !feature_types.iter().any(|existing| existing == name) {
            feature_types.push(name.to_string());
        }
        Ok(())
    }

    fn clear_feature_types(&self) -> SpatialResult<()> {
        self.ensure_open()?;
        self.inner.feature_types.write().clear();
        Ok(())
    }

    fn set_bounds(&self, bounds: &Region) -> SpatialResult<()> {
        self.ensure_open()?;
        *self.inner.bounds.write() = Some(bounds.clone());
        Ok(())
    }

    fn bounds(&self) -> SpatialResult<Option<Region>> {
        self.ensure_open()?;
        Ok(self.inner.bounds.read().clone())
    }
}
