//! Page-file storage backend.
//!
//! Layout: fixed-size pages, page 0 reserved for the header. Each node is
//! serialized with bincode, wrapped with a CRC32 checksum and written
//! across as many pages as it needs; the record of which pages belong to
//! which node lives in an in-memory directory. `flush` writes the
//! directory (plus bounds and feature types) as a linked page chain and
//! points the header at it, so a reopened file sees exactly the last
//! flushed state.
//!
//! Pages freed since the last flush stay quarantined until the next flush
//! completes; a crash between flushes can lose unflushed nodes but never
//! corrupts nodes the last flushed directory still references.

use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{SpatialError, SpatialResult};
use crate::identifier::NodeIdentifier;
use crate::node::Node;
use crate::shape::Region;
use crate::storage::Storage;

/// Size of one page in bytes.
pub const PAGE_SIZE: usize = 16384;

const MAGIC: u32 = 0x4341_4952;
const VERSION: u32 = 1;
/// Directory chain pages lead with the next page id.
const PAGE_LINK_LEN: usize = 8;

const CRC_POLY: u32 = 0x04C11DB7;

/// CRC32-MPEG2 over a byte slice.
fn crc32(data: &[u8]) -> u32 {
    let mut crc = u32::MAX;
    for &byte in data {
        crc ^= (byte as u32) << 24;
        for _ in 0..8 {
            crc = if crc & 0x8000_0000 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
        }
    }
    !crc
}

fn encode<T: Serialize>(value: &T) -> SpatialResult<Vec<u8>> {
    bincode::serde::encode_to_vec(value, bincode::config::legacy())
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> SpatialResult<T> {
    bincode::serde::decode_from_slice(bytes, bincode::config::legacy())
        .map(|(value, _)| value)
        .map_err(|e| SpatialError::Serialization(e.to_string()))
}

/// File header stored in page 0.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct FileHeader {
    magic: u32,
    version: u32,
    page_size: u32,
    next_page: u64,
    directory_page: u64,
    directory_len: u64,
    directory_checksum: u32,
}

impl FileHeader {
    fn new() -> FileHeader {
        FileHeader {
            magic: MAGIC,
            version: VERSION,
            page_size: PAGE_SIZE as u32,
            next_page: 1,
            directory_page: 0,
            directory_len: 0,
            directory_checksum: 0,
        }
    }

    fn validate(&self) -> SpatialResult<()> {
        if self.magic != MAGIC {
            return Err(SpatialError::InvalidOperation(
                "Invalid file format (bad magic)".into(),
            ));
        }
        if self.version != VERSION {
            return Err(SpatialError::InvalidOperation(
                "Unsupported file format version".into(),
            ));
        }
        if self.page_size != PAGE_SIZE as u32 {
            return Err(SpatialError::InvalidOperation(
                "Unsupported page size".into(),
            ));
        }
        Ok(())
    }
}

/// Where a node's bytes live: page list, byte length, checksum.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct NodeRecord {
    pages: Vec<u64>,
    len: u64,
    checksum: u32,
}

/// The bookkeeping persisted on flush.
#[derive(Serialize, Deserialize)]
struct DirectoryBlob {
    records: Vec<(NodeIdentifier, NodeRecord)>,
    feature_types: Vec<String>,
    bounds: Option<Region>,
}

struct DiskState {
    file: std::fs::File,
    next_page: u64,
    /// Pages reusable right now.
    free_pages: Vec<u64>,
    /// Pages freed since the last flush; reusable only after the next
    /// flush lands, so the last flushed directory stays intact.
    pending_free: Vec<u64>,
    directory: HashMap<NodeIdentifier, NodeRecord>,
    /// Pages holding the currently persisted directory chain.
    directory_run: Vec<u64>,
    feature_types: Vec<String>,
    bounds: Option<Region>,
}

/// Page-file storage backend.
///
/// Cloning the handle shares the underlying file, so a caller can keep a
/// handle for inspection while the engine owns another.
pub struct DiskStorage<N> {
    inner: Arc<DiskStorageInner<N>>,
}

struct DiskStorageInner<N> {
    path: PathBuf,
    state: Mutex<Option<DiskState>>,
    _marker: PhantomData<fn() -> N>,
}

impl<N> Clone for DiskStorage<N> {
    fn clone(&self) -> Self {
        DiskStorage {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<N> DiskStorage<N> {
    /// Creates a new storage file, truncating any existing file at `path`.
    pub fn create(path: &Path) -> SpatialResult<DiskStorage<N>> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;

        let mut state = DiskState {
            file,
            next_page: 1,
            free_pages: Vec::new(),
            pending_free: Vec::new(),
            directory: HashMap::new(),
            directory_run: Vec::new(),
            feature_types: Vec::new(),
            bounds: None,
        };
        state.write_header(&FileHeader::new())?;

        log::debug!("created spatial storage at {:?}", path);
        Ok(DiskStorage::wrap(path, state))
    }

    /// Opens an existing storage file, restoring the last flushed state.
    pub fn open(path: &Path) -> SpatialResult<DiskStorage<N>> {
        let file = OpenOptions::new().read(true).write(true).open(path)?;

        let mut state = DiskState {
            file,
            next_page: 1,
            free_pages: Vec::new(),
            pending_free: Vec::new(),
            directory: HashMap::new(),
            directory_run: Vec::new(),
            feature_types: Vec::new(),
            bounds: None,
        };

        let header = state.read_header()?;
        header.validate()?;
        state.next_page = header.next_page;

        if header.directory_page != 0 {
            let (bytes, run) =
                state.read_chain(header.directory_page, header.directory_len as usize)?;
            if crc32(&bytes) != header.directory_checksum {
                return Err(SpatialError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    "Directory checksum mismatch - possible corruption",
                )));
            }
            let blob: DirectoryBlob = decode(&bytes)?;
            state.directory = blob.records.into_iter().collect();
            state.feature_types = blob.feature_types;
            state.bounds = blob.bounds;
            state.directory_run = run;
        }
        state.rebuild_free_list();

        log::debug!(
            "opened spatial storage at {:?} with {} nodes",
            path,
            state.directory.len()
        );
        Ok(DiskStorage::wrap(path, state))
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    fn wrap(path: &Path, state: DiskState) -> DiskStorage<N> {
        DiskStorage {
            inner: Arc::new(DiskStorageInner {
                path: path.to_path_buf(),
                state: Mutex::new(Some(state)),
                _marker: PhantomData,
            }),
        }
    }

    fn with_state<R>(
        &self,
        operation: impl FnOnce(&mut DiskState) -> SpatialResult<R>,
    ) -> SpatialResult<R> {
        let mut guard = self.inner.state.lock();
        match guard.as_mut() {
            Some(state) => operation(state),
            None => Err(SpatialError::Disposed),
        }
    }
}

impl DiskState {
    fn page_offset(&self, page: u64) -> u64 {
        page * PAGE_SIZE as u64
    }

    fn read_header(&mut self) -> SpatialResult<FileHeader> {
        self.file.seek(SeekFrom::Start(0))?;
        let mut buffer = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut buffer)?;
        decode(&buffer)
    }

    fn write_header(&mut self, header: &FileHeader) -> SpatialResult<()> {
        let mut padded = encode(header)?;
        padded.resize(PAGE_SIZE, 0);
        self.file.seek(SeekFrom::Start(0))?;
        self.file.write_all(&padded)?;
        Ok(())
    }

    /// Writes up to one page of raw payload, padded to the page size.
    fn write_page(&mut self, page: u64, data: &[u8]) -> SpatialResult<()> {
        if page == 0 {
            return Err(SpatialError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Cannot write to page 0 (reserved for header)",
            )));
        }
        let mut padded = data.to_vec();
        padded.resize(PAGE_SIZE, 0);
        let offset = self.page_offset(page);
        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&padded)?;
        Ok(())
    }

    fn read_page(&mut self, page: u64) -> SpatialResult<Vec<u8>> {
        if page == 0 {
            return Err(SpatialError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Cannot read page 0 (reserved for header)",
            )));
        }
        let offset = self.page_offset(page);
        self.file.seek(SeekFrom::Start(offset))?;
        let mut buffer = vec![0u8; PAGE_SIZE];
        self.file.read_exact(&mut buffer)?;
        Ok(buffer)
    }

    /// Takes `count` pages from the free list, extending the file once the
    /// list runs dry.
    fn allocate_pages(&mut self, count: usize) -> Vec<u64> {
        let mut pages = Vec::with_capacity(count);
        for _ in 0..count {
            match self.free_pages.pop() {
                Some(page) => pages.push(page),
                None => {
                    pages.push(self.next_page);
                    self.next_page += 1;
                }
            }
        }
        pages
    }

    /// Writes `bytes` as a linked chain of freshly allocated pages,
    /// returning the chain in order.
    fn write_chain(&mut self, bytes: &[u8]) -> SpatialResult<Vec<u64>> {
        let capacity = PAGE_SIZE - PAGE_LINK_LEN;
        let chunk_count = (bytes.len() + capacity - 1) / capacity;
        let pages = self.allocate_pages(chunk_count.max(1));

        let mut chunks = bytes.chunks(capacity);
        for (index, page) in pages.iter().enumerate() {
            let next = pages.get(index + 1).copied().unwrap_or(0);
            let chunk = chunks.next().unwrap_or(&[]);
            let mut payload = Vec::with_capacity(PAGE_LINK_LEN + chunk.len());
            payload.extend_from_slice(&next.to_le_bytes());
            payload.extend_from_slice(chunk);
            self.write_page(*page, &payload)?;
        }
        Ok(pages)
    }

    /// Reads `len` bytes back from a chain starting at `first`, returning
    /// the bytes and the pages walked.
    fn read_chain(&mut self, first: u64, len: usize) -> SpatialResult<(Vec<u8>, Vec<u64>)> {
        let mut bytes = Vec::with_capacity(len);
        let mut pages = Vec::new();
        let mut page = first;
        while page != 0 && bytes.len() < len {
            let buffer = self.read_page(page)?;
            let mut link = [0u8; PAGE_LINK_LEN];
            link.copy_from_slice(&buffer[..PAGE_LINK_LEN]);
            pages.push(page);
            bytes.extend_from_slice(&buffer[PAGE_LINK_LEN..]);
            page = u64::from_le_bytes(link);
        }
        if bytes.len() < len {
            return Err(SpatialError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "Directory chain shorter than recorded length",
            )));
        }
        bytes.truncate(len);
        Ok((bytes, pages))
    }

    /// Free pages are whatever `[1, next_page)` leaves once every page the
    /// directory references is accounted for.
    fn rebuild_free_list(&mut self) {
        let mut used: HashSet<u64> = self.directory_run.iter().copied().collect();
        for record in self.directory.values() {
            used.extend(record.pages.iter().copied());
        }
        self.free_pages = (1..self.next_page)
            .filter(|page| !used.contains(page))
            .collect();
        self.pending_free.clear();
    }

    /// Persists the directory and header; quarantined pages become
    /// reusable only after this succeeds.
    fn flush_state(&mut self) -> SpatialResult<()> {
        let old_run = std::mem::take(&mut self.directory_run);
        self.pending_free.extend(old_run);

        let blob = DirectoryBlob {
            records: self
                .directory
                .iter()
                .map(|(id, record)| (id.clone(), record.clone()))
                .collect(),
            feature_types: self.feature_types.clone(),
            bounds: self.bounds.clone(),
        };
        let bytes = encode(&blob)?;
        let checksum = crc32(&bytes);
        let run = self.write_chain(&bytes)?;

        let header = FileHeader {
            magic: MAGIC,
            version: VERSION,
            page_size: PAGE_SIZE as u32,
            next_page: self.next_page,
            directory_page: run[0],
            directory_len: bytes.len() as u64,
            directory_checksum: checksum,
        };
        self.write_header(&header)?;
        self.file.sync_all()?;

        self.directory_run = run;
        self.free_pages.append(&mut self.pending_free);
        Ok(())
    }
}

impl<N> Storage<N> for DiskStorage<N>
where
    N: Node + Clone + Serialize + DeserializeOwned,
{
    fn put(&self, node: &N) -> SpatialResult<()> {
        let id = node.identifier();
        self.with_state(|state| {
            let bytes = encode(node)?;
            let checksum = crc32(&bytes);
            let page_count = (bytes.len() + PAGE_SIZE - 1) / PAGE_SIZE;
            let pages = state.allocate_pages(page_count.max(1));
            for (index, chunk) in bytes.chunks(PAGE_SIZE).enumerate() {
                state.write_page(pages[index], chunk)?;
            }
            if bytes.is_empty() {
                state.write_page(pages[0], &[])?;
            }

            let record = NodeRecord {
                pages,
                len: bytes.len() as u64,
                checksum,
            };
            // the first stored identifier stays the canonical instance
            match state.directory.get_mut(id) {
                Some(existing) => {
                    let old = std::mem::replace(existing, record);
                    state.pending_free.extend(old.pages);
                }
                None => {
                    state.directory.insert(id.clone(), record);
                }
            }
            Ok(())
        })
    }

    fn get(&self, id: &NodeIdentifier) -> SpatialResult<Option<N>> {
        self.with_state(|state| {
            let record = match state.directory.get(id) {
                Some(record) => record.clone(),
                None => return Ok(None),
            };

            let mut bytes = Vec::with_capacity(record.len as usize);
            for page in &record.pages {
                bytes.extend_from_slice(&state.read_page(*page)?);
            }
            bytes.truncate(record.len as usize);

            if crc32(&bytes) != record.checksum {
                return Err(SpatialError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Page checksum mismatch for node {} - possible corruption", id),
                )));
            }
            decode(&bytes).map(Some)
        })
    }

    fn remove(&self, id: &NodeIdentifier) -> SpatialResult<()> {
        self.with_state(|state| {
            if let Some(record) = state.directory.remove(id) {
                state.pending_free.extend(record.pages);
            }
            Ok(())
        })
    }

    fn clear(&self) -> SpatialResult<()> {
        self.with_state(|state| {
            state.directory.clear();
            state.free_pages.clear();
            state.pending_free.clear();
            state.directory_run.clear();
            state.next_page = 1;
            state.file.set_len(PAGE_SIZE as u64)?;
            state.write_header(&FileHeader::new())?;
            state.file.sync_all()?;
            Ok(())
        })
    }

    fn flush(&self) -> SpatialResult<()> {
        self.with_state(|state| state.flush_state())
    }

    fn dispose(&self) -> SpatialResult<()> {
        let mut guard = self.inner.state.lock();
        if let Some(mut state) = guard.take() {
            state.flush_state()?;
            log::debug!("disposed spatial storage at {:?}", self.inner.path);
        }
        Ok(())
    }

    fn find_unique_instance(&self, id: &NodeIdentifier) -> SpatialResult<NodeIdentifier> {
        self.with_state(|state| {
            Ok(state
                .directory
                .get_key_value(id)
                .map(|(key, _)| key.clone())
                .unwrap_or_else(|| id.clone()))
        })
    }

    fn feature_types(&self) -> SpatialResult<Vec<String>> {
        self.with_state(|state| Ok(state.feature_types.clone()))
    }

    fn add_feature_type(&self, name: &str) -> SpatialResult<()> {
        self.with_state(|state| {
            if !state.feature_types.iter().any(|existing| existing == name) {
                state.feature_types.push(name.to_string());
            }
            Ok(())
        })
    }

    fn clear_feature_types(&self) -> SpatialResult<()> {
        self.with_state(|state| {
            state.feature_types.clear();
            Ok(())
        })
    }

    fn set_bounds(&self, bounds: &Region) -> SpatialResult<()> {
        self.with_state(|state| {
            state.bounds = Some(bounds.clone());
            Ok(())
        })
    }

    fn bounds(&self) -> SpatialResult<Option<Region>> {
        self.with_state(|state| Ok(state.bounds.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Shape;
    use crate::testing::TestNode;
    use tempfile::tempdir;

    fn region(n: f64) -> Region {
        Region::new(vec![n, n], vec![n + 1.0, n + 1.0])
    }

    fn sample_node(n: f64) -> TestNode {
        TestNode::leaf(region(n)).with_entries(vec![(
            "entry",
            Shape::from(Region::new(vec![n, n], vec![n + 0.5, n + 0.5])),
        )])
    }

    #[test]
    fn test_create_and_reopen_empty() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");

        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();
        storage.flush().unwrap();
        storage.dispose().unwrap();

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert_eq!(reopened.get(&NodeIdentifier::new(region(0.0))).unwrap(), None);
        assert_eq!(reopened.bounds().unwrap(), None);
        assert!(reopened.feature_types().unwrap().is_empty());
    }

    #[test]
    fn test_put_get_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = sample_node(0.0);
        storage.put(&node).unwrap();
        assert_eq!(storage.get(node.identifier()).unwrap(), Some(node));
    }

    #[test]
    fn test_node_spanning_multiple_pages() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = TestNode::leaf(region(0.0)).with_padding(PAGE_SIZE * 2 + 700);
        storage.put(&node).unwrap();
        assert_eq!(storage.get(node.identifier()).unwrap(), Some(node.clone()));

        storage.flush().unwrap();
        storage.dispose().unwrap();
        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert_eq!(reopened.get(node.identifier()).unwrap(), Some(node));
    }

    #[test]
    fn test_overwrite_replaces_node() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let id = NodeIdentifier::new(region(0.0));
        storage.put(&TestNode::leaf_for(id.clone())).unwrap();

        let replacement = TestNode::leaf_for(id.clone()).with_entries(vec![(
            "replacement",
            Shape::from(Region::new(vec![0.1, 0.1], vec![0.2, 0.2])),
        )]);
        storage.put(&replacement).unwrap();
        assert_eq!(storage.get(&id).unwrap(), Some(replacement));
    }

    #[test]
    fn test_remove_then_get_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = sample_node(0.0);
        storage.put(&node).unwrap();
        storage.remove(node.identifier()).unwrap();
        assert_eq!(storage.get(node.identifier()).unwrap(), None);
        // removing an absent key is a no-op
        storage.remove(node.identifier()).unwrap();
    }

    #[test]
    fn test_flush_persists_directory_and_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let a = sample_node(0.0);
        let b = sample_node(10.0);
        storage.put(&a).unwrap();
        storage.put(&b).unwrap();
        storage.set_bounds(&region(0.0).combined(&region(10.0))).unwrap();
        storage.add_feature_type("roads").unwrap();
        storage.flush().unwrap();
        storage.dispose().unwrap();

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert_eq!(reopened.get(a.identifier()).unwrap(), Some(a));
        assert_eq!(reopened.get(b.identifier()).unwrap(), Some(b));
        assert_eq!(
            reopened.bounds().unwrap(),
            Some(region(0.0).combined(&region(10.0)))
        );
        assert_eq!(reopened.feature_types().unwrap(), vec!["roads"]);
    }

    #[test]
    fn test_unflushed_nodes_lost_on_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = sample_node(0.0);
        storage.put(&node).unwrap();
        // dropped without flush or dispose, as a crash would
        drop(storage);

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert_eq!(reopened.get(node.identifier()).unwrap(), None);
    }

    #[test]
    fn test_crash_after_flush_keeps_flushed_nodes_intact() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let a = sample_node(0.0);
        storage.put(&a).unwrap();
        storage.flush().unwrap();

        // pages freed after the flush must not be recycled before the
        // next flush, so the flushed state survives a crash here
        storage.remove(a.identifier()).unwrap();
        storage.put(&sample_node(5.0)).unwrap();
        drop(storage);

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert_eq!(reopened.get(a.identifier()).unwrap(), Some(a));
    }

    #[test]
    fn test_checksum_corruption_detected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = TestNode::leaf(region(0.0)).with_padding(1000);
        storage.put(&node).unwrap();
        storage.flush().unwrap();
        storage.dispose().unwrap();

        // the first put lands on page 1; stomp on its payload
        let mut file = OpenOptions::new().write(true).open(&path).unwrap();
        file.seek(SeekFrom::Start(PAGE_SIZE as u64 + 50)).unwrap();
        file.write_all(&[0xFF; 16]).unwrap();
        drop(file);

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        assert!(matches!(
            reopened.get(node.identifier()),
            Err(SpatialError::Io(_))
        ));
    }

    #[test]
    fn test_open_rejects_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("junk.cairn");
        std::fs::write(&path, vec![0u8; PAGE_SIZE]).unwrap();

        let result: SpatialResult<DiskStorage<TestNode>> = DiskStorage::open(&path);
        assert!(matches!(result, Err(SpatialError::InvalidOperation(_))));
    }

    #[test]
    fn test_find_unique_instance_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = TestNode::leaf(region(0.0));
        assert!(node.identifier().is_valid());
        storage.put(&node).unwrap();
        storage.flush().unwrap();
        storage.dispose().unwrap();

        let reopened: DiskStorage<TestNode> = DiskStorage::open(&path).unwrap();
        let fresh = NodeIdentifier::new(region(0.0));
        assert!(!fresh.is_valid());
        let canonical = reopened.find_unique_instance(&fresh).unwrap();
        // validity was persisted with the directory
        assert!(canonical.is_valid());
    }

    #[test]
    fn test_clear_drops_nodes_keeps_metadata() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        let node = sample_node(0.0);
        storage.put(&node).unwrap();
        storage.set_bounds(&region(0.0)).unwrap();
        storage.add_feature_type("roads").unwrap();

        storage.clear().unwrap();
        assert_eq!(storage.get(node.identifier()).unwrap(), None);
        assert_eq!(storage.bounds().unwrap(), Some(region(0.0)));
        assert_eq!(storage.feature_types().unwrap(), vec!["roads"]);

        // storage stays usable after clear
        storage.put(&node).unwrap();
        assert_eq!(storage.get(node.identifier()).unwrap(), Some(node));
    }

    #[test]
    fn test_dispose_idempotent_and_blocks_use() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("index.cairn");
        let storage: DiskStorage<TestNode> = DiskStorage::create(&path).unwrap();

        storage.dispose().unwrap();
        storage.dispose().unwrap();

        assert!(matches!(
            storage.get(&NodeIdentifier::new(region(0.0))),
            Err(SpatialError::Disposed)
        ));
        assert!(matches!(
            storage.put(&sample_node(0.0)),
            Err(SpatialError::Disposed)
        ));
        assert!(matches!(storage.flush(), Err(SpatialError::Disposed)));
    }

    #[test]
    fn test_crc32_reference_values() {
        assert_eq!(crc32(&[]), 0);
        let a = crc32(b"spatial");
        let b = crc32(b"spatial");
        let c = crc32(b"spatia1");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
