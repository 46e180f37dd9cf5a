//! Two-level grid index over the cairn engine.

use parking_lot::RwLock;

use cairn::engine::{IndexEngine, IndexPolicy, QueryMode};
use cairn::{
    DataEntry, IndexProperties, Node, NodeIdentifier, Point, Region, Shape, SpatialError,
    SpatialIndex, SpatialResult, StatisticsSnapshot, Storage, Visitor, DEFAULT_CACHE_CAPACITY,
};

use crate::node::GridNode;

/// Tuning knobs for [`GridIndex`].
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// Number of tiles along each axis.
    pub tiles_per_axis: usize,
    /// Target number of entries per tile, reported through the index
    /// properties and used by [`GridConfig::sized_for`].
    pub tile_capacity: usize,
    /// Node-cache capacity handed to the engine.
    pub cache_capacity: usize,
}

impl Default for GridConfig {
    fn default() -> GridConfig {
        GridConfig {
            tiles_per_axis: 8,
            tile_capacity: 32,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl GridConfig {
    /// Derives a per-axis tile count so `expected_entries` spread over the
    /// grid at roughly `tile_capacity` entries per tile.
    pub fn sized_for(expected_entries: usize, dimension: usize) -> GridConfig {
        let config = GridConfig::default();
        let tiles = (expected_entries as f64 / config.tile_capacity as f64).max(1.0);
        let per_axis = tiles.powf(1.0 / dimension.max(1) as f64).ceil() as usize;
        GridConfig {
            tiles_per_axis: per_axis.max(1),
            ..config
        }
    }
}

/// The tiling of the current bounds: per-axis subdivision plus the
/// flat (axis-major) numbering of the tiles.
#[derive(Debug, Clone)]
struct GridGeometry {
    bounds: Region,
    tiles_per_axis: usize,
}

impl GridGeometry {
    fn dimension(&self) -> usize {
        self.bounds.dimension()
    }

    fn tile_count(&self) -> usize {
        self.tiles_per_axis.pow(self.dimension() as u32)
    }

    fn axis_width(&self, axis: usize) -> f64 {
        (self.bounds.high()[axis] - self.bounds.low()[axis]) / self.tiles_per_axis as f64
    }

    /// Index of the tile interval containing `coordinate` on `axis`,
    /// clamped so the upper bound lands in the last tile.
    fn axis_index(&self, axis: usize, coordinate: f64) -> usize {
        let width = self.axis_width(axis);
        if width <= 0.0 {
            return 0;
        }
        let offset = coordinate - self.bounds.low()[axis];
        ((offset / width) as usize).min(self.tiles_per_axis - 1)
    }

    /// The tile wholly containing `mbr`, or `None` when it spans tiles.
    fn tile_for(&self, mbr: &Region) -> Option<usize> {
        let mut flat = 0;
        for axis in 0..self.dimension() {
            let low = self.axis_index(axis, mbr.low()[axis]);
            let high = self.axis_index(axis, mbr.high()[axis]);
            if low != high {
                return None;
            }
            flat = flat * self.tiles_per_axis + low;
        }
        Some(flat)
    }

    /// The region of tile `index` under the flat numbering. The last tile
    /// on each axis ends exactly at the bounds, avoiding drift from
    /// accumulated division.
    fn tile_region(&self, index: usize) -> Region {
        let dimension = self.dimension();
        let mut digits = vec![0usize; dimension];
        let mut remainder = index;
        for axis in (0..dimension).rev() {
            digits[axis] = remainder % self.tiles_per_axis;
            remainder /= self.tiles_per_axis;
        }

        let mut low = Vec::with_capacity(dimension);
        let mut high = Vec::with_capacity(dimension);
        for axis in 0..dimension {
            let width = self.axis_width(axis);
            let digit = digits[axis];
            low.push(self.bounds.low()[axis] + digit as f64 * width);
            if digit + 1 == self.tiles_per_axis {
                high.push(self.bounds.high()[axis]);
            } else {
                high.push(self.bounds.low()[axis] + (digit + 1) as f64 * width);
            }
        }
        Region::new(low, high)
    }
}

/// A two-level grid: one root index node over fixed bounds, subdivided into
/// per-axis tiles.
///
/// Entries whose MBR fits inside a single tile live in that tile; entries
/// spanning tiles live on the root itself. Tiles are materialized lazily:
/// their identifiers exist from construction, but a tile's node body is
/// written (and its validity flag flipped) on first insert, so queries skip
/// tiles that never received data. Insertion collapses duplicate
/// `(item, shape)` pairs. An insert outside the bounds grows the index:
/// bounds combine with the new shape's MBR and every entry is redistributed
/// over the rebuilt grid.
///
/// The geometry lock doubles as the insert/grow lock: inserts hold it
/// shared from tile resolution through the node write, growth holds it
/// exclusive across the rebuild, so an insert can never land in a tile
/// whose region a concurrent rebuild has moved out from under it.
pub struct GridIndex<T: Clone + Send + Sync> {
    engine: IndexEngine<GridNode<T>>,
    geometry: RwLock<GridGeometry>,
    config: GridConfig,
}

impl<T> GridIndex<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    /// Creates an empty grid over `bounds` with the default configuration.
    pub fn new(bounds: Region, storage: Box<dyn Storage<GridNode<T>>>) -> SpatialResult<GridIndex<T>> {
        GridIndex::with_config(bounds, GridConfig::default(), storage)
    }

    /// Creates an empty grid over `bounds` with an explicit configuration.
    pub fn with_config(
        bounds: Region,
        config: GridConfig,
        storage: Box<dyn Storage<GridNode<T>>>,
    ) -> SpatialResult<GridIndex<T>> {
        if config.tiles_per_axis == 0 {
            return Err(SpatialError::InvalidOperation(
                "Grid needs at least one tile per axis".into(),
            ));
        }
        let geometry = GridGeometry {
            bounds: bounds.clone(),
            tiles_per_axis: config.tiles_per_axis,
        };
        let root = NodeIdentifier::with_validity(bounds.clone(), true);
        let engine =
            IndexEngine::with_cache_capacity(bounds.dimension(), root.clone(), storage, config.cache_capacity)?;

        let index = GridIndex {
            engine,
            geometry: RwLock::new(geometry),
            config,
        };
        index.build_root(&root, &index.geometry.read())?;
        Ok(index)
    }

    /// Rehydrates a grid over a pre-populated storage, e.g. to reopen a
    /// persisted cache. The storage's recorded bounds locate the root; the
    /// root node restores the tiling and the counters.
    pub fn initialize_from_storage(
        storage: Box<dyn Storage<GridNode<T>>>,
    ) -> SpatialResult<GridIndex<T>> {
        GridIndex::initialize_with_config(GridConfig::default(), storage)
    }

    /// Rehydrates with explicit cache and capacity settings; the tiling
    /// itself always comes from the stored root.
    pub fn initialize_with_config(
        config: GridConfig,
        storage: Box<dyn Storage<GridNode<T>>>,
    ) -> SpatialResult<GridIndex<T>> {
        let engine = IndexEngine::from_storage_with_cache_capacity(storage, config.cache_capacity)?;
        let root_id = engine.root();
        let root = engine
            .read_node(&root_id)?
            .ok_or_else(|| SpatialError::NodeNotFound(root_id.to_string()))?;

        let dimension = engine.dimension();
        let tiles_per_axis = recover_tiles_per_axis(root.children_count(), dimension)?;
        let geometry = GridGeometry {
            bounds: root_id.region().clone(),
            tiles_per_axis,
        };

        let mut nodes = 1u64;
        let mut data = root.data_count() as u64;
        for child in root.children() {
            if !child.is_valid() {
                continue;
            }
            let tile = engine
                .read_node(child)?
                .ok_or_else(|| SpatialError::NodeNotFound(child.to_string()))?;
            nodes += 1;
            data += tile.data_count() as u64;
        }
        engine.statistics().add_nodes(nodes);
        engine.statistics().add_data(data);

        log::debug!(
            "reopened grid index: {} tiles per axis, {} entries",
            tiles_per_axis,
            data
        );
        let config = GridConfig {
            tiles_per_axis,
            ..config
        };
        Ok(GridIndex {
            engine,
            geometry: RwLock::new(geometry),
            config,
        })
    }

    /// The engine driving this index.
    pub fn engine(&self) -> &IndexEngine<GridNode<T>> {
        &self.engine
    }

    /// Writes a fresh root node with one not-yet-valid identifier per tile.
    /// Callers pass the geometry they already hold locked.
    fn build_root(&self, root: &NodeIdentifier, geometry: &GridGeometry) -> SpatialResult<()> {
        let children = (0..geometry.tile_count())
            .map(|tile| NodeIdentifier::new(geometry.tile_region(tile)))
            .collect();
        self.engine.write_node(GridNode::index(root.clone(), children))?;
        self.engine.statistics().add_nodes(1);
        self.engine.storage().set_bounds(&geometry.bounds)?;
        Ok(())
    }

    fn root_node(&self, engine: &IndexEngine<GridNode<T>>) -> SpatialResult<GridNode<T>> {
        let root_id = engine.root();
        engine
            .read_node(&root_id)?
            .ok_or_else(|| SpatialError::NodeNotFound(root_id.to_string()))
    }

    /// Routes `entry` to its tile, or to the root when it spans tiles. The
    /// caller holds the geometry lock (shared or exclusive), so the tile
    /// numbering cannot shift between resolution and the node write.
    fn insert_locked(
        &self,
        engine: &IndexEngine<GridNode<T>>,
        geometry: &GridGeometry,
        entry: DataEntry<T>,
    ) -> SpatialResult<()> {
        match geometry.tile_for(&entry.shape().mbr()) {
            Some(tile) => self.insert_into_tile(engine, tile, entry),
            None => self.insert_into_root(engine, entry),
        }
    }

    /// Adds `entry` to the tile at `tile`, materializing the tile's node on
    /// first insert. Holds the tile's write lock for the read-modify-write.
    fn insert_into_tile(
        &self,
        engine: &IndexEngine<GridNode<T>>,
        tile: usize,
        entry: DataEntry<T>,
    ) -> SpatialResult<()> {
        let root = self.root_node(engine)?;
        let tile_id = root.children()[tile].clone();
        let _guard = tile_id.write_lock()?;

        let materialize = !tile_id.is_valid();
        let mut node = if materialize {
            GridNode::leaf(tile_id.clone())
        } else {
            engine
                .read_node_for_update(&tile_id)?
                .ok_or_else(|| SpatialError::NodeNotFound(tile_id.to_string()))?
        };
        if node.entries().contains(&entry) {
            return Ok(());
        }
        node.entries_mut().push(entry);
        engine.write_node(node)?;

        if materialize {
            tile_id.set_valid(true);
            engine.statistics().add_nodes(1);
        }
        engine.statistics().add_data(1);
        Ok(())
    }

    /// Adds a spanning entry to the root's own data list.
    fn insert_into_root(
        &self,
        engine: &IndexEngine<GridNode<T>>,
        entry: DataEntry<T>,
    ) -> SpatialResult<()> {
        let root_id = engine.root();
        let _guard = root_id.write_lock()?;

        let mut root = engine
            .read_node_for_update(&root_id)?
            .ok_or_else(|| SpatialError::NodeNotFound(root_id.to_string()))?;
        if root.entries().contains(&entry) {
            return Ok(());
        }
        root.entries_mut().push(entry);
        engine.write_node(root)?;
        engine.statistics().add_data(1);
        Ok(())
    }

    /// Grows the index: bounds combine with the new entry's MBR, the grid
    /// is rebuilt over the combined bounds and every entry redistributed.
    ///
    /// The geometry write lock is held across the whole rebuild, excluding
    /// every concurrent insert and grow. A grow that lost the race finds
    /// bounds already covering its entry and inserts normally.
    fn grow(&self, engine: &IndexEngine<GridNode<T>>, entry: DataEntry<T>) -> SpatialResult<()> {
        let mut geometry = self.geometry.write();
        if Shape::from(geometry.bounds.clone()).contains(entry.shape()) {
            return self.insert_locked(engine, &geometry, entry);
        }

        let root_id = engine.root();
        let _guard = root_id.write_lock()?;

        let root = self.root_node(engine)?;
        let mut entries: Vec<DataEntry<T>> = root.entries().to_vec();
        for child in root.children() {
            if !child.is_valid() {
                continue;
            }
            let tile = engine
                .read_node(child)?
                .ok_or_else(|| SpatialError::NodeNotFound(child.to_string()))?;
            entries.extend(tile.entries().iter().cloned());
        }

        let mut bounds = geometry.bounds.clone();
        bounds.combine(&entry.shape().mbr());
        log::info!(
            "growing grid index from {} to {}",
            root_id.region(),
            bounds
        );
        entries.push(entry);

        engine.clear()?;
        let new_root = NodeIdentifier::with_validity(bounds.clone(), true);
        geometry.bounds = bounds;
        engine.set_root(new_root.clone())?;
        self.build_root(&new_root, &geometry)?;

        for entry in entries {
            self.insert_locked(engine, &geometry, entry)?;
        }
        Ok(())
    }
}

impl<T> IndexPolicy<GridNode<T>, T> for GridIndex<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn insert(&self, engine: &IndexEngine<GridNode<T>>, entry: DataEntry<T>) -> SpatialResult<()> {
        // held until the entry lands, so a concurrent grow cannot remap
        // the tile numbering mid-insert
        let geometry = self.geometry.read();
        self.insert_locked(engine, &geometry, entry)
    }

    fn insert_out_of_bounds(
        &self,
        engine: &IndexEngine<GridNode<T>>,
        entry: DataEntry<T>,
    ) -> SpatialResult<()> {
        self.grow(engine, entry)
    }

    fn visit_data(
        &self,
        node: &GridNode<T>,
        query: &Shape,
        mode: QueryMode,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        for entry in node.entries() {
            if mode.matches(query, entry.shape()) {
                visitor.visit_data(entry);
            }
        }
        Ok(())
    }

    /// Verifies the stored tiling against the configured geometry: child
    /// count, per-tile regions and containment in the root bounds.
    fn is_index_valid(&self, engine: &IndexEngine<GridNode<T>>) -> SpatialResult<bool> {
        let geometry = self.geometry.read().clone();
        let root_id = engine.root();
        if *root_id.region() != geometry.bounds {
            return Ok(false);
        }
        let root = match engine.read_node(&root_id)? {
            Some(root) => root,
            None => return Ok(false),
        };
        if root.children_count() != geometry.tile_count() {
            return Ok(false);
        }
        for (tile, child) in root.children().iter().enumerate() {
            let expected = geometry.tile_region(tile);
            if *child.region() != expected || !geometry.bounds.contains_region(&expected) {
                return Ok(false);
            }
        }
        Ok(true)
    }
}

impl<T> SpatialIndex<T> for GridIndex<T>
where
    T: Clone + PartialEq + Send + Sync,
{
    fn clear(&self) -> SpatialResult<()> {
        let geometry = self.geometry.read();
        let root = self.engine.root();
        self.engine.clear()?;
        self.build_root(&root, &geometry)
    }

    fn insert_data(&self, item: T, shape: Shape) -> SpatialResult<()> {
        self.engine.insert_data(self, item, shape)
    }

    fn containment_query(&self, query: &Shape, visitor: &mut dyn Visitor<T>) -> SpatialResult<()> {
        self.engine.containment_query(query, self, visitor)
    }

    fn intersection_query(&self, query: &Shape, visitor: &mut dyn Visitor<T>) -> SpatialResult<()> {
        self.engine.intersection_query(query, self, visitor)
    }

    fn point_location_query(
        &self,
        point: &Point,
        visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        self.engine.point_location_query(point, self, visitor)
    }

    fn index_properties(&self) -> IndexProperties {
        IndexProperties {
            dimension: self.engine.dimension(),
            bounds: self.geometry.read().bounds.clone(),
            node_capacity: self.config.tile_capacity,
        }
    }

    fn is_index_valid(&self) -> SpatialResult<bool> {
        IndexPolicy::is_index_valid(self, &self.engine)
    }

    fn statistics(&self) -> StatisticsSnapshot {
        self.engine.statistics().snapshot()
    }

    fn flush(&self) -> SpatialResult<()> {
        self.engine.flush()
    }
}

fn recover_tiles_per_axis(tile_count: usize, dimension: usize) -> SpatialResult<usize> {
    let per_axis = (tile_count as f64)
        .powf(1.0 / dimension.max(1) as f64)
        .round() as usize;
    if per_axis == 0 || per_axis.pow(dimension as u32) != tile_count {
        return Err(SpatialError::InvalidOperation(format!(
            "Stored root has {} tiles, not a {}-dimensional grid",
            tile_count, dimension
        )));
    }
    Ok(per_axis)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(low: &[f64], high: &[f64], tiles: usize) -> GridGeometry {
        GridGeometry {
            bounds: Region::new(low.to_vec(), high.to_vec()),
            tiles_per_axis: tiles,
        }
    }

    #[test]
    fn test_tile_count_and_regions_tile_the_bounds() {
        let geometry = geometry(&[0.0, 0.0], &[8.0, 8.0], 4);
        assert_eq!(geometry.tile_count(), 16);

        let combined =
            Region::combined_all(&(0..16).map(|i| geometry.tile_region(i)).collect::<Vec<_>>());
        assert_eq!(combined, geometry.bounds);

        // first and last tiles sit exactly on the corners
        assert_eq!(
            geometry.tile_region(0),
            Region::new(vec![0.0, 0.0], vec![2.0, 2.0])
        );
        assert_eq!(
            geometry.tile_region(15),
            Region::new(vec![6.0, 6.0], vec![8.0, 8.0])
        );
    }

    #[test]
    fn test_tile_for_single_tile_and_spanning() {
        let geometry = geometry(&[0.0, 0.0], &[8.0, 8.0], 4);

        let inside = Region::new(vec![0.5, 0.5], vec![1.5, 1.5]);
        assert_eq!(geometry.tile_for(&inside), Some(0));

        let far_corner = Region::new(vec![7.0, 7.0], vec![8.0, 8.0]);
        assert_eq!(geometry.tile_for(&far_corner), Some(15));

        let spanning = Region::new(vec![1.5, 0.5], vec![2.5, 1.5]);
        assert_eq!(geometry.tile_for(&spanning), None);
    }

    #[test]
    fn test_tile_for_round_trips_with_tile_region() {
        let geometry = geometry(&[-4.0, 2.0, 0.0], &[4.0, 10.0, 16.0], 3);
        for tile in 0..geometry.tile_count() {
            let region = geometry.tile_region(tile);
            // a shape hugging the tile's center maps back to the tile
            let center = region.center();
            let probe = Region::from_point(&center);
            assert_eq!(geometry.tile_for(&probe), Some(tile));
        }
    }

    #[test]
    fn test_degenerate_axis_collapses_to_first_tile() {
        let geometry = geometry(&[0.0, 0.0], &[0.0, 8.0], 4);
        // x-axis has zero width, so only the y coordinate picks the tile
        let probe = Region::new(vec![0.0, 4.5], vec![0.0, 5.0]);
        assert_eq!(geometry.tile_for(&probe), Some(2));
    }

    #[test]
    fn test_sized_for_scales_with_expected_entries() {
        assert_eq!(GridConfig::sized_for(10, 2).tiles_per_axis, 1);
        assert_eq!(GridConfig::sized_for(32 * 64, 2).tiles_per_axis, 8);
        assert!(GridConfig::sized_for(1_000_000, 2).tiles_per_axis > 8);
    }

    #[test]
    fn test_recover_tiles_per_axis() {
        assert_eq!(recover_tiles_per_axis(64, 2).unwrap(), 8);
        assert_eq!(recover_tiles_per_axis(27, 3).unwrap(), 3);
        assert_eq!(recover_tiles_per_axis(1, 2).unwrap(), 1);
        assert!(recover_tiles_per_axis(60, 2).is_err());
    }
}
