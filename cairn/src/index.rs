//! Public surface of a concrete spatial index.

use std::cmp::Ordering;

use crate::error::{SpatialError, SpatialResult};
use crate::node::DataEntry;
use crate::shape::{Point, Region, Shape};
use crate::statistics::StatisticsSnapshot;
use crate::visitor::Visitor;

/// Ranking callback for the comparator-based nearest-neighbor form.
pub type EntryComparator<'a, T> = &'a dyn Fn(&DataEntry<T>, &DataEntry<T>) -> Ordering;

/// Static facts about an index instance.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexProperties {
    /// Dimensionality of every shape in the index.
    pub dimension: usize,
    /// The region the index currently covers.
    pub bounds: Region,
    /// Target number of entries per node, as configured for the flavor.
    pub node_capacity: usize,
}

/// The operations every index flavor exposes to callers.
///
/// Both nearest-neighbor forms default to
/// [`SpatialError::Unsupported`]; flavors that implement ranking override
/// them.
pub trait SpatialIndex<T>: Send + Sync {
    /// Drops every entry and node, keeping the index usable.
    fn clear(&self) -> SpatialResult<()>;

    /// Inserts `item` under `shape`.
    fn insert_data(&self, item: T, shape: Shape) -> SpatialResult<()>;

    /// Visits entries fully enclosed by `query`.
    fn containment_query(&self, query: &Shape, visitor: &mut dyn Visitor<T>) -> SpatialResult<()>;

    /// Visits entries overlapping `query`.
    fn intersection_query(&self, query: &Shape, visitor: &mut dyn Visitor<T>) -> SpatialResult<()>;

    /// Visits entries overlapping `point`.
    fn point_location_query(&self, point: &Point, visitor: &mut dyn Visitor<T>)
        -> SpatialResult<()>;

    /// Visits the `k` entries nearest to `point` by minimum distance.
    fn nearest_neighbor_query(
        &self,
        _k: usize,
        _point: &Point,
        _visitor: &mut dyn Visitor<T>,
    ) -> SpatialResult<()> {
        Err(SpatialError::Unsupported("nearest-neighbor query"))
    }

    /// Visits the `k` entries nearest to `point`, ranked by `comparator`.
    fn nearest_neighbor_query_by(
        &self,
        _k: usize,
        _point: &Point,
        _visitor: &mut dyn Visitor<T>,
        _comparator: EntryComparator<'_, T>,
    ) -> SpatialResult<()> {
        Err(SpatialError::Unsupported("nearest-neighbor query"))
    }

    /// Static facts about this index.
    fn index_properties(&self) -> IndexProperties;

    /// Checks the structural consistency of the index.
    fn is_index_valid(&self) -> SpatialResult<bool>;

    /// Point-in-time copy of the operation counters.
    fn statistics(&self) -> StatisticsSnapshot;

    /// Pushes the resident root and any buffered storage writes to durable
    /// form. Must run before disposal or the root's latest state is lost.
    fn flush(&self) -> SpatialResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::Region;

    struct StubIndex;

    impl SpatialIndex<u64> for StubIndex {
        fn clear(&self) -> SpatialResult<()> {
            Ok(())
        }

        fn insert_data(&self, _item: u64, _shape: Shape) -> SpatialResult<()> {
            Ok(())
        }

        fn containment_query(
            &self,
            _query: &Shape,
            _visitor: &mut dyn Visitor<u64>,
        ) -> SpatialResult<()> {
            Ok(())
        }

        fn intersection_query(
            &self,
            _query: &Shape,
            _visitor: &mut dyn Visitor<u64>,
        ) -> SpatialResult<()> {
            Ok(())
        }

        fn point_location_query(
            &self,
            _point: &Point,
            _visitor: &mut dyn Visitor<u64>,
        ) -> SpatialResult<()> {
            Ok(())
        }

        fn index_properties(&self) -> IndexProperties {
            IndexProperties {
                dimension: 2,
                bounds: Region::new(vec![0.0, 0.0], vec![1.0, 1.0]),
                node_capacity: 8,
            }
        }

        fn is_index_valid(&self) -> SpatialResult<bool> {
            Ok(true)
        }

        fn statistics(&self) -> StatisticsSnapshot {
            StatisticsSnapshot::default()
        }

        fn flush(&self) -> SpatialResult<()> {
            Ok(())
        }
    }

    #[test]
    fn test_nearest_neighbor_defaults_to_unsupported() {
        let index = StubIndex;
        let mut visitor = crate::visitor::CollectingVisitor::new();
        let point = Point::new(vec![0.0, 0.0]);

        assert!(matches!(
            index.nearest_neighbor_query(3, &point, &mut visitor),
            Err(SpatialError::Unsupported(_))
        ));
        assert!(matches!(
            index.nearest_neighbor_query_by(3, &point, &mut visitor, &|a, b| a
                .shape()
                .area()
                .total_cmp(&b.shape().area())),
            Err(SpatialError::Unsupported(_))
        ));
    }
}
