//! Tree-node and data-entry abstractions.

use serde::{Deserialize, Serialize};

use crate::identifier::NodeIdentifier;
use crate::shape::Shape;

/// A tree node, either an index (internal) node or a leaf.
///
/// Concrete index flavors supply the node representation; the engine and
/// the storage backends see it only through this trait plus whatever
/// serialization bounds the chosen backend adds.
pub trait Node: Send + Sync {
    /// The identifier naming this node.
    fn identifier(&self) -> &NodeIdentifier;

    /// Height above the leaf level; leaves are at level 0.
    fn level(&self) -> u32;

    /// True for leaf nodes.
    fn is_leaf(&self) -> bool {
        self.level() == 0
    }

    /// True for index (internal) nodes.
    fn is_index(&self) -> bool {
        !self.is_leaf()
    }

    /// Number of child nodes; 0 for leaves.
    fn children_count(&self) -> usize;

    /// The identifier of the child at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.children_count()`.
    fn child_identifier(&self, index: usize) -> &NodeIdentifier;

    /// Number of data entries stored directly on this node.
    fn data_count(&self) -> usize;

    /// Drops all children and data entries.
    fn clear(&mut self);
}

/// A datum held by the index: a payload together with the shape it was
/// inserted under.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataEntry<T> {
    shape: Shape,
    item: T,
}

impl<T> DataEntry<T> {
    /// Creates an entry pairing `item` with `shape`.
    pub fn new(item: T, shape: Shape) -> DataEntry<T> {
        DataEntry { shape, item }
    }

    /// Returns the shape this entry was inserted under.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Returns the payload.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// Consumes the entry and returns the payload.
    pub fn into_item(self) -> T {
        self.item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::{Point, Region};
    use crate::testing::TestNode;

    #[test]
    fn test_leaf_and_index_follow_level() {
        let leaf = TestNode::leaf(Region::new(vec![0.0, 0.0], vec![1.0, 1.0]));
        assert!(leaf.is_leaf());
        assert!(!leaf.is_index());

        let index = TestNode::index(Region::new(vec![0.0, 0.0], vec![4.0, 4.0]), 1, vec![]);
        assert!(index.is_index());
        assert!(!index.is_leaf());
    }

    #[test]
    #[should_panic]
    fn test_child_identifier_out_of_bounds() {
        let leaf = TestNode::leaf(Region::new(vec![0.0, 0.0], vec![1.0, 1.0]));
        leaf.child_identifier(0);
    }

    #[test]
    fn test_data_entry_accessors() {
        let shape = Shape::from(Point::new(vec![1.0, 2.0]));
        let entry = DataEntry::new("payload".to_string(), shape.clone());
        assert_eq!(entry.shape(), &shape);
        assert_eq!(entry.item(), "payload");
        assert_eq!(entry.into_item(), "payload");
    }

    #[test]
    fn test_data_entry_serde_round_trip() {
        let entry = DataEntry::new(
            42u64,
            Shape::from(Region::new(vec![0.0, 0.0], vec![2.0, 2.0])),
        );
        let json = serde_json::to_string(&entry).unwrap();
        let back: DataEntry<u64> = serde_json::from_str(&json).unwrap();
        assert_eq!(entry, back);
    }
}
