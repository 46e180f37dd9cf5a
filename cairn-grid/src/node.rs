//! Node representation of the two-level grid.

use serde::{Deserialize, Serialize};

use cairn::{DataEntry, Node, NodeIdentifier};

/// A node of the grid index.
///
/// The tree is exactly two levels: one `Index` root spanning the whole
/// bounds, whose children are the `Leaf` tiles. Entries spanning more than
/// one tile live directly on the root; everything else lives in the tile
/// containing its MBR.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum GridNode<T> {
    /// The root: one child identifier per tile, plus the spanning entries.
    Index {
        identifier: NodeIdentifier,
        children: Vec<NodeIdentifier>,
        entries: Vec<DataEntry<T>>,
    },
    /// One tile.
    Leaf {
        identifier: NodeIdentifier,
        entries: Vec<DataEntry<T>>,
    },
}

impl<T> GridNode<T> {
    pub fn index(identifier: NodeIdentifier, children: Vec<NodeIdentifier>) -> GridNode<T> {
        GridNode::Index {
            identifier,
            children,
            entries: Vec::new(),
        }
    }

    pub fn leaf(identifier: NodeIdentifier) -> GridNode<T> {
        GridNode::Leaf {
            identifier,
            entries: Vec::new(),
        }
    }

    /// Entries held directly by this node.
    pub fn entries(&self) -> &[DataEntry<T>] {
        match self {
            GridNode::Index { entries, .. } => entries,
            GridNode::Leaf { entries, .. } => entries,
        }
    }

    pub(crate) fn entries_mut(&mut self) -> &mut Vec<DataEntry<T>> {
        match self {
            GridNode::Index { entries, .. } => entries,
            GridNode::Leaf { entries, .. } => entries,
        }
    }

    /// Tile identifiers; empty for a leaf.
    pub fn children(&self) -> &[NodeIdentifier] {
        match self {
            GridNode::Index { children, .. } => children,
            GridNode::Leaf { .. } => &[],
        }
    }
}

impl<T: Send + Sync> Node for GridNode<T> {
    fn identifier(&self) -> &NodeIdentifier {
        match self {
            GridNode::Index { identifier, .. } => identifier,
            GridNode::Leaf { identifier, .. } => identifier,
        }
    }

    fn level(&self) -> u32 {
        match self {
            GridNode::Index { .. } => 1,
            GridNode::Leaf { .. } => 0,
        }
    }

    fn children_count(&self) -> usize {
        self.children().len()
    }

    fn child_identifier(&self, index: usize) -> &NodeIdentifier {
        &self.children()[index]
    }

    fn data_count(&self) -> usize {
        self.entries().len()
    }

    fn clear(&mut self) {
        match self {
            GridNode::Index {
                children, entries, ..
            } => {
                children.clear();
                entries.clear();
            }
            GridNode::Leaf { entries, .. } => entries.clear(),
        }
    }
}
