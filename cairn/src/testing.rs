//! Shared fixtures for unit tests.

use serde::{Deserialize, Serialize};

use crate::identifier::NodeIdentifier;
use crate::node::{DataEntry, Node};
use crate::shape::{Region, Shape};

/// Minimal concrete node used by tests across the crate. Payload type is
/// fixed to `String`; `padding` exists so storage tests can force nodes
/// across page boundaries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub(crate) struct TestNode {
    identifier: NodeIdentifier,
    children: Vec<NodeIdentifier>,
    entries: Vec<DataEntry<String>>,
    level: u32,
    padding: Vec<u8>,
}

impl TestNode {
    pub(crate) fn leaf(region: Region) -> TestNode {
        TestNode::leaf_for(NodeIdentifier::with_validity(region, true))
    }

    pub(crate) fn leaf_for(identifier: NodeIdentifier) -> TestNode {
        TestNode {
            identifier,
            children: Vec::new(),
            entries: Vec::new(),
            level: 0,
            padding: Vec::new(),
        }
    }

    pub(crate) fn index(region: Region, level: u32, children: Vec<NodeIdentifier>) -> TestNode {
        TestNode::index_for(
            NodeIdentifier::with_validity(region, true),
            level,
            children,
        )
    }

    pub(crate) fn index_for(
        identifier: NodeIdentifier,
        level: u32,
        children: Vec<NodeIdentifier>,
    ) -> TestNode {
        TestNode {
            identifier,
            children,
            entries: Vec::new(),
            level,
            padding: Vec::new(),
        }
    }

    pub(crate) fn with_entries(mut self, entries: Vec<(&str, Shape)>) -> TestNode {
        self.entries = entries
            .into_iter()
            .map(|(item, shape)| DataEntry::new(item.to_string(), shape))
            .collect();
        self
    }

    pub(crate) fn with_padding(mut self, bytes: usize) -> TestNode {
        self.padding = vec![0xAB; bytes];
        self
    }

    pub(crate) fn entries(&self) -> &[DataEntry<String>] {
        &self.entries
    }
}

impl Node for TestNode {
    fn identifier(&self) -> &NodeIdentifier {
        &self.identifier
    }

    fn level(&self) -> u32 {
        self.level
    }

    fn children_count(&self) -> usize {
        self.children.len()
    }

    fn child_identifier(&self, index: usize) -> &NodeIdentifier {
        &self.children[index]
    }

    fn data_count(&self) -> usize {
        self.entries.len()
    }

    fn clear(&mut self) {
        self.children.clear();
        self.entries.clear();
    }
}
