//! Visitor callbacks driven by query traversal.

use crate::node::{DataEntry, Node};

/// Callback protocol for query traversal.
///
/// [`visit_node`](Visitor::visit_node) fires once for every node whose
/// region intersects the query, in depth-first order.
/// [`visit_data`](Visitor::visit_data) fires for every matching data entry,
/// but only when [`is_data_visitor`](Visitor::is_data_visitor) returns true;
/// returning false skips the per-entry predicate checks entirely, which is
/// the cheap path for callers interested in node-level callbacks only.
pub trait Visitor<T> {
    /// Called for every traversed node.
    fn visit_node(&mut self, node: &dyn Node);

    /// Called for every data entry matching the query predicate.
    fn visit_data(&mut self, data: &DataEntry<T>);

    /// Gates the per-entry filtering cost.
    fn is_data_visitor(&self) -> bool {
        true
    }
}

/// A visitor that collects matched entries and counts visited nodes.
#[derive(Debug)]
pub struct CollectingVisitor<T> {
    entries: Vec<DataEntry<T>>,
    nodes_visited: usize,
}

impl<T> CollectingVisitor<T> {
    pub fn new() -> CollectingVisitor<T> {
        CollectingVisitor {
            entries: Vec::new(),
            nodes_visited: 0,
        }
    }

    /// Returns the entries matched so far.
    pub fn entries(&self) -> &[DataEntry<T>] {
        &self.entries
    }

    /// Consumes the visitor and returns the matched entries.
    pub fn into_entries(self) -> Vec<DataEntry<T>> {
        self.entries
    }

    /// Returns how many nodes the traversal touched.
    pub fn nodes_visited(&self) -> usize {
        self.nodes_visited
    }
}

impl<T> Default for CollectingVisitor<T> {
    fn default() -> Self {
        CollectingVisitor::new()
    }
}

impl<T: Clone> Visitor<T> for CollectingVisitor<T> {
    fn visit_node(&mut self, _node: &dyn Node) {
        self.nodes_visited += 1;
    }

    fn visit_data(&mut self, data: &DataEntry<T>) {
        self.entries.push(data.clone());
    }
}
