//! Reference graph
//!
//! One `RefEdge` per discovered `$ref` node, in discovery order. The
//! order is what makes bundle output deterministic, and the circular
//! flag is fixed at discovery time: circularity is a property of the
//! walked graph, not of any later pass.

use std::collections::HashMap;

use crate::value::NodeId;

/// A resolved `$ref` occurrence
#[derive(Debug, Clone)]
pub struct RefEdge {
    /// The `$ref` node itself
    pub ref_node: NodeId,
    /// Literal `$ref` string
    pub reference: String,
    /// Location of the document containing the ref
    pub source_location: String,
    /// Resolved target node
    pub target: NodeId,
    /// Location of the document containing the target
    pub target_location: String,
    /// Pointer of the target within its document (`""` for the root)
    pub target_pointer: String,
    /// True when the target was on the ancestor stack at discovery
    pub circular: bool,
}

/// All edges discovered by one walk
#[derive(Debug, Default)]
pub struct RefGraph {
    edges: Vec<RefEdge>,
    by_ref_node: HashMap<NodeId, usize>,
}

impl RefGraph {
    pub fn record(&mut self, edge: RefEdge) {
        self.by_ref_node.insert(edge.ref_node, self.edges.len());
        self.edges.push(edge);
    }

    pub fn edges(&self) -> &[RefEdge] {
        &self.edges
    }

    /// The edge whose `$ref` node is `node`, if `node` is one
    pub fn edge_for(&self, node: NodeId) -> Option<&RefEdge> {
        self.by_ref_node.get(&node).map(|&idx| &self.edges[idx])
    }

    pub fn has_circular(&self) -> bool {
        self.edges.iter().any(|e| e.circular)
    }

    /// Literal `$ref` strings of every circular edge, in discovery order
    pub fn circular_refs(&self) -> Vec<&str> {
        self.edges
            .iter()
            .filter(|e| e.circular)
            .map(|e| e.reference.as_str())
            .collect()
    }
}
