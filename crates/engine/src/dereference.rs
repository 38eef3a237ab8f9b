//! Dereferencer
//!
//! Second, graph-informed pass: rewrites container child pointers from
//! ref nodes to their resolved targets, by identity. Installing the
//! target's own `NodeId` (never a copy) is what keeps shared subtrees
//! shared and lets circular chains become real cycles in the arena.

use oas_refs_common::{ApiError, CircularPolicy, Result};
use std::collections::HashSet;

use crate::graph::RefGraph;
use crate::value::{Arena, Node, NodeId};

/// Apply the circular policy and replace `$ref` nodes throughout the
/// tree reachable from `root`. Returns the (possibly new) root.
pub fn dereference(
    arena: &mut Arena,
    graph: &RefGraph,
    root: NodeId,
    policy: CircularPolicy,
) -> Result<NodeId> {
    if policy == CircularPolicy::Forbid && graph.has_circular() {
        return Err(ApiError::CircularReference);
    }

    let new_root = replacement(graph, root, policy).unwrap_or(root);
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut pending = vec![new_root];
    while let Some(node) = pending.pop() {
        if !visited.insert(node) {
            continue;
        }
        let rewritten: Vec<NodeId> = match arena.get(node) {
            Node::Object(members) => members
                .iter()
                .map(|(_, child)| replacement(graph, *child, policy).unwrap_or(*child))
                .collect(),
            Node::Array(items) => items
                .iter()
                .map(|child| replacement(graph, *child, policy).unwrap_or(*child))
                .collect(),
            _ => continue,
        };
        match arena.get_mut(node) {
            Node::Object(members) => {
                for ((_, child), new_child) in members.iter_mut().zip(&rewritten) {
                    *child = *new_child;
                }
            }
            Node::Array(items) => {
                for (child, new_child) in items.iter_mut().zip(&rewritten) {
                    *child = *new_child;
                }
            }
            _ => {}
        }
        pending.extend(rewritten);
    }
    Ok(new_root)
}

/// What a child pointer at `node` should become, if `node` is a ref
/// node that the policy replaces. Follows ref-to-ref chains, stopping
/// at ref nodes the policy keeps and guarding against ref-only cycles.
fn replacement(graph: &RefGraph, node: NodeId, policy: CircularPolicy) -> Option<NodeId> {
    let edge = graph.edge_for(node)?;
    if edge.circular && policy == CircularPolicy::Ignore {
        return None;
    }
    let mut seen: HashSet<NodeId> = HashSet::new();
    seen.insert(node);
    let mut current = edge;
    loop {
        let target = current.target;
        match graph.edge_for(target) {
            Some(next) if !(next.circular && policy == CircularPolicy::Ignore) => {
                if !seen.insert(target) {
                    return Some(target);
                }
                current = next;
            }
            _ => return Some(target),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::RefEdge;
    use serde_json::json;

    fn edge(ref_node: NodeId, target: NodeId, circular: bool) -> RefEdge {
        RefEdge {
            ref_node,
            reference: "x".to_string(),
            source_location: "/spec.yaml".to_string(),
            target,
            target_location: "/spec.yaml".to_string(),
            target_pointer: String::new(),
            circular,
        }
    }

    #[test]
    fn test_non_circular_refs_are_replaced_by_identity() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({
            "a": {"$ref": "#/target"},
            "b": {"$ref": "#/target"},
            "target": {"type": "object"}
        }));
        let a = arena.member(root, "a").unwrap();
        let b = arena.member(root, "b").unwrap();
        let target = arena.member(root, "target").unwrap();

        let mut graph = RefGraph::default();
        graph.record(edge(a, target, false));
        graph.record(edge(b, target, false));

        let new_root = dereference(&mut arena, &graph, root, CircularPolicy::Allow).unwrap();
        assert_eq!(new_root, root);
        assert_eq!(arena.member(root, "a").unwrap(), target);
        assert_eq!(arena.member(root, "b").unwrap(), target);
    }

    #[test]
    fn test_forbid_fails_only_when_a_cycle_exists() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({"a": {"$ref": "#/b"}, "b": {}}));
        let a = arena.member(root, "a").unwrap();
        let b = arena.member(root, "b").unwrap();

        let mut acyclic = RefGraph::default();
        acyclic.record(edge(a, b, false));
        assert!(dereference(&mut arena, &acyclic, root, CircularPolicy::Forbid).is_ok());

        let mut cyclic = RefGraph::default();
        cyclic.record(edge(a, root, true));
        let err = dereference(&mut arena, &cyclic, root, CircularPolicy::Forbid).unwrap_err();
        assert_eq!(err.to_string(), "The API contains circular references");
    }

    #[test]
    fn test_ignore_keeps_circular_ref_nodes() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({
            "a": {"$ref": "#"},
            "b": {"$ref": "#/c"},
            "c": {"type": "object"}
        }));
        let a = arena.member(root, "a").unwrap();
        let b = arena.member(root, "b").unwrap();
        let c = arena.member(root, "c").unwrap();

        let mut graph = RefGraph::default();
        graph.record(edge(a, root, true));
        graph.record(edge(b, c, false));

        dereference(&mut arena, &graph, root, CircularPolicy::Ignore).unwrap();
        // Circular ref untouched, non-circular ref replaced
        assert_eq!(arena.member(root, "a").unwrap(), a);
        assert!(arena.ref_string(a).is_some());
        assert_eq!(arena.member(root, "b").unwrap(), c);
    }

    #[test]
    fn test_allow_materializes_cycles() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({
            "person": {"properties": {"spouse": {"$ref": "#/person"}}}
        }));
        let person = arena.member(root, "person").unwrap();
        let props = arena.member(person, "properties").unwrap();
        let spouse_ref = arena.member(props, "spouse").unwrap();

        let mut graph = RefGraph::default();
        graph.record(edge(spouse_ref, person, true));

        dereference(&mut arena, &graph, root, CircularPolicy::Allow).unwrap();
        assert_eq!(arena.member(props, "spouse").unwrap(), person);
        // The cycle is real: export must refuse it
        assert!(arena.export(root).is_err());
    }
}
