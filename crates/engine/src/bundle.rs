//! Bundler
//!
//! Produces a self-contained document: every external target is inlined
//! exactly once under the root `definitions` container and every
//! external `$ref` string is rewritten to point there. Inlined entries
//! share arena nodes with their source documents (no deep copy), and
//! internal refs are left untouched.

use oas_refs_common::{ApiError, Result};
use std::collections::HashMap;

use crate::graph::RefGraph;
use crate::location;
use crate::pointer;
use crate::value::{Arena, Node, NodeId};

const CONTAINER: &str = "definitions";

/// Inline external targets and rewrite external refs. Returns the root,
/// which now resolves without any further document acquisition.
pub fn bundle(
    arena: &mut Arena,
    graph: &RefGraph,
    root: NodeId,
    root_location: &str,
) -> Result<NodeId> {
    let edges: Vec<_> = graph.edges().to_vec();

    for edge in edges.iter().filter(|e| e.target_location == root_location) {
        // Internal target spelled with an explicit location part still
        // needs a local spelling to be self-contained
        let (loc_part, _) = pointer::split_ref(&edge.reference);
        if !loc_part.is_empty() {
            set_ref_string(arena, edge.ref_node, format!("#{}", edge.target_pointer));
        }
    }

    let externals: Vec<_> = edges
        .iter()
        .filter(|e| e.target_location != root_location)
        .collect();
    if externals.is_empty() {
        return Ok(root);
    }

    let container = container_node(arena, root, root_location)?;

    // Synthetic key per distinct (location, pointer) target
    let mut assigned: HashMap<(String, String), String> = HashMap::new();
    for edge in externals {
        let target_key = (edge.target_location.clone(), edge.target_pointer.clone());
        let key = match assigned.get(&target_key) {
            Some(key) => key.clone(),
            None => {
                let key = inline_target(arena, graph, container, edge, &target_key)?;
                assigned.insert(target_key, key.clone());
                key
            }
        };
        set_ref_string(
            arena,
            edge.ref_node,
            format!("#/{CONTAINER}/{}", pointer::escape_token(&key)),
        );
    }
    Ok(root)
}

/// Place one external target into the container and return its key.
///
/// When the container already holds a `$ref` to the same target (the
/// common "definitions mirror the external files" layout), the inline
/// replaces that entry in place instead of minting a second copy.
fn inline_target(
    arena: &mut Arena,
    graph: &RefGraph,
    container: NodeId,
    edge: &crate::graph::RefEdge,
    target_key: &(String, String),
) -> Result<String> {
    let members: Vec<(String, NodeId)> = match arena.get(container) {
        Node::Object(members) => members.clone(),
        _ => Vec::new(),
    };
    for (key, value) in &members {
        if let Some(existing) = graph.edge_for(*value) {
            if existing.target_location == target_key.0 && existing.target_pointer == target_key.1 {
                set_member(arena, container, key, edge.target);
                return Ok(key.clone());
            }
        }
    }

    let base = if edge.target_pointer.is_empty() {
        location::stem(&edge.target_location)
    } else {
        pointer::parse_pointer(&edge.target_pointer)?
            .pop()
            .unwrap_or_else(|| location::stem(&edge.target_location))
    };
    let mut key = base.clone();
    let mut suffix = 2;
    while arena.member(container, &key).is_some() {
        key = format!("{base}_{suffix}");
        suffix += 1;
    }
    if let Node::Object(members) = arena.get_mut(container) {
        members.push((key.clone(), edge.target));
    }
    Ok(key)
}

/// The root `definitions` object, created on demand
fn container_node(arena: &mut Arena, root: NodeId, root_location: &str) -> Result<NodeId> {
    match arena.member(root, CONTAINER) {
        Some(existing) => match arena.get(existing) {
            Node::Object(_) => Ok(existing),
            _ => Err(ApiError::Parse {
                location: root_location.to_string(),
                detail: format!("cannot bundle: \"{CONTAINER}\" is not an object"),
            }),
        },
        None => match arena.get(root) {
            Node::Object(_) => {
                let container = arena.alloc(Node::Object(Vec::new()));
                if let Node::Object(members) = arena.get_mut(root) {
                    members.push((CONTAINER.to_string(), container));
                }
                Ok(container)
            }
            _ => Err(ApiError::Parse {
                location: root_location.to_string(),
                detail: "cannot bundle: document root is not an object".to_string(),
            }),
        },
    }
}

fn set_member(arena: &mut Arena, object: NodeId, key: &str, new_child: NodeId) {
    if let Node::Object(members) = arena.get_mut(object) {
        if let Some(slot) = members.iter_mut().find(|(k, _)| k == key) {
            slot.1 = new_child;
        }
    }
}

fn set_ref_string(arena: &mut Arena, ref_node: NodeId, new_ref: String) {
    let value_id = match arena.get(ref_node) {
        Node::Object(members) => members
            .iter()
            .find(|(k, _)| k == "$ref")
            .map(|(_, v)| *v),
        _ => None,
    };
    if let Some(value_id) = value_id {
        *arena.get_mut(value_id) = Node::String(new_ref);
    }
}
