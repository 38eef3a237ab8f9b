//! Arena-backed document tree
//!
//! Every document loaded during a top-level operation shares one arena.
//! Nodes address each other by `NodeId`, so two parents can point at the
//! same child, and a cycle is simply an edge back to a slot that is
//! already an ancestor. This is what lets the dereferencer install
//! shared targets by identity instead of cloning them.

use oas_refs_common::{ApiError, Result};
use serde_json::Value;
use std::collections::HashMap;

use crate::pointer;

/// Handle to a node in the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// A single document tree node
#[derive(Debug, Clone)]
pub enum Node {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    /// Sequence of child nodes in index order
    Array(Vec<NodeId>),
    /// Mapping members in document order
    Object(Vec<(String, NodeId)>),
}

/// Slot-addressed storage for document trees
#[derive(Debug, Default)]
pub struct Arena {
    nodes: Vec<Node>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, node: Node) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.0]
    }

    /// Import a parsed `serde_json::Value` tree, returning its root
    pub fn import(&mut self, value: &Value) -> NodeId {
        match value {
            Value::Null => self.alloc(Node::Null),
            Value::Bool(b) => self.alloc(Node::Bool(*b)),
            Value::Number(n) => self.alloc(Node::Number(n.clone())),
            Value::String(s) => self.alloc(Node::String(s.clone())),
            Value::Array(items) => {
                let children: Vec<NodeId> = items.iter().map(|v| self.import(v)).collect();
                self.alloc(Node::Array(children))
            }
            Value::Object(members) => {
                let children: Vec<(String, NodeId)> = members
                    .iter()
                    .map(|(k, v)| (k.clone(), self.import(v)))
                    .collect();
                self.alloc(Node::Object(children))
            }
        }
    }

    /// The `$ref` string of a reference node, if `id` is one
    pub fn ref_string(&self, id: NodeId) -> Option<&str> {
        match self.get(id) {
            Node::Object(members) => members.iter().find_map(|(k, v)| {
                if k == "$ref" {
                    match self.get(*v) {
                        Node::String(s) => Some(s.as_str()),
                        _ => None,
                    }
                } else {
                    None
                }
            }),
            _ => None,
        }
    }

    /// Look up an object member by key
    pub fn member(&self, id: NodeId, key: &str) -> Option<NodeId> {
        match self.get(id) {
            Node::Object(members) => members
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, child)| *child),
            _ => None,
        }
    }

    /// Export a subtree back to `serde_json::Value`.
    ///
    /// Fails when the subtree contains a live cycle, since a `Value`
    /// tree cannot represent one.
    pub fn export(&self, root: NodeId) -> Result<Value> {
        let mut on_stack = vec![false; self.nodes.len()];
        self.export_inner(root, &mut on_stack)
    }

    fn export_inner(&self, id: NodeId, on_stack: &mut [bool]) -> Result<Value> {
        if on_stack[id.0] {
            return Err(ApiError::CircularReference);
        }
        on_stack[id.0] = true;
        let value = match self.get(id) {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(self.export_inner(*item, on_stack)?);
                }
                Value::Array(out)
            }
            Node::Object(members) => {
                let mut out = serde_json::Map::with_capacity(members.len());
                for (key, child) in members {
                    out.insert(key.clone(), self.export_inner(*child, on_stack)?);
                }
                Value::Object(out)
            }
        };
        on_stack[id.0] = false;
        Ok(value)
    }

    /// Export a subtree, re-emitting each back-edge as a `$ref` node
    /// pointing at the first occurrence of its target.
    ///
    /// Shared but acyclic subtrees are duplicated, matching what a
    /// plain serialization of the structure would contain.
    pub fn export_lossy(&self, root: NodeId) -> Value {
        let mut on_stack: HashMap<NodeId, String> = HashMap::new();
        self.export_lossy_inner(root, String::new(), &mut on_stack)
    }

    fn export_lossy_inner(
        &self,
        id: NodeId,
        path: String,
        on_stack: &mut HashMap<NodeId, String>,
    ) -> Value {
        if let Some(first) = on_stack.get(&id) {
            let mut back_ref = serde_json::Map::new();
            back_ref.insert("$ref".to_string(), Value::String(format!("#{first}")));
            return Value::Object(back_ref);
        }
        on_stack.insert(id, path.clone());
        let value = match self.get(id) {
            Node::Null => Value::Null,
            Node::Bool(b) => Value::Bool(*b),
            Node::Number(n) => Value::Number(n.clone()),
            Node::String(s) => Value::String(s.clone()),
            Node::Array(items) => Value::Array(
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| {
                        self.export_lossy_inner(*item, format!("{path}/{i}"), on_stack)
                    })
                    .collect(),
            ),
            Node::Object(members) => {
                let mut out = serde_json::Map::with_capacity(members.len());
                for (key, child) in members {
                    let child_path = format!("{path}/{}", pointer::escape_token(key));
                    out.insert(
                        key.clone(),
                        self.export_lossy_inner(*child, child_path, on_stack),
                    );
                }
                Value::Object(out)
            }
        };
        on_stack.remove(&id);
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_import_export_round_trip() {
        let value = json!({
            "swagger": "2.0",
            "paths": {"/pet": {"get": {"responses": {"200": {"description": "ok"}}}}},
            "tags": ["pets", 1, null, true]
        });
        let mut arena = Arena::new();
        let root = arena.import(&value);
        assert_eq!(arena.export(root).unwrap(), value);
    }

    #[test]
    fn test_ref_string_detection() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({"$ref": "definitions/pet.yaml"}));
        assert_eq!(arena.ref_string(root), Some("definitions/pet.yaml"));

        let plain = arena.import(&json!({"type": "object"}));
        assert_eq!(arena.ref_string(plain), None);

        // A non-string $ref member is not a reference node
        let bogus = arena.import(&json!({"$ref": 42}));
        assert_eq!(arena.ref_string(bogus), None);
    }

    #[test]
    fn test_export_fails_on_cycle() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({"person": {"name": "a"}}));
        let person = arena.member(root, "person").unwrap();
        // person.spouse -> person
        if let Node::Object(members) = arena.get_mut(person) {
            members.push(("spouse".to_string(), person));
        }
        assert!(arena.export(root).is_err());
    }

    #[test]
    fn test_export_lossy_marks_back_edges() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({"person": {"name": "a"}}));
        let person = arena.member(root, "person").unwrap();
        if let Node::Object(members) = arena.get_mut(person) {
            members.push(("spouse".to_string(), person));
        }
        let exported = arena.export_lossy(root);
        assert_eq!(exported["person"]["spouse"]["$ref"], json!("#/person"));
    }
}
