//! Graph walker
//!
//! Depth-first traversal that discovers every `$ref` reachable from the
//! root document, loading referenced documents on first touch and
//! recording one edge per ref node. Cycle detection keys off the
//! current ancestor stack, not a global visited set, so re-converging
//! DAG paths are not misclassified as circular.

use futures::future::{BoxFuture, FutureExt};
use oas_refs_common::{ApiError, Result};
use std::collections::HashSet;
use std::sync::Arc;

use crate::graph::{RefEdge, RefGraph};
use crate::loader::Loader;
use crate::location;
use crate::pointer;
use crate::store::DocumentStore;
use crate::value::{Arena, Node, NodeId};

/// Everything produced by one walk
pub struct WalkOutput {
    pub arena: Arena,
    pub store: DocumentStore,
    pub graph: RefGraph,
    pub root: NodeId,
    pub root_location: String,
}

/// Single-use traversal state; consumed by [`GraphWalker::walk`]
pub struct GraphWalker {
    arena: Arena,
    store: DocumentStore,
    graph: RefGraph,
    on_stack: HashSet<NodeId>,
    done: HashSet<NodeId>,
}

impl GraphWalker {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            arena: Arena::new(),
            store: DocumentStore::new(loader),
            graph: RefGraph::default(),
            on_stack: HashSet::new(),
            done: HashSet::new(),
        }
    }

    /// Load the root document and discover every reachable reference
    pub async fn walk(mut self, location: &str) -> Result<WalkOutput> {
        let root_location = location::normalize(location)?;
        let (root, _) = self.store.open(&mut self.arena, &root_location).await?;
        self.prefetch_referenced(root, &root_location);
        self.visit(root, root_location.clone()).await?;
        Ok(WalkOutput {
            arena: self.arena,
            store: self.store,
            graph: self.graph,
            root,
            root_location,
        })
    }

    fn visit<'a>(&'a mut self, node: NodeId, base: String) -> BoxFuture<'a, Result<()>> {
        async move {
            if self.done.contains(&node) || self.on_stack.contains(&node) {
                return Ok(());
            }
            self.on_stack.insert(node);
            let result = if let Some(reference) = self.arena.ref_string(node).map(str::to_string) {
                self.visit_ref(node, reference, &base).await
            } else {
                self.visit_children(node, &base).await
            };
            self.on_stack.remove(&node);
            self.done.insert(node);
            result
        }
        .boxed()
    }

    async fn visit_children(&mut self, node: NodeId, base: &str) -> Result<()> {
        let children: Vec<NodeId> = match self.arena.get(node) {
            Node::Object(members) => members.iter().map(|(_, child)| *child).collect(),
            Node::Array(items) => items.clone(),
            _ => return Ok(()),
        };
        for child in children {
            self.visit(child, base.to_string()).await?;
        }
        Ok(())
    }

    /// Resolve one `$ref` node, record its edge, and descend into the
    /// target unless that would close a cycle.
    async fn visit_ref(&mut self, node: NodeId, reference: String, base: &str) -> Result<()> {
        let (loc_part, fragment) = pointer::split_ref(&reference);
        let target_location = location::resolve(base, loc_part)?;
        let tokens = pointer::parse_pointer(fragment.unwrap_or(""))?;

        let (doc_root, newly_loaded) = self
            .store
            .open(&mut self.arena, &target_location)
            .await
            .map_err(|e| match e {
                ApiError::InvalidPointer { .. } => e,
                other => ApiError::UnresolvableReference {
                    reference: reference.clone(),
                    location: base.to_string(),
                    detail: other.to_string(),
                },
            })?;
        if newly_loaded {
            self.prefetch_referenced(doc_root, &target_location);
        }

        let target = pointer::eval(&self.arena, doc_root, &tokens).ok_or_else(|| {
            ApiError::UnresolvableReference {
                reference: reference.clone(),
                location: base.to_string(),
                detail: format!(
                    "pointer \"{}\" does not exist in {target_location}",
                    fragment.unwrap_or("")
                ),
            }
        })?;

        let circular = self.on_stack.contains(&target);
        let target_pointer = pointer::join_pointer(tokens.iter().map(String::as_str));
        self.graph.record(RefEdge {
            ref_node: node,
            reference,
            source_location: base.to_string(),
            target,
            target_location: target_location.clone(),
            target_pointer,
            circular,
        });
        if !circular {
            self.visit(target, target_location).await?;
        }
        Ok(())
    }

    /// Kick off acquisition for every external location referenced by a
    /// freshly loaded document, so sibling branches of the traversal do
    /// not serialize their fetches.
    fn prefetch_referenced(&self, root: NodeId, base: &str) {
        let mut locations: Vec<String> = Vec::new();
        let mut pending = vec![root];
        while let Some(node) = pending.pop() {
            match self.arena.get(node) {
                Node::Object(members) => {
                    if let Some(reference) = self.arena.ref_string(node) {
                        let (loc_part, _) = pointer::split_ref(reference);
                        if !loc_part.is_empty() {
                            if let Ok(resolved) = location::resolve(base, loc_part) {
                                if resolved != base && !self.store.contains(&resolved) {
                                    locations.push(resolved);
                                }
                            }
                        }
                        continue;
                    }
                    pending.extend(members.iter().map(|(_, child)| *child));
                }
                Node::Array(items) => pending.extend(items.iter().copied()),
                _ => {}
            }
        }
        self.store.prefetch(locations);
    }
}
