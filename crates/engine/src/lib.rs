//! Reference resolution engine for OpenAPI and Swagger documents
//!
//! This crate discovers `$ref` occurrences anywhere in a document tree
//! (including documents loaded from other files or URLs), builds a
//! reference graph, and derives the requested view of it:
//!
//! - `parse` — the raw root document, refs untouched
//! - `resolve` — the populated reference graph and document list
//! - `dereference` — refs replaced by their targets, by identity, with
//!   a configurable circular-reference policy
//! - `bundle` — external refs inlined, internal refs preserved
//!
//! Documents live in a per-operation arena, so a dereferenced cycle is
//! two slots pointing at each other rather than an infinite tree.
//!
//! ## Usage
//! ```rust,ignore
//! use oas_refs_engine::ApiParser;
//!
//! let api = ApiParser::new().dereference("specs/petstore.yaml").await?;
//! let value = api.to_value_lossy();
//! ```

mod bundle;
mod dereference;
mod graph;
mod loader;
pub mod location;
pub mod pointer;
mod store;
mod value;
mod walker;

pub use graph::{RefEdge, RefGraph};
pub use loader::{DefaultLoader, FileLoader, HttpLoader, Loader};
pub use store::{Document, DocumentStore, RawDocument};
pub use value::{Arena, Node, NodeId};

use oas_refs_common::{CircularPolicy, ParserOptions, Result};
use serde_json::Value;
use std::sync::Arc;
use walker::GraphWalker;

/// Entry point for the engine's operations.
///
/// Each operation owns a fresh document store and reference graph;
/// nothing is shared or cached across calls.
pub struct ApiParser {
    options: ParserOptions,
    loader: Arc<dyn Loader>,
}

impl Default for ApiParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ApiParser {
    pub fn new() -> Self {
        Self {
            options: ParserOptions::default(),
            loader: Arc::new(DefaultLoader::default()),
        }
    }

    pub fn with_options(mut self, options: ParserOptions) -> Self {
        self.options = options;
        self
    }

    /// Swap the document acquisition seam (tests, custom schemes)
    pub fn with_loader(mut self, loader: Arc<dyn Loader>) -> Self {
        self.loader = loader;
        self
    }

    /// Load and parse the root document without touching any `$ref`
    pub async fn parse(&self, location: &str) -> Result<ResolvedApi> {
        let normalized = location::normalize(location)?;
        let mut arena = Arena::new();
        let mut store = DocumentStore::new(Arc::clone(&self.loader));
        let (root, _) = store.open(&mut arena, &normalized).await?;
        Ok(ResolvedApi {
            arena,
            root,
            graph: RefGraph::default(),
            paths: store.paths(),
            location: normalized,
        })
    }

    /// Discover and resolve every reference reachable from the root
    pub async fn resolve(&self, location: &str) -> Result<ResolvedApi> {
        let out = GraphWalker::new(Arc::clone(&self.loader)).walk(location).await?;
        Ok(ResolvedApi {
            arena: out.arena,
            root: out.root,
            graph: out.graph,
            paths: out.store.paths(),
            location: out.root_location,
        })
    }

    /// Resolve, then replace `$ref` nodes with their targets according
    /// to the configured circular policy
    pub async fn dereference(&self, location: &str) -> Result<ResolvedApi> {
        let mut api = self.resolve(location).await?;
        api.root = dereference::dereference(
            &mut api.arena,
            &api.graph,
            api.root,
            self.options.dereference.circular,
        )?;
        Ok(api)
    }

    /// Resolve, then inline every external target into the root document
    pub async fn bundle(&self, location: &str) -> Result<ResolvedApi> {
        let mut api = self.resolve(location).await?;
        api.root = bundle::bundle(&mut api.arena, &api.graph, api.root, &api.location)?;
        Ok(api)
    }
}

/// Result of an engine operation: the document tree plus the graph it
/// was derived from.
#[derive(Debug)]
pub struct ResolvedApi {
    arena: Arena,
    root: NodeId,
    graph: RefGraph,
    paths: Vec<String>,
    location: String,
}

impl ResolvedApi {
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn graph(&self) -> &RefGraph {
        &self.graph
    }

    /// Normalized absolute location of the root document
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Locations of every document loaded, root first, in load order
    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Literal `$ref` strings that remained circular
    pub fn circular_refs(&self) -> Vec<&str> {
        self.graph.circular_refs()
    }

    /// Node addressed by a JSON pointer from the root.
    ///
    /// Two pointers addressing the same dereferenced target return the
    /// same `NodeId`; comparing them is the reference-equality check.
    pub fn node_at(&self, ptr: &str) -> Option<NodeId> {
        let tokens = pointer::parse_pointer(ptr).ok()?;
        pointer::eval(&self.arena, self.root, &tokens)
    }

    /// Export the tree to a `serde_json::Value`; fails if it contains a
    /// live cycle
    pub fn to_value(&self) -> Result<Value> {
        self.arena.export(self.root)
    }

    /// Export the tree, emitting back-edges as internal `$ref` nodes
    pub fn to_value_lossy(&self) -> Value {
        self.arena.export_lossy(self.root)
    }
}

/// Parse the root document at `location`
pub async fn parse(location: &str) -> Result<ResolvedApi> {
    ApiParser::new().parse(location).await
}

/// Resolve every reference reachable from `location`
pub async fn resolve(location: &str) -> Result<ResolvedApi> {
    ApiParser::new().resolve(location).await
}

/// Dereference the document at `location` with the given options
pub async fn dereference(location: &str, options: ParserOptions) -> Result<ResolvedApi> {
    ApiParser::new().with_options(options).dereference(location).await
}

/// Bundle the document at `location` into a self-contained tree
pub async fn bundle(location: &str) -> Result<ResolvedApi> {
    ApiParser::new().bundle(location).await
}

/// Convenience: dereference with an explicit circular policy
pub async fn dereference_with_policy(
    location: &str,
    circular: CircularPolicy,
) -> Result<ResolvedApi> {
    let mut options = ParserOptions::default();
    options.dereference.circular = circular;
    dereference(location, options).await
}
