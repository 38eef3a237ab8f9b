//! Document store
//!
//! Owns every document loaded during one top-level operation, keyed by
//! normalized absolute location. Acquisition is de-duplicated through a
//! map of shared in-flight futures: two traversal branches asking for
//! the same not-yet-loaded location await one fetch and one parse.

use futures::future::{BoxFuture, FutureExt, Shared};
use oas_refs_common::{ApiError, Result, SourceFormat};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::loader::{self, Loader};
use crate::value::{Arena, NodeId};

/// Raw acquisition result, before arena import
#[derive(Debug)]
pub struct RawDocument {
    pub location: String,
    pub text: String,
    pub value: Value,
    pub format: SourceFormat,
}

type LoadOutcome = std::result::Result<Arc<RawDocument>, Arc<ApiError>>;
type LoadFuture = Shared<BoxFuture<'static, LoadOutcome>>;

/// A parsed document registered in the store
#[derive(Debug)]
pub struct Document {
    pub location: String,
    pub root: NodeId,
    pub format: SourceFormat,
}

/// Per-operation registry of parsed documents
pub struct DocumentStore {
    loader: Arc<dyn Loader>,
    inflight: Arc<Mutex<HashMap<String, LoadFuture>>>,
    documents: Vec<Document>,
    by_location: HashMap<String, usize>,
}

impl DocumentStore {
    pub fn new(loader: Arc<dyn Loader>) -> Self {
        Self {
            loader,
            inflight: Arc::new(Mutex::new(HashMap::new())),
            documents: Vec::new(),
            by_location: HashMap::new(),
        }
    }

    fn load_future(&self, location: &str) -> LoadFuture {
        let mut inflight = self.inflight.lock().expect("inflight map lock");
        if let Some(pending) = inflight.get(location) {
            return pending.clone();
        }
        let loader = Arc::clone(&self.loader);
        let loc = location.to_string();
        let pending: LoadFuture = async move {
            let text = loader.load(&loc).await.map_err(Arc::new)?;
            let (value, format) = loader::parse_text(&loc, &text).map_err(Arc::new)?;
            Ok(Arc::new(RawDocument {
                location: loc,
                text,
                value,
                format,
            }))
        }
        .boxed()
        .shared();
        inflight.insert(location.to_string(), pending.clone());
        pending
    }

    /// Fetch and parse a location, sharing any in-flight acquisition
    pub async fn acquire(&self, location: &str) -> LoadOutcome {
        self.load_future(location).await
    }

    /// Start acquiring locations that are not loaded yet, without
    /// awaiting them. Later `open` calls join the in-flight futures.
    pub fn prefetch<I: IntoIterator<Item = String>>(&self, locations: I) {
        for location in locations {
            if !self.by_location.contains_key(&location) {
                tokio::spawn(self.load_future(&location));
            }
        }
    }

    /// Get the root of a document, loading and registering it on first
    /// access. The `bool` is true when this call performed the load.
    pub async fn open(&mut self, arena: &mut Arena, location: &str) -> Result<(NodeId, bool)> {
        if let Some(&idx) = self.by_location.get(location) {
            return Ok((self.documents[idx].root, false));
        }
        let raw = self
            .acquire(location)
            .await
            .map_err(|e| clone_error(&e))?;
        let root = arena.import(&raw.value);
        self.by_location
            .insert(location.to_string(), self.documents.len());
        self.documents.push(Document {
            location: location.to_string(),
            root,
            format: raw.format,
        });
        Ok((root, true))
    }

    pub fn root_of(&self, location: &str) -> Option<NodeId> {
        self.by_location
            .get(location)
            .map(|&idx| self.documents[idx].root)
    }

    pub fn contains(&self, location: &str) -> bool {
        self.by_location.contains_key(location)
    }

    /// Locations of every registered document, in load order (root first)
    pub fn paths(&self) -> Vec<String> {
        self.documents.iter().map(|d| d.location.clone()).collect()
    }
}

/// Rebuild an owned error from a shared acquisition failure.
///
/// Shared futures hand every waiter the same `Arc`-wrapped error;
/// source-carrying variants degrade to their display form.
fn clone_error(err: &ApiError) -> ApiError {
    match err {
        ApiError::Parse { location, detail } => ApiError::Parse {
            location: location.clone(),
            detail: detail.clone(),
        },
        ApiError::UnresolvableReference {
            reference,
            location,
            detail,
        } => ApiError::UnresolvableReference {
            reference: reference.clone(),
            location: location.clone(),
            detail: detail.clone(),
        },
        ApiError::InvalidPointer { pointer, detail } => ApiError::InvalidPointer {
            pointer: pointer.clone(),
            detail: detail.clone(),
        },
        ApiError::CircularReference => ApiError::CircularReference,
        ApiError::Validation { violations } => ApiError::Validation {
            violations: violations.clone(),
        },
        other => ApiError::Io(std::io::Error::other(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::MockLoader;

    #[tokio::test]
    async fn test_open_loads_once_per_location() {
        let mut mock = MockLoader::new();
        mock.expect_load()
            .withf(|loc| loc == "/specs/pet.yaml")
            .times(1)
            .returning(|_| Ok("title: pet\n".to_string()));

        let mut store = DocumentStore::new(Arc::new(mock));
        let mut arena = Arena::new();

        let (root, loaded) = store.open(&mut arena, "/specs/pet.yaml").await.unwrap();
        assert!(loaded);
        let (again, loaded) = store.open(&mut arena, "/specs/pet.yaml").await.unwrap();
        assert!(!loaded);
        assert_eq!(root, again);
        assert_eq!(store.paths(), vec!["/specs/pet.yaml".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_acquire_shares_one_fetch() {
        let mut mock = MockLoader::new();
        mock.expect_load()
            .times(1)
            .returning(|_| Ok("title: pet\n".to_string()));

        let store = DocumentStore::new(Arc::new(mock));
        let (a, b) = futures::join!(store.acquire("/specs/pet.yaml"), store.acquire("/specs/pet.yaml"));
        let a = a.unwrap();
        let b = b.unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[tokio::test]
    async fn test_failed_acquisition_reaches_every_waiter() {
        let mut mock = MockLoader::new();
        mock.expect_load().times(1).returning(|loc| {
            Err(ApiError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("{loc} not found"),
            )))
        });

        let store = DocumentStore::new(Arc::new(mock));
        let (a, b) = futures::join!(store.acquire("/missing.yaml"), store.acquire("/missing.yaml"));
        assert!(a.is_err());
        assert!(b.is_err());
    }

    #[tokio::test]
    async fn test_open_surfaces_parse_failure() {
        let mut mock = MockLoader::new();
        mock.expect_load()
            .returning(|_| Ok("{broken json".to_string()));

        let mut store = DocumentStore::new(Arc::new(mock));
        let mut arena = Arena::new();
        let err = store.open(&mut arena, "/specs/pet.json").await.unwrap_err();
        assert!(matches!(err, ApiError::Parse { .. }));
    }
}
