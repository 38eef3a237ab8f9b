//! Document acquisition
//!
//! The engine only ever sees the `Loader` seam; the default
//! implementation dispatches on the location scheme (filesystem or
//! http(s)). Text is parsed to a `serde_json::Value` here so the store
//! can import it into the arena without re-reading anything.

use async_trait::async_trait;
use oas_refs_common::{ApiError, Result, SourceFormat};
use serde_json::Value;

use crate::location;

/// Fetches the raw text of a document by absolute location
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Loader: Send + Sync {
    async fn load(&self, location: &str) -> Result<String>;
}

/// Reads documents from the local filesystem
#[derive(Debug, Default)]
pub struct FileLoader;

#[async_trait]
impl Loader for FileLoader {
    async fn load(&self, location: &str) -> Result<String> {
        Ok(tokio::fs::read_to_string(location).await?)
    }
}

/// Fetches documents over http(s)
#[derive(Debug, Default)]
pub struct HttpLoader {
    client: reqwest::Client,
}

#[async_trait]
impl Loader for HttpLoader {
    async fn load(&self, location: &str) -> Result<String> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(|e| io_error(location, &e.to_string()))?;
        let response = response
            .error_for_status()
            .map_err(|e| io_error(location, &e.to_string()))?;
        response
            .text()
            .await
            .map_err(|e| io_error(location, &e.to_string()))
    }
}

fn io_error(location: &str, detail: &str) -> ApiError {
    ApiError::Io(std::io::Error::other(format!("GET {location}: {detail}")))
}

/// Scheme-dispatching loader used when the caller does not supply one
#[derive(Debug, Default)]
pub struct DefaultLoader {
    file: FileLoader,
    http: HttpLoader,
}

#[async_trait]
impl Loader for DefaultLoader {
    async fn load(&self, location: &str) -> Result<String> {
        if location::is_url(location) {
            self.http.load(location).await
        } else {
            self.file.load(location).await
        }
    }
}

/// Parse raw document text, picking the format from the location
/// extension and falling back to JSON-then-YAML when it is ambiguous.
pub fn parse_text(location: &str, text: &str) -> Result<(Value, SourceFormat)> {
    let lowered = location.split(['?', '#']).next().unwrap_or(location).to_lowercase();
    if lowered.ends_with(".json") {
        let value = serde_json::from_str(text).map_err(|e| ApiError::Parse {
            location: location.to_string(),
            detail: e.to_string(),
        })?;
        return Ok((value, SourceFormat::Json));
    }
    if lowered.ends_with(".yaml") || lowered.ends_with(".yml") {
        let value = serde_yaml::from_str(text).map_err(|e| ApiError::Parse {
            location: location.to_string(),
            detail: e.to_string(),
        })?;
        return Ok((value, SourceFormat::Yaml));
    }
    if let Ok(value) = serde_json::from_str(text) {
        return Ok((value, SourceFormat::Json));
    }
    match serde_yaml::from_str(text) {
        Ok(value) => Ok((value, SourceFormat::Yaml)),
        Err(e) => Err(ApiError::Parse {
            location: location.to_string(),
            detail: e.to_string(),
        }),
    }
}
