//! Common types and utilities for oas-refs
//!
//! This crate contains the shared error taxonomy, the options surface,
//! and the `Result` alias used across the engine, validator, and CLI
//! components.

use serde::{Deserialize, Serialize};
use thiserror::Error;

mod options;

pub use options::{CircularPolicy, DereferenceOptions, ParserOptions};

/// Errors that can occur while resolving an API description
#[derive(Error, Debug)]
pub enum ApiError {
    /// The root document could not be parsed as JSON or YAML
    #[error("Error parsing {location}: {detail}")]
    Parse { location: String, detail: String },

    /// A `$ref` points at a location that cannot be loaded, or at a
    /// pointer path that does not exist in the loaded document
    #[error("Error resolving $ref pointer \"{reference}\" in {location}: {detail}")]
    UnresolvableReference {
        reference: String,
        location: String,
        detail: String,
    },

    /// The `$ref` string itself is malformed
    #[error("Invalid $ref pointer \"{pointer}\": {detail}")]
    InvalidPointer { pointer: String, detail: String },

    /// Raised only when the circular policy forbids cycles and at
    /// least one reference chain is circular
    #[error("The API contains circular references")]
    CircularReference,

    /// The dereferenced document does not conform to the meta-schema
    #[error("API validation failed:\n{}", .violations.join("\n"))]
    Validation { violations: Vec<String> },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type for oas-refs operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// Source format of a parsed document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceFormat {
    Json,
    Yaml,
}
