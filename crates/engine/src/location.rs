//! Document location normalization and relative resolution
//!
//! Locations are either http(s) URLs or filesystem paths. Every
//! document is keyed by its normalized absolute location, so two
//! spellings of the same place hit the same store entry.

use oas_refs_common::{ApiError, Result};
use url::Url;

/// Whether a location (or `$ref` location part) is an http(s) URL
pub fn is_url(location: &str) -> bool {
    location.starts_with("http://") || location.starts_with("https://")
}

/// Normalize a root location into its absolute form.
///
/// Relative filesystem paths are anchored at the current working
/// directory; URLs are canonicalized through `url::Url`.
pub fn normalize(location: &str) -> Result<String> {
    if is_url(location) {
        let url = Url::parse(location).map_err(|e| ApiError::InvalidPointer {
            pointer: location.to_string(),
            detail: e.to_string(),
        })?;
        return Ok(url.to_string());
    }
    let path = location.replace('\\', "/");
    if path.starts_with('/') {
        return Ok(normalize_path(&path));
    }
    let cwd = std::env::current_dir()?;
    let joined = format!("{}/{}", cwd.to_string_lossy().replace('\\', "/"), path);
    Ok(normalize_path(&joined))
}

/// Resolve a `$ref` location part against the location of the document
/// that contains the reference.
pub fn resolve(base: &str, reference: &str) -> Result<String> {
    if reference.is_empty() {
        return Ok(base.to_string());
    }
    if is_url(reference) {
        return normalize(reference);
    }
    if is_url(base) {
        let base_url = Url::parse(base).map_err(|e| ApiError::InvalidPointer {
            pointer: base.to_string(),
            detail: e.to_string(),
        })?;
        let joined = base_url.join(reference).map_err(|e| ApiError::InvalidPointer {
            pointer: reference.to_string(),
            detail: e.to_string(),
        })?;
        return Ok(joined.to_string());
    }
    if reference.starts_with('/') {
        return Ok(normalize_path(reference));
    }
    let dir = match base.rfind('/') {
        Some(idx) => &base[..idx],
        None => ".",
    };
    Ok(normalize_path(&format!("{dir}/{reference}")))
}

/// Lexically collapse `.` and `..` segments of a `/`-separated path
fn normalize_path(path: &str) -> String {
    let absolute = path.starts_with('/');
    let mut segments: Vec<&str> = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if segments.last().is_some_and(|s| *s != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    let joined = segments.join("/");
    if absolute {
        format!("/{joined}")
    } else {
        joined
    }
}

/// Short display name for a location (file stem or last URL segment),
/// used to derive bundled definition keys.
pub fn stem(location: &str) -> String {
    let tail = location.rsplit('/').next().unwrap_or(location);
    let tail = tail.split(['?', '#']).next().unwrap_or(tail);
    let stem = match tail.rfind('.') {
        Some(idx) if idx > 0 => &tail[..idx],
        _ => tail,
    };
    if stem.is_empty() {
        "definition".to_string()
    } else {
        stem.to_string()
    }
}
