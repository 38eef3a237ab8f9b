//! `$ref` string splitting and JSON pointer evaluation
//!
//! A `$ref` value is a location part, a `#`-prefixed fragment, or both.
//! The fragment is a slash-delimited JSON pointer with `~0` → `~` and
//! `~1` → `/` unescaping applied per token.

use oas_refs_common::{ApiError, Result};

use crate::value::{Arena, Node, NodeId};

/// Split a `$ref` string into its location part and optional fragment
pub fn split_ref(reference: &str) -> (&str, Option<&str>) {
    match reference.find('#') {
        Some(idx) => (&reference[..idx], Some(&reference[idx + 1..])),
        None => (reference, None),
    }
}

/// Parse a pointer fragment into unescaped tokens.
///
/// The empty fragment addresses the document root. A non-empty fragment
/// must start with `/`.
pub fn parse_pointer(fragment: &str) -> Result<Vec<String>> {
    if fragment.is_empty() {
        return Ok(Vec::new());
    }
    let Some(rest) = fragment.strip_prefix('/') else {
        return Err(ApiError::InvalidPointer {
            pointer: fragment.to_string(),
            detail: "pointer must be empty or start with \"/\"".to_string(),
        });
    };
    rest.split('/').map(|tok| unescape_token(fragment, tok)).collect()
}

fn unescape_token(pointer: &str, token: &str) -> Result<String> {
    let mut out = String::with_capacity(token.len());
    let mut chars = token.chars();
    while let Some(c) = chars.next() {
        if c != '~' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            other => {
                return Err(ApiError::InvalidPointer {
                    pointer: pointer.to_string(),
                    detail: format!(
                        "invalid escape \"~{}\" in token \"{token}\"",
                        other.map(String::from).unwrap_or_default()
                    ),
                })
            }
        }
    }
    Ok(out)
}

/// Escape a single token for embedding in a pointer string
pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

/// Build a pointer string (`""` or `"/a/b"`) from unescaped tokens
pub fn join_pointer<'a, I: IntoIterator<Item = &'a str>>(tokens: I) -> String {
    let mut out = String::new();
    for token in tokens {
        out.push('/');
        out.push_str(&escape_token(token));
    }
    out
}

/// Walk a pointer from `root`, returning the addressed node
pub fn eval(arena: &Arena, root: NodeId, tokens: &[String]) -> Option<NodeId> {
    let mut current = root;
    for token in tokens {
        current = match arena.get(current) {
            Node::Object(members) => members
                .iter()
                .find(|(k, _)| k == token)
                .map(|(_, child)| *child)?,
            Node::Array(items) => {
                let index: usize = token.parse().ok()?;
                items.get(index).copied()?
            }
            _ => return None,
        };
    }
    Some(current)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_split_ref() {
        assert_eq!(split_ref("pet.yaml"), ("pet.yaml", None));
        assert_eq!(split_ref("#/definitions/pet"), ("", Some("/definitions/pet")));
        assert_eq!(
            split_ref("pet.yaml#/properties/name"),
            ("pet.yaml", Some("/properties/name"))
        );
        assert_eq!(split_ref("pet.yaml#"), ("pet.yaml", Some("")));
    }

    #[test]
    fn test_parse_pointer_unescapes_tokens() {
        assert_eq!(parse_pointer("").unwrap(), Vec::<String>::new());
        assert_eq!(parse_pointer("/a/b").unwrap(), vec!["a", "b"]);
        assert_eq!(parse_pointer("/paths/~1pet").unwrap(), vec!["paths", "/pet"]);
        assert_eq!(parse_pointer("/~0~1").unwrap(), vec!["~/"]);
    }

    #[test]
    fn test_parse_pointer_rejects_malformed() {
        assert!(parse_pointer("definitions/pet").is_err());
        assert!(parse_pointer("/a/~2").is_err());
        assert!(parse_pointer("/a~").is_err());
    }

    #[test]
    fn test_escape_round_trip() {
        let token = "a/~b";
        let escaped = escape_token(token);
        assert_eq!(escaped, "a~1~0b");
        assert_eq!(parse_pointer(&format!("/{escaped}")).unwrap(), vec![token]);
    }

    #[test]
    fn test_eval_walks_objects_and_arrays() {
        let mut arena = Arena::new();
        let root = arena.import(&json!({
            "paths": {"/pet": {"tags": ["a", "b"]}}
        }));
        let tokens = parse_pointer("/paths/~1pet/tags/1").unwrap();
        let node = eval(&arena, root, &tokens).unwrap();
        assert!(matches!(arena.get(node), Node::String(s) if s == "b"));

        let missing = parse_pointer("/paths/~1pet/tags/7").unwrap();
        assert!(eval(&arena, root, &missing).is_none());
    }
}
