//! Structural meta-schema validation
//!
//! Downstream of the resolution engine: takes a fully dereferenced
//! document and checks its skeleton against the Swagger 2.0 / OpenAPI 3
//! meta-schema — version declaration, info block, path shapes,
//! operation responses, and parameter locations. Semantic rules (for
//! example, that a declared path parameter is actually used) are out of
//! scope.

use oas_refs_common::{ApiError, ParserOptions, Result};
use oas_refs_engine::{dereference, pointer, Arena, Node, NodeId, ResolvedApi};

const METHODS: [&str; 7] = ["get", "put", "post", "delete", "options", "head", "patch"];

const PARAMETER_LOCATIONS: [&str; 6] = ["query", "header", "path", "formData", "body", "cookie"];

/// Resolve, dereference (honoring the circular policy), and check the
/// result against the meta-schema.
pub async fn validate(location: &str, options: ParserOptions) -> Result<ResolvedApi> {
    let api = dereference(location, options).await?;
    let violations = check_root(api.arena(), api.root());
    if violations.is_empty() {
        Ok(api)
    } else {
        Err(ApiError::Validation { violations })
    }
}

/// Structural violations of the document rooted at `root`.
///
/// Only bounded structure is descended (paths, operations, responses,
/// parameters), so a dereferenced tree containing cycles is safe to
/// check.
pub fn check_root(arena: &Arena, root: NodeId) -> Vec<String> {
    let mut violations = Vec::new();

    let Node::Object(_) = arena.get(root) else {
        violations.push("document root must be an object".to_string());
        return violations;
    };

    match version_of(arena, root) {
        Some(version) if version == "2.0" || version.starts_with("3.") => {}
        Some(version) => violations.push(format!("unrecognized specification version \"{version}\"")),
        None => violations
            .push("document must declare a \"swagger\" or \"openapi\" version".to_string()),
    }

    match arena.member(root, "info") {
        Some(info) if matches!(arena.get(info), Node::Object(_)) => {
            for field in ["title", "version"] {
                match arena.member(info, field) {
                    Some(v) if matches!(arena.get(v), Node::String(_)) => {}
                    _ => violations.push(format!("/info/{field}: missing or not a string")),
                }
            }
        }
        _ => violations.push("/info: missing or not an object".to_string()),
    }

    match arena.member(root, "paths") {
        Some(paths) => check_paths(arena, paths, &mut violations),
        None => violations.push("/paths: missing".to_string()),
    }

    violations
}

fn version_of(arena: &Arena, root: NodeId) -> Option<String> {
    for field in ["swagger", "openapi"] {
        if let Some(v) = arena.member(root, field) {
            if let Node::String(s) = arena.get(v) {
                return Some(s.clone());
            }
        }
    }
    None
}

fn check_paths(arena: &Arena, paths: NodeId, violations: &mut Vec<String>) {
    let Node::Object(members) = arena.get(paths) else {
        violations.push("/paths: not an object".to_string());
        return;
    };
    for (path, item) in members {
        let at = format!("/paths/{}", pointer::escape_token(path));
        if !path.starts_with('/') {
            violations.push(format!("{at}: path must start with \"/\""));
        }
        let Node::Object(item_members) = arena.get(*item) else {
            violations.push(format!("{at}: path item must be an object"));
            continue;
        };
        for (key, op) in item_members {
            if METHODS.contains(&key.as_str()) {
                check_operation(arena, *op, &format!("{at}/{key}"), violations);
            }
        }
    }
}

fn check_operation(arena: &Arena, op: NodeId, at: &str, violations: &mut Vec<String>) {
    let Node::Object(_) = arena.get(op) else {
        violations.push(format!("{at}: operation must be an object"));
        return;
    };

    match arena.member(op, "responses") {
        Some(responses) => match arena.get(responses) {
            Node::Object(members) => {
                for (code, _) in members {
                    if code != "default" && !is_status_code(code) {
                        violations.push(format!(
                            "{at}/responses/{code}: not \"default\" or a valid status code"
                        ));
                    }
                }
            }
            _ => violations.push(format!("{at}/responses: not an object")),
        },
        None => violations.push(format!("{at}: operation has no responses")),
    }

    if let Some(parameters) = arena.member(op, "parameters") {
        match arena.get(parameters) {
            Node::Array(items) => {
                for (index, parameter) in items.iter().enumerate() {
                    check_parameter(arena, *parameter, &format!("{at}/parameters/{index}"), violations);
                }
            }
            _ => violations.push(format!("{at}/parameters: not an array")),
        }
    }
}

fn check_parameter(arena: &Arena, parameter: NodeId, at: &str, violations: &mut Vec<String>) {
    let Node::Object(_) = arena.get(parameter) else {
        violations.push(format!("{at}: parameter must be an object"));
        return;
    };
    match arena.member(parameter, "in") {
        Some(loc) => match arena.get(loc) {
            Node::String(s) if PARAMETER_LOCATIONS.contains(&s.as_str()) => {}
            Node::String(s) => {
                violations.push(format!("{at}/in: \"{s}\" is not a valid parameter location"))
            }
            _ => violations.push(format!("{at}/in: not a string")),
        },
        None => violations.push(format!("{at}: parameter has no \"in\"")),
    }
}

fn is_status_code(code: &str) -> bool {
    code.len() == 3
        && code.chars().all(|c| c.is_ascii_digit())
        && matches!(code.as_bytes()[0], b'1'..=b'5')
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn check(value: serde_json::Value) -> Vec<String> {
        let mut arena = Arena::new();
        let root = arena.import(&value);
        check_root(&arena, root)
    }

    #[test]
    fn test_minimal_swagger_document_passes() {
        let violations = check(json!({
            "swagger": "2.0",
            "info": {"title": "Pets", "version": "1.0.0"},
            "paths": {
                "/pet": {
                    "get": {
                        "responses": {"200": {"description": "ok"}, "default": {"description": "err"}}
                    }
                }
            }
        }));
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_openapi_3_version_is_recognized() {
        let violations = check(json!({
            "openapi": "3.0.3",
            "info": {"title": "Pets", "version": "1.0.0"},
            "paths": {}
        }));
        assert!(violations.is_empty(), "{violations:?}");
    }

    #[test]
    fn test_missing_version_and_info() {
        let violations = check(json!({"paths": {}}));
        assert!(violations.iter().any(|v| v.contains("swagger")));
        assert!(violations.iter().any(|v| v.contains("/info")));
    }

    #[test]
    fn test_bad_status_code_and_parameter_location() {
        let violations = check(json!({
            "swagger": "2.0",
            "info": {"title": "Pets", "version": "1.0.0"},
            "paths": {
                "/pet": {
                    "get": {
                        "responses": {"999": {"description": "bad"}},
                        "parameters": [{"name": "x", "in": "nowhere"}]
                    }
                }
            }
        }));
        assert!(violations.iter().any(|v| v.contains("/responses/999")));
        assert!(violations.iter().any(|v| v.contains("parameter location")));
    }

    #[test]
    fn test_path_without_leading_slash() {
        let violations = check(json!({
            "swagger": "2.0",
            "info": {"title": "Pets", "version": "1.0.0"},
            "paths": {"pet": {"get": {"responses": {"200": {"description": "ok"}}}}}
        }));
        assert!(violations.iter().any(|v| v.contains("start with")));
    }
}
