//! Option types honored by the resolution engine
//!
//! Options are plain data: the walker only records circularity, and the
//! dereferencer consults the policy afterwards. New policies can be
//! added here without touching traversal code.

use serde::{Deserialize, Deserializer, Serialize};

/// How the dereferencer treats circular references
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircularPolicy {
    /// Replace circular `$ref` nodes like any other, producing a tree
    /// that legitimately contains cycles
    #[default]
    Allow,

    /// Leave circular `$ref` nodes untouched; dereference everything else
    Ignore,

    /// Fail the whole operation if any circular reference exists
    Forbid,
}

/// Accepts `"allow"` / `"ignore"` / `"forbid"`, plus the boolean
/// spellings `true` (allow) and `false` (forbid) common in existing
/// configuration files.
impl<'de> Deserialize<'de> for CircularPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Flag(bool),
            Name(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Flag(true) => Ok(CircularPolicy::Allow),
            Raw::Flag(false) => Ok(CircularPolicy::Forbid),
            Raw::Name(name) => match name.as_str() {
                "allow" => Ok(CircularPolicy::Allow),
                "ignore" => Ok(CircularPolicy::Ignore),
                "forbid" => Ok(CircularPolicy::Forbid),
                other => Err(serde::de::Error::unknown_variant(
                    other,
                    &["allow", "ignore", "forbid"],
                )),
            },
        }
    }
}

/// Options for the dereference pass
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DereferenceOptions {
    /// Circular reference policy (`"allow"` by default)
    #[serde(default)]
    pub circular: CircularPolicy,
}

/// Top-level options recognized by every operation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ParserOptions {
    /// Dereference behavior
    #[serde(default)]
    pub dereference: DereferenceOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_allow() {
        let opts = ParserOptions::default();
        assert_eq!(opts.dereference.circular, CircularPolicy::Allow);
    }

    #[test]
    fn test_policy_deserializes_from_name() {
        let opts: ParserOptions =
            serde_json::from_str(r#"{"dereference":{"circular":"ignore"}}"#).unwrap();
        assert_eq!(opts.dereference.circular, CircularPolicy::Ignore);
    }

    #[test]
    fn test_policy_deserializes_from_bool() {
        let opts: ParserOptions =
            serde_json::from_str(r#"{"dereference":{"circular":false}}"#).unwrap();
        assert_eq!(opts.dereference.circular, CircularPolicy::Forbid);

        let opts: ParserOptions =
            serde_json::from_str(r#"{"dereference":{"circular":true}}"#).unwrap();
        assert_eq!(opts.dereference.circular, CircularPolicy::Allow);
    }

    #[test]
    fn test_unknown_policy_is_rejected() {
        let result: Result<ParserOptions, _> =
            serde_json::from_str(r#"{"dereference":{"circular":"sometimes"}}"#);
        assert!(result.is_err());
    }
}
