//! Shared value types for the resource-check domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values with invariants (a source is always a JSON object, a
//! version always belongs to exactly one configuration identity) and
//! participate in domain decisions.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    DispatchId, PipelineName, ResourceConfigId, ResourceId, ResourceName, ResourceType, TeamName,
};

// ---------------------------------------------------------------------------
// Pipelines
// ---------------------------------------------------------------------------

/// Addresses a pipeline: the owning team plus the pipeline name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PipelineRef {
    /// Owning team; also the outer credential scope.
    pub team: TeamName,
    /// Pipeline name, unique per team.
    pub name: PipelineName,
}

impl PipelineRef {
    /// Creates a new [`PipelineRef`].
    pub fn new(team: TeamName, name: PipelineName) -> Self {
        Self { team, name }
    }
}

impl std::fmt::Display for PipelineRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.team, self.name)
    }
}

/// A persisted pipeline record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    /// Team and name of the pipeline.
    pub reference: PipelineRef,
    /// Paused pipelines still accept webhooks; the scanner decides what to do.
    pub paused: bool,
}

// ---------------------------------------------------------------------------
// Resource definitions
// ---------------------------------------------------------------------------

/// The raw source definition of a resource, exactly as configured.
///
/// Values may still contain credential placeholders such as `((github-token))`;
/// they are never evaluated by this crate except for the webhook token.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Source(Map<String, Value>);

impl Source {
    /// Creates a [`Source`] from an arbitrary JSON value.
    ///
    /// Returns `None` if `value` is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self(fields)),
            _ => None,
        }
    }

    /// Returns `true` if the top-level field `key` holds exactly `value`.
    ///
    /// Matching is against the raw, un-evaluated configuration. Strings compare
    /// verbatim (case-sensitive); numbers and booleans compare by their
    /// canonical text form. Objects, arrays and null never match.
    pub fn field_matches(&self, key: &str, value: &str) -> bool {
        match self.0.get(key) {
            Some(Value::String(s)) => s == value,
            Some(Value::Number(n)) => n.to_string() == value,
            Some(Value::Bool(b)) => b.to_string() == value,
            _ => false,
        }
    }
}

/// One observed version of a resource, e.g. `{"ref": "4b1e2c"}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(BTreeMap<String, String>);

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Version {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (k, v) in &self.0 {
            if !first {
                write!(f, ",")?;
            }
            write!(f, "{k}:{v}")?;
            first = false;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Persisted records
// ---------------------------------------------------------------------------

/// A resource configuration identity as stored by the persistence layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Identity under which version history is grouped.
    pub id: ResourceConfigId,
    /// Resource type the configuration was established for.
    pub resource_type: ResourceType,
}

/// An immutable record of a version observed for one configuration identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceVersion {
    /// The configuration identity this version was observed under.
    pub resource_config_id: ResourceConfigId,
    /// The version itself.
    pub version: Version,
    /// When the version was first observed.
    pub observed_at: Timestamp,
}

/// A pipeline-tracked external resource (repository, artifact feed, ...).
///
/// Owned by the persistence layer and read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedResource {
    /// Persistence identity of the resource.
    pub id: ResourceId,
    /// Configured name, unique within the pipeline.
    pub name: ResourceName,
    /// Pipeline the resource belongs to.
    pub pipeline: PipelineRef,
    /// Resource type.
    pub resource_type: ResourceType,
    /// Raw source definition.
    pub source: Source,
    /// Templated webhook secret, e.g. `"((repo-a-webhook))"`.
    ///
    /// `None` means webhooks are not enabled for this resource.
    pub webhook_token: Option<String>,
    /// Current configuration identity, or `None` if the resource has never
    /// been checked.
    pub resource_config_id: Option<ResourceConfigId>,
}

// ---------------------------------------------------------------------------
// Scan hand-off
// ---------------------------------------------------------------------------

/// An ephemeral request for the scanning subsystem to check a resource now.
///
/// Created per dispatch and never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Correlates the scan with the dispatch that produced it.
    pub dispatch_id: DispatchId,
    /// Resource to scan.
    pub resource_id: ResourceId,
    /// Name of the resource to scan (informational).
    pub resource_name: ResourceName,
    /// Pipeline owning the resource.
    pub pipeline: PipelineRef,
    /// Last version already seen; `None` means scan from scratch.
    pub from_version: Option<Version>,
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source(value: Value) -> Source {
        Source::from_value(value).unwrap()
    }

    #[test]
    fn field_matches_compares_raw_strings_exactly() {
        let s = source(json!({ "org": "acme", "uri": "https://example.com/acme/repo.git" }));
        assert!(s.field_matches("org", "acme"));
        assert!(!s.field_matches("org", "ACME"));
        assert!(!s.field_matches("org", "acme "));
        assert!(!s.field_matches("missing", "acme"));
    }

    #[test]
    fn field_matches_does_not_evaluate_placeholders() {
        let s = source(json!({ "org": "((org-name))" }));
        assert!(s.field_matches("org", "((org-name))"));
        assert!(!s.field_matches("org", "acme"));
    }

    #[test]
    fn field_matches_scalars_by_text_and_never_containers() {
        let s = source(json!({
            "port": 8080,
            "insecure": true,
            "nested": { "org": "acme" },
            "list": ["acme"],
            "nothing": null,
        }));
        assert!(s.field_matches("port", "8080"));
        assert!(s.field_matches("insecure", "true"));
        assert!(!s.field_matches("nested", "acme"));
        assert!(!s.field_matches("list", "acme"));
        assert!(!s.field_matches("nothing", "null"));
    }

    #[test]
    fn source_must_be_an_object() {
        assert!(Source::from_value(json!("acme")).is_none());
    }

    #[test]
    fn version_display_is_stable() {
        let v: Version = [("ref", "abc"), ("branch", "main")].into_iter().collect();
        assert_eq!(v.to_string(), "branch:main,ref:abc");
    }
}
