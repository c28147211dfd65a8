//! Declarative description of the pipelines and resources to serve.
//!
//! Loaded by the CLI from configuration and turned into a populated
//! [`crate::MemoryStore`] by [`crate::MemoryStore::from_catalog`].

use pipeline::{PipelineName, ResourceName, ResourceType, Source, TeamName, Version};
use serde::{Deserialize, Serialize};

/// Every pipeline known to the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    /// Pipelines, in declaration order.
    #[serde(default)]
    pub pipelines: Vec<PipelineDefinition>,
}

/// One pipeline and its resources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDefinition {
    /// Owning team.
    pub team: TeamName,
    /// Pipeline name.
    pub name: PipelineName,
    /// Whether the pipeline is paused.
    #[serde(default)]
    pub paused: bool,
    /// Resources tracked by the pipeline.
    #[serde(default)]
    pub resources: Vec<ResourceDefinition>,
}

/// One tracked resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceDefinition {
    /// Resource name, unique within the pipeline.
    pub name: ResourceName,
    /// Resource type, e.g. `git`.
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    /// Raw source definition; placeholders are kept verbatim.
    #[serde(default)]
    pub source: Source,
    /// Templated webhook secret. Webhooks are disabled when absent.
    #[serde(default)]
    pub webhook_token: Option<String>,
    /// Versions already observed, oldest first. A non-empty list establishes
    /// the resource's configuration identity. A repeated entry counts as
    /// observed again at its last position.
    #[serde(default)]
    pub versions: Vec<Version>,
}
