//! Port traits for the collaborators this crate depends on.
//!
//! Infrastructure crates implement these; the domain logic only ever sees the
//! traits. All methods are `async` and object-safe via [`async_trait`] so the
//! service can hold `Arc<dyn Trait>` handles.

use async_trait::async_trait;

use crate::credentials::VariableScope;
use crate::errors::{CredentialError, ScanError, StoreError};
use crate::events::WebhookEvent;
use crate::{
    Pipeline, PipelineRef, ResourceConfig, ResourceConfigId, ResourceName, ResourceVersion,
    ScanRequest, SourceKey, TrackedResource,
};

/// Read access to persisted pipelines.
#[async_trait]
pub trait PipelineRepository: Send + Sync {
    /// Looks up a pipeline. `Ok(None)` means it does not exist.
    async fn find_pipeline(&self, pipeline: &PipelineRef) -> Result<Option<Pipeline>, StoreError>;
}

/// Read access to persisted resources.
#[async_trait]
pub trait ResourceRepository: Send + Sync {
    /// Looks up a resource by name within a pipeline.
    async fn find_resource_by_name(
        &self,
        pipeline: &PipelineRef,
        name: &ResourceName,
    ) -> Result<Option<TrackedResource>, StoreError>;

    /// Returns every resource, across all pipelines, whose raw source
    /// definition has the top-level field `key` equal to `value`
    /// (see [`crate::Source::field_matches`]).
    async fn find_resources_by_source_field(
        &self,
        key: &SourceKey,
        value: &str,
    ) -> Result<Vec<TrackedResource>, StoreError>;
}

/// Read access to resource configuration identities and their version history.
#[async_trait]
pub trait ResourceConfigRepository: Send + Sync {
    /// Looks up a configuration identity. `Ok(None)` is a confirmed absence.
    async fn find_resource_config_by_id(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceConfig>, StoreError>;

    /// Returns the most recently observed version for `id`. `Ok(None)` is a
    /// confirmed absence of any version.
    async fn latest_version(
        &self,
        id: ResourceConfigId,
    ) -> Result<Option<ResourceVersion>, StoreError>;
}

/// Evaluates a templated credential within a scope.
#[async_trait]
pub trait CredentialResolver: Send + Sync {
    /// Returns the evaluated string, or why it could not be produced.
    async fn evaluate(&self, scope: &VariableScope, template: &str)
        -> Result<String, CredentialError>;
}

/// The scanning subsystem.
///
/// Implementations must tolerate concurrent calls for the same resource; each
/// call is an idempotent "please check now" signal.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Asks the scanner to check a resource. Returns once the request has been
    /// handed off, not once the scan has finished.
    async fn trigger_scan(&self, request: ScanRequest) -> Result<(), ScanError>;
}

/// Structured sink for observability events.
///
/// Passed explicitly into every operation; there is no global logger.
pub trait EventSink: Send + Sync {
    /// Records one event. Must not block.
    fn record(&self, event: WebhookEvent);
}
