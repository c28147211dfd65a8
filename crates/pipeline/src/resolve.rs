//! Mapping webhook addressing information onto tracked resources.
//!
//! Two addressing modes exist: a named resource inside one pipeline, and a
//! shared `(source key, source value, token)` triple that may fan out across
//! pipelines and teams.

use crate::auth::{authenticate, AuthOutcome};
use crate::errors::{CredentialError, StoreError};
use crate::ports::{CredentialResolver, PipelineRepository, ResourceRepository};
use crate::{PipelineRef, ResourceName, SourceKey, TrackedResource};

/// Outcome of a successful named lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum NamedResolution {
    /// The resource exists in the pipeline.
    Found(TrackedResource),
    /// The pipeline itself does not exist.
    PipelineNotFound,
    /// The pipeline exists but has no resource with that name.
    ResourceNotFound,
}

/// Looks up `name` within `pipeline`.
pub async fn resolve_named(
    pipelines: &dyn PipelineRepository,
    resources: &dyn ResourceRepository,
    pipeline: &PipelineRef,
    name: &ResourceName,
) -> Result<NamedResolution, StoreError> {
    if pipelines.find_pipeline(pipeline).await?.is_none() {
        return Ok(NamedResolution::PipelineNotFound);
    }

    Ok(match resources.find_resource_by_name(pipeline, name).await? {
        Some(resource) => NamedResolution::Found(resource),
        None => NamedResolution::ResourceNotFound,
    })
}

/// Outcome of a successful shared lookup.
///
/// `matched` may be empty; deciding how to surface zero matches is the
/// caller's job.
#[derive(Debug, Default)]
pub struct SharedResolution {
    /// Resources whose source holds the field and whose token authenticated.
    pub matched: Vec<TrackedResource>,
    /// Candidates whose secret could not be evaluated, and why.
    pub evaluation_failures: Vec<(TrackedResource, CredentialError)>,
}

/// Finds every resource whose raw source has `key` equal to `value` and whose
/// webhook secret evaluates to `token`.
///
/// Source matching uses the raw configuration, so no secret is decrypted merely
/// to compare a source field. Only the webhook secrets of candidates that
/// already match on source are evaluated. Candidates whose token does not match
/// are silently excluded; candidates whose secret cannot be evaluated are
/// returned separately, never folded into "no match".
pub async fn resolve_shared(
    resources: &dyn ResourceRepository,
    credentials: &dyn CredentialResolver,
    token: &str,
    key: &SourceKey,
    value: &str,
) -> Result<SharedResolution, StoreError> {
    let candidates = resources.find_resources_by_source_field(key, value).await?;

    let mut resolution = SharedResolution::default();
    for candidate in candidates {
        match authenticate(credentials, &candidate, token).await {
            AuthOutcome::Authenticated => resolution.matched.push(candidate),
            AuthOutcome::Unauthorized | AuthOutcome::MissingToken => {}
            AuthOutcome::CredentialEvaluationFailed(err) => {
                resolution.evaluation_failures.push((candidate, err));
            }
        }
    }
    Ok(resolution)
}
