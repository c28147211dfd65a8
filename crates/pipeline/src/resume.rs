//! Determining the version a scan should resume from.

use crate::errors::ResumePointError;
use crate::ports::ResourceConfigRepository;
use crate::{TrackedResource, Version};

/// Returns the version the next scan of `resource` should treat as already seen.
///
/// `Ok(None)` means "scan from scratch" and is only returned after a confirmed
/// absence: the resource has no configuration identity yet, the identity is not
/// stored, or no version has been observed under it. Any lookup failure is an
/// error, because scanning from scratch on an indeterminate history would
/// re-report versions the pipeline has already seen.
///
/// The returned version is guaranteed to belong to the resource's own
/// configuration identity.
pub async fn resolve_resume_point(
    configs: &dyn ResourceConfigRepository,
    resource: &TrackedResource,
) -> Result<Option<Version>, ResumePointError> {
    let Some(config_id) = resource.resource_config_id else {
        return Ok(None);
    };

    let Some(config) = configs.find_resource_config_by_id(config_id).await? else {
        return Ok(None);
    };

    let Some(latest) = configs.latest_version(config.id).await? else {
        return Ok(None);
    };

    if latest.resource_config_id != config_id {
        return Err(ResumePointError::IdentityMismatch {
            expected: config_id,
            found: latest.resource_config_id,
        });
    }

    Ok(Some(latest.version))
}
