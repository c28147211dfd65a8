//! Webhook token authentication.

use crate::credentials::VariableScope;
use crate::errors::CredentialError;
use crate::ports::CredentialResolver;
use crate::TrackedResource;

/// Result of checking a claimed token against a resource's webhook secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The evaluated secret equals the claimed token.
    Authenticated,
    /// The evaluated secret differs from the claimed token, or the resource
    /// has no webhook secret configured.
    Unauthorized,
    /// No token was supplied.
    MissingToken,
    /// The secret could not be evaluated; no comparison was made.
    CredentialEvaluationFailed(CredentialError),
}

/// Checks `claimed` against the evaluated webhook secret of `resource`.
///
/// The secret is evaluated in the resource's own pipeline scope. An evaluation
/// error short-circuits before any comparison. A secret that evaluates to the
/// empty string never authenticates. Comparison is exact and case-sensitive.
/// There are no retries.
pub async fn authenticate(
    credentials: &dyn CredentialResolver,
    resource: &TrackedResource,
    claimed: &str,
) -> AuthOutcome {
    if claimed.is_empty() {
        return AuthOutcome::MissingToken;
    }

    let Some(template) = resource.webhook_token.as_deref() else {
        return AuthOutcome::Unauthorized;
    };

    let scope = VariableScope::from(&resource.pipeline);
    let secret = match credentials.evaluate(&scope, template).await {
        Ok(secret) => secret,
        Err(err) => return AuthOutcome::CredentialEvaluationFailed(err),
    };

    if !secret.is_empty() && constant_time_eq(secret.as_bytes(), claimed.as_bytes()) {
        AuthOutcome::Authenticated
    } else {
        AuthOutcome::Unauthorized
    }
}

/// Compares two byte strings without short-circuiting on the first difference.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
