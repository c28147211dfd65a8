//! Credential templating.
//!
//! Webhook secrets are configured as templates such as `"((repo-a-webhook))"`
//! or `"prefix-((shared-token))"`. [`TemplatedCredentials`] evaluates those
//! templates against a [`VariableSource`], scoped to the team and pipeline
//! that own the resource.

use async_trait::async_trait;

use crate::errors::CredentialError;
use crate::ports::CredentialResolver;
use crate::{PipelineName, PipelineRef, TeamName};

const OPEN: &str = "((";
const CLOSE: &str = "))";

/// The scope a credential is evaluated in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VariableScope {
    /// Owning team.
    pub team: TeamName,
    /// Owning pipeline.
    pub pipeline: PipelineName,
}

impl From<&PipelineRef> for VariableScope {
    fn from(pipeline: &PipelineRef) -> Self {
        Self {
            team: pipeline.team.clone(),
            pipeline: pipeline.name.clone(),
        }
    }
}

/// A store of named credential variables (vault, secrets manager, static map).
#[async_trait]
pub trait VariableSource: Send + Sync {
    /// Looks up `name` within `scope`. `Ok(None)` means the variable is not
    /// defined anywhere visible from the scope.
    async fn get(&self, scope: &VariableScope, name: &str)
        -> Result<Option<String>, CredentialError>;
}

/// [`CredentialResolver`] that substitutes `((name))` placeholders.
#[derive(Debug, Clone)]
pub struct TemplatedCredentials<V> {
    variables: V,
}

impl<V: VariableSource> TemplatedCredentials<V> {
    /// Wraps a variable source.
    pub fn new(variables: V) -> Self {
        Self { variables }
    }
}

#[async_trait]
impl<V: VariableSource> CredentialResolver for TemplatedCredentials<V> {
    async fn evaluate(
        &self,
        scope: &VariableScope,
        template: &str,
    ) -> Result<String, CredentialError> {
        let mut evaluated = String::with_capacity(template.len());
        for segment in parse_template(template)? {
            match segment {
                Segment::Literal(text) => evaluated.push_str(text),
                Segment::Variable(name) => {
                    let value = self.variables.get(scope, name).await?.ok_or_else(|| {
                        CredentialError::UndefinedVariable {
                            name: name.to_string(),
                        }
                    })?;
                    evaluated.push_str(&value);
                }
            }
        }
        Ok(evaluated)
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Literal(&'a str),
    Variable(&'a str),
}

/// Splits a template into literal text and variable references.
///
/// The whole template is validated before any variable is looked up, so a
/// malformed template never triggers a backend call.
fn parse_template(template: &str) -> Result<Vec<Segment<'_>>, CredentialError> {
    let mut segments = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find(OPEN) {
        if start > 0 {
            segments.push(Segment::Literal(&rest[..start]));
        }
        let after_open = &rest[start + OPEN.len()..];
        let end = after_open
            .find(CLOSE)
            .ok_or_else(|| CredentialError::MalformedTemplate {
                reason: "unterminated '((' placeholder".to_string(),
            })?;
        let name = after_open[..end].trim();
        if name.is_empty() {
            return Err(CredentialError::MalformedTemplate {
                reason: "empty placeholder name".to_string(),
            });
        }
        segments.push(Segment::Variable(name));
        rest = &after_open[end + CLOSE.len()..];
    }

    if !rest.is_empty() {
        segments.push(Segment::Literal(rest));
    }
    Ok(segments)
}
