//! Transport-independent handling of check webhooks.
//!
//! [`WebhookService`] runs the per-request state machine: authenticate and
//! resolve synchronously, decide the outcome, then spawn dispatches. The
//! dispatches are already running when a method returns `Ok`, and the caller
//! writes its response without waiting for them.

use std::sync::Arc;

use crate::auth::{authenticate, AuthOutcome};
use crate::dispatch::{DispatchHandle, Dispatcher};
use crate::errors::WebhookError;
use crate::events::{Endpoint, WebhookEvent};
use crate::ports::{
    CredentialResolver, EventSink, PipelineRepository, ResourceConfigRepository,
    ResourceRepository, Scanner,
};
use crate::resolve::{resolve_named, resolve_shared, NamedResolution};
use crate::{PipelineRef, ResourceName, SourceKey};

/// Collaborators needed by [`WebhookService`].
#[derive(Clone)]
pub struct Collaborators {
    /// Pipeline lookups.
    pub pipelines: Arc<dyn PipelineRepository>,
    /// Resource lookups.
    pub resources: Arc<dyn ResourceRepository>,
    /// Configuration identity and version lookups.
    pub configs: Arc<dyn ResourceConfigRepository>,
    /// Webhook secret evaluation.
    pub credentials: Arc<dyn CredentialResolver>,
    /// The scanning subsystem.
    pub scanner: Arc<dyn Scanner>,
    /// Observability sink.
    pub events: Arc<dyn EventSink>,
}

/// A request that passed authentication and resolution.
#[derive(Debug)]
pub struct Accepted {
    /// One handle per spawned dispatch. Dropping them detaches the dispatches.
    pub dispatches: Vec<DispatchHandle>,
}

impl Accepted {
    /// Number of dispatches spawned for the request.
    pub fn dispatched(&self) -> usize {
        self.dispatches.len()
    }
}

/// Entry point for both webhook flavours.
#[derive(Clone)]
pub struct WebhookService {
    pipelines: Arc<dyn PipelineRepository>,
    resources: Arc<dyn ResourceRepository>,
    credentials: Arc<dyn CredentialResolver>,
    events: Arc<dyn EventSink>,
    dispatcher: Dispatcher,
}

impl WebhookService {
    /// Creates a service over the given collaborators.
    pub fn new(collaborators: Collaborators) -> Self {
        let dispatcher = Dispatcher::new(
            collaborators.configs,
            collaborators.scanner,
            collaborators.events.clone(),
        );
        Self {
            pipelines: collaborators.pipelines,
            resources: collaborators.resources,
            credentials: collaborators.credentials,
            events: collaborators.events,
            dispatcher,
        }
    }

    /// Handles a webhook addressed to one named resource.
    ///
    /// Exactly one event is recorded for every rejected request. On success a
    /// single dispatch is already running when this returns.
    pub async fn check_resource_webhook(
        &self,
        pipeline: &PipelineRef,
        resource_name: &str,
        token: Option<&str>,
    ) -> Result<Accepted, WebhookError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(self.missing(Endpoint::Named, "webhook_token"));
        };

        let Some(name) = ResourceName::new(resource_name) else {
            return Err(self.resource_not_found(pipeline, resource_name));
        };

        let resolution = resolve_named(
            self.pipelines.as_ref(),
            self.resources.as_ref(),
            pipeline,
            &name,
        )
        .await
        .map_err(|err| self.lookup_failed(Endpoint::Named, &err))?;

        let resource = match resolution {
            NamedResolution::Found(resource) => resource,
            NamedResolution::PipelineNotFound => {
                self.events.record(WebhookEvent::PipelineNotFound {
                    pipeline: pipeline.clone(),
                });
                return Err(WebhookError::NotFound {
                    message: format!("pipeline '{pipeline}' not found"),
                });
            }
            NamedResolution::ResourceNotFound => {
                return Err(self.resource_not_found(pipeline, resource_name));
            }
        };

        match authenticate(self.credentials.as_ref(), &resource, token).await {
            AuthOutcome::Authenticated => Ok(Accepted {
                dispatches: vec![self.dispatcher.dispatch(resource)],
            }),
            AuthOutcome::Unauthorized => {
                self.events.record(WebhookEvent::InvalidToken {
                    pipeline: resource.pipeline,
                    resource: resource.name,
                });
                Err(WebhookError::Unauthorized)
            }
            AuthOutcome::MissingToken => Err(self.missing(Endpoint::Named, "webhook_token")),
            AuthOutcome::CredentialEvaluationFailed(err) => {
                self.events.record(WebhookEvent::CredentialEvaluationFailed {
                    endpoint: Endpoint::Named,
                    pipeline: resource.pipeline,
                    resource: resource.name,
                    error: err.to_string(),
                });
                Err(WebhookError::BackendFailure {
                    message: "failed to evaluate webhook token".to_string(),
                })
            }
        }
    }

    /// Handles a shared webhook that may fan out to many resources.
    ///
    /// Zero matches is [`WebhookError::NotFound`]. When some candidates could not
    /// have their secret evaluated, the request still succeeds if any other
    /// candidate matched; otherwise it is a [`WebhookError::BackendFailure`]
    /// because "no match" cannot be confirmed.
    pub async fn check_shared_webhook(
        &self,
        token: Option<&str>,
        source_key: Option<&str>,
        source_value: Option<&str>,
    ) -> Result<Accepted, WebhookError> {
        let Some(token) = token.filter(|t| !t.is_empty()) else {
            return Err(self.missing(Endpoint::Shared, "webhook_token"));
        };
        let Some(key) = source_key.and_then(SourceKey::new) else {
            return Err(self.missing(Endpoint::Shared, "source_key"));
        };
        let Some(value) = source_value.filter(|v| !v.is_empty()) else {
            return Err(self.missing(Endpoint::Shared, "source_value"));
        };

        let resolution = resolve_shared(
            self.resources.as_ref(),
            self.credentials.as_ref(),
            token,
            &key,
            value,
        )
        .await
        .map_err(|err| self.lookup_failed(Endpoint::Shared, &err))?;

        let failed = resolution.evaluation_failures.len();
        for (resource, err) in resolution.evaluation_failures {
            self.events.record(WebhookEvent::CredentialEvaluationFailed {
                endpoint: Endpoint::Shared,
                pipeline: resource.pipeline,
                resource: resource.name,
                error: err.to_string(),
            });
        }

        if resolution.matched.is_empty() {
            if failed > 0 {
                return Err(WebhookError::BackendFailure {
                    message: format!("failed to evaluate webhook token for {failed} resource(s)"),
                });
            }
            self.events.record(WebhookEvent::NoSharedMatches {
                source_key: key.to_string(),
                source_value: value.to_string(),
            });
            return Err(WebhookError::NotFound {
                message: format!("no resources match {key}={value}"),
            });
        }

        Ok(Accepted {
            dispatches: self.dispatcher.dispatch_all(resolution.matched),
        })
    }

    fn missing(&self, endpoint: Endpoint, parameter: &str) -> WebhookError {
        self.events.record(WebhookEvent::MissingParameter {
            endpoint,
            parameter: parameter.to_string(),
        });
        WebhookError::input_missing(parameter)
    }

    fn resource_not_found(&self, pipeline: &PipelineRef, resource: &str) -> WebhookError {
        self.events.record(WebhookEvent::ResourceNotFound {
            pipeline: pipeline.clone(),
            resource: resource.to_string(),
        });
        WebhookError::NotFound {
            message: format!("resource '{resource}' not found in pipeline '{pipeline}'"),
        }
    }

    fn lookup_failed(&self, endpoint: Endpoint, err: &dyn std::error::Error) -> WebhookError {
        self.events.record(WebhookEvent::LookupFailed {
            endpoint,
            error: err.to_string(),
        });
        WebhookError::BackendFailure {
            message: "failed to look up resources".to_string(),
        }
    }
}
