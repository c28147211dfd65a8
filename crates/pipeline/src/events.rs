//! Observability events and the sinks that receive them.
//!
//! Every rejection, lookup failure and dispatch outcome is described by a
//! [`WebhookEvent`] and handed to an injected [`EventSink`]. Events never carry
//! the supplied webhook token or any evaluated secret.

use std::sync::Mutex;

use serde::Serialize;

use crate::ports::EventSink;
use crate::{DispatchId, PipelineRef, ResourceName, Version};

/// Which webhook endpoint an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Endpoint {
    /// `/pipelines/{pipeline}/resources/{resource}/check/webhook`
    Named,
    /// `/webhooks/shared`
    Shared,
}

impl Endpoint {
    /// Stable label used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Named => "check-resource-webhook",
            Self::Shared => "check-resource-shared-webhook",
        }
    }
}

/// A structured observability event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WebhookEvent {
    /// A required query parameter was absent or empty.
    MissingParameter {
        endpoint: Endpoint,
        parameter: String,
    },

    /// The addressed pipeline does not exist.
    PipelineNotFound { pipeline: PipelineRef },

    /// The addressed resource does not exist in the pipeline.
    ResourceNotFound {
        pipeline: PipelineRef,
        resource: String,
    },

    /// A shared webhook matched no resource.
    NoSharedMatches {
        source_key: String,
        source_value: String,
    },

    /// A persistence lookup on the synchronous path failed.
    LookupFailed { endpoint: Endpoint, error: String },

    /// A resource's webhook secret could not be evaluated.
    CredentialEvaluationFailed {
        endpoint: Endpoint,
        pipeline: PipelineRef,
        resource: ResourceName,
        error: String,
    },

    /// The supplied token did not match the resource's secret.
    InvalidToken {
        pipeline: PipelineRef,
        resource: ResourceName,
    },

    /// A scan was handed off to the scanner.
    ScanDispatched {
        dispatch_id: DispatchId,
        pipeline: PipelineRef,
        resource: ResourceName,
        from_version: Option<Version>,
    },

    /// The resume point could not be determined; no scan was triggered.
    ResumePointFailed {
        dispatch_id: DispatchId,
        pipeline: PipelineRef,
        resource: ResourceName,
        error: String,
    },

    /// The scanner refused or could not receive the scan request.
    ScanTriggerFailed {
        dispatch_id: DispatchId,
        pipeline: PipelineRef,
        resource: ResourceName,
        error: String,
    },

    /// The dispatch task panicked before reaching an outcome.
    DispatchPanicked {
        dispatch_id: DispatchId,
        pipeline: PipelineRef,
        resource: ResourceName,
    },
}

impl WebhookEvent {
    /// Returns `true` for events that describe a failure rather than progress.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::ScanDispatched { .. })
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Production sink: emits each event as a structured `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, event: WebhookEvent) {
        match event {
            WebhookEvent::MissingParameter {
                endpoint,
                parameter,
            } => {
                tracing::info!(endpoint = endpoint.as_str(), %parameter, "missing webhook parameter");
            }
            WebhookEvent::PipelineNotFound { pipeline } => {
                tracing::info!(%pipeline, "pipeline not found");
            }
            WebhookEvent::ResourceNotFound { pipeline, resource } => {
                tracing::info!(%pipeline, %resource, "resource not found");
            }
            WebhookEvent::NoSharedMatches {
                source_key,
                source_value,
            } => {
                tracing::info!(%source_key, %source_value, "shared webhook matched no resources");
            }
            WebhookEvent::LookupFailed { endpoint, error } => {
                tracing::error!(endpoint = endpoint.as_str(), %error, "resource lookup failed");
            }
            WebhookEvent::CredentialEvaluationFailed {
                endpoint,
                pipeline,
                resource,
                error,
            } => {
                tracing::error!(
                    endpoint = endpoint.as_str(),
                    %pipeline,
                    %resource,
                    %error,
                    "failed to evaluate webhook token"
                );
            }
            WebhookEvent::InvalidToken { pipeline, resource } => {
                tracing::info!(%pipeline, %resource, "invalid webhook token");
            }
            WebhookEvent::ScanDispatched {
                dispatch_id,
                pipeline,
                resource,
                from_version,
            } => {
                let from_version = from_version.map(|v| v.to_string());
                tracing::info!(
                    %dispatch_id,
                    %pipeline,
                    %resource,
                    from_version = from_version.as_deref().unwrap_or("<none>"),
                    "scan dispatched"
                );
            }
            WebhookEvent::ResumePointFailed {
                dispatch_id,
                pipeline,
                resource,
                error,
            } => {
                tracing::error!(%dispatch_id, %pipeline, %resource, %error, "failed to resolve resume point");
            }
            WebhookEvent::ScanTriggerFailed {
                dispatch_id,
                pipeline,
                resource,
                error,
            } => {
                tracing::error!(%dispatch_id, %pipeline, %resource, %error, "failed to trigger scan");
            }
            WebhookEvent::DispatchPanicked {
                dispatch_id,
                pipeline,
                resource,
            } => {
                tracing::error!(%dispatch_id, %pipeline, %resource, "dispatch task panicked");
            }
        }
    }
}

/// In-memory sink that keeps every event, for tests and diagnostics.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<WebhookEvent>>,
}

impl RecordingEventSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the events recorded so far, oldest first.
    pub fn events(&self) -> Vec<WebhookEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Returns only the failure events recorded so far.
    pub fn failures(&self) -> Vec<WebhookEvent> {
        self.events().into_iter().filter(WebhookEvent::is_failure).collect()
    }
}

impl EventSink for RecordingEventSink {
    fn record(&self, event: WebhookEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
