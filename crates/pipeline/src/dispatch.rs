//! Asynchronous hand-off of scans to the scanning subsystem.
//!
//! A dispatch runs on its own Tokio task so the webhook response never waits on
//! resume-point lookups or the scanner. The task is not linked to the request:
//! dropping the [`DispatchHandle`] (as the HTTP layer does) detaches it, and a
//! dropped connection does not cancel it.
//!
//! Each dispatch is supervised. The work runs on an inner task whose join
//! result is inspected by an outer task, so a panic in a collaborator is
//! reported as [`WebhookEvent::DispatchPanicked`] instead of disappearing with
//! the task. Every other failure is reported through the [`EventSink`] before
//! the task ends. Nothing is retried here.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::errors::{ResumePointError, ScanError};
use crate::events::WebhookEvent;
use crate::ports::{EventSink, ResourceConfigRepository, Scanner};
use crate::resume::resolve_resume_point;
use crate::{DispatchId, ResourceId, ScanRequest, TrackedResource, Version};

/// How a single dispatch ended.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The scanner accepted the request.
    Triggered {
        /// Resume point sent with the request.
        from_version: Option<Version>,
    },
    /// The resume point could not be determined; the scanner was not called.
    ResumePointFailed(ResumePointError),
    /// The scanner refused or could not receive the request.
    TriggerFailed(ScanError),
    /// The dispatch task panicked.
    Panicked,
    /// The runtime shut down before the dispatch finished.
    Cancelled,
}

/// Handle to a running dispatch.
///
/// Dropping the handle detaches the task; it keeps running.
#[derive(Debug)]
pub struct DispatchHandle {
    id: DispatchId,
    resource_id: ResourceId,
    task: JoinHandle<DispatchOutcome>,
}

impl DispatchHandle {
    /// Identifier attached to every event of this dispatch.
    pub fn id(&self) -> DispatchId {
        self.id
    }

    /// The resource being dispatched.
    pub fn resource_id(&self) -> ResourceId {
        self.resource_id
    }

    /// Waits for the dispatch to finish.
    pub async fn join(self) -> DispatchOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => DispatchOutcome::Panicked,
            Err(_) => DispatchOutcome::Cancelled,
        }
    }
}

/// Launches scans for resolved resources.
#[derive(Clone)]
pub struct Dispatcher {
    configs: Arc<dyn ResourceConfigRepository>,
    scanner: Arc<dyn Scanner>,
    events: Arc<dyn EventSink>,
}

impl Dispatcher {
    /// Creates a dispatcher over the given collaborators.
    pub fn new(
        configs: Arc<dyn ResourceConfigRepository>,
        scanner: Arc<dyn Scanner>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            configs,
            scanner,
            events,
        }
    }

    /// Spawns one dispatch for `resource` and returns immediately.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn dispatch(&self, resource: TrackedResource) -> DispatchHandle {
        let id = DispatchId::new_random();
        let resource_id = resource.id;
        let this = self.clone();

        let task = tokio::spawn(async move {
            let work = {
                let this = this.clone();
                let resource = resource.clone();
                tokio::spawn(async move { this.run(id, resource).await })
            };

            match work.await {
                Ok(outcome) => outcome,
                Err(err) if err.is_panic() => {
                    this.events.record(WebhookEvent::DispatchPanicked {
                        dispatch_id: id,
                        pipeline: resource.pipeline,
                        resource: resource.name,
                    });
                    DispatchOutcome::Panicked
                }
                Err(_) => DispatchOutcome::Cancelled,
            }
        });

        DispatchHandle {
            id,
            resource_id,
            task,
        }
    }

    /// Spawns one independent dispatch per resource.
    ///
    /// A failure in one dispatch has no effect on the others.
    pub fn dispatch_all(&self, resources: Vec<TrackedResource>) -> Vec<DispatchHandle> {
        resources.into_iter().map(|r| self.dispatch(r)).collect()
    }

    async fn run(&self, id: DispatchId, resource: TrackedResource) -> DispatchOutcome {
        let from_version = match resolve_resume_point(self.configs.as_ref(), &resource).await {
            Ok(version) => version,
            Err(err) => {
                self.events.record(WebhookEvent::ResumePointFailed {
                    dispatch_id: id,
                    pipeline: resource.pipeline,
                    resource: resource.name,
                    error: err.to_string(),
                });
                return DispatchOutcome::ResumePointFailed(err);
            }
        };

        let request = ScanRequest {
            dispatch_id: id,
            resource_id: resource.id,
            resource_name: resource.name.clone(),
            pipeline: resource.pipeline.clone(),
            from_version: from_version.clone(),
        };

        match self.scanner.trigger_scan(request).await {
            Ok(()) => {
                self.events.record(WebhookEvent::ScanDispatched {
                    dispatch_id: id,
                    pipeline: resource.pipeline,
                    resource: resource.name,
                    from_version: from_version.clone(),
                });
                DispatchOutcome::Triggered { from_version }
            }
            Err(err) => {
                self.events.record(WebhookEvent::ScanTriggerFailed {
                    dispatch_id: id,
                    pipeline: resource.pipeline,
                    resource: resource.name,
                    error: err.to_string(),
                });
                DispatchOutcome::TriggerFailed(err)
            }
        }
    }
}
