//! Core domain for webhook-triggered resource checks.
//!
//! A third party (typically a source-control host) calls a webhook to say that
//! a tracked resource may have changed. This crate decides whether to believe
//! it and, if so, asks the scanning subsystem to check the resource now
//! instead of waiting for the next polling interval.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed (persistence, credential evaluation, scanning,
//! observability); infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`ResourceId`, `ResourceConfigId`, `TeamName`, etc.) |
//! | [`types`] | Value types (`TrackedResource`, `Source`, `Version`, `ScanRequest`, etc.) |
//! | [`errors`] | `WebhookError` outcome taxonomy and collaborator errors |
//! | [`ports`] | Collaborator traits implemented by infrastructure crates |
//! | [`credentials`] | `((var))` template evaluation over a `VariableSource` |
//! | [`auth`] | Token authentication |
//! | [`resolve`] | Named and shared resource resolution |
//! | [`resume`] | Resume-point resolution from version history |
//! | [`dispatch`] | Supervised, fire-and-forget scan dispatch |
//! | [`events`] | Observability events and sinks |
//! | [`service`] | The per-request state machine for both webhook flavours |

pub mod auth;
pub mod credentials;
pub mod dispatch;
pub mod errors;
pub mod events;
pub mod identifiers;
pub mod ports;
pub mod resolve;
pub mod resume;
pub mod service;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use auth::{authenticate, AuthOutcome};
pub use credentials::{TemplatedCredentials, VariableScope, VariableSource};
pub use dispatch::{DispatchHandle, DispatchOutcome, Dispatcher};
pub use errors::{CredentialError, ResumePointError, ScanError, StoreError, WebhookError};
pub use events::{Endpoint, RecordingEventSink, TracingEventSink, WebhookEvent};
pub use identifiers::{
    DispatchId, PipelineName, ResourceConfigId, ResourceId, ResourceName, ResourceType,
    SourceKey, TeamName,
};
pub use ports::{
    CredentialResolver, EventSink, PipelineRepository, ResourceConfigRepository,
    ResourceRepository, Scanner,
};
pub use resolve::{resolve_named, resolve_shared, NamedResolution, SharedResolution};
pub use resume::resolve_resume_point;
pub use service::{Accepted, Collaborators, WebhookService};
pub use types::{
    Pipeline, PipelineRef, ResourceConfig, ResourceVersion, ScanRequest, Source, Timestamp,
    TrackedResource, Version,
};
