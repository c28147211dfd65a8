//! HTTP webhook receiver for resource checks.
//!
//! Exposes the check webhooks over HTTP and hands every request to
//! [`pipeline::WebhookService`]:
//!
//! | Route | Purpose |
//! |-------|---------|
//! | `GET\|POST /pipelines/{pipeline}/resources/{resource}/check/webhook` | One resource in the default team |
//! | `GET\|POST /teams/{team}/pipelines/{pipeline}/resources/{resource}/check/webhook` | One resource in a named team |
//! | `GET\|POST /webhooks/shared` | Every resource matching a source field and token |
//! | `GET /healthz` | Liveness |
//!
//! The response is written as soon as the request is accepted or rejected.
//! Accepted requests have their scans dispatched on detached tasks that
//! outlive the connection.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Routing, parameter extraction and status-code mapping
//! live here. The [`pipeline`] crate never sees HTTP types.

pub mod error;
pub mod router;
pub mod routes;
pub mod state;

use std::future::Future;

use tokio::net::TcpListener;

pub use error::{ApiError, ErrorDetail, ErrorResponse};
pub use router::webhook_router;
pub use routes::WebhookAccepted;
pub use state::ListenerState;

/// Serves `router` on `listener` until `shutdown` resolves.
///
/// In-flight requests are allowed to finish. Dispatches that are still running
/// keep running for as long as the runtime does.
pub async fn serve(
    listener: TcpListener,
    router: axum::Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "webhook listener started");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}
