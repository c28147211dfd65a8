//! Router setup.

use axum::extract::OriginalUri;
use axum::Router;
use pipeline::WebhookError;
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::routes;
use crate::state::ListenerState;

/// Creates the webhook router.
pub fn webhook_router(state: ListenerState) -> Router {
    Router::new()
        .merge(routes::routes())
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found(uri: OriginalUri) -> ApiError {
    ApiError(WebhookError::NotFound {
        message: format!("not found: {}", uri.0.path()),
    })
}
