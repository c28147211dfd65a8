//! Webhook endpoints.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::{FromRequestParts, Path, Query, State};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use pipeline::{Accepted, PipelineName, PipelineRef, TeamName, WebhookError};
use serde::{Deserialize, Serialize};

use crate::error::ApiResult;
use crate::state::ListenerState;

/// Webhook route group.
pub fn routes() -> Router<ListenerState> {
    Router::new()
        .route(
            "/pipelines/:pipeline/resources/:resource/check/webhook",
            get(check_resource_webhook).post(check_resource_webhook),
        )
        .route(
            "/teams/:team/pipelines/:pipeline/resources/:resource/check/webhook",
            get(check_team_resource_webhook).post(check_team_resource_webhook),
        )
        .route(
            "/webhooks/shared",
            get(check_shared_webhook).post(check_shared_webhook),
        )
        .route("/healthz", get(healthz))
}

/// Query string of a webhook request.
///
/// A repeated key takes its first value, so `?webhook_token=a&webhook_token=b`
/// authenticates with `a`. Extraction never fails: a query string that cannot
/// be decoded is treated as empty and the handler reports the missing
/// parameters.
#[derive(Debug, Default)]
pub struct WebhookQuery(Vec<(String, String)>);

impl WebhookQuery {
    /// First value of `key`, if present.
    pub fn first(&self, key: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for WebhookQuery
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<Vec<(String, String)>>::from_request_parts(parts, state).await {
            Ok(Query(pairs)) => Ok(Self(pairs)),
            Err(rejection) => {
                tracing::debug!(error = %rejection, "undecodable webhook query string");
                Ok(Self::default())
            }
        }
    }
}

/// Body of a `200` response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookAccepted {
    /// Number of scans dispatched for the request.
    pub dispatched: usize,
}

impl From<Accepted> for WebhookAccepted {
    // Dropping `Accepted` detaches the dispatches; they keep running.
    fn from(accepted: Accepted) -> Self {
        Self {
            dispatched: accepted.dispatched(),
        }
    }
}

/// `GET|POST /pipelines/{pipeline}/resources/{resource}/check/webhook`, in the
/// default team.
pub async fn check_resource_webhook(
    State(state): State<ListenerState>,
    Path((pipeline, resource)): Path<(String, String)>,
    query: WebhookQuery,
) -> ApiResult<Json<WebhookAccepted>> {
    let team = state.default_team.clone();
    check(&state, team, &pipeline, &resource, query).await
}

/// `GET|POST /teams/{team}/pipelines/{pipeline}/resources/{resource}/check/webhook`
pub async fn check_team_resource_webhook(
    State(state): State<ListenerState>,
    Path((team, pipeline, resource)): Path<(String, String, String)>,
    query: WebhookQuery,
) -> ApiResult<Json<WebhookAccepted>> {
    let Some(team) = TeamName::new(team) else {
        return Err(not_found("team name must not be empty").into());
    };
    check(&state, team, &pipeline, &resource, query).await
}

async fn check(
    state: &ListenerState,
    team: TeamName,
    pipeline: &str,
    resource: &str,
    query: WebhookQuery,
) -> ApiResult<Json<WebhookAccepted>> {
    let Some(name) = PipelineName::new(pipeline) else {
        return Err(not_found("pipeline name must not be empty").into());
    };
    let pipeline = PipelineRef::new(team, name);

    let accepted = state
        .service
        .check_resource_webhook(&pipeline, resource, query.first("webhook_token"))
        .await?;
    Ok(Json(accepted.into()))
}

/// `GET|POST /webhooks/shared`
pub async fn check_shared_webhook(
    State(state): State<ListenerState>,
    query: WebhookQuery,
) -> ApiResult<Json<WebhookAccepted>> {
    let accepted = state
        .service
        .check_shared_webhook(
            query.first("webhook_token"),
            query.first("source_key"),
            query.first("source_value"),
        )
        .await?;
    Ok(Json(accepted.into()))
}

/// `GET /healthz`
pub async fn healthz() -> &'static str {
    "ok"
}

fn not_found(message: &str) -> WebhookError {
    WebhookError::NotFound {
        message: message.to_string(),
    }
}
