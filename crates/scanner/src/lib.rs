//! HTTP client for the resource scanning service.
//!
//! Implements the [`pipeline::Scanner`] trait by posting each
//! [`pipeline::ScanRequest`] to the scanning service's check endpoint. The call
//! returns as soon as the service has accepted the request; the scan itself
//! runs and reports on the service's side.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** Transport, timeouts and status-code mapping live here.
//! The [`pipeline`] crate sees only [`pipeline::Scanner`].

use std::time::Duration;

use async_trait::async_trait;
use pipeline::{ResourceId, ScanError, ScanRequest, Scanner};
use reqwest::StatusCode;
use thiserror::Error;

/// Default timeout for one trigger call.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors raised while constructing an [`HttpScanner`].
#[derive(Debug, Error)]
pub enum ScannerSetupError {
    /// The base URL is empty.
    #[error("scanner base URL must not be empty")]
    MissingBaseUrl,

    /// The HTTP client could not be built (e.g. TLS backend unavailable).
    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}

/// [`Scanner`] that reaches the scanning service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpScanner {
    base_url: String,
    client: reqwest::Client,
}

impl HttpScanner {
    /// Creates a scanner targeting `base_url` with the given per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ScannerSetupError> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(ScannerSetupError::MissingBaseUrl);
        }
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn check_url(&self, resource: ResourceId) -> String {
        format!("{}/api/v1/resources/{resource}/check", self.base_url)
    }
}

#[async_trait]
impl Scanner for HttpScanner {
    async fn trigger_scan(&self, request: ScanRequest) -> Result<(), ScanError> {
        let url = self.check_url(request.resource_id);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| ScanError::Transport {
                message: format!("scan request failed: {e}"),
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!(dispatch_id = %request.dispatch_id, %status, "scan accepted");
            return Ok(());
        }

        let body = response.bytes().await.map_err(|e| ScanError::Transport {
            message: format!("failed reading scan error body: {e}"),
        })?;
        let message = serde_json::from_slice::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| {
                value
                    .get("message")
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| String::from_utf8_lossy(&body).to_string());

        Err(classify(status, message))
    }
}

fn classify(status: StatusCode, message: String) -> ScanError {
    if status.is_server_error() {
        ScanError::Unavailable {
            status: status.as_u16(),
            message,
        }
    } else {
        // 4xx, and any 1xx/3xx the client did not resolve on its own.
        ScanError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::{Path, State};
    use axum::http::StatusCode as AxumStatus;
    use axum::routing::post;
    use axum::{Json, Router};
    use pipeline::{DispatchId, PipelineName, PipelineRef, ResourceName, TeamName, Version};
    use serde_json::json;

    use super::*;

    type Received = Arc<Mutex<Vec<(u64, serde_json::Value)>>>;

    async fn spawn_scan_server(status: AxumStatus, body: serde_json::Value) -> (String, Received) {
        let received: Received = Arc::default();
        let app = Router::new()
            .route(
                "/api/v1/resources/:id/check",
                post(
                    move |State(received): State<Received>,
                          Path(id): Path<u64>,
                          Json(request): Json<serde_json::Value>| {
                        let body = body.clone();
                        async move {
                            received.lock().unwrap().push((id, request));
                            (status, Json(body))
                        }
                    },
                ),
            )
            .with_state(received.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        (format!("http://{addr}/"), received)
    }

    fn sample_request(from_version: Option<Version>) -> ScanRequest {
        ScanRequest {
            dispatch_id: DispatchId::new_random(),
            resource_id: ResourceId::new(42),
            resource_name: ResourceName::new("repo-a").unwrap(),
            pipeline: PipelineRef::new(TeamName::new("main").unwrap(), PipelineName::new("ci").unwrap()),
            from_version,
        }
    }

    #[tokio::test]
    async fn accepted_scans_post_the_request_body() {
        let (url, received) = spawn_scan_server(AxumStatus::ACCEPTED, json!({})).await;
        let scanner = HttpScanner::new(url, DEFAULT_REQUEST_TIMEOUT).unwrap();

        let version: Version = [("ref", "abc")].into_iter().collect();
        scanner
            .trigger_scan(sample_request(Some(version)))
            .await
            .unwrap();

        let received = received.lock().unwrap().clone();
        assert_eq!(received.len(), 1);
        assert_eq!(received[0].0, 42);
        assert_eq!(received[0].1["from_version"], json!({ "ref": "abc" }));
        assert_eq!(received[0].1["resource_name"], json!("repo-a"));
    }

    #[tokio::test]
    async fn scratch_scans_send_a_null_resume_point() {
        let (url, received) = spawn_scan_server(AxumStatus::OK, json!({})).await;
        let scanner = HttpScanner::new(url, DEFAULT_REQUEST_TIMEOUT).unwrap();

        scanner.trigger_scan(sample_request(None)).await.unwrap();
        assert_eq!(received.lock().unwrap()[0].1["from_version"], json!(null));
    }

    #[tokio::test]
    async fn client_errors_map_to_rejected() {
        let (url, _) =
            spawn_scan_server(AxumStatus::UNPROCESSABLE_ENTITY, json!({ "message": "unknown resource" }))
                .await;
        let scanner = HttpScanner::new(url, DEFAULT_REQUEST_TIMEOUT).unwrap();

        let err = scanner.trigger_scan(sample_request(None)).await.unwrap_err();
        assert_eq!(
            err,
            ScanError::Rejected {
                status: 422,
                message: "unknown resource".to_string()
            }
        );
    }

    #[tokio::test]
    async fn server_errors_map_to_unavailable() {
        let (url, _) = spawn_scan_server(AxumStatus::SERVICE_UNAVAILABLE, json!("busy")).await;
        let scanner = HttpScanner::new(url, DEFAULT_REQUEST_TIMEOUT).unwrap();

        let err = scanner.trigger_scan(sample_request(None)).await.unwrap_err();
        assert!(matches!(err, ScanError::Unavailable { status: 503, .. }));
    }

    #[tokio::test]
    async fn unreachable_scanner_is_a_transport_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let scanner = HttpScanner::new(format!("http://{addr}"), Duration::from_secs(2)).unwrap();
        let err = scanner.trigger_scan(sample_request(None)).await.unwrap_err();
        assert!(matches!(err, ScanError::Transport { .. }));
    }

    #[test]
    fn only_server_errors_are_unavailable() {
        let status_of = |code: u16| StatusCode::from_u16(code).unwrap();

        assert!(matches!(
            classify(status_of(502), String::new()),
            ScanError::Unavailable { status: 502, .. }
        ));
        for code in [304, 307, 400, 404] {
            assert!(
                matches!(classify(status_of(code), String::new()), ScanError::Rejected { status, .. } if status == code),
                "{code}"
            );
        }
    }

    #[test]
    fn empty_base_url_is_rejected() {
        assert!(matches!(
            HttpScanner::new("  ", DEFAULT_REQUEST_TIMEOUT),
            Err(ScannerSetupError::MissingBaseUrl)
        ));
    }
}
