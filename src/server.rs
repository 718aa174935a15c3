//! HTTP boundary exposing the guide pipeline.
//!
//! Stateless: every `POST /generate-guide` runs one generation and returns
//! the guides in the response body.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::body::Incoming;
use hyper::header::{CONTENT_TYPE, HeaderValue};
use hyper::server::conn::http1;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::error::GuideError;
use crate::pipeline::GuidePipeline;

/// Largest request body accepted
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Handle to a running server that can be used to stop it
pub struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    addr: SocketAddr,
}

impl ServerHandle {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Stop the server
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Start the guide server on the given host and port (0 picks a free port)
pub async fn start_server_on(
    host: &str,
    port: u16,
    pipeline: GuidePipeline,
) -> anyhow::Result<ServerHandle> {
    let listener = TcpListener::bind((host, port)).await?;
    let local_addr = listener.local_addr()?;

    info!("Starting guide server on {}", local_addr);

    let (shutdown_tx, mut shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => {
                    info!("Shutting down guide server");
                    break;
                }
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer)) => {
                            debug!("Accepted connection from {}", peer);
                            let io = TokioIo::new(stream);
                            let pipeline = pipeline.clone();

                            tokio::spawn(async move {
                                if let Err(err) = http1::Builder::new()
                                    .serve_connection(
                                        io,
                                        hyper::service::service_fn(move |req| {
                                            let pipeline = pipeline.clone();
                                            async move { Ok::<_, Infallible>(route(req, &pipeline).await) }
                                        }),
                                    )
                                    .await
                                {
                                    error!("Error serving connection: {:?}", err);
                                }
                            });
                        }
                        Err(e) => {
                            error!("Failed to accept connection: {}", e);
                        }
                    }
                }
            }
        }
    });

    Ok(ServerHandle {
        shutdown_tx,
        addr: local_addr,
    })
}

async fn route(req: Request<Incoming>, pipeline: &GuidePipeline) -> Response<Full<Bytes>> {
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    debug!("{} {}", method, path);

    match (path.as_str(), method) {
        ("/generate-guide", Method::POST) => generate_guide(req, pipeline).await,
        ("/health", Method::GET) => json_response(StatusCode::OK, json!({ "status": "ok" })),
        ("/generate-guide" | "/health", _) => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    }
}

async fn generate_guide(req: Request<Incoming>, pipeline: &GuidePipeline) -> Response<Full<Bytes>> {
    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Rejected request body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Request body too large or unreadable");
        }
    };

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            debug!("Invalid JSON body: {}", e);
            return error_response(StatusCode::BAD_REQUEST, "Request body must be valid JSON");
        }
    };

    let Some(slide_texts) = payload.get("slideTexts").and_then(Value::as_array) else {
        return guide_error_response(&GuideError::EmptyInput { field: "slideTexts" });
    };
    let Some(deck_title) = payload.get("deckTitle").and_then(Value::as_str) else {
        return guide_error_response(&GuideError::EmptyInput { field: "deckTitle" });
    };

    match pipeline.generate_json(deck_title, slide_texts).await {
        Ok(guides) => json_response(StatusCode::OK, json!({ "guides": guides })),
        Err(e) => {
            warn!("Guide generation failed ({:?} stage): {}", e.stage(), e);
            guide_error_response(&e)
        }
    }
}

fn guide_error_response(err: &GuideError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    error_response(status, &err.user_message())
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, json!({ "error": message }))
}

fn json_response(status: StatusCode, body: Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::tests::{StubBackend, model_response};
    use std::sync::Arc;
    use std::time::Duration;

    async fn start(backend: StubBackend) -> ServerHandle {
        let pipeline = GuidePipeline::new(Arc::new(backend), Duration::from_secs(30));
        start_server_on("127.0.0.1", 0, pipeline).await.unwrap()
    }

    async fn post(handle: &ServerHandle, body: Value) -> (u16, Value) {
        let response = reqwest::Client::new()
            .post(format!("{}/generate-guide", handle.url()))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    #[tokio::test]
    async fn test_generate_guide_success() {
        let handle = start(StubBackend::ok(model_response(2))).await;

        let (status, body) = post(
            &handle,
            json!({ "slideTexts": ["Welcome to Acme", ""], "deckTitle": "Acme Pitch" }),
        )
        .await;

        assert_eq!(status, 200);
        let guides = body["guides"].as_array().unwrap();
        assert_eq!(guides.len(), 2);
        assert_eq!(guides[1]["slideNumber"], 2);
        assert_eq!(guides[0]["speakerReminder"]["energy"], "Medium");
        handle.stop();
    }

    #[tokio::test]
    async fn test_empty_slides_is_bad_request() {
        let handle = start(StubBackend::ok(model_response(1))).await;
        let (status, body) = post(&handle, json!({ "slideTexts": [], "deckTitle": "Deck" })).await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("slideTexts"));
        handle.stop();
    }

    #[tokio::test]
    async fn test_missing_fields_are_bad_request() {
        let handle = start(StubBackend::ok(model_response(1))).await;

        let (status, _) = post(&handle, json!({ "deckTitle": "Deck" })).await;
        assert_eq!(status, 400);

        let (status, _) = post(&handle, json!({ "slideTexts": "not a list", "deckTitle": "Deck" })).await;
        assert_eq!(status, 400);

        let (status, body) = post(&handle, json!({ "slideTexts": ["one"] })).await;
        assert_eq!(status, 400);
        assert!(body["error"].as_str().unwrap().contains("deckTitle"));
        handle.stop();
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let handle = start(StubBackend::ok(model_response(1))).await;
        let response = reqwest::Client::new()
            .post(format!("{}/generate-guide", handle.url()))
            .body("{not json")
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 400);
        handle.stop();
    }

    #[tokio::test]
    async fn test_upstream_errors_map_to_status() {
        let cases = [
            (GuideError::RateLimited, 429, "Rate limit exceeded. Please try again in a moment."),
            (
                GuideError::QuotaExceeded,
                402,
                "AI usage limit reached. Please add credits to continue.",
            ),
        ];
        for (error, expected_status, expected_message) in cases {
            let handle = start(StubBackend::failing(error)).await;
            let (status, body) = post(&handle, json!({ "slideTexts": ["one"], "deckTitle": "Deck" })).await;
            assert_eq!(status, expected_status);
            assert_eq!(body["error"], expected_message);
            handle.stop();
        }
    }

    #[tokio::test]
    async fn test_missing_credential_is_unauthorized() {
        let handle = start(StubBackend::failing(GuideError::AuthenticationMissing)).await;
        let (status, _) = post(&handle, json!({ "slideTexts": ["one"], "deckTitle": "Deck" })).await;
        assert_eq!(status, 401);
        handle.stop();
    }

    #[tokio::test]
    async fn test_count_mismatch_is_bad_gateway() {
        let handle = start(StubBackend::ok(model_response(1))).await;
        let (status, _) = post(&handle, json!({ "slideTexts": ["one", "two"], "deckTitle": "Deck" })).await;
        assert_eq!(status, 502);
        handle.stop();
    }

    #[tokio::test]
    async fn test_binds_by_host_name() {
        let pipeline = GuidePipeline::new(
            Arc::new(StubBackend::ok(model_response(1))),
            Duration::from_secs(30),
        );
        let handle = start_server_on("localhost", 0, pipeline).await.unwrap();
        assert!(!handle.url().ends_with(":0"));

        let health = reqwest::get(format!("{}/health", handle.url())).await.unwrap();
        assert_eq!(health.status().as_u16(), 200);
        handle.stop();
    }

    #[tokio::test]
    async fn test_health_and_routing() {
        let handle = start(StubBackend::ok(model_response(1))).await;
        let client = reqwest::Client::new();

        let health = client.get(format!("{}/health", handle.url())).send().await.unwrap();
        assert_eq!(health.status().as_u16(), 200);
        assert_eq!(health.json::<Value>().await.unwrap()["status"], "ok");

        let missing = client.get(format!("{}/nope", handle.url())).send().await.unwrap();
        assert_eq!(missing.status().as_u16(), 404);

        let wrong = client.get(format!("{}/generate-guide", handle.url())).send().await.unwrap();
        assert_eq!(wrong.status().as_u16(), 405);
        assert!(wrong.json::<Value>().await.unwrap()["error"].is_string());
        handle.stop();
    }
}
