use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{GenerationBackend, GuideRequest};
use crate::error::{GuideError, Result};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Backend for OpenAI-compatible `/chat/completions` endpoints.
pub struct ChatCompletionsBackend {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl ChatCompletionsBackend {
    pub fn new(api_key: &str, model: &str, base_url: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_key: api_key.trim().to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl GenerationBackend for ChatCompletionsBackend {
    async fn generate(&self, request: &GuideRequest) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(GuideError::AuthenticationMissing);
        }

        let body = ChatRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("Generation request failed: {}", e.without_url());
                GuideError::UpstreamUnavailable { status: None }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Generation endpoint returned {}", status);
            debug!("Generation endpoint error body: {}", error_text);
            return Err(classify_status(status));
        }

        let response: ChatResponse = response.json().await.map_err(|e| {
            GuideError::MalformedResponse(format!("unexpected endpoint response: {e}"))
        })?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| GuideError::MalformedResponse("no content in model response".into()))
    }

    fn name(&self) -> &'static str {
        "chat-completions"
    }
}

fn classify_status(status: StatusCode) -> GuideError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GuideError::RateLimited,
        StatusCode::PAYMENT_REQUIRED => GuideError::QuotaExceeded,
        other => GuideError::UpstreamUnavailable {
            status: Some(other.as_u16()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sanitize::sanitize;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// Serve a single canned HTTP response and hand back the raw request.
    async fn one_shot_server(status: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut raw = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).await.unwrap();
                raw.extend_from_slice(&buf[..n]);
                if n == 0 || request_complete(&raw) {
                    break;
                }
            }
            let response = format!(
                "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&raw).to_string());
        });

        (format!("http://{addr}/v1"), rx)
    }

    fn request_complete(raw: &[u8]) -> bool {
        let text = String::from_utf8_lossy(raw);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        raw.len() >= header_end + 4 + content_length
    }

    fn request() -> GuideRequest {
        GuideRequest::new(&sanitize("Acme Pitch", &["Welcome to Acme"]).unwrap())
    }

    #[tokio::test]
    async fn test_returns_completion_content() {
        let (url, captured) = one_shot_server(
            "200 OK",
            r#"{"choices":[{"message":{"role":"assistant","content":"[{\"slideNumber\":1}]"}}]}"#,
        )
        .await;
        let backend = ChatCompletionsBackend::new("sk-test", "test-model", &url).unwrap();

        let content = backend.generate(&request()).await.unwrap();
        assert_eq!(content, r#"[{"slideNumber":1}]"#);

        let raw = captured.await.unwrap();
        assert!(raw.starts_with("POST /v1/chat/completions"));
        assert!(raw.to_lowercase().contains("authorization: bearer sk-test"));
        assert!(raw.contains(r#""model":"test-model""#));
        assert!(raw.contains(r#""role":"system""#));
        assert!(raw.contains(r#""role":"user""#));
    }

    #[tokio::test]
    async fn test_429_is_rate_limited() {
        let (url, _) = one_shot_server("429 Too Many Requests", r#"{"error":"slow down"}"#).await;
        let backend = ChatCompletionsBackend::new("sk-test", "m", &url).unwrap();
        assert_eq!(backend.generate(&request()).await, Err(GuideError::RateLimited));
    }

    #[tokio::test]
    async fn test_402_is_quota_exceeded() {
        let (url, _) = one_shot_server("402 Payment Required", r#"{"error":"credits"}"#).await;
        let backend = ChatCompletionsBackend::new("sk-test", "m", &url).unwrap();
        assert_eq!(backend.generate(&request()).await, Err(GuideError::QuotaExceeded));
    }

    #[tokio::test]
    async fn test_other_status_is_upstream_unavailable() {
        let (url, _) = one_shot_server("503 Service Unavailable", "{}").await;
        let backend = ChatCompletionsBackend::new("sk-test", "m", &url).unwrap();
        assert_eq!(
            backend.generate(&request()).await,
            Err(GuideError::UpstreamUnavailable { status: Some(503) })
        );
    }

    #[tokio::test]
    async fn test_missing_content_is_malformed() {
        let (url, _) = one_shot_server("200 OK", r#"{"choices":[]}"#).await;
        let backend = ChatCompletionsBackend::new("sk-test", "m", &url).unwrap();
        assert!(matches!(
            backend.generate(&request()).await,
            Err(GuideError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_non_json_body_is_malformed() {
        let (url, _) = one_shot_server("200 OK", "<html>gateway</html>").await;
        let backend = ChatCompletionsBackend::new("sk-test", "m", &url).unwrap();
        assert!(matches!(
            backend.generate(&request()).await,
            Err(GuideError::MalformedResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_network() {
        // nothing listens on this port; an attempted call would be UpstreamUnavailable
        let backend = ChatCompletionsBackend::new("  ", "m", "http://127.0.0.1:9").unwrap();
        assert_eq!(
            backend.generate(&request()).await,
            Err(GuideError::AuthenticationMissing)
        );
    }

    #[tokio::test]
    async fn test_connection_refused_is_upstream_unavailable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend =
            ChatCompletionsBackend::new("sk-test", "m", &format!("http://{addr}")).unwrap();
        assert_eq!(
            backend.generate(&request()).await,
            Err(GuideError::UpstreamUnavailable { status: None })
        );
    }

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::TOO_MANY_REQUESTS), GuideError::RateLimited);
        assert_eq!(classify_status(StatusCode::PAYMENT_REQUIRED), GuideError::QuotaExceeded);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            GuideError::UpstreamUnavailable { status: Some(401) }
        );
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let backend = ChatCompletionsBackend::new("k", "m", "https://gateway.example/v1/").unwrap();
        assert_eq!(backend.endpoint(), "https://gateway.example/v1/chat/completions");
    }
}
