//! Streaming client for the Gemini generation API.
//!
//! [`GenerationClient`] wraps a single streaming call per invocation and
//! records the admission with the rate window at submission time. The
//! remote service sits behind the [`GenerationTransport`] trait so tests
//! can substitute a scripted transport; the production implementation
//! speaks Gemini's `streamGenerateContent` SSE protocol over `reqwest`.

use crate::gemini::rate_limiter::RequestWindow;
use crate::gemini::types::{ChunkStream, GeminiError, GenerationRequest, PromptPart};
use base64::Engine;
use futures::StreamExt;
use futures::future::BoxFuture;
use reqwest::StatusCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Abstraction over the remote generation service.
///
/// One call opens one stream; the stream terminates normally on
/// end-of-stream or with a single terminal error.
pub trait GenerationTransport: Send + Sync {
    fn start_stream(
        &self,
        parts: Vec<PromptPart>,
    ) -> BoxFuture<'_, Result<ChunkStream, GeminiError>>;
}

/// Client wrapping one streaming generation call per invocation.
///
/// Collaborators are injected fully formed at construction; there is no
/// post-hoc wiring step.
pub struct GenerationClient {
    transport: Arc<dyn GenerationTransport>,
    limiter: Arc<RequestWindow>,
}

impl GenerationClient {
    pub fn new(transport: Arc<dyn GenerationTransport>, limiter: Arc<RequestWindow>) -> Self {
        Self { transport, limiter }
    }

    /// Submit a request and return its chunk stream.
    ///
    /// The admission is recorded exactly once here, at submission time,
    /// not per chunk. Transport failure surfaces as a single terminal
    /// error; callers discard any partial output.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<ChunkStream, GeminiError> {
        self.limiter.admit().await;
        debug!(request_id = %request.id, mode = ?request.mode, "submitting generation request");
        self.transport.start_stream(request.prompt_parts()).await
    }
}

/// Production transport speaking Gemini's SSE streaming protocol.
pub struct GeminiTransport {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiTransport {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Override the service endpoint (tests, regional endpoints)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }
}

impl GenerationTransport for GeminiTransport {
    fn start_stream(
        &self,
        parts: Vec<PromptPart>,
    ) -> BoxFuture<'_, Result<ChunkStream, GeminiError>> {
        Box::pin(async move {
            let body = request_body(&parts);
            let response = self
                .http
                .post(self.endpoint())
                .header("x-goog-api-key", &self.api_key)
                .json(&body)
                .send()
                .await
                .map_err(|err| GeminiError::Network(err.to_string()))?;

            let status = response.status();
            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                return Err(GeminiError::Auth(format!(
                    "service refused the API key (status {})",
                    status.as_u16()
                )));
            }
            if !status.is_success() {
                let message = response.text().await.unwrap_or_default();
                return Err(GeminiError::Api {
                    status: status.as_u16(),
                    message: summarize_error(&message),
                });
            }

            let (tx, rx) = mpsc::unbounded_channel();
            let mut bytes = response.bytes_stream();

            // Producer task: frame SSE lines out of the byte stream and
            // forward parsed chunks until completion or a terminal error.
            tokio::spawn(async move {
                let mut buffer = String::new();
                while let Some(next) = bytes.next().await {
                    match next {
                        Ok(chunk) => {
                            buffer.push_str(&String::from_utf8_lossy(&chunk));
                            while let Some(pos) = buffer.find('\n') {
                                let line: String = buffer.drain(..=pos).collect();
                                if !forward_sse_line(line.trim_end(), &tx) {
                                    return;
                                }
                            }
                        }
                        Err(err) => {
                            warn!(error = %err, "generation stream broke mid-flight");
                            let _ = tx.send(Err(GeminiError::Network(err.to_string())));
                            return;
                        }
                    }
                }
                if !buffer.is_empty() {
                    forward_sse_line(buffer.trim_end(), &tx);
                }
            });

            Ok(ChunkStream::new(rx))
        })
    }
}

/// Handle one SSE line; returns false once the stream should stop.
fn forward_sse_line(
    line: &str,
    tx: &mpsc::UnboundedSender<Result<String, GeminiError>>,
) -> bool {
    let Some(payload) = line.strip_prefix("data:") else {
        // Blank keep-alives and event/id fields carry no chunk text.
        return true;
    };
    let payload = payload.trim();
    if payload.is_empty() || payload == "[DONE]" {
        return payload != "[DONE]";
    }
    match parse_chunk_text(payload) {
        Ok(Some(text)) => tx.send(Ok(text)).is_ok(),
        Ok(None) => true,
        Err(err) => {
            let _ = tx.send(Err(err));
            false
        }
    }
}

/// Pull the candidate text out of one streamed response payload.
fn parse_chunk_text(payload: &str) -> Result<Option<String>, GeminiError> {
    let value: serde_json::Value = serde_json::from_str(payload)
        .map_err(|err| GeminiError::Stream(format!("unparseable chunk: {err}")))?;
    let mut text = String::new();
    if let Some(parts) = value["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(piece) = part["text"].as_str() {
                text.push_str(piece);
            }
        }
    }
    Ok((!text.is_empty()).then_some(text))
}

/// Encode the multi-part payload in the Gemini request shape.
fn request_body(parts: &[PromptPart]) -> serde_json::Value {
    let parts: Vec<serde_json::Value> = parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => serde_json::json!({ "text": text }),
            PromptPart::Blob { mime_type, data } => serde_json::json!({
                "inline_data": {
                    "mime_type": mime_type,
                    "data": base64::engine::general_purpose::STANDARD.encode(data),
                }
            }),
        })
        .collect();
    serde_json::json!({ "contents": [{ "parts": parts }] })
}

/// First meaningful line of an error body, to keep messages readable.
fn summarize_error(body: &str) -> String {
    body.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("no error detail provided")
        .to_string()
}
