use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use uuid::Uuid;

pub type RequestId = Uuid;

/// Which pipeline a request feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    /// Generate a Python script to be installed and executed
    Automation,
    /// Answer a question in plain text
    Qa,
    /// Generate a self-contained web page
    WebDev,
}

/// Binary payload attached to a generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    pub data: Vec<u8>,
}

/// One generation request. Immutable once submitted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub id: RequestId,
    pub instruction: String,
    pub attachment: Option<Attachment>,
    pub mode: GenerationMode,
}

impl GenerationRequest {
    pub fn new(instruction: impl Into<String>, mode: GenerationMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            instruction: instruction.into(),
            attachment: None,
            mode,
        }
    }

    /// Attach a binary payload (file or image) to the request
    pub fn with_attachment(mut self, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        self.attachment = Some(Attachment {
            mime_type: mime_type.into(),
            data,
        });
        self
    }

    /// Render the mode-specific prompt for this request.
    pub fn prompt_text(&self) -> String {
        match self.mode {
            GenerationMode::Automation => format!(
                "Write a Python script to {}. Only give code and nothing else.",
                self.instruction
            ),
            GenerationMode::Qa => format!(
                "Answer the following question concisely in plain text: {}",
                self.instruction
            ),
            GenerationMode::WebDev => format!(
                "Write a single self-contained HTML document (inline CSS and JavaScript) to {}. \
                 Only give code and nothing else.",
                self.instruction
            ),
        }
    }

    /// Assemble the multi-part payload forwarded to the transport.
    pub fn prompt_parts(&self) -> Vec<PromptPart> {
        let mut parts = vec![PromptPart::Text(self.prompt_text())];
        if let Some(attachment) = &self.attachment {
            parts.push(PromptPart::Blob {
                mime_type: attachment.mime_type.clone(),
                data: attachment.data.clone(),
            });
        }
        parts
    }
}

/// One element of the multi-part payload sent to the remote service.
#[derive(Debug, Clone)]
pub enum PromptPart {
    Text(String),
    Blob { mime_type: String, data: Vec<u8> },
}

/// Assembled output of one generation call.
#[derive(Debug, Clone)]
pub struct GenerationResult {
    /// Full response text as streamed from the service
    pub raw_text: String,
    /// Code with markdown wrapping stripped; `None` for answer requests
    pub extracted_code: Option<String>,
    /// Wall-clock time from submission to end of stream
    pub elapsed: Duration,
}

/// Errors emitted by the generation service integration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GeminiError {
    #[error("network error: {0}")]
    Network(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("malformed stream payload: {0}")]
    Stream(String),
}

/// Stream of text chunks from one generation call.
///
/// Produced by the transport worker and drained by the pipeline; ends when
/// the remote service signals completion or a terminal error is yielded.
pub struct ChunkStream {
    rx: UnboundedReceiver<Result<String, GeminiError>>,
}

impl ChunkStream {
    pub fn new(rx: UnboundedReceiver<Result<String, GeminiError>>) -> Self {
        Self { rx }
    }

    /// Receive the next chunk; `None` once the stream has completed.
    pub async fn next_chunk(&mut self) -> Option<Result<String, GeminiError>> {
        self.rx.recv().await
    }
}
