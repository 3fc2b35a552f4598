pub mod gemini;

pub use gemini::GeminiGateway;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::model::ModelOption;
use crate::state::ChatMessage;

/// Identifies one submitted request for the lifetime of a controller.
pub type RequestId = u64;

/// Failures reported by an inference backend. The `Display` text is what the
/// user sees in the error banner.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("{0}")]
    Transport(String),
    #[error("Gemini request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Could not read the model response: {0}")]
    Decode(String),
    #[error("Gemini API key not configured. Set GOOGLE_GENERATIVE_AI_API_KEY or add api_key to the config file.")]
    MissingApiKey,
    #[error("{0}")]
    Backend(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Transport(err.to_string())
        }
    }
}

/// Progress of a request, sent from the request task back to the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEvent {
    Chunk { request: RequestId, text: String },
    Completed { request: RequestId, content: String },
    Failed { request: RequestId, error: GatewayError },
}

impl GatewayEvent {
    pub fn request(&self) -> RequestId {
        match self {
            GatewayEvent::Chunk { request, .. }
            | GatewayEvent::Completed { request, .. }
            | GatewayEvent::Failed { request, .. } => *request,
        }
    }
}

/// Handle a gateway uses to stream partial content for a single request.
///
/// Sends are best effort: if the receiving controller is gone the chunk is
/// dropped.
#[derive(Debug, Clone)]
pub struct ChunkSink {
    request: RequestId,
    tx: mpsc::UnboundedSender<GatewayEvent>,
}

impl ChunkSink {
    pub fn new(request: RequestId, tx: mpsc::UnboundedSender<GatewayEvent>) -> Self {
        Self { request, tx }
    }

    pub fn push(&self, text: impl Into<String>) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        let _ = self.tx.send(GatewayEvent::Chunk {
            request: self.request,
            text,
        });
    }
}

/// The model inference boundary.
///
/// Implementations receive the full transcript (ending with the newest user
/// message) and return the complete assistant reply. Streaming backends may
/// also push partial text through `chunks` as it arrives; the returned string
/// must then equal the concatenation of the pushed chunks.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    async fn send(
        &self,
        transcript: &[ChatMessage],
        model: ModelOption,
        chunks: &ChunkSink,
    ) -> Result<String, GatewayError>;
}
