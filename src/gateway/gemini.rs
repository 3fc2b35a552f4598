use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{ChunkSink, GatewayError, InferenceGateway};
use crate::model::ModelOption;
use crate::state::{ChatMessage, ChatRole};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Serialize, PartialEq)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize, PartialEq)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
}

#[derive(Deserialize)]
struct GeminiResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiResponseContent>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct GeminiErrorBody {
    message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamPayload {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    prompt_feedback: Option<GeminiPromptFeedback>,
    #[serde(default)]
    error: Option<GeminiErrorBody>,
}

#[derive(Deserialize)]
struct GeminiErrorEnvelope {
    error: GeminiErrorBody,
}

/// Gateway over the Gemini `streamGenerateContent` SSE endpoint.
#[derive(Clone)]
pub struct GeminiGateway {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    system_prompt: Option<String>,
}

impl GeminiGateway {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            system_prompt: None,
        }
    }

    pub fn with_system_prompt(mut self, prompt: Option<String>) -> Self {
        self.system_prompt = prompt.filter(|p| !p.trim().is_empty());
        self
    }

    fn stream_url(&self, model: ModelOption) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url,
            model.id()
        )
    }
}

#[async_trait]
impl InferenceGateway for GeminiGateway {
    async fn send(
        &self,
        transcript: &[ChatMessage],
        model: ModelOption,
        chunks: &ChunkSink,
    ) -> Result<String, GatewayError> {
        let api_key = self.api_key.as_deref().ok_or(GatewayError::MissingApiKey)?;
        let request = build_request(transcript, self.system_prompt.as_deref());

        debug!(model = %model, messages = request.contents.len(), "sending gemini request");

        let response = self
            .client
            .post(self.stream_url(model))
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            warn!(status, "gemini request rejected");
            return Err(GatewayError::Status {
                status,
                body: error_message_from_body(&text),
            });
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut reply = String::new();

        while let Some(bytes) = stream.next().await {
            buffer.extend_from_slice(&bytes?);
            while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&line);
                if let Some(text) = parse_sse_line(&line)? {
                    chunks.push(text.clone());
                    reply.push_str(&text);
                }
            }
        }

        // Trailing event without a final newline
        if !buffer.is_empty() {
            let line = String::from_utf8_lossy(&buffer);
            if let Some(text) = parse_sse_line(&line)? {
                chunks.push(text.clone());
                reply.push_str(&text);
            }
        }

        Ok(reply)
    }
}

fn build_request(transcript: &[ChatMessage], system_prompt: Option<&str>) -> GeminiRequest {
    let contents = transcript
        .iter()
        .filter(|msg| !msg.content.trim().is_empty())
        .map(|msg| GeminiContent {
            role: Some(match msg.role {
                ChatRole::User => "user",
                ChatRole::Assistant => "model",
            }),
            parts: vec![GeminiPart {
                text: msg.content.clone(),
            }],
        })
        .collect();

    GeminiRequest {
        contents,
        system_instruction: system_prompt.map(|prompt| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: prompt.to_string(),
            }],
        }),
    }
}

/// Parse one SSE line. Returns the text carried by a `data:` event, `None`
/// for comments, blank lines and other fields.
fn parse_sse_line(line: &str) -> Result<Option<String>, GatewayError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let Some(data) = line.strip_prefix("data:") else {
        return Ok(None);
    };
    let data = data.trim_start();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }

    let payload: GeminiStreamPayload =
        serde_json::from_str(data).map_err(|e| GatewayError::Decode(e.to_string()))?;

    if let Some(error) = payload.error {
        return Err(GatewayError::Backend(error.message));
    }

    if payload.candidates.is_empty() {
        if let Some(reason) = payload.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(GatewayError::Backend(format!("Prompt blocked by Gemini: {}", reason)));
        }
    }

    let text: String = payload
        .candidates
        .first()
        .and_then(|c| c.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|p| p.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    Ok(if text.is_empty() { None } else { Some(text) })
}

fn error_message_from_body(body: &str) -> String {
    serde_json::from_str::<GeminiErrorEnvelope>(body)
        .map(|envelope| envelope.error.message)
        .unwrap_or_else(|_| body.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[test]
    fn test_parse_sse_text_chunk() {
        let line = r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"BIT"}],"role":"model"}}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), Some("Hello BIT".to_string()));
    }

    #[test]
    fn test_parse_sse_ignores_non_data_lines() {
        assert_eq!(parse_sse_line("").unwrap(), None);
        assert_eq!(parse_sse_line(": keep-alive").unwrap(), None);
        assert_eq!(parse_sse_line("event: message\r\n").unwrap(), None);
    }

    #[test]
    fn test_parse_sse_candidate_without_text() {
        let line = r#"data: {"candidates":[{"finishReason":"STOP"}]}"#;
        assert_eq!(parse_sse_line(line).unwrap(), None);
    }

    #[test]
    fn test_parse_sse_backend_error() {
        let line = r#"data: {"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        assert_eq!(
            parse_sse_line(line).unwrap_err(),
            GatewayError::Backend("Resource has been exhausted".to_string())
        );
    }

    #[test]
    fn test_parse_sse_blocked_prompt() {
        let line = r#"data: {"promptFeedback":{"blockReason":"SAFETY"}}"#;
        let err = parse_sse_line(line).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_sse_malformed_json() {
        assert!(matches!(
            parse_sse_line("data: {not json"),
            Err(GatewayError::Decode(_))
        ));
    }

    #[test]
    fn test_build_request_maps_roles_and_skips_empty() {
        let transcript = vec![
            ChatMessage::user("What is BIT?"),
            ChatMessage::assistant(""),
            ChatMessage::assistant("A college in Sathyamangalam."),
            ChatMessage::user("Where?"),
        ];
        let request = build_request(&transcript, Some("You are BIT BOT."));

        let roles: Vec<_> = request.contents.iter().map(|c| c.role).collect();
        assert_eq!(roles, vec![Some("user"), Some("model"), Some("user")]);

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["systemInstruction"]["parts"][0]["text"], "You are BIT BOT.");
        assert!(json["systemInstruction"].get("role").is_none());
    }

    #[test]
    fn test_build_request_without_system_prompt() {
        let request = build_request(&[ChatMessage::user("hi")], None);
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_none());
    }

    #[test]
    fn test_error_message_from_body() {
        let body = r#"{"error":{"code":400,"message":"API key not valid","status":"INVALID_ARGUMENT"}}"#;
        assert_eq!(error_message_from_body(body), "API key not valid");
        assert_eq!(error_message_from_body(" upstream down \n"), "upstream down");
    }

    #[test]
    fn test_stream_url() {
        let gateway = GeminiGateway::new("http://localhost:8080/", None);
        assert_eq!(
            gateway.stream_url(ModelOption::Gemini10Pro),
            "http://localhost:8080/v1beta/models/gemini-1.0-pro:streamGenerateContent?alt=sse"
        );

        // The key travels in a header, never the URL
        let keyed = GeminiGateway::new(DEFAULT_BASE_URL, Some("secret".to_string()));
        assert!(!keyed.stream_url(ModelOption::Gemini15Flash).contains("secret"));
    }

    #[tokio::test]
    async fn test_send_without_key_fails_fast() {
        let gateway = GeminiGateway::new(DEFAULT_BASE_URL, None);
        let (tx, _rx) = mpsc::unbounded_channel();
        let result = gateway
            .send(&[ChatMessage::user("hi")], ModelOption::default(), &ChunkSink::new(1, tx))
            .await;
        assert_eq!(result, Err(GatewayError::MissingApiKey));
    }
}
