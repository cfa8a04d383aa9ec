//! OpenAI LLM provider

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};

use crate::error::{AiError, Result};
use crate::http_client::build_http_client;
use crate::llm::client::{CompletionRequest, LlmClient, StreamChunk, TextStream};
use crate::llm::sse::SseBuffer;

const DONE_SENTINEL: &str = "[DONE]";

// Truncate error body to prevent leaking large or sensitive responses.
const MAX_ERROR_BODY: usize = 512;

/// OpenAI client
pub struct OpenAIClient {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAIClient {
    /// Create a new OpenAI client
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: build_http_client(),
            api_key: api_key.into(),
            model: "gpt-4".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
        }
    }

    /// Set the model to use
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set custom base URL (for API-compatible services)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }
}

#[derive(Serialize)]
struct OpenAIRequest<'a> {
    model: &'a str,
    messages: Vec<OpenAIMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAIMessage<'a> {
    role: &'static str,
    content: &'a str,
}

// Streaming types

#[derive(Deserialize, Debug)]
struct OpenAIStreamResponse {
    #[serde(default)]
    choices: Vec<OpenAIStreamChoice>,
    error: Option<OpenAIErrorBody>,
}

#[derive(Deserialize, Debug)]
struct OpenAIStreamChoice {
    #[serde(default)]
    delta: OpenAIStreamDelta,
}

#[derive(Deserialize, Debug, Default)]
struct OpenAIStreamDelta {
    content: Option<String>,
}

#[derive(Deserialize, Debug)]
struct OpenAIErrorBody {
    message: String,
}

/// What a single SSE payload means for the text stream.
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Skip,
    Done,
    Failed(String),
}

fn interpret_payload(data: &str) -> StreamEvent {
    let data = data.trim();
    if data.is_empty() {
        return StreamEvent::Skip;
    }
    if data == DONE_SENTINEL {
        return StreamEvent::Done;
    }

    let parsed: OpenAIStreamResponse = match serde_json::from_str(data) {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(error = %err, "Skipping unparseable OpenAI stream event");
            return StreamEvent::Skip;
        }
    };

    if let Some(error) = parsed.error {
        return StreamEvent::Failed(error.message);
    }

    match parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta.content)
    {
        Some(content) if !content.is_empty() => StreamEvent::Text(content),
        _ => StreamEvent::Skip,
    }
}

async fn response_to_error(response: Response, provider: &str) -> AiError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    let message = if body.len() > MAX_ERROR_BODY {
        let mut end = MAX_ERROR_BODY;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated]", &body[..end])
    } else {
        body
    };

    AiError::LlmHttp {
        provider: provider.to_string(),
        status,
        message,
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    fn provider(&self) -> &str {
        "openai"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        let body = OpenAIRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: m.role.as_str(),
                    content: &m.content,
                })
                .collect(),
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| AiError::Llm(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(response_to_error(response, "OpenAI").await);
        }

        let mut byte_stream = response.bytes_stream();

        Ok(Box::pin(async_stream::stream! {
            let mut buffer = SseBuffer::new();

            while let Some(chunk_result) = byte_stream.next().await {
                let chunk = match chunk_result {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        yield Err(AiError::Llm(format!("Stream error: {}", e)));
                        return;
                    }
                };

                for payload in buffer.push(&chunk) {
                    match interpret_payload(&payload) {
                        StreamEvent::Text(text) => yield Ok(StreamChunk::text(text)),
                        StreamEvent::Skip => {}
                        StreamEvent::Done => return,
                        StreamEvent::Failed(message) => {
                            yield Err(AiError::Llm(message));
                            return;
                        }
                    }
                }
            }

            // The last event may lack its trailing blank line.
            if let Some(payload) = buffer.finish() {
                match interpret_payload(&payload) {
                    StreamEvent::Text(text) => yield Ok(StreamChunk::text(text)),
                    StreamEvent::Failed(message) => yield Err(AiError::Llm(message)),
                    StreamEvent::Skip | StreamEvent::Done => {}
                }
            }
        }))
    }
}
