//! Deterministic mock LLM client for relay and consumer tests.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::{Duration, sleep};

use crate::error::{AiError, Result};

use super::{CompletionRequest, LlmClient, Role, StreamChunk, TextStream};

/// Deterministic step emitted by a scripted stream.
#[derive(Debug, Clone)]
pub enum MockStepKind {
    /// Emit a text fragment.
    Text(String),
    /// Fail the stream mid-flight.
    Error(String),
}

/// Scripted stream step with optional delay before it is emitted.
#[derive(Debug, Clone)]
pub struct MockStep {
    pub delay_ms: u64,
    pub kind: MockStepKind,
}

impl MockStep {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Text(content.into()),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            delay_ms: 0,
            kind: MockStepKind::Error(message.into()),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// One scripted provider response.
#[derive(Debug, Clone)]
pub enum MockScript {
    /// The provider cannot be reached; `open_stream` fails.
    Unavailable(String),
    /// The provider opens a stream and plays the steps in order.
    Stream(Vec<MockStep>),
}

impl MockScript {
    pub fn fragments<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Stream(fragments.into_iter().map(MockStep::text).collect())
    }
}

/// A deterministic mock LLM client driven by scripted responses.
#[derive(Debug, Clone, Default)]
pub struct MockLlmClient {
    model: String,
    scripts: Arc<Mutex<VecDeque<MockScript>>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockLlmClient {
    pub fn new(model: impl Into<String>) -> Self {
        Self::from_scripts(model, Vec::new())
    }

    pub fn from_scripts(model: impl Into<String>, scripts: Vec<MockScript>) -> Self {
        Self {
            model: model.into(),
            scripts: Arc::new(Mutex::new(VecDeque::from(scripts))),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Requests received so far, in call order.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    async fn next_script(&self) -> Option<MockScript> {
        self.scripts.lock().await.pop_front()
    }

    fn fallback_script(request: &CompletionRequest) -> MockScript {
        let text = request
            .messages
            .iter()
            .rev()
            .find(|msg| msg.role == Role::User)
            .map(|msg| format!("mock-echo: {}", msg.content))
            .unwrap_or_else(|| "mock-ok".to_string());

        MockScript::fragments([text])
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    fn provider(&self) -> &str {
        "mock"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn open_stream(&self, request: CompletionRequest) -> Result<TextStream> {
        self.requests.lock().await.push(request.clone());

        let script = match self.next_script().await {
            Some(script) => script,
            None => Self::fallback_script(&request),
        };

        let steps = match script {
            MockScript::Unavailable(message) => return Err(AiError::Llm(message)),
            MockScript::Stream(steps) => steps,
        };

        Ok(Box::pin(async_stream::stream! {
            for step in steps {
                if step.delay_ms > 0 {
                    sleep(Duration::from_millis(step.delay_ms)).await;
                }
                match step.kind {
                    MockStepKind::Text(text) => yield Ok(StreamChunk::text(text)),
                    MockStepKind::Error(message) => {
                        yield Err(AiError::Llm(message));
                        return;
                    }
                }
            }
        }))
    }
}
