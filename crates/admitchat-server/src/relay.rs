//! Completion relay: forwards a conversation to the provider and re-emits its
//! text fragments as a raw byte stream.

use std::pin::Pin;
use std::sync::Arc;

use admitchat_ai::{AiError, CompletionRequest, LlmClient, Message};
use axum::body::Bytes;
use futures::{Stream, StreamExt};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RelayError {
    /// The provider request could not be established; nothing was streamed.
    #[error("Provider unavailable: {0}")]
    Provider(#[source] AiError),

    /// The provider failed after the outgoing stream was opened.
    #[error("Provider stream failed: {0}")]
    Stream(#[source] AiError),
}

/// Outgoing byte stream. Ends cleanly on provider completion, or with a single
/// `Err` item when the provider fails mid-flight.
pub type RelayStream = Pin<Box<dyn Stream<Item = Result<Bytes, RelayError>> + Send>>;

/// Stateless relay shared by every request.
pub struct CompletionRelay {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl CompletionRelay {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    /// Conversation as sent to the provider: system instructions first.
    pub fn augment(&self, conversation: Vec<Message>) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() + 1);
        messages.push(Message::system(self.system_prompt.clone()));
        messages.extend(conversation);
        messages
    }

    /// Open the provider stream and adapt it into an outgoing byte stream.
    ///
    /// The returned stream pulls one provider event per poll, so the provider
    /// is never read faster than the caller drains the body.
    pub async fn open(&self, conversation: Vec<Message>) -> Result<RelayStream, RelayError> {
        let request = CompletionRequest::new(self.augment(conversation));
        let mut upstream = self
            .llm
            .open_stream(request)
            .await
            .map_err(RelayError::Provider)?;

        tracing::debug!(
            provider = self.llm.provider(),
            model = self.llm.model(),
            "Provider stream opened"
        );

        Ok(Box::pin(async_stream::stream! {
            let mut chunks = 0usize;
            let mut bytes = 0usize;

            while let Some(item) = upstream.next().await {
                match item {
                    Ok(chunk) => {
                        if chunk.is_empty() {
                            continue;
                        }
                        chunks += 1;
                        bytes += chunk.text.len();
                        yield Ok(Bytes::from(chunk.text));
                    }
                    Err(err) => {
                        tracing::error!(error = %err, chunks, "Stream error");
                        yield Err(RelayError::Stream(err));
                        return;
                    }
                }
            }

            tracing::debug!(chunks, bytes, "Provider stream completed");
        }))
    }
}
