//! HTTP client for the relay's `POST /api/chat` endpoint.

use std::pin::Pin;

use admitchat_ai::{Message, build_http_client};
use bytes::Bytes;
use futures::{Stream, StreamExt};
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;

const MAX_ERROR_BODY: usize = 256;

#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Relay returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Raw reply bytes as they arrive from the relay.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ConsumerError>> + Send>>;

#[derive(Serialize)]
struct ChatRequestBody<'a> {
    messages: &'a [Message],
}

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    chat_url: String,
}

impl RelayClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: build_http_client(),
            chat_url: format!("{}/api/chat", base_url.trim_end_matches('/')),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    /// Send the conversation and return the reply body as a byte stream.
    pub async fn open(&self, conversation: &[Message]) -> Result<ByteStream, ConsumerError> {
        let response = self
            .http
            .post(&self.chat_url)
            .json(&ChatRequestBody {
                messages: conversation,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut end = MAX_ERROR_BODY;
                while !body.is_char_boundary(end) {
                    end -= 1;
                }
                body.truncate(end);
            }
            return Err(ConsumerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(Box::pin(
            response
                .bytes_stream()
                .map(|chunk| chunk.map_err(ConsumerError::from)),
        ))
    }
}
