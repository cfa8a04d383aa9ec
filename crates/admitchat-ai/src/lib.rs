//! AdmitChat AI - streaming chat-completion providers
//!
//! This crate provides:
//! - Provider-neutral chat message types
//! - The `LlmClient` trait: open a streaming completion, then pull text chunks
//! - An OpenAI-compatible chat-completions client (SSE streaming)
//! - A scripted mock provider for tests (`test-utils` feature)

pub mod error;
pub mod http_client;
pub mod llm;

// Re-export commonly used types
pub use error::{AiError, Result};
pub use http_client::build_http_client;
pub use llm::{
    CompletionRequest, LlmClient, Message, OpenAIClient, Role, StreamChunk, TextStream,
};
