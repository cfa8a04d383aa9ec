//! LLM module - streaming chat-completion provider abstraction

mod client;
#[cfg(any(test, feature = "test-utils"))]
pub mod mock_client;
mod openai;
mod sse;

pub use client::{CompletionRequest, LlmClient, Message, Role, StreamChunk, TextStream};
#[cfg(any(test, feature = "test-utils"))]
pub use mock_client::{MockLlmClient, MockScript, MockStep, MockStepKind};
pub use openai::OpenAIClient;
