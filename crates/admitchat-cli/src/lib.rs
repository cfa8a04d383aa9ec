//! AdmitChat client
//!
//! Keeps the conversation transcript, sends it to the relay, and fills the
//! assistant reply in place as the streamed bytes arrive.

pub mod client;
pub mod decoder;
pub mod session;
pub mod transcript;

pub use client::{ConsumerError, RelayClient};
pub use decoder::Utf8StreamDecoder;
pub use session::{
    ChatSession, FALLBACK_REPLY, GREETING, IgnoreReason, RequestState, SessionEvent,
    StreamCancelHandle, StreamCancelReceiver, SubmitOutcome,
};
pub use transcript::{ReplySlot, TranscriptError, TranscriptStore};
