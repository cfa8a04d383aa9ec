//! Chat session: submits turns to the relay and renders replies as they stream.

use std::sync::Arc;

use admitchat_ai::Message;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::client::{ConsumerError, RelayClient};
use crate::decoder::Utf8StreamDecoder;
use crate::transcript::{ReplySlot, TranscriptStore};

pub const GREETING: &str =
    "Hello! I'm here to assist you with your college application process. How can I help you today?";

pub const FALLBACK_REPLY: &str = "I'm sorry, but I encountered an error. Please try again later.";

/// Per-request lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    Sending,
    Streaming,
    Completed,
    Failed,
}

impl RequestState {
    /// Whether a new request may begin from this state.
    pub fn accepts_submission(self) -> bool {
        matches!(
            self,
            RequestState::Idle | RequestState::Completed | RequestState::Failed
        )
    }

    pub fn is_in_flight(self) -> bool {
        !self.accepts_submission()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Sending,
    Streaming,
    TextDelta(String),
    Completed { reply: String },
    Failed { reason: String },
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Blank,
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    Completed,
    Failed(String),
    Cancelled,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone)]
pub struct StreamCancelHandle {
    sender: broadcast::Sender<()>,
}

impl StreamCancelHandle {
    pub fn new() -> (Self, StreamCancelReceiver) {
        let (sender, receiver) = broadcast::channel(1);
        (Self { sender }, StreamCancelReceiver { receiver })
    }

    pub fn cancel(&self) {
        let _ = self.sender.send(());
    }
}

#[derive(Debug)]
pub struct StreamCancelReceiver {
    receiver: broadcast::Receiver<()>,
}

impl StreamCancelReceiver {
    /// Resolves once `cancel` is called. Never resolves if the handle is
    /// dropped without cancelling.
    async fn cancelled(&mut self) {
        match self.receiver.recv().await {
            Ok(()) | Err(broadcast::error::RecvError::Lagged(_)) => {}
            Err(broadcast::error::RecvError::Closed) => std::future::pending().await,
        }
    }
}

async fn wait_for_cancel(cancel: &mut Option<StreamCancelReceiver>) {
    match cancel {
        Some(receiver) => receiver.cancelled().await,
        None => std::future::pending().await,
    }
}

struct SessionInner {
    transcript: TranscriptStore,
    state: RequestState,
}

/// Shared chat session. Clones observe the same transcript and the same
/// single in-flight request.
#[derive(Clone)]
pub struct ChatSession {
    client: RelayClient,
    inner: Arc<Mutex<SessionInner>>,
    events: Option<mpsc::UnboundedSender<SessionEvent>>,
}

impl ChatSession {
    pub fn new(client: RelayClient) -> Self {
        Self::with_transcript(client, TranscriptStore::with_greeting(GREETING))
    }

    pub fn with_transcript(client: RelayClient, transcript: TranscriptStore) -> Self {
        Self {
            client,
            inner: Arc::new(Mutex::new(SessionInner {
                transcript,
                state: RequestState::Idle,
            })),
            events: None,
        }
    }

    /// Forward progress events to a renderer.
    pub fn with_events(mut self, events: mpsc::UnboundedSender<SessionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn state(&self) -> RequestState {
        self.inner.lock().state
    }

    pub fn transcript(&self) -> TranscriptStore {
        self.inner.lock().transcript.clone()
    }

    pub async fn submit(&self, text: &str) -> SubmitOutcome {
        self.run(text, None).await
    }

    pub async fn submit_with_cancel(
        &self,
        text: &str,
        cancel: StreamCancelReceiver,
    ) -> SubmitOutcome {
        self.run(text, Some(cancel)).await
    }

    async fn run(&self, text: &str, mut cancel: Option<StreamCancelReceiver>) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored(IgnoreReason::Blank);
        }

        let (conversation, slot) = {
            let mut inner = self.inner.lock();
            if inner.state.is_in_flight() {
                tracing::debug!(state = ?inner.state, "Ignoring submission while a request is in flight");
                return SubmitOutcome::Ignored(IgnoreReason::Busy);
            }
            let user = Message::user(text);
            let mut conversation = inner.transcript.conversation();
            conversation.push(user.clone());
            let slot = match inner.transcript.reserve_reply(user) {
                Ok(slot) => slot,
                Err(err) => {
                    tracing::warn!(error = %err, "Transcript refused a new turn");
                    return SubmitOutcome::Ignored(IgnoreReason::Busy);
                }
            };
            inner.state = RequestState::Sending;
            (conversation, slot)
        };
        self.emit(SessionEvent::Sending);

        tracing::info!(messages = conversation.len(), url = self.client.chat_url(), "Sending chat request");

        let opened = tokio::select! {
            biased;
            _ = wait_for_cancel(&mut cancel) => None,
            result = self.client.open(&conversation) => Some(result),
        };
        let mut stream = match opened {
            None => return self.cancel(slot),
            Some(Ok(stream)) => stream,
            Some(Err(err)) => return self.fail(slot, err),
        };

        self.inner.lock().state = RequestState::Streaming;
        self.emit(SessionEvent::Streaming);

        let mut decoder = Utf8StreamDecoder::new();
        loop {
            let next = tokio::select! {
                biased;
                _ = wait_for_cancel(&mut cancel) => return self.cancel(slot),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(bytes)) => {
                    let fragment = decoder.decode(&bytes);
                    self.apply(&slot, fragment);
                }
                Some(Err(err)) => return self.fail(slot, err),
                None => {
                    let tail = decoder.finish();
                    self.apply(&slot, tail);
                    return self.complete(slot);
                }
            }
        }
    }

    fn apply(&self, slot: &ReplySlot, fragment: String) {
        if fragment.is_empty() {
            return;
        }
        if let Err(err) = self.inner.lock().transcript.append_to(slot, &fragment) {
            tracing::warn!(error = %err, "Dropped reply fragment");
            return;
        }
        self.emit(SessionEvent::TextDelta(fragment));
    }

    fn complete(&self, slot: ReplySlot) -> SubmitOutcome {
        let reply = {
            let mut inner = self.inner.lock();
            inner.state = RequestState::Completed;
            match inner.transcript.finalize_reply(slot) {
                Ok(message) => message.content.clone(),
                Err(err) => {
                    tracing::warn!(error = %err, "Reply was already closed");
                    String::new()
                }
            }
        };
        tracing::info!(reply_len = reply.len(), "Reply completed");
        self.emit(SessionEvent::Completed { reply });
        SubmitOutcome::Completed
    }

    fn fail(&self, slot: ReplySlot, err: ConsumerError) -> SubmitOutcome {
        tracing::error!(error = %err, "Chat request failed");
        {
            let mut inner = self.inner.lock();
            inner.state = RequestState::Failed;
            if let Err(close_err) = inner.transcript.fail_reply(slot, FALLBACK_REPLY) {
                tracing::warn!(error = %close_err, "Reply was already closed");
            }
        }
        let reason = err.to_string();
        self.emit(SessionEvent::Failed {
            reason: reason.clone(),
        });
        SubmitOutcome::Failed(reason)
    }

    fn cancel(&self, slot: ReplySlot) -> SubmitOutcome {
        tracing::info!("Chat request cancelled");
        {
            let mut inner = self.inner.lock();
            inner.state = RequestState::Failed;
            if let Err(err) = inner.transcript.finalize_reply(slot) {
                tracing::warn!(error = %err, "Reply was already closed");
            }
        }
        self.emit(SessionEvent::Cancelled);
        SubmitOutcome::Cancelled
    }

    fn emit(&self, event: SessionEvent) {
        if let Some(events) = &self.events {
            let _ = events.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_state_gate() {
        assert!(RequestState::Idle.accepts_submission());
        assert!(RequestState::Completed.accepts_submission());
        assert!(RequestState::Failed.accepts_submission());
        assert!(RequestState::Sending.is_in_flight());
        assert!(RequestState::Streaming.is_in_flight());
    }

    #[tokio::test]
    async fn test_blank_submission_is_ignored() {
        let session = ChatSession::new(RelayClient::new("http://127.0.0.1:9"));
        assert_eq!(
            session.submit("   \n").await,
            SubmitOutcome::Ignored(IgnoreReason::Blank)
        );
        assert_eq!(session.transcript().len(), 1);
        assert_eq!(session.state(), RequestState::Idle);
    }

    #[tokio::test]
    async fn test_unreachable_relay_leaves_fallback_reply() {
        // Nothing listens on port 9 of localhost in the test environment.
        let session = ChatSession::new(RelayClient::new("http://127.0.0.1:9"));

        let outcome = session.submit("Hi").await;
        assert!(matches!(outcome, SubmitOutcome::Failed(_)));
        assert_eq!(session.state(), RequestState::Failed);

        let transcript = session.transcript();
        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.messages()[1], Message::user("Hi"));
        assert_eq!(transcript.messages()[2], Message::assistant(FALLBACK_REPLY));
        assert!(!transcript.is_reply_open());
    }

    #[tokio::test]
    async fn test_cancel_before_response_fails_request() {
        let session = ChatSession::new(RelayClient::new("http://127.0.0.1:9"));
        let (handle, receiver) = StreamCancelHandle::new();
        handle.cancel();

        let outcome = session.submit_with_cancel("Hi", receiver).await;
        assert_eq!(outcome, SubmitOutcome::Cancelled);
        assert_eq!(session.state(), RequestState::Failed);
        assert_eq!(session.transcript().last(), Some(&Message::assistant("")));
    }
}
