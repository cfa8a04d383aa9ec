//! In-memory conversation transcript.
//!
//! Messages are only ever appended. The one exception is the in-progress
//! assistant reply, which is filled through a [`ReplySlot`]: reserve it, append
//! fragments to it, then finalize it or fail it with fallback text.

use admitchat_ai::{Message, Role};
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TranscriptError {
    #[error("An assistant reply is still in progress")]
    ReplyInProgress,

    #[error("No assistant reply is in progress")]
    NoOpenReply,

    #[error("Reply slot {0} is not the open reply")]
    StaleSlot(usize),
}

/// Handle to the placeholder reserved for an in-progress assistant reply.
///
/// Consumed by [`TranscriptStore::finalize_reply`] or
/// [`TranscriptStore::fail_reply`], so a reply cannot be closed twice.
#[derive(Debug, PartialEq, Eq)]
pub struct ReplySlot {
    index: usize,
}

#[derive(Debug, Clone, Default)]
pub struct TranscriptStore {
    messages: Vec<Message>,
    open_reply: Option<usize>,
}

impl TranscriptStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a transcript with an assistant greeting.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::assistant(greeting)],
            open_reply: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_reply_open(&self) -> bool {
        self.open_reply.is_some()
    }

    /// Add a complete message at the end.
    pub fn append(&mut self, message: Message) -> Result<(), TranscriptError> {
        if self.open_reply.is_some() {
            return Err(TranscriptError::ReplyInProgress);
        }
        self.messages.push(message);
        Ok(())
    }

    /// Append text to the last message, which must be the open reply.
    pub fn append_to_last(&mut self, text: &str) -> Result<(), TranscriptError> {
        let index = self.open_reply.ok_or(TranscriptError::NoOpenReply)?;
        self.messages[index].content.push_str(text);
        Ok(())
    }

    /// Append the user turn and an empty assistant placeholder after it.
    pub fn reserve_reply(&mut self, user: Message) -> Result<ReplySlot, TranscriptError> {
        self.append(user)?;
        self.messages.push(Message::assistant(String::new()));
        let index = self.messages.len() - 1;
        self.open_reply = Some(index);
        Ok(ReplySlot { index })
    }

    pub fn append_to(&mut self, slot: &ReplySlot, text: &str) -> Result<(), TranscriptError> {
        self.check_open(slot)?;
        self.append_to_last(text)
    }

    /// Close the reply with whatever text it holds.
    pub fn finalize_reply(&mut self, slot: ReplySlot) -> Result<&Message, TranscriptError> {
        self.check_open(&slot)?;
        self.open_reply = None;
        Ok(&self.messages[slot.index])
    }

    /// Close the reply, replacing any partial text with `fallback`.
    pub fn fail_reply(
        &mut self,
        slot: ReplySlot,
        fallback: &str,
    ) -> Result<&Message, TranscriptError> {
        self.check_open(&slot)?;
        self.open_reply = None;
        let message = &mut self.messages[slot.index];
        message.content.clear();
        message.content.push_str(fallback);
        Ok(message)
    }

    /// Messages to send to the relay: everything except an open placeholder.
    pub fn conversation(&self) -> Vec<Message> {
        match self.open_reply {
            Some(index) => self.messages[..index].to_vec(),
            None => self.messages.clone(),
        }
    }

    /// Number of user turns recorded so far.
    pub fn user_turns(&self) -> usize {
        self.messages
            .iter()
            .filter(|message| message.role == Role::User)
            .count()
    }

    fn check_open(&self, slot: &ReplySlot) -> Result<(), TranscriptError> {
        match self.open_reply {
            Some(index) if index == slot.index => Ok(()),
            Some(_) => Err(TranscriptError::StaleSlot(slot.index)),
            None => Err(TranscriptError::NoOpenReply),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserve_then_fill_then_finalize() {
        let mut transcript = TranscriptStore::with_greeting("Hello!");
        let slot = transcript.reserve_reply(Message::user("Deadlines?")).unwrap();

        assert_eq!(transcript.len(), 3);
        assert_eq!(transcript.last(), Some(&Message::assistant("")));
        assert!(transcript.is_reply_open());

        transcript.append_to(&slot, "Most are").unwrap();
        transcript.append_to(&slot, " in January.").unwrap();
        let reply = transcript.finalize_reply(slot).unwrap();
        assert_eq!(reply, &Message::assistant("Most are in January."));
        assert!(!transcript.is_reply_open());
    }

    #[test]
    fn test_conversation_excludes_open_placeholder() {
        let mut transcript = TranscriptStore::with_greeting("Hello!");
        let _slot = transcript.reserve_reply(Message::user("Hi")).unwrap();

        assert_eq!(
            transcript.conversation(),
            vec![Message::assistant("Hello!"), Message::user("Hi")]
        );
    }

    #[test]
    fn test_fail_reply_replaces_partial_text() {
        let mut transcript = TranscriptStore::new();
        let slot = transcript.reserve_reply(Message::user("Hi")).unwrap();
        transcript.append_to(&slot, "partial").unwrap();

        let reply = transcript.fail_reply(slot, "Sorry.").unwrap();
        assert_eq!(reply.content, "Sorry.");
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_append_rejected_while_reply_open() {
        let mut transcript = TranscriptStore::new();
        let _slot = transcript.reserve_reply(Message::user("first")).unwrap();

        assert_eq!(
            transcript.append(Message::user("second")),
            Err(TranscriptError::ReplyInProgress)
        );
        assert_eq!(
            transcript.reserve_reply(Message::user("second")),
            Err(TranscriptError::ReplyInProgress)
        );
        assert_eq!(transcript.len(), 2);
    }

    #[test]
    fn test_append_to_last_requires_open_reply() {
        let mut transcript = TranscriptStore::with_greeting("Hello!");
        assert_eq!(
            transcript.append_to_last("more"),
            Err(TranscriptError::NoOpenReply)
        );
        assert_eq!(transcript.messages()[0].content, "Hello!");
    }

    #[test]
    fn test_slot_from_other_transcript_is_stale() {
        let mut first = TranscriptStore::new();
        let foreign = first.reserve_reply(Message::user("a")).unwrap();

        let mut second = TranscriptStore::with_greeting("Hello!");
        let _own = second.reserve_reply(Message::user("b")).unwrap();

        assert_eq!(
            second.append_to(&foreign, "x"),
            Err(TranscriptError::StaleSlot(1))
        );
    }

    #[test]
    fn test_user_turns() {
        let mut transcript = TranscriptStore::with_greeting("Hello!");
        let slot = transcript.reserve_reply(Message::user("a")).unwrap();
        transcript.finalize_reply(slot).unwrap();
        let slot = transcript.reserve_reply(Message::user("b")).unwrap();
        transcript.finalize_reply(slot).unwrap();

        assert_eq!(transcript.user_turns(), 2);
        assert_eq!(transcript.len(), 5);
    }
}
