//! Transcript of the active conversation.
//!
//! The transcript is replaced wholesale on every fetch. Incremental changes
//! are limited to the three local mutations the client confirms itself:
//! patching an edited body, removing a deleted message, and flipping `seen`.
//!
//! Ordering is timestamp ascending, ties broken by message id.

use std::collections::HashSet;

use chat_types::{ConversationKey, Message, MessageId, UserId};
use chrono::{DateTime, Utc};

/// What a wholesale replace kept and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplaceSummary {
    /// Messages now in the transcript.
    pub kept: usize,
    /// Duplicates, malformed messages, or messages from other conversations.
    pub dropped: usize,
}

/// Ordered messages of one two-party conversation.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    key: Option<ConversationKey>,
    messages: Vec<Message>,
}

impl Transcript {
    /// Create an empty transcript bound to no conversation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebind to a conversation (or none), discarding all messages.
    pub fn reset(&mut self, key: Option<ConversationKey>) {
        self.key = key;
        self.messages.clear();
    }

    /// Replace the whole transcript with a fetched sequence.
    ///
    /// Drops messages that belong to another conversation, have identical
    /// sender and receiver, or repeat an id already seen in `incoming`.
    /// A message already marked seen locally stays seen even if the fetch
    /// predates the remote seen-marking.
    pub fn replace(&mut self, incoming: Vec<Message>) -> ReplaceSummary {
        let seen_locally: HashSet<MessageId> = self
            .messages
            .iter()
            .filter(|m| m.seen)
            .map(|m| m.id.clone())
            .collect();

        let total = incoming.len();
        let mut ids = HashSet::with_capacity(total);
        let mut next: Vec<Message> = incoming
            .into_iter()
            .filter(|m| m.is_well_formed())
            .filter(|m| match &self.key {
                Some(key) => &m.conversation_key() == key,
                None => true,
            })
            .filter(|m| ids.insert(m.id.clone()))
            .collect();

        for msg in next.iter_mut() {
            if seen_locally.contains(&msg.id) {
                msg.seen = true;
            }
        }
        next.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));

        self.messages = next;
        ReplaceSummary {
            kept: self.messages.len(),
            dropped: total - self.messages.len(),
        }
    }

    /// Messages in display order.
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// Number of messages.
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Look up a message by id.
    pub fn get(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    /// Replace a message body after a confirmed edit.
    ///
    /// Returns `false` if the message is not in the transcript.
    pub fn patch_body(
        &mut self,
        id: &MessageId,
        body: &str,
        edited_at: Option<DateTime<Utc>>,
    ) -> bool {
        match self.messages.iter_mut().find(|m| &m.id == id) {
            Some(msg) => {
                msg.body = body.to_string();
                if edited_at.is_some() {
                    msg.edited_at = edited_at;
                }
                true
            }
            None => false,
        }
    }

    /// Remove a message, returning it if it was present.
    pub fn remove(&mut self, id: &MessageId) -> Option<Message> {
        let pos = self.messages.iter().position(|m| &m.id == id)?;
        Some(self.messages.remove(pos))
    }

    /// Count messages from `sender` not yet seen.
    pub fn unseen_from(&self, sender: &UserId) -> usize {
        self.messages
            .iter()
            .filter(|m| m.is_from(sender) && !m.seen)
            .count()
    }

    /// Mark every message from `sender` as seen. Returns how many flipped.
    pub fn mark_seen_from(&mut self, sender: &UserId) -> usize {
        let mut flipped = 0;
        for msg in self.messages.iter_mut() {
            if msg.is_from(sender) && !msg.seen {
                msg.seen = true;
                flipped += 1;
            }
        }
        flipped
    }
}
