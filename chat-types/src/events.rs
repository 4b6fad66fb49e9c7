//! Push events delivered over the real-time channel.
//!
//! Push events are refresh triggers. None of them carries state that the
//! client applies directly; the authoritative copy is always refetched.

use serde::{Deserialize, Serialize};

use crate::{ConversationKey, UserId};

/// An event received from the push transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum PushEvent {
    /// Some message touching the current user was written.
    #[serde(rename = "getMessage")]
    InboundMessage,
    /// A message was written in the conversation between the pair.
    #[serde(rename = "newMessage", rename_all = "camelCase")]
    PeerMessage {
        /// Author.
        sender_id: UserId,
        /// Recipient.
        receiver_id: UserId,
    },
    /// A notification was created for the current user.
    #[serde(rename = "newNotification")]
    NotificationCreated,
}

impl PushEvent {
    /// The transport-level event name.
    pub fn wire_name(&self) -> &'static str {
        match self {
            PushEvent::InboundMessage => "getMessage",
            PushEvent::PeerMessage { .. } => "newMessage",
            PushEvent::NotificationCreated => "newNotification",
        }
    }

    /// Whether this event concerns the conversation between `me` and `peer`.
    ///
    /// A `PeerMessage` matches when its pair is exactly `{me, peer}`.
    /// An `InboundMessage` may concern any conversation of `me`, so it
    /// matches every peer. Notifications never match a conversation.
    pub fn concerns_conversation(&self, me: &UserId, peer: &UserId) -> bool {
        match self {
            PushEvent::InboundMessage => true,
            PushEvent::PeerMessage {
                sender_id,
                receiver_id,
            } => ConversationKey::new(sender_id, receiver_id) == ConversationKey::new(me, peer),
            PushEvent::NotificationCreated => false,
        }
    }

    /// Whether this event may have changed the notification list.
    pub fn affects_notifications(&self) -> bool {
        matches!(
            self,
            PushEvent::InboundMessage | PushEvent::NotificationCreated
        )
    }
}
