//! Request bodies and response envelopes exchanged with the backend.
//!
//! All bodies use camelCase keys (`senderId`, `friendId`).

use serde::{Deserialize, Serialize};

use crate::{Notification, NotificationId, RequestId, User, UserId};

/// Body of a friend request creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewFriendRequest {
    /// Requesting user.
    pub sender_id: UserId,
    /// Requested user.
    pub receiver_id: UserId,
}

/// Body of a friend request acceptance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptRequest {
    /// Request being accepted.
    pub request_id: RequestId,
}

/// Body of a message creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Message text.
    pub message: String,
}

/// Body of a message edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePatch {
    /// Replacement text.
    pub message: String,
}

/// Body of a mark-seen call: everything `friend_id` sent to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeenRequest {
    /// The peer whose messages were viewed.
    pub friend_id: UserId,
}

/// Body of a batched notification read-marking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkRead {
    /// Exactly the notifications to flip.
    pub ids: Vec<NotificationId>,
}

/// Best-effort hint pushed to the peer after a message write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboundHint {
    /// Author.
    pub sender_id: UserId,
    /// Recipient.
    pub receiver_id: UserId,
    /// Message text.
    pub message: String,
}

impl From<&NewMessage> for OutboundHint {
    fn from(msg: &NewMessage) -> Self {
        Self {
            sender_id: msg.sender_id.clone(),
            receiver_id: msg.receiver_id.clone(),
            message: msg.message.clone(),
        }
    }
}

/// `{"friends": [...]}` wrapper of the friends listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendsEnvelope {
    /// Users with an accepted edge to the caller.
    #[serde(default)]
    pub friends: Vec<User>,
}

/// `{"notifications": [...]}` wrapper of the notification listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationsEnvelope {
    /// All notifications for the caller.
    #[serde(default)]
    pub notifications: Vec<Notification>,
}

/// `{"message": "..."}` error body returned on rejected calls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Server-provided reason.
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_message_uses_camel_case() {
        let body = NewMessage {
            sender_id: UserId::from("u1"),
            receiver_id: UserId::from("u2"),
            message: "hi".into(),
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["senderId"], "u1");
        assert_eq!(json["receiverId"], "u2");
        assert_eq!(json["message"], "hi");
    }

    #[test]
    fn seen_request_uses_friend_id() {
        let json = serde_json::to_value(SeenRequest {
            friend_id: UserId::from("u2"),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"friendId": "u2"}));
    }

    #[test]
    fn hint_copies_the_write() {
        let body = NewMessage {
            sender_id: UserId::from("u1"),
            receiver_id: UserId::from("u2"),
            message: "hi".into(),
        };
        let hint = OutboundHint::from(&body);
        assert_eq!(hint.receiver_id, body.receiver_id);
        assert_eq!(hint.message, "hi");
    }

    #[test]
    fn envelopes_default_when_key_missing() {
        let friends: FriendsEnvelope = serde_json::from_str("{}").unwrap();
        assert!(friends.friends.is_empty());
        let notes: NotificationsEnvelope = serde_json::from_str("{}").unwrap();
        assert!(notes.notifications.is_empty());
    }

    #[test]
    fn error_body_tolerates_missing_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"error":"x"}"#).unwrap();
        assert!(body.message.is_none());
    }
}
