//! Records returned by the backend.
//!
//! Field names follow the backend's JSON (`_id`, `profilePic`, `isRead`).
//! Participants may arrive either as a bare id or as a populated user
//! object, so they are modelled as [`UserRef`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{MessageId, NotificationId, RequestId, UserId};

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Stable identity.
    #[serde(rename = "_id")]
    pub id: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contact email.
    #[serde(default)]
    pub email: String,
    /// Avatar URL, if one was uploaded.
    #[serde(rename = "profilePic", default, skip_serializing_if = "Option::is_none")]
    pub profile_pic_url: Option<String>,
}

impl User {
    /// Create a user with just a name and email.
    pub fn new(id: impl Into<UserId>, name: &str, email: &str) -> Self {
        Self {
            id: id.into(),
            name: name.to_string(),
            email: email.to_string(),
            profile_pic_url: None,
        }
    }
}

/// A reference to a user, bare or populated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserRef {
    /// Only the id was sent.
    Id(UserId),
    /// The backend populated the full record.
    User(User),
}

impl UserRef {
    /// The referenced user's id.
    pub fn id(&self) -> &UserId {
        match self {
            UserRef::Id(id) => id,
            UserRef::User(user) => &user.id,
        }
    }

    /// The populated record, if present.
    pub fn user(&self) -> Option<&User> {
        match self {
            UserRef::Id(_) => None,
            UserRef::User(user) => Some(user),
        }
    }
}

impl From<UserId> for UserRef {
    fn from(id: UserId) -> Self {
        UserRef::Id(id)
    }
}

impl From<User> for UserRef {
    fn from(user: User) -> Self {
        UserRef::User(user)
    }
}

/// Lifecycle state of a friend request.
///
/// Requests only move forward: `Pending` → `Accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    /// Awaiting the receiver's decision.
    #[default]
    Pending,
    /// Accepted; a friend edge now exists.
    Accepted,
}

impl RequestStatus {
    /// Query-string form used by the backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Accepted => "accepted",
        }
    }
}

/// A friend request between two users.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FriendRequest {
    /// Request id.
    #[serde(rename = "_id")]
    pub id: RequestId,
    /// Who sent it.
    pub sender: UserRef,
    /// Who received it.
    pub receiver: UserRef,
    /// Current status.
    #[serde(default)]
    pub status: RequestStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

impl FriendRequest {
    /// Whether this request connects `a` and `b`, in either direction.
    pub fn connects(&self, a: &UserId, b: &UserId) -> bool {
        let (s, r) = (self.sender.id(), self.receiver.id());
        (s == a && r == b) || (s == b && r == a)
    }
}

/// Order-independent key of a two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConversationKey {
    low: UserId,
    high: UserId,
}

impl ConversationKey {
    /// Build a key; `new(a, b) == new(b, a)`.
    pub fn new(a: &UserId, b: &UserId) -> Self {
        if a <= b {
            Self {
                low: a.clone(),
                high: b.clone(),
            }
        } else {
            Self {
                low: b.clone(),
                high: a.clone(),
            }
        }
    }
}

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Server-assigned id.
    #[serde(rename = "_id")]
    pub id: MessageId,
    /// Author.
    pub sender: UserRef,
    /// Recipient.
    pub receiver: UserRef,
    /// Message text.
    #[serde(rename = "message")]
    pub body: String,
    /// Server timestamp.
    pub timestamp: DateTime<Utc>,
    /// Whether the receiver has viewed it. Only ever goes false → true.
    #[serde(default)]
    pub seen: bool,
    /// Last edit time, if edited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<DateTime<Utc>>,
}

impl Message {
    /// Author id.
    pub fn sender_id(&self) -> &UserId {
        self.sender.id()
    }

    /// Recipient id.
    pub fn receiver_id(&self) -> &UserId {
        self.receiver.id()
    }

    /// Conversation this message belongs to.
    pub fn conversation_key(&self) -> ConversationKey {
        ConversationKey::new(self.sender_id(), self.receiver_id())
    }

    /// Whether `user` wrote this message.
    pub fn is_from(&self, user: &UserId) -> bool {
        self.sender_id() == user
    }

    /// Sender and receiver must differ.
    pub fn is_well_formed(&self) -> bool {
        self.sender_id() != self.receiver_id()
    }
}

/// A notification addressed to the current user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// Notification id.
    #[serde(rename = "_id")]
    pub id: NotificationId,
    /// Addressee.
    pub recipient: UserRef,
    /// Originator.
    pub sender: UserRef,
    /// Category, e.g. `"message"` or `"friend_request"`.
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Human-readable text.
    #[serde(default)]
    pub message: String,
    /// Whether it was read. Only ever goes false → true.
    #[serde(default)]
    pub is_read: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}
