//! # chat-types
//!
//! Wire and data model types for the chatsync client engine.
//!
//! This crate provides the foundational types used across all chatsync crates:
//! - [`UserId`], [`RequestId`], [`MessageId`], [`NotificationId`] - Opaque server ids
//! - [`User`], [`FriendRequest`], [`Message`], [`Notification`] - Backend records
//! - [`PushEvent`] - Real-time channel events
//! - Request bodies and response envelopes for the gateway

#![warn(missing_docs)]
#![warn(clippy::all)]

mod error;
mod events;
mod ids;
mod models;
mod payloads;

pub use error::InvalidId;
pub use events::PushEvent;
pub use ids::{MessageId, NotificationId, RequestId, UserId};
pub use models::{
    ConversationKey, FriendRequest, Message, Notification, RequestStatus, User, UserRef,
};
pub use payloads::{
    AcceptRequest, ErrorBody, FriendsEnvelope, MarkRead, MessagePatch, NewFriendRequest,
    NewMessage, NotificationsEnvelope, OutboundHint, SeenRequest,
};
