//! Request/response access to the backend.
//!
//! This module provides the [`RemoteGateway`] seam that every sync
//! component talks through, plus two implementations:
//! - [`HttpGateway`] for the real REST backend
//! - [`MockGateway`], an in-memory backend for tests and demos
//!
//! # Design
//!
//! The gateway is stateless from the engine's point of view. Each call is
//! one request; nothing is retried here, so a failed write is surfaced once
//! and only repeated on an explicit user action.

mod http;
mod mock;

pub use http::HttpGateway;
pub use mock::{CallHold, GatewayOp, MockGateway};

use async_trait::async_trait;
use chat_types::{
    AcceptRequest, FriendRequest, MarkRead, Message, MessageId, MessagePatch, NewFriendRequest,
    NewMessage, Notification, RequestStatus, SeenRequest, User, UserId,
};
use thiserror::Error;

/// Gateway errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    /// A pending or accepted edge already exists for the pair.
    #[error("duplicate friend request")]
    DuplicateRequest,

    /// The caller may not perform this operation.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The backend refused the request for another reason.
    #[error("rejected: {0}")]
    Rejected(String),

    /// The backend failed internally.
    #[error("server error: {0}")]
    Server(String),

    /// The backend was unreachable or timed out.
    #[error("network failure: {0}")]
    Network(String),

    /// The response body could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),

    /// The gateway is misconfigured.
    #[error("invalid gateway configuration: {0}")]
    Config(String),
}

impl GatewayError {
    /// The backend answered and said no.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            GatewayError::DuplicateRequest
                | GatewayError::Unauthorized(_)
                | GatewayError::NotFound(_)
                | GatewayError::Rejected(_)
        )
    }

    /// The call did not complete; the outcome on the backend is unknown.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            GatewayError::Network(_) | GatewayError::Server(_) | GatewayError::Decode(_)
        )
    }
}

/// Backend operations consumed by the sync engine.
///
/// Implementations handle the underlying transport (HTTP, in-memory).
#[async_trait]
pub trait RemoteGateway: Send + Sync {
    /// Every user except `excluding`.
    async fn list_users(&self, excluding: &UserId) -> Result<Vec<User>, GatewayError>;

    /// Users with an accepted edge to `me`.
    async fn list_friends(&self, me: &UserId) -> Result<Vec<User>, GatewayError>;

    /// Requests addressed to `me` with the given status, in server order.
    async fn list_pending_requests(
        &self,
        me: &UserId,
        status: RequestStatus,
    ) -> Result<Vec<FriendRequest>, GatewayError>;

    /// Create a friend request.
    ///
    /// Fails with [`GatewayError::DuplicateRequest`] if an edge already exists.
    async fn send_request(&self, body: &NewFriendRequest) -> Result<FriendRequest, GatewayError>;

    /// Accept a friend request.
    async fn accept_request(&self, body: &AcceptRequest) -> Result<(), GatewayError>;

    /// Full message history between `me` and `peer`.
    async fn fetch_transcript(
        &self,
        me: &UserId,
        peer: &UserId,
    ) -> Result<Vec<Message>, GatewayError>;

    /// Write a message; returns the server's copy.
    async fn send_message(&self, body: &NewMessage) -> Result<Message, GatewayError>;

    /// Replace a message body; returns the server's copy.
    async fn edit_message(
        &self,
        id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<Message, GatewayError>;

    /// Delete a message.
    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError>;

    /// Mark everything `body.friend_id` sent to `me` as seen.
    async fn mark_seen(&self, me: &UserId, body: &SeenRequest) -> Result<(), GatewayError>;

    /// All notifications for `me`.
    async fn fetch_notifications(&self, me: &UserId) -> Result<Vec<Notification>, GatewayError>;

    /// Mark exactly `body.ids` as read.
    async fn mark_notifications_read(&self, body: &MarkRead) -> Result<(), GatewayError>;
}
