//! Client errors.

use crate::channel::ChannelError;
use crate::gateway::GatewayError;
use crate::session::SessionError;
use chat_types::MessageId;
use thiserror::Error;

/// Input rejected before any network call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required id was empty.
    #[error("missing {0}")]
    MissingId(&'static str),

    /// The operation would target the current user.
    #[error("cannot target yourself")]
    SelfTarget,
}

/// Errors surfaced by the sync components.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No persisted identity; the caller must sign in.
    #[error("not authenticated")]
    NotAuthenticated,

    /// A pending or accepted edge already exists.
    #[error("friend request already exists")]
    DuplicateRequest,

    /// The trimmed body was empty, or the conversation had no peer.
    #[error("message is empty")]
    EmptyMessage,

    /// The message belongs to someone else.
    #[error("message {0} is not yours")]
    NotOwner(MessageId),

    /// The message is not in the active transcript.
    #[error("message {0} is not in the open conversation")]
    UnknownMessage(MessageId),

    /// No conversation is open.
    #[error("no active conversation")]
    NoActiveConversation,

    /// Invalid input.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Gateway error.
    #[error("gateway error: {0}")]
    Gateway(GatewayError),

    /// Push channel error.
    #[error("push channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Session persistence error.
    #[error("session error: {0}")]
    Session(#[from] SessionError),
}

impl From<GatewayError> for ClientError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::DuplicateRequest => ClientError::DuplicateRequest,
            other => ClientError::Gateway(other),
        }
    }
}

impl ClientError {
    /// Rejected locally before any remote call.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ClientError::Validation(_)
                | ClientError::EmptyMessage
                | ClientError::NotOwner(_)
                | ClientError::UnknownMessage(_)
                | ClientError::NoActiveConversation
        )
    }

    /// The backend answered and refused.
    pub fn is_rejection(&self) -> bool {
        match self {
            ClientError::DuplicateRequest => true,
            ClientError::Gateway(e) => e.is_rejection(),
            _ => false,
        }
    }

    /// The call did not complete.
    pub fn is_network(&self) -> bool {
        matches!(self, ClientError::Gateway(e) if e.is_network())
    }
}
