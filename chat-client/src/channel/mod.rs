//! Persistent push transport.
//!
//! The [`RealtimeChannel`] seam joins a user-scoped room, emits best-effort
//! hints and hands out typed [`Subscription`]s. Push events are refresh
//! triggers only; nothing received here is applied as state.

mod mock;

pub use mock::MockChannel;

use async_trait::async_trait;
use chat_types::{OutboundHint, PushEvent, UserId};
use thiserror::Error;
use tokio::sync::broadcast;

/// Push channel errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelError {
    /// The transport shut down; no further events will arrive.
    #[error("push channel closed")]
    Closed,

    /// The subscriber fell behind; the count of dropped events.
    #[error("push subscriber lagged, {0} events dropped")]
    Lagged(u64),

    /// Emit was called before the session joined its room.
    #[error("push channel not joined")]
    NotJoined,

    /// Room registration failed.
    #[error("join failed: {0}")]
    JoinFailed(String),

    /// Hint could not be delivered to the transport.
    #[error("emit failed: {0}")]
    EmitFailed(String),
}

/// Real-time transport consumed by the sync engine.
#[async_trait]
pub trait RealtimeChannel: Send + Sync {
    /// Register this session to receive events addressed to `user`.
    async fn join(&self, user: &UserId) -> Result<(), ChannelError>;

    /// Send a best-effort hint. Independent of the authoritative write.
    async fn emit(&self, hint: &OutboundHint) -> Result<(), ChannelError>;

    /// Open a typed event stream.
    fn subscribe(&self) -> Subscription;
}

/// A typed stream of push events.
///
/// Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    rx: broadcast::Receiver<PushEvent>,
}

impl Subscription {
    /// Wrap a broadcast receiver.
    pub fn new(rx: broadcast::Receiver<PushEvent>) -> Self {
        Self { rx }
    }

    /// Wait for the next event.
    ///
    /// [`ChannelError::Lagged`] is recoverable: the stream continues with
    /// the oldest retained event.
    pub async fn next(&mut self) -> Result<PushEvent, ChannelError> {
        self.rx.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => ChannelError::Closed,
            broadcast::error::RecvError::Lagged(n) => ChannelError::Lagged(n),
        })
    }

    /// Stop receiving events.
    pub fn unsubscribe(self) {
        drop(self);
    }
}
