//! In-process push channel for testing.

use super::{ChannelError, RealtimeChannel, Subscription};
use async_trait::async_trait;
use chat_types::{OutboundHint, PushEvent, UserId};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 64;

/// Broadcast-backed [`RealtimeChannel`].
///
/// Tests drive it with [`MockChannel::push`] and inspect joins and emitted
/// hints afterwards. With loopback on, every emitted hint is echoed back as
/// a `PeerMessage`, the way the backend relays `sendMessage`.
#[derive(Debug, Clone)]
pub struct MockChannel {
    inner: Arc<Mutex<MockChannelInner>>,
}

#[derive(Debug)]
struct MockChannelInner {
    events: Option<broadcast::Sender<PushEvent>>,
    joined: Vec<UserId>,
    emitted: Vec<OutboundHint>,
    fail_join: Option<String>,
    fail_emit: Option<String>,
    loopback: bool,
}

impl Default for MockChannel {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl MockChannel {
    /// Create an open channel.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an open channel whose subscribers lag after `capacity` unread events.
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            inner: Arc::new(Mutex::new(MockChannelInner {
                events: Some(tx),
                joined: Vec::new(),
                emitted: Vec::new(),
                fail_join: None,
                fail_emit: None,
                loopback: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockChannelInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Deliver an event to every subscriber. Returns how many received it.
    pub fn push(&self, event: PushEvent) -> usize {
        match &self.lock().events {
            Some(tx) => tx.send(event).unwrap_or(0),
            None => 0,
        }
    }

    /// Echo emitted hints back to subscribers.
    pub fn set_loopback(&self, enabled: bool) {
        self.lock().loopback = enabled;
    }

    /// Users joined so far, in order.
    pub fn joined(&self) -> Vec<UserId> {
        self.lock().joined.clone()
    }

    /// Hints emitted so far, in order.
    pub fn emitted(&self) -> Vec<OutboundHint> {
        self.lock().emitted.clone()
    }

    /// Cause the next join to fail.
    pub fn fail_next_join(&self, reason: &str) {
        self.lock().fail_join = Some(reason.to_string());
    }

    /// Cause the next emit to fail.
    pub fn fail_next_emit(&self, reason: &str) {
        self.lock().fail_emit = Some(reason.to_string());
    }

    /// Shut the transport down. Subscribers see [`ChannelError::Closed`].
    pub fn close(&self) {
        self.lock().events = None;
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.lock()
            .events
            .as_ref()
            .map_or(0, |tx| tx.receiver_count())
    }
}

#[async_trait]
impl RealtimeChannel for MockChannel {
    async fn join(&self, user: &UserId) -> Result<(), ChannelError> {
        let mut inner = self.lock();
        if let Some(reason) = inner.fail_join.take() {
            return Err(ChannelError::JoinFailed(reason));
        }
        if inner.events.is_none() {
            return Err(ChannelError::Closed);
        }
        inner.joined.push(user.clone());
        Ok(())
    }

    async fn emit(&self, hint: &OutboundHint) -> Result<(), ChannelError> {
        let mut inner = self.lock();
        if inner.joined.is_empty() {
            return Err(ChannelError::NotJoined);
        }
        if let Some(reason) = inner.fail_emit.take() {
            return Err(ChannelError::EmitFailed(reason));
        }
        let tx = inner.events.as_ref().ok_or(ChannelError::Closed)?;
        if inner.loopback {
            let _ = tx.send(PushEvent::PeerMessage {
                sender_id: hint.sender_id.clone(),
                receiver_id: hint.receiver_id.clone(),
            });
        }
        inner.emitted.push(hint.clone());
        Ok(())
    }

    fn subscribe(&self) -> Subscription {
        match &self.lock().events {
            Some(tx) => Subscription::new(tx.subscribe()),
            None => {
                // Already closed: hand out a stream that ends immediately.
                let (_, rx) = broadcast::channel(1);
                Subscription::new(rx)
            }
        }
    }
}
