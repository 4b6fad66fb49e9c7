//! The active conversation.
//!
//! [`MessagingSync`] owns the transcript for one (me, peer) pair at a time.
//! Fetches are ticketed with the peer they target, so a late result for a
//! conversation the user has already left is discarded instead of
//! overwriting the one on screen.
//!
//! Sends are confirm-then-refetch: the created message appears in the
//! transcript only once a fetch returns the server's copy.

use std::sync::Arc;

use chat_core::{Admission, RefreshGate, Transcript};
use chat_types::{
    ConversationKey, Message, MessageId, MessagePatch, NewMessage, OutboundHint, PushEvent,
    SeenRequest, UserId,
};
use tokio::sync::Mutex;

use crate::channel::RealtimeChannel;
use crate::error::{ClientError, ValidationError};
use crate::gateway::RemoteGateway;
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct ConversationState {
    peer: Option<UserId>,
    transcript: Transcript,
    gate: RefreshGate,
}

/// Keeps the open conversation in step with the backend.
pub struct MessagingSync<G: RemoteGateway + ?Sized, C: RealtimeChannel + ?Sized> {
    gateway: Arc<G>,
    channel: Arc<C>,
    session: Arc<SessionContext>,
    state: Arc<Mutex<ConversationState>>,
}

impl<G, C> Clone for MessagingSync<G, C>
where
    G: RemoteGateway + ?Sized,
    C: RealtimeChannel + ?Sized,
{
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            channel: Arc::clone(&self.channel),
            session: Arc::clone(&self.session),
            state: Arc::clone(&self.state),
        }
    }
}

impl<G, C> MessagingSync<G, C>
where
    G: RemoteGateway + ?Sized,
    C: RealtimeChannel + ?Sized,
{
    /// Create with no conversation open.
    pub fn new(gateway: Arc<G>, channel: Arc<C>, session: Arc<SessionContext>) -> Self {
        Self {
            gateway,
            channel,
            session,
            state: Arc::new(Mutex::new(ConversationState::default())),
        }
    }

    fn validate_peer(&self, peer: &UserId) -> Result<(), ClientError> {
        if peer.is_blank() {
            return Err(ValidationError::MissingId("peer id").into());
        }
        if peer == self.session.user_id() {
            return Err(ValidationError::SelfTarget.into());
        }
        Ok(())
    }

    /// Make `peer` the active conversation, fetch it, then mark it seen.
    ///
    /// Reopening the current peer keeps the transcript until the fetch
    /// replaces it. Seen-marking is skipped if the fetch was superseded.
    pub async fn open_conversation(&self, peer: &UserId) -> Result<(), ClientError> {
        self.validate_peer(peer)?;
        let me = self.session.user_id();
        {
            let mut state = self.state.lock().await;
            if state.peer.as_ref() != Some(peer) {
                state.peer = Some(peer.clone());
                state.transcript.reset(Some(ConversationKey::new(me, peer)));
            }
        }
        if let Err(e) = self.session.remember_peer(peer).await {
            tracing::warn!("Failed to persist last peer: {}", e);
        }

        if self.fetch_transcript().await? {
            self.mark_seen().await?;
        }
        Ok(())
    }

    /// Leave the active conversation. In-flight fetches for it are discarded.
    pub async fn close_conversation(&self) {
        let mut state = self.state.lock().await;
        state.peer = None;
        state.transcript.reset(None);
    }

    /// The peer of the open conversation.
    pub async fn active_peer(&self) -> Option<UserId> {
        self.state.lock().await.peer.clone()
    }

    /// Snapshot of the transcript in display order.
    pub async fn transcript(&self) -> Vec<Message> {
        self.state.lock().await.transcript.messages().to_vec()
    }

    /// Replace the transcript from the backend.
    ///
    /// Returns `false` if the result was discarded because the active peer
    /// changed or a newer fetch was already applied.
    pub async fn fetch_transcript(&self) -> Result<bool, ClientError> {
        let me = self.session.user_id();
        let ticket = {
            let mut state = self.state.lock().await;
            let peer = state
                .peer
                .clone()
                .ok_or(ClientError::NoActiveConversation)?;
            state.gate.issue(peer)
        };

        let messages = self.gateway.fetch_transcript(me, ticket.target()).await?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        match state.gate.admit(&ticket, state.peer.as_ref()) {
            Admission::Apply => {
                let summary = state.transcript.replace(messages);
                tracing::debug!(
                    peer = %ticket.target(),
                    kept = summary.kept,
                    dropped = summary.dropped,
                    "transcript replaced"
                );
                Ok(true)
            }
            verdict => {
                tracing::debug!(
                    peer = %ticket.target(),
                    seq = ticket.seq(),
                    ?verdict,
                    "discarding stale transcript"
                );
                Ok(false)
            }
        }
    }

    /// Send `body` to `peer`.
    ///
    /// Returns the server's copy. The push hint is best effort, and the
    /// follow-up fetch only runs if `peer` is the open conversation; a
    /// failure of either is logged and does not fail the send.
    pub async fn send(&self, peer: &UserId, body: &str) -> Result<Message, ClientError> {
        let body = body.trim();
        if body.is_empty() || peer.is_blank() {
            return Err(ClientError::EmptyMessage);
        }
        self.validate_peer(peer)?;

        let outgoing = NewMessage {
            sender_id: self.session.user_id().clone(),
            receiver_id: peer.clone(),
            message: body.to_string(),
        };
        let created = self.gateway.send_message(&outgoing).await?;
        tracing::debug!(message = %created.id, to = %peer, "message sent");

        if let Err(e) = self.channel.emit(&OutboundHint::from(&outgoing)).await {
            tracing::warn!("Push hint for {} failed: {}", created.id, e);
        }

        if self.active_peer().await.as_ref() == Some(peer) {
            if let Err(e) = self.fetch_transcript().await {
                tracing::warn!("Refetch after send failed: {}", e);
            }
        }
        Ok(created)
    }

    /// Replace the body of one of my messages in the open conversation.
    ///
    /// Fetches issued before the edit is confirmed are discarded.
    pub async fn edit(&self, id: &MessageId, new_body: &str) -> Result<Message, ClientError> {
        let new_body = new_body.trim();
        if new_body.is_empty() {
            return Err(ClientError::EmptyMessage);
        }
        {
            let state = self.state.lock().await;
            if state.peer.is_none() {
                return Err(ClientError::NoActiveConversation);
            }
            let message = state
                .transcript
                .get(id)
                .ok_or_else(|| ClientError::UnknownMessage(id.clone()))?;
            if !message.is_from(self.session.user_id()) {
                return Err(ClientError::NotOwner(id.clone()));
            }
        }

        let patch = MessagePatch {
            message: new_body.to_string(),
        };
        let updated = self.gateway.edit_message(id, &patch).await?;

        let mut state = self.state.lock().await;
        state
            .transcript
            .patch_body(id, &updated.body, updated.edited_at);
        state.gate.supersede_outstanding();
        Ok(updated)
    }

    /// Delete a message from the open conversation.
    ///
    /// The message is removed locally before the remote call. If the call
    /// fails the error is returned and the message comes back on the next
    /// fetch. Fetches issued before a confirmed delete are discarded.
    pub async fn delete(&self, id: &MessageId) -> Result<(), ClientError> {
        {
            let mut state = self.state.lock().await;
            if state.peer.is_none() {
                return Err(ClientError::NoActiveConversation);
            }
            state.transcript.remove(id);
        }
        self.gateway.delete_message(id).await?;

        let mut state = self.state.lock().await;
        state.transcript.remove(id);
        state.gate.supersede_outstanding();
        Ok(())
    }

    /// Mark everything the peer sent me as seen. Returns how many flipped.
    ///
    /// No remote call is made when nothing is unseen.
    pub async fn mark_seen(&self) -> Result<usize, ClientError> {
        let peer = {
            let state = self.state.lock().await;
            let peer = state
                .peer
                .clone()
                .ok_or(ClientError::NoActiveConversation)?;
            if state.transcript.unseen_from(&peer) == 0 {
                return Ok(0);
            }
            peer
        };

        self.gateway
            .mark_seen(
                self.session.user_id(),
                &SeenRequest {
                    friend_id: peer.clone(),
                },
            )
            .await?;

        let mut state = self.state.lock().await;
        if state.peer.as_ref() != Some(&peer) {
            return Ok(0);
        }
        Ok(state.transcript.mark_seen_from(&peer))
    }

    /// React to a push event. Returns whether a refetch was applied.
    pub async fn on_push(&self, event: &PushEvent) -> Result<bool, ClientError> {
        let Some(peer) = self.active_peer().await else {
            return Ok(false);
        };
        if !event.concerns_conversation(self.session.user_id(), &peer) {
            return Ok(false);
        }
        self.fetch_transcript().await
    }
}
