//! ChatClient - the main interface for chatsync.
//!
//! This module provides [`ChatClient`], which wires the session, the three
//! sync components and the push router together in startup order.
//!
//! # Architecture
//!
//! ```text
//! Application → ChatClient → SocialGraphSync ─┐
//!                          → MessagingSync ───┼→ RemoteGateway → Backend
//!                          → NotificationCenter┘
//!                          → PushRouter ← RealtimeChannel ← Backend
//! ```
//!
//! # Example
//!
//! ```ignore
//! use chatsync_client::{ChatClient, ClientConfig, MemorySessionStore, MockChannel, MockGateway, SessionState};
//!
//! let store = Arc::new(MemorySessionStore::new(SessionState::signed_in("u1")));
//! let client = ChatClient::start(&ClientConfig::default(), store, gateway, channel).await?;
//!
//! client.messaging().open_conversation(&"u2".into()).await?;
//! client.messaging().send(&"u2".into(), "hi").await?;
//! ```

use std::sync::Arc;

use crate::channel::RealtimeChannel;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gateway::RemoteGateway;
use crate::messaging::MessagingSync;
use crate::notifications::NotificationCenter;
use crate::realtime::PushRouter;
use crate::session::{SessionContext, SessionStore};
use crate::social::SocialGraphSync;

/// The chat client.
///
/// Owns the session and one instance of each sync component.
pub struct ChatClient<G, C>
where
    G: RemoteGateway + ?Sized + 'static,
    C: RealtimeChannel + ?Sized + 'static,
{
    session: Arc<SessionContext>,
    social: SocialGraphSync<G>,
    messaging: MessagingSync<G, C>,
    notifications: NotificationCenter<G>,
    router: Option<PushRouter>,
}

impl<G, C> ChatClient<G, C>
where
    G: RemoteGateway + ?Sized + 'static,
    C: RealtimeChannel + ?Sized + 'static,
{
    /// Load the session and bring every component up.
    ///
    /// Only a missing identity is fatal. Failed initial pulls and a failed
    /// room join are logged; the affected state stays empty until the next
    /// refresh, and without a router freshness falls back to refresh on the
    /// next user action.
    pub async fn start(
        config: &ClientConfig,
        store: Arc<dyn SessionStore>,
        gateway: Arc<G>,
        channel: Arc<C>,
    ) -> Result<Self, ClientError> {
        let session = Arc::new(SessionContext::load(store).await?);

        let social = SocialGraphSync::new(Arc::clone(&gateway), Arc::clone(&session));
        let messaging =
            MessagingSync::new(Arc::clone(&gateway), Arc::clone(&channel), Arc::clone(&session));
        let notifications = NotificationCenter::new(gateway, Arc::clone(&session));

        let (graph, notes) = tokio::join!(social.refresh_all(), notifications.fetch());
        if let Err(e) = graph {
            tracing::warn!("Initial social graph pull failed: {}", e);
        }
        if let Err(e) = notes {
            tracing::warn!("Initial notification pull failed: {}", e);
        }

        let router = match PushRouter::start(
            session.user_id(),
            channel,
            messaging.clone(),
            notifications.clone(),
        )
        .await
        {
            Ok(router) => Some(router),
            Err(e) => {
                tracing::warn!("Push channel unavailable: {}", e);
                None
            }
        };

        if config.sync.restore_last_peer {
            if let Some(peer) = session.last_peer().await {
                if let Err(e) = messaging.open_conversation(&peer).await {
                    tracing::warn!("Reopening conversation with {} failed: {}", peer, e);
                }
            }
        }

        tracing::info!(user = %session.user_id(), "chat client started");
        Ok(Self {
            session,
            social,
            messaging,
            notifications,
            router,
        })
    }

    /// The signed-in session.
    pub fn session(&self) -> &SessionContext {
        &self.session
    }

    /// Friends, requests and the user directory.
    pub fn social(&self) -> &SocialGraphSync<G> {
        &self.social
    }

    /// The open conversation.
    pub fn messaging(&self) -> &MessagingSync<G, C> {
        &self.messaging
    }

    /// Notifications.
    pub fn notifications(&self) -> &NotificationCenter<G> {
        &self.notifications
    }

    /// Whether push events are being received.
    pub fn is_live(&self) -> bool {
        self.router.as_ref().is_some_and(PushRouter::is_running)
    }

    /// Stop receiving push events.
    pub async fn shutdown(&mut self) {
        if let Some(mut router) = self.router.take() {
            router.shutdown().await;
        }
    }

    /// Stop receiving push events and clear the stored identity.
    pub async fn sign_out(&mut self) -> Result<(), ClientError> {
        self.shutdown().await;
        self.messaging.close_conversation().await;
        self.session.sign_out().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use crate::gateway::{GatewayError, GatewayOp, MockGateway};
    use crate::session::{MemorySessionStore, SessionState};
    use chat_types::{User, UserId};

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    fn backend() -> Arc<MockGateway> {
        let gw = MockGateway::with_users(vec![
            User::new("u1", "Ann", "a@x.io"),
            User::new("u2", "Bo", "b@x.io"),
        ]);
        gw.befriend(&uid("u1"), &uid("u2"));
        Arc::new(gw)
    }

    fn store(last_peer: Option<&str>) -> Arc<MemorySessionStore> {
        let mut state = SessionState::signed_in("u1");
        state.last_peer = last_peer.map(UserId::from);
        Arc::new(MemorySessionStore::new(state))
    }

    #[tokio::test]
    async fn start_without_identity_fails() {
        let store = Arc::new(MemorySessionStore::default());
        let result = ChatClient::start(
            &ClientConfig::default(),
            store,
            backend(),
            Arc::new(MockChannel::new()),
        )
        .await;
        assert!(matches!(result, Err(ClientError::NotAuthenticated)));
    }

    #[tokio::test]
    async fn start_pulls_state_and_goes_live() {
        let mut client = ChatClient::start(
            &ClientConfig::default(),
            store(None),
            backend(),
            Arc::new(MockChannel::new()),
        )
        .await
        .unwrap();

        assert!(client.social().is_friend(&uid("u2")).await);
        assert_eq!(client.social().users().await.len(), 1);
        assert!(client.is_live());

        client.shutdown().await;
        assert!(!client.is_live());
    }

    #[tokio::test]
    async fn start_restores_last_peer() {
        let gw = backend();
        gw.seed_message(&uid("u2"), &uid("u1"), "welcome back");

        let client = ChatClient::start(
            &ClientConfig::default(),
            store(Some("u2")),
            Arc::clone(&gw),
            Arc::new(MockChannel::new()),
        )
        .await
        .unwrap();

        assert_eq!(client.messaging().active_peer().await, Some(uid("u2")));
        assert_eq!(client.messaging().transcript().await.len(), 1);
    }

    #[tokio::test]
    async fn restore_can_be_disabled() {
        let mut config = ClientConfig::default();
        config.sync.restore_last_peer = false;

        let client = ChatClient::start(
            &config,
            store(Some("u2")),
            backend(),
            Arc::new(MockChannel::new()),
        )
        .await
        .unwrap();

        assert_eq!(client.messaging().active_peer().await, None);
    }

    #[tokio::test]
    async fn startup_failures_are_not_fatal() {
        let gw = backend();
        gw.fail_next(GatewayOp::ListFriends, GatewayError::Network("down".into()));
        let channel = MockChannel::new();
        channel.fail_next_join("refused");

        let client = ChatClient::start(
            &ClientConfig::default(),
            store(None),
            gw,
            Arc::new(channel),
        )
        .await
        .unwrap();

        assert!(client.social().friends().await.is_empty());
        assert!(!client.is_live());
    }

    #[tokio::test]
    async fn sign_out_clears_session() {
        let store = store(Some("u2"));
        let mut client = ChatClient::start(
            &ClientConfig::default(),
            store.clone(),
            backend(),
            Arc::new(MockChannel::new()),
        )
        .await
        .unwrap();

        client.sign_out().await.unwrap();

        assert!(!client.is_live());
        assert_eq!(store.snapshot(), SessionState::default());
        assert!(client.messaging().transcript().await.is_empty());
    }
}
