//! Push event routing.
//!
//! [`PushRouter`] joins the user's room once, takes a single subscription,
//! and forwards every event to the messaging and notification components
//! from one background task. Switching conversations never adds handlers;
//! the messaging handler reads the active peer when each event arrives.

use std::sync::Arc;

use chat_types::{PushEvent, UserId};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::channel::{ChannelError, RealtimeChannel, Subscription};
use crate::error::ClientError;
use crate::gateway::RemoteGateway;
use crate::messaging::MessagingSync;
use crate::notifications::NotificationCenter;

/// Handle to the running dispatch task.
#[derive(Debug)]
pub struct PushRouter {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl PushRouter {
    /// Subscribe, join the room for `user`, and start dispatching.
    ///
    /// Fails if the join fails; no task is started in that case.
    pub async fn start<G, C>(
        user: &UserId,
        channel: Arc<C>,
        messaging: MessagingSync<G, C>,
        notifications: NotificationCenter<G>,
    ) -> Result<Self, ClientError>
    where
        G: RemoteGateway + ?Sized + 'static,
        C: RealtimeChannel + ?Sized + 'static,
    {
        // Subscribe first so nothing sent right after the join is missed.
        let subscription = channel.subscribe();
        channel.join(user).await?;

        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(run(subscription, stop_rx, messaging, notifications));
        tracing::info!(user = %user, "push router started");

        Ok(Self {
            stop: Some(stop_tx),
            task: Some(task),
        })
    }

    /// Whether the dispatch task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Unsubscribe and wait for the dispatch task to finish.
    pub async fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!("Push router task failed: {}", e);
            }
            tracing::info!("push router stopped");
        }
    }
}

async fn run<G, C>(
    mut subscription: Subscription,
    mut stop: oneshot::Receiver<()>,
    messaging: MessagingSync<G, C>,
    notifications: NotificationCenter<G>,
) where
    G: RemoteGateway + ?Sized,
    C: RealtimeChannel + ?Sized,
{
    loop {
        tokio::select! {
            // Also fires when the router handle is dropped.
            _ = &mut stop => break,
            next = subscription.next() => match next {
                Ok(event) => dispatch(&event, &messaging, &notifications).await,
                Err(ChannelError::Lagged(dropped)) => {
                    tracing::warn!(dropped, "Push subscriber lagged; resyncing");
                    resync(&messaging, &notifications).await;
                }
                Err(e) => {
                    tracing::warn!("Push channel ended ({}); refreshing on next action only", e);
                    break;
                }
            },
        }
    }
    subscription.unsubscribe();
}

async fn dispatch<G, C>(
    event: &PushEvent,
    messaging: &MessagingSync<G, C>,
    notifications: &NotificationCenter<G>,
) where
    G: RemoteGateway + ?Sized,
    C: RealtimeChannel + ?Sized,
{
    tracing::debug!(event = event.wire_name(), "push event");
    let (m, n) = tokio::join!(messaging.on_push(event), notifications.on_push(event));
    if let Err(e) = m {
        tracing::warn!("Transcript refresh for {} failed: {}", event.wire_name(), e);
    }
    if let Err(e) = n {
        tracing::warn!("Notification refresh for {} failed: {}", event.wire_name(), e);
    }
}

async fn resync<G, C>(messaging: &MessagingSync<G, C>, notifications: &NotificationCenter<G>)
where
    G: RemoteGateway + ?Sized,
    C: RealtimeChannel + ?Sized,
{
    let (m, n) = tokio::join!(
        async {
            match messaging.active_peer().await {
                Some(_) => messaging.fetch_transcript().await.map(|_| ()),
                None => Ok(()),
            }
        },
        notifications.fetch()
    );
    if let Err(e) = m {
        tracing::warn!("Transcript resync failed: {}", e);
    }
    if let Err(e) = n {
        tracing::warn!("Notification resync failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::MockChannel;
    use crate::gateway::{GatewayError, GatewayOp, MockGateway};
    use crate::session::{MemorySessionStore, SessionContext, SessionState};
    use chat_types::User;
    use std::time::Duration;

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    struct Fixture {
        gateway: Arc<MockGateway>,
        channel: Arc<MockChannel>,
        messaging: MessagingSync<MockGateway, MockChannel>,
        notifications: NotificationCenter<MockGateway>,
    }

    async fn setup(channel: MockChannel) -> Fixture {
        let gateway = Arc::new(MockGateway::with_users(vec![
            User::new("u1", "Ann", "a@x.io"),
            User::new("u2", "Bo", "b@x.io"),
        ]));
        let channel = Arc::new(channel);
        let store = Arc::new(MemorySessionStore::new(SessionState::signed_in("u1")));
        let session = Arc::new(SessionContext::load(store).await.unwrap());
        let messaging =
            MessagingSync::new(Arc::clone(&gateway), Arc::clone(&channel), Arc::clone(&session));
        let notifications = NotificationCenter::new(Arc::clone(&gateway), session);
        Fixture {
            gateway,
            channel,
            messaging,
            notifications,
        }
    }

    async fn start(f: &Fixture) -> PushRouter {
        PushRouter::start(
            &uid("u1"),
            Arc::clone(&f.channel),
            f.messaging.clone(),
            f.notifications.clone(),
        )
        .await
        .unwrap()
    }

    /// Poll until `cond` holds, failing after a second.
    async fn eventually<F, Fut>(mut cond: F)
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = bool>,
    {
        for _ in 0..100 {
            if cond().await {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn start_joins_once_and_subscribes_once() {
        let f = setup(MockChannel::new()).await;
        let mut router = start(&f).await;

        assert_eq!(f.channel.joined(), vec![uid("u1")]);
        assert_eq!(f.channel.subscriber_count(), 1);
        assert!(router.is_running());

        router.shutdown().await;
        assert!(!router.is_running());
        assert_eq!(f.channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn join_failure_starts_nothing() {
        let channel = MockChannel::new();
        channel.fail_next_join("refused");
        let f = setup(channel).await;

        let result = PushRouter::start(
            &uid("u1"),
            Arc::clone(&f.channel),
            f.messaging.clone(),
            f.notifications.clone(),
        )
        .await;

        assert!(matches!(result, Err(ClientError::Channel(_))));
        assert_eq!(f.channel.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn inbound_message_refreshes_both_components() {
        let f = setup(MockChannel::new()).await;
        f.messaging.open_conversation(&uid("u2")).await.unwrap();
        let mut router = start(&f).await;

        f.gateway.seed_message(&uid("u2"), &uid("u1"), "ping");
        f.channel.push(PushEvent::InboundMessage);

        let messaging = f.messaging.clone();
        eventually(|| {
            let m = messaging.clone();
            async move { m.transcript().await.len() == 1 }
        })
        .await;
        let notifications = f.notifications.clone();
        eventually(|| {
            let n = notifications.clone();
            async move { n.unread_count().await == 1 }
        })
        .await;

        router.shutdown().await;
    }

    #[tokio::test]
    async fn handler_failure_keeps_loop_alive() {
        let f = setup(MockChannel::new()).await;
        let router = start(&f).await;

        f.gateway.fail_next(
            GatewayOp::FetchNotifications,
            GatewayError::Network("down".into()),
        );
        f.channel.push(PushEvent::NotificationCreated);
        let gw = Arc::clone(&f.gateway);
        eventually(|| {
            let gw = Arc::clone(&gw);
            async move { gw.call_count(GatewayOp::FetchNotifications) == 1 }
        })
        .await;

        f.gateway.seed_notification(&uid("u1"), &uid("u2"), "later");
        f.channel.push(PushEvent::NotificationCreated);
        let notifications = f.notifications.clone();
        eventually(|| {
            let n = notifications.clone();
            async move { n.unread_count().await == 1 }
        })
        .await;
        assert!(router.is_running());
    }

    #[tokio::test]
    async fn closed_channel_ends_loop() {
        let f = setup(MockChannel::new()).await;
        let router = start(&f).await;

        f.channel.close();

        for _ in 0..100 {
            if !router.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(!router.is_running());
    }

    #[tokio::test]
    async fn lag_triggers_resync() {
        let f = setup(MockChannel::with_capacity(1)).await;
        f.gateway.seed_notification(&uid("u1"), &uid("u2"), "a");
        let router = start(&f).await;

        // None of these touch notifications; only the resync does.
        for _ in 0..4 {
            f.channel.push(PushEvent::PeerMessage {
                sender_id: uid("u2"),
                receiver_id: uid("u1"),
            });
        }

        let notifications = f.notifications.clone();
        eventually(|| {
            let n = notifications.clone();
            async move { n.unread_count().await == 1 }
        })
        .await;
        assert!(router.is_running());
    }
}
