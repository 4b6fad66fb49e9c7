//! Unread notification tracking and batched read-marking.

use std::sync::Arc;

use chat_core::{NotificationList, ReadBatch, RefreshGate};
use chat_types::{MarkRead, Notification, NotificationId, PushEvent};
use tokio::sync::Mutex;

use crate::error::ClientError;
use crate::gateway::RemoteGateway;
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct NotificationState {
    list: NotificationList,
    gate: RefreshGate,
}

/// Keeps the notification list in step with the backend.
pub struct NotificationCenter<G: RemoteGateway + ?Sized> {
    gateway: Arc<G>,
    session: Arc<SessionContext>,
    state: Arc<Mutex<NotificationState>>,
}

impl<G: RemoteGateway + ?Sized> Clone for NotificationCenter<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            session: Arc::clone(&self.session),
            state: Arc::clone(&self.state),
        }
    }
}

impl<G: RemoteGateway + ?Sized> NotificationCenter<G> {
    /// Create with an empty list.
    pub fn new(gateway: Arc<G>, session: Arc<SessionContext>) -> Self {
        Self {
            gateway,
            session,
            state: Arc::new(Mutex::new(NotificationState::default())),
        }
    }

    /// Pull the full notification list. Last fetch wins.
    pub async fn fetch(&self) -> Result<Vec<Notification>, ClientError> {
        let ticket = self.state.lock().await.gate.issue(());
        let incoming = self
            .gateway
            .fetch_notifications(self.session.user_id())
            .await?;

        let mut state = self.state.lock().await;
        if state.gate.admit(&ticket, Some(&())).is_apply() {
            state.list.replace(incoming);
        } else {
            tracing::debug!(seq = ticket.seq(), "discarding superseded notification listing");
        }
        Ok(state.list.items().to_vec())
    }

    /// Notifications as last fetched.
    pub async fn notifications(&self) -> Vec<Notification> {
        self.state.lock().await.list.items().to_vec()
    }

    /// Number of unread notifications.
    pub async fn unread_count(&self) -> usize {
        self.state.lock().await.list.unread_count()
    }

    /// Mark `ids` read.
    ///
    /// Only ids that are unread at call time are sent and flipped.
    /// Returns how many flipped locally.
    pub async fn mark_read(&self, ids: &[NotificationId]) -> Result<usize, ClientError> {
        let batch = self.state.lock().await.list.capture(ids);
        self.commit(batch).await
    }

    /// Mark everything currently unread as read.
    pub async fn mark_all_read(&self) -> Result<usize, ClientError> {
        let batch = self.state.lock().await.list.capture_all();
        self.commit(batch).await
    }

    async fn commit(&self, batch: ReadBatch) -> Result<usize, ClientError> {
        if batch.is_empty() {
            return Ok(0);
        }
        self.gateway
            .mark_notifications_read(&MarkRead {
                ids: batch.ids().to_vec(),
            })
            .await?;
        Ok(self.state.lock().await.list.apply(&batch))
    }

    /// React to a push event. Returns whether a refetch ran.
    pub async fn on_push(&self, event: &PushEvent) -> Result<bool, ClientError> {
        if !event.affects_notifications() {
            return Ok(false);
        }
        self.fetch().await?;
        Ok(true)
    }
}
