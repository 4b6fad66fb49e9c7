//! In-memory gateway for testing.
//!
//! Behaves like a small backend: it stores users, requests, messages and
//! notifications, assigns ids and timestamps, and enforces the duplicate
//! request rule. Failures can be injected per operation, and any call can be
//! held open to reproduce late results.

use super::{GatewayError, RemoteGateway};
use async_trait::async_trait;
use chat_types::{
    AcceptRequest, ConversationKey, FriendRequest, MarkRead, Message, MessageId, MessagePatch,
    NewFriendRequest, NewMessage, Notification, NotificationId, RequestId, RequestStatus,
    SeenRequest, User, UserId, UserRef,
};
use chrono::{DateTime, Utc};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{oneshot, Notify};
use uuid::Uuid;

/// 2024-01-01T00:00:00Z; the mock clock ticks one second per write.
const CLOCK_START: i64 = 1_704_067_200;

/// Gateway operations, for failure injection and call accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GatewayOp {
    /// `list_users`
    ListUsers,
    /// `list_friends`
    ListFriends,
    /// `list_pending_requests`
    ListPendingRequests,
    /// `send_request`
    SendRequest,
    /// `accept_request`
    AcceptRequest,
    /// `fetch_transcript`
    FetchTranscript,
    /// `send_message`
    SendMessage,
    /// `edit_message`
    EditMessage,
    /// `delete_message`
    DeleteMessage,
    /// `mark_seen`
    MarkSeen,
    /// `fetch_notifications`
    FetchNotifications,
    /// `mark_notifications_read`
    MarkNotificationsRead,
}

/// Keeps one call pending until released.
///
/// The held call takes effect on the backend when it is issued, but its
/// response is delivered only after [`CallHold::release`]. A held read
/// therefore returns the snapshot from issue time.
#[derive(Debug)]
pub struct CallHold {
    release: oneshot::Sender<()>,
    parked: Arc<Notify>,
}

impl CallHold {
    /// Wait until the held call has been issued and is parked.
    pub async fn parked(&self) {
        self.parked.notified().await;
    }

    /// Let the held call return.
    pub fn release(self) {
        let _ = self.release.send(());
    }
}

type ParkedCall = (oneshot::Receiver<()>, Arc<Notify>);

/// In-memory backend implementing [`RemoteGateway`].
#[derive(Debug, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<MockGatewayInner>>,
}

#[derive(Debug, Default)]
struct MockGatewayInner {
    users: Vec<User>,
    requests: Vec<FriendRequest>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    ticks: i64,
    calls: Vec<GatewayOp>,
    failures: HashMap<GatewayOp, GatewayError>,
    holds: HashMap<GatewayOp, VecDeque<ParkedCall>>,
}

impl MockGatewayInner {
    fn now(&mut self) -> DateTime<Utc> {
        self.ticks += 1;
        DateTime::<Utc>::from_timestamp(CLOCK_START + self.ticks, 0).unwrap_or_else(Utc::now)
    }

    fn user_ref(&self, id: &UserId) -> UserRef {
        match self.users.iter().find(|u| &u.id == id) {
            Some(user) => UserRef::User(user.clone()),
            None => UserRef::Id(id.clone()),
        }
    }

    fn user(&self, id: &UserId) -> User {
        self.users
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .unwrap_or_else(|| User::new(id.clone(), "", ""))
    }

    fn notify(
        &mut self,
        recipient: &UserId,
        sender: &UserId,
        kind: &str,
        text: &str,
    ) -> NotificationId {
        let id = NotificationId::from(format!("n-{}", Uuid::new_v4().simple()));
        let created_at = self.now();
        let sender = self.user_ref(sender);
        self.notifications.push(Notification {
            id: id.clone(),
            recipient: UserRef::Id(recipient.clone()),
            sender,
            kind: kind.to_string(),
            message: text.to_string(),
            is_read: false,
            created_at,
        });
        id
    }

    fn insert_request(
        &mut self,
        id: RequestId,
        from: &UserId,
        to: &UserId,
        status: RequestStatus,
    ) -> FriendRequest {
        let created_at = self.now();
        let request = FriendRequest {
            id,
            sender: self.user_ref(from),
            receiver: self.user_ref(to),
            status,
            created_at,
        };
        self.requests.push(request.clone());
        request
    }

    fn insert_message(&mut self, from: &UserId, to: &UserId, body: &str) -> Message {
        let timestamp = self.now();
        let message = Message {
            id: MessageId::from(format!("m-{}", Uuid::new_v4().simple())),
            sender: self.user_ref(from),
            receiver: self.user_ref(to),
            body: body.to_string(),
            timestamp,
            seen: false,
            edited_at: None,
        };
        self.messages.push(message.clone());
        self.notify(to, from, "message", "New message");
        message
    }
}

fn new_request_id() -> RequestId {
    RequestId::from(format!("rq-{}", Uuid::new_v4().simple()))
}

impl MockGateway {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a backend with the given accounts.
    pub fn with_users(users: Vec<User>) -> Self {
        let gateway = Self::new();
        for user in users {
            gateway.add_user(user);
        }
        gateway
    }

    fn lock(&self) -> MutexGuard<'_, MockGatewayInner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Run one backend call: record it, apply any injected failure, let `f`
    /// act on the store, then wait out any hold before responding.
    async fn call<T>(
        &self,
        op: GatewayOp,
        f: impl FnOnce(&mut MockGatewayInner) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let (result, hold) = {
            let mut inner = self.lock();
            inner.calls.push(op);
            if let Some(err) = inner.failures.remove(&op) {
                return Err(err);
            }
            let hold = inner.holds.get_mut(&op).and_then(VecDeque::pop_front);
            (f(&mut *inner), hold)
        };

        if let Some((release, parked)) = hold {
            parked.notify_one();
            // A dropped hold releases too.
            let _ = release.await;
        }
        result
    }

    /// Register an account.
    pub fn add_user(&self, user: User) {
        self.lock().users.push(user);
    }

    /// Create a pending request with a generated id.
    pub fn seed_request(&self, from: &UserId, to: &UserId) -> RequestId {
        let id = new_request_id();
        self.seed_request_with_id(id.clone(), from, to);
        id
    }

    /// Create a pending request with a fixed id.
    pub fn seed_request_with_id(&self, id: impl Into<RequestId>, from: &UserId, to: &UserId) {
        self.lock()
            .insert_request(id.into(), from, to, RequestStatus::Pending);
    }

    /// Create an accepted edge between two users.
    pub fn befriend(&self, a: &UserId, b: &UserId) {
        self.lock()
            .insert_request(new_request_id(), a, b, RequestStatus::Accepted);
    }

    /// Write a message as if another session sent it.
    pub fn seed_message(&self, from: &UserId, to: &UserId, body: &str) -> MessageId {
        self.lock().insert_message(from, to, body).id
    }

    /// Create a notification.
    pub fn seed_notification(
        &self,
        recipient: &UserId,
        sender: &UserId,
        text: &str,
    ) -> NotificationId {
        self.lock().notify(recipient, sender, "message", text)
    }

    /// All stored messages between `a` and `b`, in write order.
    pub fn messages_between(&self, a: &UserId, b: &UserId) -> Vec<Message> {
        let key = ConversationKey::new(a, b);
        self.lock()
            .messages
            .iter()
            .filter(|m| m.conversation_key() == key)
            .cloned()
            .collect()
    }

    /// All stored requests, in creation order.
    pub fn requests(&self) -> Vec<FriendRequest> {
        self.lock().requests.clone()
    }

    /// Pending requests between `a` and `b`, either direction.
    pub fn pending_edges(&self, a: &UserId, b: &UserId) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|rq| rq.status == RequestStatus::Pending && rq.connects(a, b))
            .count()
    }

    /// All stored notifications for `user`.
    pub fn notifications_for(&self, user: &UserId) -> Vec<Notification> {
        self.lock()
            .notifications
            .iter()
            .filter(|n| n.recipient.id() == user)
            .cloned()
            .collect()
    }

    /// Cause the next call of `op` to fail with `error`.
    pub fn fail_next(&self, op: GatewayOp, error: GatewayError) {
        self.lock().failures.insert(op, error);
    }

    /// Hold the next call of `op` open until the returned handle is released.
    pub fn hold_next(&self, op: GatewayOp) -> CallHold {
        let (tx, rx) = oneshot::channel();
        let parked = Arc::new(Notify::new());
        self.lock()
            .holds
            .entry(op)
            .or_default()
            .push_back((rx, Arc::clone(&parked)));
        CallHold {
            release: tx,
            parked,
        }
    }

    /// Every call made so far, in order.
    pub fn calls(&self) -> Vec<GatewayOp> {
        self.lock().calls.clone()
    }

    /// How many times `op` was called.
    pub fn call_count(&self, op: GatewayOp) -> usize {
        self.lock().calls.iter().filter(|c| **c == op).count()
    }

    /// Forget the call log.
    pub fn reset_calls(&self) {
        self.lock().calls.clear();
    }
}

impl Clone for MockGateway {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

#[async_trait]
impl RemoteGateway for MockGateway {
    async fn list_users(&self, excluding: &UserId) -> Result<Vec<User>, GatewayError> {
        self.call(GatewayOp::ListUsers, |inner| {
            Ok(inner
                .users
                .iter()
                .filter(|u| &u.id != excluding)
                .cloned()
                .collect())
        })
        .await
    }

    async fn list_friends(&self, me: &UserId) -> Result<Vec<User>, GatewayError> {
        self.call(GatewayOp::ListFriends, |inner| {
            let others: Vec<UserId> = inner
                .requests
                .iter()
                .filter(|rq| rq.status == RequestStatus::Accepted)
                .filter_map(|rq| {
                    if rq.sender.id() == me {
                        Some(rq.receiver.id().clone())
                    } else if rq.receiver.id() == me {
                        Some(rq.sender.id().clone())
                    } else {
                        None
                    }
                })
                .collect();
            Ok(others.iter().map(|id| inner.user(id)).collect())
        })
        .await
    }

    async fn list_pending_requests(
        &self,
        me: &UserId,
        status: RequestStatus,
    ) -> Result<Vec<FriendRequest>, GatewayError> {
        self.call(GatewayOp::ListPendingRequests, |inner| {
            Ok(inner
                .requests
                .iter()
                .filter(|rq| rq.receiver.id() == me && rq.status == status)
                .cloned()
                .collect())
        })
        .await
    }

    async fn send_request(&self, body: &NewFriendRequest) -> Result<FriendRequest, GatewayError> {
        self.call(GatewayOp::SendRequest, |inner| {
            if body.sender_id == body.receiver_id {
                return Err(GatewayError::Rejected("cannot befriend yourself".into()));
            }
            if inner
                .requests
                .iter()
                .any(|rq| rq.connects(&body.sender_id, &body.receiver_id))
            {
                return Err(GatewayError::DuplicateRequest);
            }
            let request = inner.insert_request(
                new_request_id(),
                &body.sender_id,
                &body.receiver_id,
                RequestStatus::Pending,
            );
            inner.notify(
                &body.receiver_id,
                &body.sender_id,
                "friend_request",
                "New friend request",
            );
            Ok(request)
        })
        .await
    }

    async fn accept_request(&self, body: &AcceptRequest) -> Result<(), GatewayError> {
        self.call(GatewayOp::AcceptRequest, |inner| {
            let request = inner
                .requests
                .iter_mut()
                .find(|rq| rq.id == body.request_id)
                .ok_or_else(|| GatewayError::NotFound(format!("request {}", body.request_id)))?;
            if request.status == RequestStatus::Accepted {
                return Err(GatewayError::Rejected("request already accepted".into()));
            }
            request.status = RequestStatus::Accepted;
            let (sender, receiver) = (request.sender.id().clone(), request.receiver.id().clone());
            inner.notify(&sender, &receiver, "friend_accepted", "Friend request accepted");
            Ok(())
        })
        .await
    }

    async fn fetch_transcript(
        &self,
        me: &UserId,
        peer: &UserId,
    ) -> Result<Vec<Message>, GatewayError> {
        let key = ConversationKey::new(me, peer);
        self.call(GatewayOp::FetchTranscript, |inner| {
            Ok(inner
                .messages
                .iter()
                .filter(|m| m.conversation_key() == key)
                .cloned()
                .collect())
        })
        .await
    }

    async fn send_message(&self, body: &NewMessage) -> Result<Message, GatewayError> {
        self.call(GatewayOp::SendMessage, |inner| {
            if body.message.trim().is_empty() {
                return Err(GatewayError::Rejected("message is required".into()));
            }
            if body.sender_id == body.receiver_id {
                return Err(GatewayError::Rejected("cannot message yourself".into()));
            }
            Ok(inner.insert_message(&body.sender_id, &body.receiver_id, &body.message))
        })
        .await
    }

    async fn edit_message(
        &self,
        id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<Message, GatewayError> {
        self.call(GatewayOp::EditMessage, |inner| {
            let edited_at = inner.now();
            let message = inner
                .messages
                .iter_mut()
                .find(|m| &m.id == id)
                .ok_or_else(|| GatewayError::NotFound(format!("message {id}")))?;
            message.body = patch.message.clone();
            message.edited_at = Some(edited_at);
            Ok(message.clone())
        })
        .await
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError> {
        self.call(GatewayOp::DeleteMessage, |inner| {
            let before = inner.messages.len();
            inner.messages.retain(|m| &m.id != id);
            if inner.messages.len() == before {
                return Err(GatewayError::NotFound(format!("message {id}")));
            }
            Ok(())
        })
        .await
    }

    async fn mark_seen(&self, me: &UserId, body: &SeenRequest) -> Result<(), GatewayError> {
        self.call(GatewayOp::MarkSeen, |inner| {
            for message in inner.messages.iter_mut() {
                if message.sender_id() == &body.friend_id && message.receiver_id() == me {
                    message.seen = true;
                }
            }
            Ok(())
        })
        .await
    }

    async fn fetch_notifications(&self, me: &UserId) -> Result<Vec<Notification>, GatewayError> {
        self.call(GatewayOp::FetchNotifications, |inner| {
            Ok(inner
                .notifications
                .iter()
                .filter(|n| n.recipient.id() == me)
                .cloned()
                .collect())
        })
        .await
    }

    async fn mark_notifications_read(&self, body: &MarkRead) -> Result<(), GatewayError> {
        self.call(GatewayOp::MarkNotificationsRead, |inner| {
            for n in inner.notifications.iter_mut() {
                if body.ids.contains(&n.id) {
                    n.is_read = true;
                }
            }
            Ok(())
        })
        .await
    }
}
