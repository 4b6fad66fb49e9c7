//! Users, friends and pending friend requests.
//!
//! Every list is pulled from the gateway and replaced wholesale. Mutations
//! (send, accept) are confirmed remotely first and then refetched; the
//! graph is never edited locally.

use std::sync::Arc;

use chat_core::{RefreshGate, SocialGraph};
use chat_types::{
    AcceptRequest, FriendRequest, NewFriendRequest, RequestId, RequestStatus, User, UserId,
};
use tokio::sync::Mutex;

use crate::error::{ClientError, ValidationError};
use crate::gateway::RemoteGateway;
use crate::session::SessionContext;

#[derive(Debug, Default)]
struct SocialState {
    graph: SocialGraph,
    users_gate: RefreshGate,
    friends_gate: RefreshGate,
    pending_gate: RefreshGate,
}

/// Keeps the social graph in step with the backend.
pub struct SocialGraphSync<G: RemoteGateway + ?Sized> {
    gateway: Arc<G>,
    session: Arc<SessionContext>,
    state: Arc<Mutex<SocialState>>,
}

impl<G: RemoteGateway + ?Sized> Clone for SocialGraphSync<G> {
    fn clone(&self) -> Self {
        Self {
            gateway: Arc::clone(&self.gateway),
            session: Arc::clone(&self.session),
            state: Arc::clone(&self.state),
        }
    }
}

impl<G: RemoteGateway + ?Sized> SocialGraphSync<G> {
    /// Create with an empty graph.
    pub fn new(gateway: Arc<G>, session: Arc<SessionContext>) -> Self {
        Self {
            gateway,
            session,
            state: Arc::new(Mutex::new(SocialState::default())),
        }
    }

    /// Pull every other user. Last fetch wins.
    pub async fn list_all_users(&self) -> Result<Vec<User>, ClientError> {
        let me = self.session.user_id();
        let ticket = self.state.lock().await.users_gate.issue(());
        let users = self.gateway.list_users(me).await?;

        let mut state = self.state.lock().await;
        if state.users_gate.admit(&ticket, Some(&())).is_apply() {
            state.graph.replace_users(me, users);
        } else {
            tracing::debug!(seq = ticket.seq(), "discarding superseded user listing");
        }
        Ok(state.graph.users().to_vec())
    }

    /// Pull the users with an accepted edge to me.
    pub async fn list_friends(&self) -> Result<Vec<User>, ClientError> {
        let ticket = self.state.lock().await.friends_gate.issue(());
        let friends = self.gateway.list_friends(self.session.user_id()).await?;

        let mut state = self.state.lock().await;
        if state.friends_gate.admit(&ticket, Some(&())).is_apply() {
            state.graph.replace_friends(friends);
        } else {
            tracing::debug!(seq = ticket.seq(), "discarding superseded friend listing");
        }
        Ok(state.graph.friends().to_vec())
    }

    /// Pull incoming pending requests, in server order.
    pub async fn list_pending_requests(&self) -> Result<Vec<FriendRequest>, ClientError> {
        let ticket = self.state.lock().await.pending_gate.issue(());
        let requests = self
            .gateway
            .list_pending_requests(self.session.user_id(), RequestStatus::Pending)
            .await?;

        let mut state = self.state.lock().await;
        if state.pending_gate.admit(&ticket, Some(&())).is_apply() {
            state.graph.replace_pending(requests);
        } else {
            tracing::debug!(seq = ticket.seq(), "discarding superseded request listing");
        }
        Ok(state.graph.pending().to_vec())
    }

    /// Pull all three lists concurrently.
    ///
    /// Every list is attempted; the first failure is returned.
    pub async fn refresh_all(&self) -> Result<(), ClientError> {
        let (users, friends, pending) = tokio::join!(
            self.list_all_users(),
            self.list_friends(),
            self.list_pending_requests()
        );
        users?;
        friends?;
        pending?;
        Ok(())
    }

    /// Send a friend request to `receiver`.
    ///
    /// Fails with [`ClientError::DuplicateRequest`] if the backend already
    /// has an edge for the pair. On success the pending and user lists are
    /// refetched; a failed refetch is logged, not returned.
    pub async fn send_request(&self, receiver: &UserId) -> Result<FriendRequest, ClientError> {
        let me = self.session.user_id();
        if receiver.is_blank() {
            return Err(ValidationError::MissingId("receiver id").into());
        }
        if receiver == me {
            return Err(ValidationError::SelfTarget.into());
        }

        let request = self
            .gateway
            .send_request(&NewFriendRequest {
                sender_id: me.clone(),
                receiver_id: receiver.clone(),
            })
            .await?;
        tracing::info!(request = %request.id, to = %receiver, "friend request sent");

        let (pending, users) = tokio::join!(self.list_pending_requests(), self.list_all_users());
        if let Err(e) = pending.and(users) {
            tracing::warn!("Refresh after friend request failed: {}", e);
        }
        Ok(request)
    }

    /// Accept the pending request `id`.
    ///
    /// On failure nothing changes locally and the request stays pending.
    /// On success the friend and pending lists are refetched.
    pub async fn accept_request(&self, id: &RequestId) -> Result<(), ClientError> {
        if id.is_blank() {
            return Err(ValidationError::MissingId("request id").into());
        }

        self.gateway
            .accept_request(&AcceptRequest {
                request_id: id.clone(),
            })
            .await?;
        tracing::info!(request = %id, "friend request accepted");

        let (friends, pending) = tokio::join!(self.list_friends(), self.list_pending_requests());
        if let Err(e) = friends.and(pending) {
            tracing::warn!("Refresh after accepting request failed: {}", e);
        }
        Ok(())
    }

    /// Users as last fetched.
    pub async fn users(&self) -> Vec<User> {
        self.state.lock().await.graph.users().to_vec()
    }

    /// Friends as last fetched.
    pub async fn friends(&self) -> Vec<User> {
        self.state.lock().await.graph.friends().to_vec()
    }

    /// Pending requests as last fetched.
    pub async fn pending(&self) -> Vec<FriendRequest> {
        self.state.lock().await.graph.pending().to_vec()
    }

    /// Whether `user` was a friend as of the last fetch.
    pub async fn is_friend(&self, user: &UserId) -> bool {
        self.state.lock().await.graph.is_friend(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{GatewayError, GatewayOp, MockGateway};
    use crate::session::{MemorySessionStore, SessionState};

    fn uid(s: &str) -> UserId {
        UserId::from(s)
    }

    async fn setup() -> (Arc<MockGateway>, SocialGraphSync<MockGateway>) {
        let gateway = Arc::new(MockGateway::with_users(vec![
            User::new("u1", "Ann", "a@x.io"),
            User::new("u2", "Bo", "b@x.io"),
            User::new("u3", "Cara", "c@x.io"),
        ]));
        let store = Arc::new(MemorySessionStore::new(SessionState::signed_in("u1")));
        let session = Arc::new(SessionContext::load(store).await.unwrap());
        let social = SocialGraphSync::new(Arc::clone(&gateway), session);
        (gateway, social)
    }

    // ===========================================
    // Listing Tests
    // ===========================================

    #[tokio::test]
    async fn all_users_excludes_self() {
        let (_gw, social) = setup().await;
        let users = social.list_all_users().await.unwrap();
        let ids: Vec<&str> = users.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec!["u2", "u3"]);
    }

    #[tokio::test]
    async fn failed_listing_keeps_previous_snapshot() {
        let (gw, social) = setup().await;
        gw.befriend(&uid("u1"), &uid("u2"));
        social.list_friends().await.unwrap();

        gw.fail_next(GatewayOp::ListFriends, GatewayError::Network("down".into()));
        assert!(social.list_friends().await.is_err());
        assert_eq!(social.friends().await.len(), 1);
    }

    #[tokio::test]
    async fn refresh_all_fills_every_list() {
        let (gw, social) = setup().await;
        gw.befriend(&uid("u2"), &uid("u1"));
        gw.seed_request(&uid("u3"), &uid("u1"));

        social.refresh_all().await.unwrap();

        assert_eq!(social.users().await.len(), 2);
        assert!(social.is_friend(&uid("u2")).await);
        assert_eq!(social.pending().await.len(), 1);
    }

    // ===========================================
    // Send Request Tests
    // ===========================================

    #[tokio::test]
    async fn send_request_refetches_instead_of_inserting() {
        let (gw, social) = setup().await;
        social.send_request(&uid("u2")).await.unwrap();

        assert_eq!(gw.call_count(GatewayOp::ListPendingRequests), 1);
        assert_eq!(gw.call_count(GatewayOp::ListUsers), 1);
        // Outgoing requests are not part of my incoming pending list.
        assert!(social.pending().await.is_empty());
    }

    #[tokio::test]
    async fn duplicate_request_is_surfaced() {
        let (gw, social) = setup().await;
        social.send_request(&uid("u2")).await.unwrap();
        let err = social.send_request(&uid("u2")).await.unwrap_err();
        assert!(matches!(err, ClientError::DuplicateRequest));
        assert_eq!(gw.pending_edges(&uid("u1"), &uid("u2")), 1);
    }

    #[tokio::test]
    async fn invalid_targets_never_reach_gateway() {
        let (gw, social) = setup().await;
        assert!(social.send_request(&uid("u1")).await.unwrap_err().is_validation());
        assert!(social.send_request(&uid(" ")).await.unwrap_err().is_validation());
        assert!(gw.calls().is_empty());
    }

    // ===========================================
    // Accept Request Tests
    // ===========================================

    #[tokio::test]
    async fn accept_refreshes_friends_and_pending() {
        let (gw, social) = setup().await;
        gw.seed_request_with_id("rq1", &uid("u3"), &uid("u1"));
        social.list_pending_requests().await.unwrap();

        social.accept_request(&RequestId::from("rq1")).await.unwrap();

        assert!(social.is_friend(&uid("u3")).await);
        assert!(social.pending().await.is_empty());
    }

    #[tokio::test]
    async fn failed_accept_changes_nothing() {
        let (gw, social) = setup().await;
        gw.seed_request_with_id("rq1", &uid("u3"), &uid("u1"));
        social.list_pending_requests().await.unwrap();
        gw.reset_calls();
        gw.fail_next(
            GatewayOp::AcceptRequest,
            GatewayError::Server("500: boom".into()),
        );

        let err = social.accept_request(&RequestId::from("rq1")).await.unwrap_err();

        assert!(err.is_network());
        assert_eq!(social.pending().await.len(), 1);
        assert!(social.friends().await.is_empty());
        assert_eq!(gw.calls(), vec![GatewayOp::AcceptRequest]);
    }
}
