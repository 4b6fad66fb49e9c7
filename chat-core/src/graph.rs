//! Client-visible social graph snapshots.
//!
//! Each of the three lists is an independent snapshot that is only ever
//! replaced wholesale by a fetch. Nothing here inserts an edge or a request
//! locally; the graph changes only when the backend says it did.

use std::collections::HashSet;

use chat_types::{FriendRequest, RequestStatus, User, UserId};

/// Users, friends and pending requests as last fetched.
#[derive(Debug, Clone, Default)]
pub struct SocialGraph {
    users: Vec<User>,
    friends: Vec<User>,
    pending: Vec<FriendRequest>,
}

impl SocialGraph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the directory listing, preserving server order.
    ///
    /// `me` is dropped if the backend included it anyway.
    pub fn replace_users(&mut self, me: &UserId, users: Vec<User>) {
        self.users = users.into_iter().filter(|u| &u.id != me).collect();
    }

    /// Replace the friend set. Repeated ids keep their first occurrence.
    pub fn replace_friends(&mut self, friends: Vec<User>) {
        let mut seen = HashSet::with_capacity(friends.len());
        self.friends = friends
            .into_iter()
            .filter(|u| seen.insert(u.id.clone()))
            .collect();
    }

    /// Replace the pending request list, preserving server order.
    ///
    /// Requests the backend reports as already accepted are dropped.
    pub fn replace_pending(&mut self, requests: Vec<FriendRequest>) {
        self.pending = requests
            .into_iter()
            .filter(|rq| rq.status == RequestStatus::Pending)
            .collect();
    }

    /// All other users.
    pub fn users(&self) -> &[User] {
        &self.users
    }

    /// Users with an accepted edge to me.
    pub fn friends(&self) -> &[User] {
        &self.friends
    }

    /// Incoming pending requests.
    pub fn pending(&self) -> &[FriendRequest] {
        &self.pending
    }

    /// Whether `user` is a friend.
    pub fn is_friend(&self, user: &UserId) -> bool {
        self.friends.iter().any(|u| &u.id == user)
    }
}
