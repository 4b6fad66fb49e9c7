//! REST implementation of [`RemoteGateway`].

use super::{GatewayError, RemoteGateway};
use crate::config::GatewayConfig;
use async_trait::async_trait;
use chat_types::{
    AcceptRequest, ErrorBody, FriendRequest, FriendsEnvelope, MarkRead, Message, MessageId,
    MessagePatch, NewFriendRequest, NewMessage, Notification, NotificationsEnvelope,
    RequestStatus, SeenRequest, User, UserId,
};
use reqwest::{Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

impl From<reqwest::Error> for GatewayError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            GatewayError::Decode(e.to_string())
        } else if e.is_builder() {
            GatewayError::Config(e.to_string())
        } else {
            // Connect, timeout and mid-body failures all leave the outcome unknown.
            GatewayError::Network(e.to_string())
        }
    }
}

/// Gateway backed by the chat backend's HTTP API.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
}

impl HttpGateway {
    /// Create a gateway rooted at `base_url` (e.g. `http://localhost:8001/api`).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let base = Url::parse(base_url)
            .map_err(|e| GatewayError::Config(format!("base url {base_url:?}: {e}")))?;
        if base.cannot_be_a_base() {
            return Err(GatewayError::Config(format!(
                "base url {base_url:?} cannot carry a path"
            )));
        }
        if timeout.is_zero() {
            return Err(GatewayError::Config("request timeout must be non-zero".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Config(e.to_string()))?;
        Ok(Self { http, base })
    }

    /// Create a gateway from the `[gateway]` config section.
    pub fn from_config(config: &GatewayConfig) -> Result<Self, GatewayError> {
        Self::new(&config.base_url, config.request_timeout())
    }

    /// The base URL every route is resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, GatewayError> {
        let url = self.url(segments);
        debug!(%url, "GET");
        let response = self.http.get(url).query(query).send().await?;
        decode(response).await
    }

    async fn post<B: serde::Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<T, GatewayError> {
        let url = self.url(segments);
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        decode(response).await
    }

    async fn post_unit<B: serde::Serialize + ?Sized>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<(), GatewayError> {
        let url = self.url(segments);
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        expect_success(response).await
    }
}

/// Decode a successful JSON body, or classify the failure.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
    let status = response.status();
    let body = response.bytes().await?;
    if !status.is_success() {
        return Err(classify(status, &body));
    }
    serde_json::from_slice(&body).map_err(|e| GatewayError::Decode(e.to_string()))
}

/// Accept any successful response, ignoring its body.
async fn expect_success(response: Response) -> Result<(), GatewayError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.bytes().await?;
    Err(classify(status, &body))
}

/// Map an error status and body onto a [`GatewayError`].
fn classify(status: StatusCode, body: &[u8]) -> GatewayError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string()
        });

    match status.as_u16() {
        401 | 403 => GatewayError::Unauthorized(message),
        404 => GatewayError::NotFound(message),
        400..=499 => GatewayError::Rejected(message),
        _ => GatewayError::Server(format!("{}: {message}", status.as_u16())),
    }
}

/// Friend request creation reports an existing edge as 409, or as a 400
/// whose message says the request already exists.
fn lift_duplicate(status: StatusCode, err: GatewayError) -> GatewayError {
    match (status, err) {
        (StatusCode::CONFLICT, _) => GatewayError::DuplicateRequest,
        (StatusCode::BAD_REQUEST, GatewayError::Rejected(message))
            if message.to_lowercase().contains("already") =>
        {
            GatewayError::DuplicateRequest
        }
        (_, err) => err,
    }
}

#[async_trait]
impl RemoteGateway for HttpGateway {
    async fn list_users(&self, excluding: &UserId) -> Result<Vec<User>, GatewayError> {
        self.get(&["friends", "allUser"], &[("userId", excluding.as_str())])
            .await
    }

    async fn list_friends(&self, me: &UserId) -> Result<Vec<User>, GatewayError> {
        let envelope: FriendsEnvelope = self
            .get(&["friends", "my-friends"], &[("userId", me.as_str())])
            .await?;
        Ok(envelope.friends)
    }

    async fn list_pending_requests(
        &self,
        me: &UserId,
        status: RequestStatus,
    ) -> Result<Vec<FriendRequest>, GatewayError> {
        self.get(
            &["friends", "friend-requests", me.as_str()],
            &[("status", status.as_str())],
        )
        .await
    }

    async fn send_request(&self, body: &NewFriendRequest) -> Result<FriendRequest, GatewayError> {
        let url = self.url(&["friends", "requestSent"]);
        debug!(%url, "POST");
        let response = self.http.post(url).json(body).send().await?;
        let status = response.status();
        decode(response)
            .await
            .map_err(|e| lift_duplicate(status, e))
    }

    async fn accept_request(&self, body: &AcceptRequest) -> Result<(), GatewayError> {
        self.post_unit(&["friends", "friends", "accept"], body).await
    }

    async fn fetch_transcript(
        &self,
        me: &UserId,
        peer: &UserId,
    ) -> Result<Vec<Message>, GatewayError> {
        self.get(
            &["chat", "chat", me.as_str()],
            &[("friendId", peer.as_str())],
        )
        .await
    }

    async fn send_message(&self, body: &NewMessage) -> Result<Message, GatewayError> {
        self.post(&["chat", "chat", "send"], body).await
    }

    async fn edit_message(
        &self,
        id: &MessageId,
        patch: &MessagePatch,
    ) -> Result<Message, GatewayError> {
        let url = self.url(&["chat", "chat", id.as_str()]);
        debug!(%url, "PUT");
        let response = self.http.put(url).json(patch).send().await?;
        decode(response).await
    }

    async fn delete_message(&self, id: &MessageId) -> Result<(), GatewayError> {
        let url = self.url(&["chat", "chat", id.as_str()]);
        debug!(%url, "DELETE");
        let response = self.http.delete(url).send().await?;
        expect_success(response).await
    }

    async fn mark_seen(&self, me: &UserId, body: &SeenRequest) -> Result<(), GatewayError> {
        self.post_unit(&["chat", "chat", "seen", me.as_str()], body)
            .await
    }

    async fn fetch_notifications(&self, me: &UserId) -> Result<Vec<Notification>, GatewayError> {
        let envelope: NotificationsEnvelope =
            self.get(&["notifications", me.as_str()], &[]).await?;
        Ok(envelope.notifications)
    }

    async fn mark_notifications_read(&self, body: &MarkRead) -> Result<(), GatewayError> {
        self.post_unit(&["notifications", "read"], body).await
    }
}
