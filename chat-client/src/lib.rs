//! # chat-client
//!
//! Client-side sync engine for chatsync.
//!
//! Keeps a user's social graph, the open conversation and their
//! notifications consistent with a remote backend, combining on-demand pulls
//! with push-triggered refreshes.
//!
//! ## Features
//!
//! - **Confirm-then-refetch**: every mutation is confirmed remotely, then the
//!   affected collection is replaced wholesale
//! - **Stale-result suppression**: fetches are ticketed, so a late result for
//!   a conversation the user already left is discarded
//! - **Gateway Abstraction**: pluggable backend access (HTTP, mock)
//! - **Pure State Logic**: uses chat-core for side-effect-free containers
//!
//! ## Example
//!
//! ```ignore
//! use chatsync_client::{ChatClient, ClientConfig, FileSessionStore, HttpGateway};
//!
//! let config = ClientConfig::from_file(Path::new("chatsync.toml"))?;
//! chatsync_client::logging::init(&config.logging.filter);
//!
//! let gateway = Arc::new(HttpGateway::from_config(&config.gateway)?);
//! let store = Arc::new(FileSessionStore::from_config(&config.session));
//! let client = ChatClient::start(&config, store, gateway, channel).await?;
//!
//! client.social().send_request(&"u2".into()).await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod logging;
pub mod messaging;
pub mod notifications;
pub mod realtime;
pub mod session;
pub mod social;

pub use channel::{ChannelError, MockChannel, RealtimeChannel, Subscription};
pub use client::ChatClient;
pub use config::{ClientConfig, ConfigError, GatewayConfig, LoggingConfig, SessionConfig, SyncConfig};
pub use error::{ClientError, ValidationError};
pub use gateway::{
    CallHold, GatewayError, GatewayOp, HttpGateway, MockGateway, RemoteGateway,
};
pub use messaging::MessagingSync;
pub use notifications::NotificationCenter;
pub use realtime::PushRouter;
pub use session::{
    CachedProfile, FileSessionStore, MemorySessionStore, SessionContext, SessionError,
    SessionState, SessionStore,
};
pub use social::SocialGraphSync;
