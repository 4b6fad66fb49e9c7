//! # chat-core
//!
//! Pure state logic for chatsync (no I/O, instant tests).
//!
//! This crate implements the state containers and reconciliation rules of
//! the sync engine without any network or disk I/O.
//!
//! ## Design Philosophy
//!
//! Every collection here is replaced wholesale by a fetch. The only local
//! mutations are the ones the client confirms itself (edit, delete, seen,
//! read), and every fetch result passes a [`RefreshGate`] before it is
//! applied, so a late result for a superseded selection is discarded.
//!
//! The actual I/O (gateway calls, push subscriptions) is performed by
//! `chat-client`, which drives these containers.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod notifications;
pub mod ticket;
pub mod transcript;

pub use graph::SocialGraph;
pub use notifications::{NotificationList, ReadBatch};
pub use ticket::{Admission, RefreshGate, Ticket};
pub use transcript::{ReplaceSummary, Transcript};
