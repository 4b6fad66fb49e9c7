//! Identity types for chatsync.
//!
//! Every id is assigned by the backend and treated as opaque. Ids are
//! ordered so they can break ties between messages sharing a timestamp.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::InvalidId;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an id, rejecting empty or whitespace-only input.
            pub fn parse(raw: &str) -> Result<Self, InvalidId> {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(InvalidId {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_string()))
            }

            /// Get the id as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Check whether the id carries no content.
            ///
            /// Only possible for ids deserialized from a misbehaving backend.
            pub fn is_blank(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_string())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }
    };
}

string_id!(
    /// A user account on the backend.
    UserId
);

string_id!(
    /// A friend request record.
    RequestId
);

string_id!(
    /// A chat message.
    MessageId
);

string_id!(
    /// A notification record.
    NotificationId
);
