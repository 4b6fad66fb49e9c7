//! Error types for chatsync-types.

use thiserror::Error;

/// An id string that cannot identify anything.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: empty")]
pub struct InvalidId {
    /// Which id type rejected the input.
    pub kind: &'static str,
}
