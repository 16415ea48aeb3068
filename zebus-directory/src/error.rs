//! Directory Client Error Types

use thiserror::Error;
use zebus_core::ids::Endpoint;

/// Errors raised while registering with, or maintaining a replica of,
/// the peer directory.
#[derive(Error, Debug)]
pub enum DirectoryError {
    /// A single directory endpoint did not answer within its timeout.
    #[error("registration with {endpoint} timed out")]
    Timeout {
        /// The endpoint that timed out.
        endpoint: Endpoint,
    },

    /// Every configured directory endpoint was tried and none accepted
    /// the registration.
    #[error("registration exhausted all directory endpoints: {}", .endpoints.iter().map(std::string::ToString::to_string).collect::<Vec<_>>().join(", "))]
    RegistrationExhausted {
        /// Every endpoint attempted, in attempt order.
        endpoints: Vec<Endpoint>,
    },

    /// A directory endpoint reported the local peer is already
    /// registered.
    #[error("peer already exists on {endpoint}")]
    PeerAlreadyExists {
        /// The endpoint that rejected registration.
        endpoint: Endpoint,
    },

    /// A directory event arrived with a timestamp older than the
    /// entry's stored timestamp; dropped without changing state.
    #[error("outdated update for {peer_id} ignored (stale timestamp)")]
    OutdatedUpdate {
        /// The peer the stale update targeted.
        peer_id: String,
    },

    /// A directory event referenced a peer with no local entry.
    #[error("update for unknown peer {peer_id} ignored")]
    UnknownPeerUpdate {
        /// The peer the update targeted.
        peer_id: String,
    },
}

/// Result type alias for zebus-directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;

impl DirectoryError {
    /// Whether this error reflects normal, non-fatal recovery (the
    /// caller should keep trying the next directory peer, or simply
    /// drop a stale/unknown update) rather than a terminal failure.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        !matches!(self, Self::RegistrationExhausted { .. })
    }
}
