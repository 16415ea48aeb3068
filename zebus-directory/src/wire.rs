//! Directory wire commands and events (spec field order fixed for
//! compatibility). The wire transport and codec are external
//! collaborators; these are plain data carried over whatever
//! `DirectorySender` implementation a deployment wires in.

use zebus_core::ids::{Endpoint, LogicalTimestamp, MessageTypeId, PeerId};

use crate::model::{Peer, PeerDescriptor};

/// A partial subscription update for one message type, as carried by
/// `UpdatePeerSubscriptionsForTypesCommand`/`PeerSubscriptionsForTypesUpdated`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscriptionForType {
    /// Message type the binding keys below apply to.
    pub message_type_id: MessageTypeId,
    /// This peer's complete binding-key set for that type, replacing
    /// whatever it held before.
    pub binding_keys: Vec<zebus_core::binding::BindingKey>,
}

/// Sent by a peer to register itself with a directory endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterPeerCommand {
    /// Snapshot of the registering peer.
    pub self_descriptor: PeerDescriptor,
}

/// A directory endpoint's rejection reason for `RegisterPeerCommand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterPeerError {
    /// The peer is already registered with this directory.
    PeerAlreadyExists,
}

/// Response to `RegisterPeerCommand`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegisterPeerResponse {
    /// The directory's current global peer snapshot. Absent (`None`) on
    /// failure.
    pub peer_descriptors: Option<Vec<PeerDescriptor>>,
    /// Set when registration was rejected.
    pub error: Option<RegisterPeerError>,
}

/// Sent to refresh a subset of the local peer's subscriptions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdatePeerSubscriptionsForTypesCommand {
    /// The peer whose subscriptions are being updated (always self).
    pub peer_id: PeerId,
    /// Freshly minted logical timestamp for this update.
    pub timestamp: LogicalTimestamp,
    /// Per-type replacement slices.
    pub subscriptions_for_type: Vec<SubscriptionForType>,
}

/// Sent on graceful shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnregisterPeerCommand {
    /// Live state of the unregistering peer.
    pub peer: Peer,
    /// Freshly minted logical timestamp for this update.
    pub timestamp: LogicalTimestamp,
}

/// Directory maintenance events, streamed to every registered peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryEvent {
    /// A peer (re)started; carries its full descriptor.
    PeerStarted(PeerDescriptor),
    /// A peer stopped gracefully. `timestamp` is absent for legacy
    /// senders; when absent the event is applied unconditionally.
    PeerStopped {
        /// The peer that stopped.
        peer_id: PeerId,
        /// Its last-known endpoint.
        endpoint: Endpoint,
        /// Logical timestamp of the stop, if the sender provided one.
        timestamp: Option<LogicalTimestamp>,
    },
    /// A peer was permanently removed from the directory.
    PeerDecommissioned {
        /// The peer removed.
        peer_id: PeerId,
    },
    /// A peer replaced its entire subscription set.
    PeerSubscriptionsUpdated(PeerDescriptor),
    /// A peer replaced a subset of its subscriptions.
    PeerSubscriptionsForTypesUpdated {
        /// The peer updated.
        peer_id: PeerId,
        /// Per-type replacement slices.
        subscriptions_for_type: Vec<SubscriptionForType>,
        /// Logical timestamp of this update.
        timestamp: LogicalTimestamp,
    },
    /// A peer stopped responding to pings.
    PeerNotResponding {
        /// The peer that stopped responding.
        peer_id: PeerId,
    },
    /// A peer resumed responding to pings.
    PeerResponding {
        /// The peer that resumed responding.
        peer_id: PeerId,
    },
    /// Directory-issued liveness probe; carries no state mutation.
    PingPeerCommand,
}
