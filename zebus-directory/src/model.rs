//! Directory data model: `Peer`, `Subscription`, `PeerDescriptor`,
//! `MessageBinding`.

use zebus_core::binding::{BindingKey, RoutingKey};
use zebus_core::ids::{Endpoint, LogicalTimestamp, MessageTypeId, PeerId};

/// Live, mutable state of one known peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Stable identity.
    pub id: PeerId,
    /// Transport-level address.
    pub endpoint: Endpoint,
    /// Whether the peer process is currently up.
    pub is_up: bool,
    /// Whether the peer is currently responding to pings.
    pub is_responding: bool,
}

impl Peer {
    /// Build a freshly-started peer: up and responding.
    #[must_use]
    pub fn new(id: PeerId, endpoint: Endpoint) -> Self {
        Self {
            id,
            endpoint,
            is_up: true,
            is_responding: true,
        }
    }
}

/// One (`MessageTypeId`, `BindingKey`) pair a peer currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// The message type this subscription applies to.
    pub message_type_id: MessageTypeId,
    /// The binding key pattern within that message type.
    pub binding_key: BindingKey,
}

impl Subscription {
    /// Build a subscription from its two parts.
    #[must_use]
    pub fn new(message_type_id: MessageTypeId, binding_key: BindingKey) -> Self {
        Self {
            message_type_id,
            binding_key,
        }
    }
}

/// Immutable snapshot of a peer, as delivered in directory events and
/// registration responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerDescriptor {
    /// Live peer state at the time of the snapshot.
    pub peer: Peer,
    /// Whether this peer's registration survives directory restarts.
    pub is_persistent: bool,
    /// Logical timestamp this snapshot was produced at.
    pub timestamp: LogicalTimestamp,
    /// Every subscription this peer held at snapshot time.
    pub subscriptions: Vec<Subscription>,
    /// Whether a debugger was attached to the peer process.
    pub has_debugger_attached: bool,
}

/// A (`MessageTypeId`, `RoutingKey`) pair derived from an outbound
/// message's routable fields, used to query the subscription trees.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageBinding {
    /// The message type being routed.
    pub message_type_id: MessageTypeId,
    /// The concrete routing key derived from the message payload.
    pub routing_key: RoutingKey,
}

impl MessageBinding {
    /// Build a message binding from its two parts.
    #[must_use]
    pub fn new(message_type_id: MessageTypeId, routing_key: RoutingKey) -> Self {
        Self {
            message_type_id,
            routing_key,
        }
    }
}
