//! Peer Entry — authoritative in-memory record of one known peer,
//! owning the mutation of the shared subscription trees when its own
//! subscriptions change.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use zebus_core::binding::BindingKey;
use zebus_core::ids::{LogicalTimestamp, MessageTypeId, PeerId};

use crate::model::{Peer, PeerDescriptor, Subscription};
use crate::subscription_tree::SubscriptionTree;

/// Shared subscription-tree map, one tree per message type. Held by
/// reference by every `PeerEntry` so diff-application can mutate the
/// index without the entry owning it (per Design Notes: pass the index
/// by shared handle, not ownership).
pub type SharedSubscriptionTrees = Arc<DashMap<MessageTypeId, SubscriptionTree>>;

/// Authoritative, mutable record of one known peer.
pub struct PeerEntry {
    peer: Peer,
    is_persistent: bool,
    timestamp: LogicalTimestamp,
    /// This peer's own current bindings, factored per message type, so
    /// a later diff only needs to compare against what this peer itself
    /// holds.
    bindings: HashMap<MessageTypeId, Vec<BindingKey>>,
    trees: SharedSubscriptionTrees,
}

impl PeerEntry {
    /// Create an entry for a newly-seen peer with no subscriptions yet.
    #[must_use]
    pub fn new(peer: Peer, is_persistent: bool, timestamp: LogicalTimestamp, trees: SharedSubscriptionTrees) -> Self {
        Self {
            peer,
            is_persistent,
            timestamp,
            bindings: HashMap::new(),
            trees,
        }
    }

    /// The peer identity this entry tracks.
    #[must_use]
    pub fn peer_id(&self) -> &PeerId {
        &self.peer.id
    }

    /// Read-only view of the live peer state.
    #[must_use]
    pub fn peer(&self) -> &Peer {
        &self.peer
    }

    /// Last-applied timestamp across both full and partial subscription
    /// updates (the gating source spec §4.F describes as shared between
    /// `SetSubscriptions` and `SetSubscriptionsForType`).
    #[must_use]
    pub const fn timestamp(&self) -> LogicalTimestamp {
        self.timestamp
    }

    /// Refresh the live peer state (identity, endpoint, up/responding
    /// flags) and persistence flag from a fresh descriptor, e.g. on
    /// `PeerStarted` for a peer that was previously known — including one
    /// marked down by a prior `PeerStopped` (spec §4.G: "`PeerStarted`:
    /// add-or-update", a restarted peer must come back up).
    pub fn update_peer(&mut self, peer: Peer, is_persistent: bool) {
        self.peer = peer;
        self.is_persistent = is_persistent;
    }

    /// Mark the peer down, bumping the timestamp if newer.
    pub fn mark_stopped(&mut self, timestamp: LogicalTimestamp) -> bool {
        if timestamp < self.timestamp {
            return false;
        }
        self.peer.is_up = false;
        self.peer.is_responding = false;
        self.timestamp = timestamp;
        true
    }

    /// Flip responsiveness; not timestamp-gated (pings are independent
    /// of subscription state per spec §4.G).
    pub fn set_responding(&mut self, responding: bool) {
        self.peer.is_responding = responding;
    }

    /// Replace the entire subscription set if `timestamp` is at least
    /// the entry's last-applied timestamp; diffs against the previous
    /// set and applies only the delta to the shared trees. Returns
    /// `false` (no-op) if the update was out of order.
    pub fn set_subscriptions(&mut self, subscriptions: Vec<Subscription>, timestamp: LogicalTimestamp) -> bool {
        if timestamp < self.timestamp {
            return false;
        }

        let mut grouped: HashMap<MessageTypeId, Vec<BindingKey>> = HashMap::new();
        for sub in subscriptions {
            grouped.entry(sub.message_type_id).or_default().push(sub.binding_key);
        }

        let previous_types: Vec<MessageTypeId> = self.bindings.keys().cloned().collect();
        for message_type_id in previous_types {
            if !grouped.contains_key(&message_type_id) {
                self.apply_slice(message_type_id, Vec::new());
            }
        }
        for (message_type_id, keys) in grouped {
            self.apply_slice(message_type_id, keys);
        }

        self.timestamp = timestamp;
        true
    }

    /// Partial update: for each `(MessageTypeId, Vec<BindingKey>)` pair,
    /// replace that type's slice only, leaving other types untouched.
    /// Gated by the same timestamp as `set_subscriptions`.
    pub fn set_subscriptions_for_type(
        &mut self,
        updates: Vec<(MessageTypeId, Vec<BindingKey>)>,
        timestamp: LogicalTimestamp,
    ) -> bool {
        if timestamp < self.timestamp {
            return false;
        }
        for (message_type_id, keys) in updates {
            self.apply_slice(message_type_id, keys);
        }
        self.timestamp = timestamp;
        true
    }

    /// Remove every binding this peer holds, across every message type.
    /// Used on decommission.
    pub fn remove_subscriptions(&mut self) {
        let types: Vec<MessageTypeId> = self.bindings.keys().cloned().collect();
        for message_type_id in types {
            self.apply_slice(message_type_id, Vec::new());
        }
    }

    /// Diff `new_keys` against what this peer currently holds for
    /// `message_type_id` and apply the delta to the shared tree,
    /// dropping the tree entry if now empty and clearing the peer's own
    /// slice if `new_keys` is empty.
    fn apply_slice(&mut self, message_type_id: MessageTypeId, new_keys: Vec<BindingKey>) {
        let previous = self.bindings.get(&message_type_id).cloned().unwrap_or_default();

        let added: Vec<&BindingKey> = new_keys.iter().filter(|k| !previous.contains(k)).collect();
        let removed: Vec<&BindingKey> = previous.iter().filter(|k| !new_keys.contains(k)).collect();

        if !added.is_empty() || !removed.is_empty() {
            let mut tree = self.trees.entry(message_type_id.clone()).or_default();
            for key in removed {
                tree.remove(&self.peer.id, key);
            }
            for key in added {
                tree.add(self.peer.id.clone(), key.clone());
            }
        }

        if new_keys.is_empty() {
            self.bindings.remove(&message_type_id);
        } else {
            self.bindings.insert(message_type_id, new_keys);
        }
    }

    /// Immutable snapshot of this entry's current state.
    #[must_use]
    pub fn to_peer_descriptor(&self) -> PeerDescriptor {
        let mut subscriptions = Vec::new();
        for (message_type_id, keys) in &self.bindings {
            for key in keys {
                subscriptions.push(Subscription::new(message_type_id.clone(), key.clone()));
            }
        }
        PeerDescriptor {
            peer: self.peer.clone(),
            is_persistent: self.is_persistent,
            timestamp: self.timestamp,
            subscriptions,
            has_debugger_attached: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zebus_core::ids::Endpoint;

    fn trees() -> SharedSubscriptionTrees {
        Arc::new(DashMap::new())
    }

    fn entry(trees: SharedSubscriptionTrees) -> PeerEntry {
        PeerEntry::new(
            Peer::new(PeerId::new("p1"), Endpoint::new("tcp://127.0.0.1:1")),
            false,
            LogicalTimestamp::from_raw(10),
            trees,
        )
    }

    #[test]
    fn set_subscriptions_diffs_and_updates_shared_tree() {
        let trees = trees();
        let mut e = entry(trees.clone());
        e.set_subscriptions(
            vec![Subscription::new(MessageTypeId::new("T"), BindingKey::parse("a"))],
            LogicalTimestamp::from_raw(11),
        );
        assert_eq!(trees.get(&MessageTypeId::new("T")).unwrap().get_peers(&zebus_core::binding::RoutingKey::parse("a")), vec![PeerId::new("p1")]);

        e.set_subscriptions(Vec::new(), LogicalTimestamp::from_raw(12));
        assert!(trees.get(&MessageTypeId::new("T")).unwrap().is_empty());
    }

    #[test]
    fn out_of_order_update_is_rejected() {
        let trees = trees();
        let mut e = entry(trees.clone());
        assert!(e.set_subscriptions(
            vec![Subscription::new(MessageTypeId::new("T"), BindingKey::parse("a"))],
            LogicalTimestamp::from_raw(20),
        ));
        assert!(!e.set_subscriptions(
            vec![Subscription::new(MessageTypeId::new("T"), BindingKey::parse("b"))],
            LogicalTimestamp::from_raw(5),
        ));
        assert_eq!(e.timestamp(), LogicalTimestamp::from_raw(20));
        assert_eq!(
            trees.get(&MessageTypeId::new("T")).unwrap().get_peers(&zebus_core::binding::RoutingKey::parse("a")),
            vec![PeerId::new("p1")]
        );
    }

    #[test]
    fn set_subscriptions_for_type_is_partial() {
        let trees = trees();
        let mut e = entry(trees.clone());
        e.set_subscriptions(
            vec![
                Subscription::new(MessageTypeId::new("T1"), BindingKey::parse("a")),
                Subscription::new(MessageTypeId::new("T2"), BindingKey::parse("b")),
            ],
            LogicalTimestamp::from_raw(11),
        );
        e.set_subscriptions_for_type(
            vec![(MessageTypeId::new("T1"), vec![BindingKey::parse("c")])],
            LogicalTimestamp::from_raw(12),
        );
        assert_eq!(
            trees.get(&MessageTypeId::new("T1")).unwrap().get_peers(&zebus_core::binding::RoutingKey::parse("c")),
            vec![PeerId::new("p1")]
        );
        assert_eq!(
            trees.get(&MessageTypeId::new("T2")).unwrap().get_peers(&zebus_core::binding::RoutingKey::parse("b")),
            vec![PeerId::new("p1")]
        );
    }

    #[test]
    fn remove_subscriptions_clears_every_type() {
        let trees = trees();
        let mut e = entry(trees.clone());
        e.set_subscriptions(
            vec![Subscription::new(MessageTypeId::new("T"), BindingKey::parse("a"))],
            LogicalTimestamp::from_raw(11),
        );
        e.remove_subscriptions();
        assert!(trees.get(&MessageTypeId::new("T")).unwrap().is_empty());
        let descriptor = e.to_peer_descriptor();
        assert!(descriptor.subscriptions.is_empty());
    }
}
