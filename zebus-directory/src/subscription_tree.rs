//! Subscription Tree — per-message-type index of binding-key patterns
//! to subscribed peers.
//!
//! Generalizes the byte-prefix sorted-vec design of this codebase's
//! PUB/SUB subscription index to tokenized binding keys with `*`/`#`
//! wildcard matching: entries are kept in an unordered vec (lexical
//! prefix ordering does not help once tokens can be wildcards), each
//! holding the small peer set currently bound to that exact key.

use smallvec::SmallVec;
use zebus_core::binding::{BindingKey, RoutingKey};
use zebus_core::ids::PeerId;

#[derive(Debug, Clone)]
struct Entry {
    binding_key: BindingKey,
    peers: SmallVec<[PeerId; 4]>,
}

/// Maps binding-key patterns to the peers currently subscribed under
/// them, for one message type.
#[derive(Debug, Default)]
pub struct SubscriptionTree {
    entries: Vec<Entry>,
}

impl SubscriptionTree {
    /// An empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether this tree holds no bindings at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Bind `peer` to `binding_key`. Idempotent.
    pub fn add(&mut self, peer: PeerId, binding_key: BindingKey) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.binding_key == binding_key) {
            if !entry.peers.contains(&peer) {
                entry.peers.push(peer);
            }
            return;
        }
        let mut peers = SmallVec::new();
        peers.push(peer);
        self.entries.push(Entry { binding_key, peers });
    }

    /// Unbind `peer` from `binding_key`. Idempotent; the entry is
    /// dropped entirely once it has no remaining peers.
    pub fn remove(&mut self, peer: &PeerId, binding_key: &BindingKey) {
        let Some(index) = self.entries.iter().position(|e| &e.binding_key == binding_key) else {
            return;
        };
        let entry = &mut self.entries[index];
        if let Some(pos) = entry.peers.iter().position(|p| p == peer) {
            entry.peers.swap_remove(pos);
        }
        if entry.peers.is_empty() {
            self.entries.swap_remove(index);
        }
    }

    /// Every peer with a binding matching `routing_key`, deduplicated,
    /// in no particular but call-stable order.
    #[must_use]
    pub fn get_peers(&self, routing_key: &RoutingKey) -> Vec<PeerId> {
        let mut out: Vec<PeerId> = Vec::new();
        for entry in &self.entries {
            if entry.binding_key.matches(routing_key) {
                for peer in &entry.peers {
                    if !out.contains(peer) {
                        out.push(peer.clone());
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_then_get_peers_matches_literal_key() {
        let mut tree = SubscriptionTree::new();
        tree.add(PeerId::new("p1"), BindingKey::parse("x.y"));
        let peers = tree.get_peers(&RoutingKey::parse("x.y"));
        assert_eq!(peers, vec![PeerId::new("p1")]);
    }

    #[test]
    fn remove_drops_entry_when_last_peer_leaves() {
        let mut tree = SubscriptionTree::new();
        tree.add(PeerId::new("p1"), BindingKey::parse("x.y"));
        tree.remove(&PeerId::new("p1"), &BindingKey::parse("x.y"));
        assert!(tree.is_empty());
        assert!(tree.get_peers(&RoutingKey::parse("x.y")).is_empty());
    }

    #[test]
    fn same_peer_on_overlapping_bindings_is_deduped() {
        let mut tree = SubscriptionTree::new();
        tree.add(PeerId::new("p1"), BindingKey::parse("x.*"));
        tree.add(PeerId::new("p1"), BindingKey::parse("x.#"));
        let peers = tree.get_peers(&RoutingKey::parse("x.y"));
        assert_eq!(peers, vec![PeerId::new("p1")]);
    }

    #[test]
    fn scenario_routing_key_match_from_spec() {
        let mut tree = SubscriptionTree::new();
        tree.add(PeerId::new("A"), BindingKey::parse("x.*"));
        tree.add(PeerId::new("B"), BindingKey::parse("x.#"));

        let mut xy = tree.get_peers(&RoutingKey::parse("x.y"));
        xy.sort();
        assert_eq!(xy, vec![PeerId::new("A"), PeerId::new("B")]);

        assert_eq!(
            tree.get_peers(&RoutingKey::parse("x.y.z")),
            vec![PeerId::new("B")]
        );

        assert!(tree.get_peers(&RoutingKey::parse("w")).is_empty());
    }
}
