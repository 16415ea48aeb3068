//! Directory Client — registers the local peer with a configured
//! directory endpoint, then streams directory events into local state.
//!
//! Grounded on the timeout-then-retry-next-endpoint shape of this
//! codebase's `ZapClient::authenticate`: try one endpoint under
//! `compio::time::timeout`, fall through to the next on timeout or
//! error, and only fail once every configured endpoint has been tried.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use rand::seq::SliceRandom;

use zebus_core::ids::{Endpoint, LogicalTimestamp, LogicalTimestampGenerator, PeerId};

use crate::error::{DirectoryError, Result};
use crate::model::{Peer, PeerDescriptor, Subscription};
use crate::peer_entry::PeerEntry;
use crate::subscription_tree::SubscriptionTree;
use crate::wire::{
    DirectoryEvent, RegisterPeerCommand, RegisterPeerResponse, UnregisterPeerCommand,
    UpdatePeerSubscriptionsForTypesCommand,
};

/// External collaborator sending directory commands over the wire
/// (spec §6's `IBus.Send`). The transport and codec are out of scope;
/// this trait is the seam a deployment plugs a real client into.
#[async_trait]
pub trait DirectorySender: Send + Sync {
    /// Send a registration request to one directory endpoint.
    async fn send_register(
        &self,
        endpoint: &Endpoint,
        command: RegisterPeerCommand,
    ) -> std::result::Result<RegisterPeerResponse, String>;

    /// Send a subscription update to one directory endpoint.
    async fn send_update_subscriptions(
        &self,
        endpoint: &Endpoint,
        command: UpdatePeerSubscriptionsForTypesCommand,
    ) -> std::result::Result<(), String>;

    /// Send an unregistration notice to one directory endpoint.
    async fn send_unregister(
        &self,
        endpoint: &Endpoint,
        command: UnregisterPeerCommand,
    ) -> std::result::Result<(), String>;
}

/// What kind of local-state change a directory event produced, emitted
/// to subscribers of [`DirectoryClient::updates`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerUpdateKind {
    /// A peer started (or re-started).
    Started,
    /// A peer stopped gracefully.
    Stopped,
    /// A peer was permanently removed.
    Decommissioned,
    /// A peer's subscriptions or responsiveness changed.
    Updated,
}

/// One emitted local-state change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerUpdated {
    /// The peer affected.
    pub peer_id: PeerId,
    /// What changed.
    pub kind: PeerUpdateKind,
}

/// Buffers directory events that arrive while a registration is in
/// flight, so they are applied only after the registration snapshot
/// has landed (spec §4.G Race Handling).
enum Inbox {
    Open(Vec<DirectoryEvent>),
    Closed,
}

/// Peer-side replica of the global directory.
pub struct DirectoryClient {
    self_id: PeerId,
    peers: DashMap<PeerId, PeerEntry>,
    trees: Arc<DashMap<zebus_core::ids::MessageTypeId, SubscriptionTree>>,
    timestamps: LogicalTimestampGenerator,
    inbox: RwLock<Inbox>,
    /// Directory endpoints captured at the end of a successful
    /// registration; `UnregisterPeerCommand` uses this list rather than
    /// a fresh configuration lookup.
    cached_directory_peers: RwLock<Vec<Endpoint>>,
    updates: (flume::Sender<PeerUpdated>, flume::Receiver<PeerUpdated>),
}

impl DirectoryClient {
    /// Build an empty client for the given self peer identity.
    #[must_use]
    pub fn new(self_id: PeerId) -> Self {
        Self {
            self_id,
            peers: DashMap::new(),
            trees: Arc::new(DashMap::new()),
            timestamps: LogicalTimestampGenerator::new(),
            inbox: RwLock::new(Inbox::Closed),
            cached_directory_peers: RwLock::new(Vec::new()),
            updates: flume::unbounded(),
        }
    }

    /// Identity of the local peer.
    #[must_use]
    pub fn self_id(&self) -> &PeerId {
        &self.self_id
    }

    /// A fresh receiver observing every [`PeerUpdated`] emitted from now
    /// on (the channel is multi-consumer: every call gets its own
    /// clone).
    #[must_use]
    pub fn updates(&self) -> flume::Receiver<PeerUpdated> {
        self.updates.1.clone()
    }

    fn emit(&self, peer_id: PeerId, kind: PeerUpdateKind) {
        let _ = self.updates.0.send(PeerUpdated { peer_id, kind });
    }

    /// Snapshot of one peer's descriptor, if known.
    #[must_use]
    pub fn get_peer_descriptor(&self, peer_id: &PeerId) -> Option<PeerDescriptor> {
        self.peers.get(peer_id).map(|e| e.to_peer_descriptor())
    }

    /// Every peer currently subscribed to a message matching `binding`.
    #[must_use]
    pub fn get_peers_handling_message(&self, binding: &crate::model::MessageBinding) -> Vec<PeerId> {
        self.trees
            .get(&binding.message_type_id)
            .map(|tree| tree.get_peers(&binding.routing_key))
            .unwrap_or_default()
    }

    /// Register the local peer with one of `directory_endpoints`, in
    /// order (optionally shuffled), retrying on timeout/failure.
    pub async fn register_async(
        &self,
        sender: &dyn DirectorySender,
        directory_endpoints: &[Endpoint],
        randomize: bool,
        registration_timeout: Duration,
        self_endpoint: Endpoint,
        self_subscriptions: Vec<Subscription>,
        is_persistent: bool,
    ) -> Result<()> {
        let timestamp = self.timestamps.next();
        self.add_or_update_self_entry(self_endpoint, is_persistent, timestamp, self_subscriptions);

        {
            let mut guard = self.inbox.write();
            if matches!(&*guard, Inbox::Closed) {
                *guard = Inbox::Open(Vec::new());
            }
        }

        let mut ordered: Vec<Endpoint> = directory_endpoints.to_vec();
        if randomize {
            ordered.shuffle(&mut rand::thread_rng());
        }

        let mut outcome = None;
        for endpoint in &ordered {
            let command = RegisterPeerCommand {
                self_descriptor: self
                    .get_peer_descriptor(&self.self_id)
                    .expect("self entry was just inserted"),
            };

            let attempt = compio::time::timeout(registration_timeout, sender.send_register(endpoint, command)).await;

            match attempt {
                Ok(Ok(response)) if response.error.is_none() && response.peer_descriptors.is_some() => {
                    for descriptor in response.peer_descriptors.unwrap() {
                        self.add_or_update_peer_entry(descriptor);
                    }
                    outcome = Some(Ok(()));
                    break;
                }
                Ok(Ok(response)) => {
                    tracing::debug!(endpoint = %endpoint, error = ?response.error, "registration rejected, trying next endpoint");
                }
                Ok(Err(error)) => {
                    tracing::debug!(endpoint = %endpoint, %error, "registration send failed, trying next endpoint");
                }
                Err(_) => {
                    tracing::debug!(endpoint = %endpoint, "registration timed out, trying next endpoint");
                }
            }
        }

        if outcome.is_some() {
            *self.cached_directory_peers.write() = ordered;
        }

        // Close and drain regardless of outcome: further events must be
        // applied in-line going forward either way.
        let buffered = {
            let mut guard = self.inbox.write();
            match std::mem::replace(&mut *guard, Inbox::Closed) {
                Inbox::Open(events) => events,
                Inbox::Closed => Vec::new(),
            }
        };
        for event in buffered {
            if let Err(error) = self.apply_event(event) {
                tracing::info!(%error, "buffered directory event dropped during registration drain");
            }
        }

        outcome.unwrap_or(Err(DirectoryError::RegistrationExhausted { endpoints: ordered }))
    }

    /// Push a fresh subscription snapshot for a subset of message
    /// types to the first directory endpoint that accepts it.
    pub async fn update_subscriptions_for_types(
        &self,
        sender: &dyn DirectorySender,
        registration_timeout: Duration,
        subscriptions_for_type: Vec<crate::wire::SubscriptionForType>,
    ) -> Result<()> {
        let timestamp = self.timestamps.next();
        let endpoints = self.cached_directory_peers.read().clone();

        for endpoint in &endpoints {
            let command = UpdatePeerSubscriptionsForTypesCommand {
                peer_id: self.self_id.clone(),
                timestamp,
                subscriptions_for_type: subscriptions_for_type.clone(),
            };
            match compio::time::timeout(registration_timeout, sender.send_update_subscriptions(endpoint, command)).await {
                Ok(Ok(())) => {
                    if let Some(mut entry) = self.peers.get_mut(&self.self_id) {
                        let updates = subscriptions_for_type
                            .iter()
                            .cloned()
                            .map(|s| (s.message_type_id, s.binding_keys))
                            .collect();
                        entry.set_subscriptions_for_type(updates, timestamp);
                    }
                    return Ok(());
                }
                Ok(Err(error)) => {
                    tracing::debug!(endpoint = %endpoint, %error, "subscription update failed, trying next endpoint");
                }
                Err(_) => {
                    tracing::debug!(endpoint = %endpoint, "subscription update timed out, trying next endpoint");
                }
            }
        }

        Err(DirectoryError::RegistrationExhausted { endpoints })
    }

    /// Notify directory endpoints that the local peer is shutting down,
    /// using the endpoint list cached at registration time.
    pub async fn unregister_async(&self, sender: &dyn DirectorySender, registration_timeout: Duration) -> Result<()> {
        let timestamp = self.timestamps.next();
        let Some(peer) = self.peers.get(&self.self_id).map(|e| e.peer().clone()) else {
            return Ok(());
        };
        let endpoints = self.cached_directory_peers.read().clone();

        for endpoint in &endpoints {
            let command = UnregisterPeerCommand {
                peer: peer.clone(),
                timestamp,
            };
            match compio::time::timeout(registration_timeout, sender.send_unregister(endpoint, command)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(error)) => {
                    tracing::debug!(endpoint = %endpoint, %error, "unregister failed, trying next endpoint");
                }
                Err(_) => {
                    tracing::debug!(endpoint = %endpoint, "unregister timed out, trying next endpoint");
                }
            }
        }
        Err(DirectoryError::RegistrationExhausted { endpoints })
    }

    fn add_or_update_self_entry(
        &self,
        endpoint: Endpoint,
        is_persistent: bool,
        timestamp: LogicalTimestamp,
        subscriptions: Vec<Subscription>,
    ) {
        let mut entry = PeerEntry::new(Peer::new(self.self_id.clone(), endpoint), is_persistent, timestamp, self.trees.clone());
        entry.set_subscriptions(subscriptions, timestamp);
        self.peers.insert(self.self_id.clone(), entry);
    }

    /// Insert or refresh a peer entry from a full descriptor, e.g. from
    /// a registration response or a `PeerStarted` event.
    fn add_or_update_peer_entry(&self, descriptor: PeerDescriptor) {
        let peer_id = descriptor.peer.id.clone();
        let mut entry = self
            .peers
            .entry(peer_id.clone())
            .or_insert_with(|| PeerEntry::new(descriptor.peer.clone(), descriptor.is_persistent, LogicalTimestamp::MIN, self.trees.clone()));
        // Unconditional, even for an already-known entry: a restarted peer
        // (e.g. one previously marked down by `PeerStopped`) must come back
        // up, not just have its subscriptions replayed.
        entry.update_peer(descriptor.peer, descriptor.is_persistent);
        entry.set_subscriptions(descriptor.subscriptions, descriptor.timestamp);
    }

    /// Route one directory event: buffer it if a registration's inbox
    /// is currently open, else apply it immediately.
    pub fn on_event(&self, event: DirectoryEvent) {
        let mut guard = self.inbox.write();
        if let Inbox::Open(events) = &mut *guard {
            events.push(event);
            return;
        }
        drop(guard);
        if let Err(error) = self.apply_event(event) {
            tracing::info!(%error, "directory event dropped");
        }
    }

    fn apply_event(&self, event: DirectoryEvent) -> Result<()> {
        match event {
            DirectoryEvent::PeerStarted(descriptor) => {
                let peer_id = descriptor.peer.id.clone();
                self.add_or_update_peer_entry(descriptor);
                self.emit(peer_id, PeerUpdateKind::Started);
                Ok(())
            }
            DirectoryEvent::PeerStopped { peer_id, endpoint: _, timestamp } => {
                let Some(mut entry) = self.peers.get_mut(&peer_id) else {
                    return Err(DirectoryError::UnknownPeerUpdate { peer_id: peer_id.to_string() });
                };
                let ts = timestamp.unwrap_or_else(|| entry.timestamp());
                if !entry.mark_stopped(ts) {
                    return Err(DirectoryError::OutdatedUpdate { peer_id: peer_id.to_string() });
                }
                drop(entry);
                self.emit(peer_id, PeerUpdateKind::Stopped);
                Ok(())
            }
            DirectoryEvent::PeerDecommissioned { peer_id } => {
                if let Some((_, mut entry)) = self.peers.remove(&peer_id) {
                    entry.remove_subscriptions();
                }
                self.emit(peer_id, PeerUpdateKind::Decommissioned);
                Ok(())
            }
            DirectoryEvent::PeerSubscriptionsUpdated(descriptor) => {
                let peer_id = descriptor.peer.id.clone();
                let Some(mut entry) = self.peers.get_mut(&peer_id) else {
                    return Err(DirectoryError::UnknownPeerUpdate { peer_id: peer_id.to_string() });
                };
                if !entry.set_subscriptions(descriptor.subscriptions, descriptor.timestamp) {
                    return Err(DirectoryError::OutdatedUpdate { peer_id: peer_id.to_string() });
                }
                drop(entry);
                self.emit(peer_id, PeerUpdateKind::Updated);
                Ok(())
            }
            DirectoryEvent::PeerSubscriptionsForTypesUpdated { peer_id, subscriptions_for_type, timestamp } => {
                let Some(mut entry) = self.peers.get_mut(&peer_id) else {
                    return Err(DirectoryError::UnknownPeerUpdate { peer_id: peer_id.to_string() });
                };
                let updates = subscriptions_for_type.into_iter().map(|s| (s.message_type_id, s.binding_keys)).collect();
                if !entry.set_subscriptions_for_type(updates, timestamp) {
                    return Err(DirectoryError::OutdatedUpdate { peer_id: peer_id.to_string() });
                }
                drop(entry);
                self.emit(peer_id, PeerUpdateKind::Updated);
                Ok(())
            }
            DirectoryEvent::PeerNotResponding { peer_id } => {
                let Some(mut entry) = self.peers.get_mut(&peer_id) else {
                    return Err(DirectoryError::UnknownPeerUpdate { peer_id: peer_id.to_string() });
                };
                entry.set_responding(false);
                drop(entry);
                self.emit(peer_id, PeerUpdateKind::Updated);
                Ok(())
            }
            DirectoryEvent::PeerResponding { peer_id } => {
                let Some(mut entry) = self.peers.get_mut(&peer_id) else {
                    return Err(DirectoryError::UnknownPeerUpdate { peer_id: peer_id.to_string() });
                };
                entry.set_responding(true);
                drop(entry);
                self.emit(peer_id, PeerUpdateKind::Updated);
                Ok(())
            }
            DirectoryEvent::PingPeerCommand => Ok(()),
        }
    }
}
