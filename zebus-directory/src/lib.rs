//! Zebus Directory
//!
//! The peer-side replica of the global directory: peer identity and
//! liveness, subscription trees, registration, and directory event
//! handling.
//!
//! - `model` — Peer, Subscription, PeerDescriptor, MessageBinding
//! - `subscription_tree` — per-message-type binding-key index
//! - `peer_entry` — one peer's authoritative, mutable record
//! - `directory_client` — registration protocol and event handlers
//! - `wire` — directory commands/events
//! - `error` — directory-specific error types

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

pub mod directory_client;
pub mod error;
pub mod model;
pub mod peer_entry;
pub mod subscription_tree;
pub mod wire;

/// Commonly imported items for crates building on top of zebus-directory.
pub mod prelude {
    pub use crate::directory_client::{DirectoryClient, DirectorySender, PeerUpdateKind, PeerUpdated};
    pub use crate::error::{DirectoryError, Result};
    pub use crate::model::{MessageBinding, Peer, PeerDescriptor, Subscription};
    pub use crate::peer_entry::{PeerEntry, SharedSubscriptionTrees};
    pub use crate::subscription_tree::SubscriptionTree;
    pub use crate::wire::{
        DirectoryEvent, RegisterPeerCommand, RegisterPeerError, RegisterPeerResponse,
        SubscriptionForType, UnregisterPeerCommand, UpdatePeerSubscriptionsForTypesCommand,
    };
}
