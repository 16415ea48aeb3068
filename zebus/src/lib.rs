//! # Zebus
//!
//! A peer-to-peer service bus: autonomous peers exchange typed
//! commands and events discovered through a shared directory.
//!
//! ## Architecture
//!
//! Zebus is structured as a small stack of focused crates:
//!
//! - **`zebus-core`**: the Message Dispatcher, Pipe Chain, Handler
//!   Invoker, Invoker Loader, Dispatch Queue, and Local Dispatch Guard —
//!   runtime-agnostic building blocks with no notion of peers.
//! - **`zebus-directory`**: the peer directory client — peer entries,
//!   subscription trees, and the registration/event-handling protocol.
//! - **`zebus`**: this crate, the public API surface wiring the two
//!   together into a [`bus::Bus`].
//!
//! The wire transport, serialization codec, authentication, process
//! bootstrapping, and the directory *server* are external collaborators
//! out of scope for this crate (see [`zebus_directory::directory_client::DirectorySender`]
//! for the seam a deployment plugs a real transport into).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use zebus::prelude::*;
//!
//! # async fn example(sender: &dyn zebus_directory::directory_client::DirectorySender) {
//! let bus = Bus::new(PeerId::new("my-peer"), BusConfiguration::single("tcp://directory:1234"));
//! bus.start(sender, Endpoint::new("tcp://127.0.0.1:5000")).await.ok();
//! # }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::missing_errors_doc)]

// Re-export the lower layers so downstream crates rarely need to
// depend on `zebus-core`/`zebus-directory` directly.
pub use zebus_core;
pub use zebus_directory;

pub mod bus;
pub mod config;

/// Development helper for enabling `tracing` output in tests/examples.
pub mod dev_tracing;

/// Commonly imported items for applications built on zebus.
pub mod prelude {
    pub use crate::bus::Bus;
    pub use crate::config::BusConfiguration;
    pub use zebus_core::binding::{BindingKey, RoutingKey};
    pub use zebus_core::ids::{Endpoint, MessageTypeId, PeerId};
    pub use zebus_core::invoker::{AsyncMessageHandler, SyncMessageHandler};
    pub use zebus_core::local_dispatch::disable as disable_local_dispatch;
    pub use zebus_core::message::{DispatchResultSnapshot, Message, MessageContext};
    pub use zebus_directory::directory_client::{DirectoryClient, DirectorySender};
    pub use zebus_directory::model::{MessageBinding, Peer, PeerDescriptor, Subscription};
}
