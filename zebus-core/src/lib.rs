//! Zebus Core
//!
//! Runtime-agnostic building blocks for the message bus:
//! - Message/invoker/pipe abstractions (`message`, `invoker`, `pipe`)
//! - Invoker discovery and registration (`loader`)
//! - The per-peer dispatch engine (`dispatcher`)
//! - Named serial dispatch queues (`queue`)
//! - Routing primitives: peer/message identity, binding keys (`ids`, `binding`)
//! - The local dispatch short-circuit guard (`local_dispatch`)
//! - Error types (`error`)

#![deny(unsafe_code)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::needless_pass_by_value)]

pub mod binding;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod invoker;
pub mod loader;
pub mod local_dispatch;
pub mod message;
pub mod pipe;
pub mod queue;

/// Commonly imported items for crates building on top of zebus-core.
pub mod prelude {
    pub use crate::binding::{BindingKey, RoutingKey};
    pub use crate::dispatcher::{CompletionCallback, MessageDispatcher};
    pub use crate::error::{DispatchError, Result};
    pub use crate::ids::{LogicalTimestamp, LogicalTimestampGenerator, MessageTypeId, PeerId};
    pub use crate::invoker::{AsyncMessageHandler, Invoker, SyncMessageHandler};
    pub use crate::loader::{Container, InvokerLoader};
    pub use crate::local_dispatch::{disable as disable_local_dispatch, LocalDispatchGuard};
    pub use crate::message::{
        DispatchResult, DispatchResultSnapshot, Message, MessageContext, DEFAULT_DISPATCH_QUEUE,
    };
    pub use crate::pipe::{EmptyPipeManager, Pipe, PipeInvocation, PipeManager};
    pub use crate::queue::{DispatchQueue, QueueTask};
}
