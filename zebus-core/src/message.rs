//! Message envelope types: `Message`, `MessageContext`, `MessageDispatch`,
//! `DispatchResult`.

use std::any::Any;
use std::fmt;
use std::sync::Mutex;

use crate::error::DispatchError;
use crate::ids::{MessageTypeId, PeerId};

/// Default dispatch queue name, used when no handler capability tag
/// specifies otherwise.
pub const DEFAULT_DISPATCH_QUEUE: &str = "DispatchQueue";

/// Marker trait for bus messages (commands and events).
///
/// Implementors provide a stable [`MessageTypeId`] and expose themselves
/// as `Any` so invokers can downcast to their concrete type.
pub trait Message: Any + Send + Sync + fmt::Debug {
    /// Stable identifier for this message's class.
    fn message_type_id(&self) -> MessageTypeId;

    /// Upcast for invoker downcasting.
    fn as_any(&self) -> &dyn Any;
}

/// Context flowing with one dispatch. `reply_code` may be mutated by
/// handlers as they process the message.
#[derive(Debug, Clone)]
pub struct MessageContext {
    /// Identity of the peer that sent this message.
    pub sender_id: PeerId,
    /// Unique identifier of this message instance.
    pub message_id: String,
    /// Name of the dispatch queue this message is routed through.
    pub dispatch_queue_name: String,
    /// Mutated by handlers to report an application-level reply code.
    pub reply_code: i32,
}

impl MessageContext {
    /// Build a context with the default dispatch queue.
    #[must_use]
    pub fn new(sender_id: PeerId, message_id: impl Into<String>) -> Self {
        Self {
            sender_id,
            message_id: message_id.into(),
            dispatch_queue_name: DEFAULT_DISPATCH_QUEUE.to_string(),
            reply_code: 0,
        }
    }

    /// Build a context routed through a specific dispatch queue.
    #[must_use]
    pub fn with_queue(mut self, queue_name: impl Into<String>) -> Self {
        self.dispatch_queue_name = queue_name.into();
        self
    }
}

/// Outcome aggregate of one message's dispatch across all local invokers.
#[derive(Debug, Default)]
pub struct DispatchResult {
    /// True once at least one invoker ran, success or failure.
    was_handled: Mutex<bool>,
    /// Errors caught from invokers, in completion order.
    errors: Mutex<Vec<DispatchError>>,
}

impl DispatchResult {
    /// An empty, not-handled result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful invocation.
    pub fn record_success(&self) {
        *self.was_handled.lock().unwrap() = true;
    }

    /// Record a failed invocation; still counts as handled per spec.
    pub fn record_error(&self, error: DispatchError) {
        *self.was_handled.lock().unwrap() = true;
        self.errors.lock().unwrap().push(error);
    }

    /// Whether at least one invoker ran.
    #[must_use]
    pub fn was_handled(&self) -> bool {
        *self.was_handled.lock().unwrap()
    }

    /// Snapshot the accumulated errors.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors
            .lock()
            .unwrap()
            .iter()
            .map(std::string::ToString::to_string)
            .collect()
    }

    /// Number of errors recorded.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.lock().unwrap().len()
    }

    /// Consume into a plain, immutable snapshot.
    #[must_use]
    pub fn into_snapshot(self) -> DispatchResultSnapshot {
        DispatchResultSnapshot {
            was_handled: self.was_handled.into_inner().unwrap(),
            errors: self
                .errors
                .into_inner()
                .unwrap()
                .iter()
                .map(std::string::ToString::to_string)
                .collect(),
        }
    }
}

/// Plain, `Clone`-able snapshot of a [`DispatchResult`] for callbacks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchResultSnapshot {
    /// True once at least one invoker ran.
    pub was_handled: bool,
    /// Errors caught from invokers, as display strings.
    pub errors: Vec<String>,
}
