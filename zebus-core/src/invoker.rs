//! Handler Invoker — adapters wrapping one concrete handler for one
//! message type.

use async_trait::async_trait;
use futures::future::BoxFuture;

use crate::error::DispatchError;
use crate::ids::MessageTypeId;
use crate::message::{Message, MessageContext};

/// A handler for one message type whose entry point completes
/// synchronously.
pub trait SyncMessageHandler<M: Message>: Send + Sync {
    /// Handle one message. Returning `Err` is caught by the dispatcher
    /// and reported in `DispatchResult::errors`.
    fn handle(&self, message: &M, context: &mut MessageContext) -> Result<(), String>;
}

/// A handler for one message type whose entry point starts a deferred
/// task.
///
/// `start` itself is synchronous: it must *start* the task and return a
/// future representing its completion. Returning `None` is a
/// programmer error — spec §4.C's "handler did not start its task".
pub trait AsyncMessageHandler<M: Message>: Send + Sync {
    /// Start the deferred task for this message.
    fn start(
        &self,
        message: &M,
        context: &mut MessageContext,
    ) -> Option<BoxFuture<'static, Result<(), String>>>;
}

/// Adapter wrapping one concrete handler for one message type.
///
/// `MessageType`/`MessageHandlerType` in spec terms are represented by
/// [`Invoker::message_type_id`] and [`Invoker::handler_type_name`]; the
/// pair uniquely identifies an invoker (spec §3 invariant: at most one
/// invoker per (`HandlerType`, `MessageType`) pair).
#[async_trait]
pub trait Invoker: Send + Sync {
    /// Stable identifier of the message type this invoker handles.
    fn message_type_id(&self) -> &MessageTypeId;

    /// Fully-qualified name of the handler type, used for invoker
    /// identity and invoker-set deduplication.
    fn handler_type_name(&self) -> &'static str;

    /// False when the handler opted out of auto-scan (`NoScan`) or the
    /// message type is `Routable` (subscribed explicitly by binding
    /// key instead).
    fn should_be_subscribed_on_startup(&self) -> bool;

    /// Dispatch queue this invoker was explicitly registered against,
    /// if any. `None` means the dispatcher falls back to the message
    /// context's queue name, then the default queue.
    fn configured_dispatch_queue_name(&self) -> Option<&str>;

    /// Invoke the handler. Never panics: handler/async-start failures
    /// are converted to `DispatchError`.
    async fn invoke(
        &self,
        message: &dyn Message,
        context: &mut MessageContext,
    ) -> Result<(), DispatchError>;
}

/// Invoker wrapping a [`SyncMessageHandler`].
pub struct SyncInvoker<M, H> {
    handler: std::sync::Arc<H>,
    message_type_id: MessageTypeId,
    handler_type_name: &'static str,
    should_be_subscribed_on_startup: bool,
    dispatch_queue_name: Option<String>,
    _marker: std::marker::PhantomData<fn(&M)>,
}

impl<M, H> SyncInvoker<M, H>
where
    M: Message,
    H: SyncMessageHandler<M> + 'static,
{
    /// Build an invoker for a sync handler.
    pub fn new(
        handler: std::sync::Arc<H>,
        message_type_id: MessageTypeId,
        should_be_subscribed_on_startup: bool,
        dispatch_queue_name: Option<String>,
    ) -> Self {
        Self {
            handler,
            message_type_id,
            handler_type_name: std::any::type_name::<H>(),
            should_be_subscribed_on_startup,
            dispatch_queue_name,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<M, H> Invoker for SyncInvoker<M, H>
where
    M: Message,
    H: SyncMessageHandler<M> + 'static,
{
    fn message_type_id(&self) -> &MessageTypeId {
        &self.message_type_id
    }

    fn handler_type_name(&self) -> &'static str {
        self.handler_type_name
    }

    fn should_be_subscribed_on_startup(&self) -> bool {
        self.should_be_subscribed_on_startup
    }

    fn configured_dispatch_queue_name(&self) -> Option<&str> {
        self.dispatch_queue_name.as_deref()
    }

    async fn invoke(
        &self,
        message: &dyn Message,
        context: &mut MessageContext,
    ) -> Result<(), DispatchError> {
        let typed = message
            .as_any()
            .downcast_ref::<M>()
            .expect("invoker invoked with mismatched message type");
        self.handler.handle(typed, context).map_err(DispatchError::handler)
    }
}

/// Invoker wrapping an [`AsyncMessageHandler`].
pub struct AsyncInvoker<M, H> {
    handler: std::sync::Arc<H>,
    message_type_id: MessageTypeId,
    handler_type_name: &'static str,
    should_be_subscribed_on_startup: bool,
    dispatch_queue_name: Option<String>,
    _marker: std::marker::PhantomData<fn(&M)>,
}

impl<M, H> AsyncInvoker<M, H>
where
    M: Message,
    H: AsyncMessageHandler<M> + 'static,
{
    /// Build an invoker for an async handler.
    pub fn new(
        handler: std::sync::Arc<H>,
        message_type_id: MessageTypeId,
        should_be_subscribed_on_startup: bool,
        dispatch_queue_name: Option<String>,
    ) -> Self {
        Self {
            handler,
            message_type_id,
            handler_type_name: std::any::type_name::<H>(),
            should_be_subscribed_on_startup,
            dispatch_queue_name,
            _marker: std::marker::PhantomData,
        }
    }
}

#[async_trait]
impl<M, H> Invoker for AsyncInvoker<M, H>
where
    M: Message,
    H: AsyncMessageHandler<M> + 'static,
{
    fn message_type_id(&self) -> &MessageTypeId {
        &self.message_type_id
    }

    fn handler_type_name(&self) -> &'static str {
        self.handler_type_name
    }

    fn should_be_subscribed_on_startup(&self) -> bool {
        self.should_be_subscribed_on_startup
    }

    fn configured_dispatch_queue_name(&self) -> Option<&str> {
        self.dispatch_queue_name.as_deref()
    }

    async fn invoke(
        &self,
        message: &dyn Message,
        context: &mut MessageContext,
    ) -> Result<(), DispatchError> {
        let typed = message
            .as_any()
            .downcast_ref::<M>()
            .expect("invoker invoked with mismatched message type");
        match self.handler.start(typed, context) {
            Some(task) => task.await.map_err(DispatchError::handler),
            None => Err(DispatchError::AsyncNotStarted),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Ping;

    impl Message for Ping {
        fn message_type_id(&self) -> MessageTypeId {
            MessageTypeId::new("test.Ping")
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    struct PingHandler {
        called: Arc<AtomicBool>,
    }

    impl SyncMessageHandler<Ping> for PingHandler {
        fn handle(&self, _message: &Ping, _context: &mut MessageContext) -> Result<(), String> {
            self.called.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[compio::test]
    async fn sync_invoker_calls_handler() {
        let called = Arc::new(AtomicBool::new(false));
        let invoker = SyncInvoker::new(
            Arc::new(PingHandler {
                called: called.clone(),
            }),
            MessageTypeId::new("test.Ping"),
            true,
            None,
        );
        let mut ctx = MessageContext::new("sender".into(), "msg-1");
        invoker.invoke(&Ping, &mut ctx).await.unwrap();
        assert!(called.load(Ordering::SeqCst));
    }

    struct NeverStartsHandler;

    impl AsyncMessageHandler<Ping> for NeverStartsHandler {
        fn start(
            &self,
            _message: &Ping,
            _context: &mut MessageContext,
        ) -> Option<BoxFuture<'static, Result<(), String>>> {
            None
        }
    }

    #[compio::test]
    async fn async_invoker_reports_did_not_start() {
        let invoker = AsyncInvoker::new(
            Arc::new(NeverStartsHandler),
            MessageTypeId::new("test.Ping"),
            true,
            None,
        );
        let mut ctx = MessageContext::new("sender".into(), "msg-1");
        let err = invoker.invoke(&Ping, &mut ctx).await.unwrap_err();
        assert!(matches!(err, DispatchError::AsyncNotStarted));
    }
}
