//! Message Dispatcher — routes an inbound message to the right queue(s)
//! and invoker(s), collecting a `DispatchResult` delivered via a
//! completion callback.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::loader::{AssemblyFilter, HandlerFilter, InvokerLoader};
use crate::message::{
    DispatchResult, DispatchResultSnapshot, Message, MessageContext, DEFAULT_DISPATCH_QUEUE,
};
use crate::pipe::{EmptyPipeManager, PipeInvocation, PipeManager};
use crate::queue::DispatchQueue;

/// Invoked exactly once, when every matching invoker for a dispatch has
/// completed.
pub type CompletionCallback = Box<dyn FnOnce(DispatchResultSnapshot) + Send>;

/// Per-peer dispatch engine: resolves local handlers for an inbound
/// message, fans the invocation out across named dispatch queues
/// wrapped in the pipe chain, and reports the aggregate outcome.
pub struct MessageDispatcher {
    loader: Arc<InvokerLoader>,
    pipe_manager: Arc<dyn PipeManager>,
    queues: DashMap<String, Arc<DispatchQueue>>,
    default_queue_name: String,
}

impl MessageDispatcher {
    /// Build a dispatcher around an invoker loader, with no pipes
    /// configured.
    #[must_use]
    pub fn new(loader: Arc<InvokerLoader>) -> Self {
        Self::with_pipe_manager(loader, Arc::new(EmptyPipeManager))
    }

    /// Build a dispatcher with an explicit pipe manager.
    #[must_use]
    pub fn with_pipe_manager(loader: Arc<InvokerLoader>, pipe_manager: Arc<dyn PipeManager>) -> Self {
        Self::with_pipe_manager_and_queue_name(loader, pipe_manager, DEFAULT_DISPATCH_QUEUE.to_string())
    }

    /// Build a dispatcher with an explicit pipe manager and a
    /// non-default fallback queue name (spec.md §6's configurable
    /// default dispatch queue).
    #[must_use]
    pub fn with_pipe_manager_and_queue_name(
        loader: Arc<InvokerLoader>,
        pipe_manager: Arc<dyn PipeManager>,
        default_queue_name: String,
    ) -> Self {
        Self {
            loader,
            pipe_manager,
            queues: DashMap::new(),
            default_queue_name,
        }
    }

    /// Register a handler type's invoker-builder (spec §4.D); takes
    /// effect on the next [`Self::load_message_handler_invokers`].
    pub fn register_handler(
        &self,
        handler_type_name: &'static str,
        assembly_name: &'static str,
        build: impl Fn() -> Vec<Arc<dyn crate::invoker::Invoker>> + Send + Sync + 'static,
    ) {
        self.loader.register(handler_type_name, assembly_name, build);
    }

    /// Set the predicate consumed on the next [`Self::load_message_handler_invokers`].
    pub fn configure_assembly_filter(&self, filter: AssemblyFilter) {
        self.loader.configure_assembly_filter(filter);
    }

    /// Set the predicate consumed on the next [`Self::load_message_handler_invokers`].
    pub fn configure_handler_filter(&self, filter: HandlerFilter) {
        self.loader.configure_handler_filter(filter);
    }

    /// Rebuild the invoker registry. Idempotent.
    pub fn load_message_handler_invokers(&self) {
        self.loader.load();
    }

    /// Read-only snapshot of the currently loaded invokers.
    #[must_use]
    pub fn get_message_handler_invokers(&self) -> Vec<Arc<dyn crate::invoker::Invoker>> {
        self.loader.invokers()
    }

    /// Every handled message type, each appearing at most once.
    #[must_use]
    pub fn get_handled_message_types(&self) -> Vec<crate::ids::MessageTypeId> {
        self.loader.handled_message_types()
    }

    fn queue_for(&self, name: &str) -> Arc<DispatchQueue> {
        if let Some(existing) = self.queues.get(name) {
            return existing.clone();
        }
        self.queues
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(DispatchQueue::start(name.to_string())))
            .clone()
    }

    /// Sum of `purge_tasks()` across every known dispatch queue.
    #[must_use]
    pub fn purge_queues(&self) -> usize {
        self.queues.iter().map(|entry| entry.value().purge_tasks()).sum()
    }

    /// Stop every known dispatch queue.
    pub fn stop(&self) {
        for entry in self.queues.iter() {
            entry.value().stop();
        }
    }

    /// Dispatch one inbound message: resolves invokers, fans the
    /// invocation out to dispatch queues, and fires `on_complete`
    /// exactly once with the aggregate `DispatchResult`.
    pub fn dispatch(
        &self,
        message: Arc<dyn Message>,
        context: MessageContext,
        on_complete: CompletionCallback,
    ) {
        let invokers = self.loader.invokers_for(&message.message_type_id());

        if invokers.is_empty() {
            tracing::debug!(message_type = %message.message_type_id(), "no local invoker for message");
            on_complete(DispatchResultSnapshot::default());
            return;
        }

        let result = Arc::new(DispatchResult::new());
        let remaining = Arc::new(AtomicUsize::new(invokers.len()));
        let on_complete = Arc::new(std::sync::Mutex::new(Some(on_complete)));

        for invoker in invokers {
            let queue_name = invoker
                .configured_dispatch_queue_name()
                .map(std::string::ToString::to_string)
                .unwrap_or_else(|| {
                    if context.dispatch_queue_name.is_empty() {
                        self.default_queue_name.clone()
                    } else {
                        context.dispatch_queue_name.clone()
                    }
                });
            let queue = self.queue_for(&queue_name);

            let pipes = self.pipe_manager.pipes_for(invoker.as_ref());
            let message = message.clone();
            let context = context.clone();
            let result = result.clone();
            let remaining = remaining.clone();
            let on_complete = on_complete.clone();

            queue.enqueue(Box::new(move || {
                Box::pin(async move {
                    let invocation = PipeInvocation::new(invoker, message, context, pipes);
                    match invocation.run().await {
                        Ok(()) => result.record_success(),
                        Err(error) => {
                            tracing::warn!(%error, "handler invocation failed");
                            result.record_error(error);
                        }
                    }

                    if remaining.fetch_sub(1, Ordering::SeqCst) == 1 {
                        if let Some(callback) = on_complete.lock().unwrap().take() {
                            let snapshot = match Arc::try_unwrap(result) {
                                Ok(owned) => owned.into_snapshot(),
                                Err(shared) => DispatchResultSnapshot {
                                    was_handled: shared.was_handled(),
                                    errors: shared.errors(),
                                },
                            };
                            callback(snapshot);
                        }
                    }
                })
            }));
        }
    }
}
