//! Pipe Chain — ordered interceptor stack wrapping one handler
//! invocation.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::DispatchError;
use crate::invoker::Invoker;
use crate::message::{Message, MessageContext};

/// Stable identity for a pipe, used to key its per-invocation state.
pub type PipeId = &'static str;

/// An interceptor with any subset of before/after/on-error hooks.
///
/// All hooks default to no-ops so implementors only override what they
/// need, matching the style of this codebase's other minimal async
/// collaborator traits.
#[async_trait]
pub trait Pipe: Send + Sync {
    /// Stable identity for this pipe, used to key per-invocation state
    /// handed from `before_invoke` to the matching `after_invoke`/
    /// `on_error`.
    fn id(&self) -> PipeId;

    /// Runs before the handler, in registration order. May return an
    /// opaque state value readable by this pipe's own `after_invoke`/
    /// `on_error`.
    async fn before_invoke(&self, _context: &mut MessageContext) -> Option<Box<dyn Any + Send>> {
        None
    }

    /// Runs after the handler (or a failing pipe), in **reverse**
    /// registration order. `error` is set when the handler or an
    /// earlier hook failed; this hook still runs in that case.
    async fn after_invoke(
        &self,
        _context: &mut MessageContext,
        _state: Option<Box<dyn Any + Send>>,
        _error: Option<&DispatchError>,
    ) {
    }

    /// Runs in reverse registration order when the handler or any hook
    /// fails, before `after_invoke` hooks run.
    async fn on_error(
        &self,
        _context: &mut MessageContext,
        _state: Option<&(dyn Any + Send)>,
        _error: &DispatchError,
    ) {
    }
}

/// Bundles one invoker, its message/context, and the ordered pipe stack
/// for one dispatch.
pub struct PipeInvocation {
    invoker: Arc<dyn Invoker>,
    message: Arc<dyn Message>,
    context: MessageContext,
    pipes: Vec<Arc<dyn Pipe>>,
}

impl PipeInvocation {
    /// Build a pipe invocation around one invoker and its ordered pipes.
    #[must_use]
    pub fn new(
        invoker: Arc<dyn Invoker>,
        message: Arc<dyn Message>,
        context: MessageContext,
        pipes: Vec<Arc<dyn Pipe>>,
    ) -> Self {
        Self {
            invoker,
            message,
            context,
            pipes,
        }
    }

    /// Run before hooks, the handler, then after/on-error hooks, per
    /// spec §4.B's ordering.
    pub async fn run(mut self) -> Result<(), DispatchError> {
        let mut state: HashMap<PipeId, Box<dyn Any + Send>> = HashMap::new();

        for pipe in &self.pipes {
            if let Some(value) = pipe.before_invoke(&mut self.context).await {
                state.insert(pipe.id(), value);
            }
        }

        let result = self
            .invoker
            .invoke(self.message.as_ref(), &mut self.context)
            .await;

        if let Err(ref error) = result {
            for pipe in self.pipes.iter().rev() {
                let slot = state.get(pipe.id()).map(std::convert::AsRef::as_ref);
                pipe.on_error(&mut self.context, slot, error).await;
            }
        }

        for pipe in self.pipes.iter().rev() {
            let slot = state.remove(pipe.id());
            pipe.after_invoke(&mut self.context, slot, result.as_ref().err())
                .await;
        }

        result
    }
}

/// External collaborator that builds a [`PipeInvocation`] for one
/// dispatch (spec §6: `PipeManager.BuildPipeInvocation`).
pub trait PipeManager: Send + Sync {
    /// Ordered pipes to wrap around every invocation. Returning the
    /// same stack for every call is the common case; implementors may
    /// vary it by invoker or message type.
    fn pipes_for(&self, invoker: &dyn Invoker) -> Vec<Arc<dyn Pipe>>;
}

/// A [`PipeManager`] with no configured pipes; the handler runs
/// directly with no interceptors.
#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyPipeManager;

impl PipeManager for EmptyPipeManager {
    fn pipes_for(&self, _invoker: &dyn Invoker) -> Vec<Arc<dyn Pipe>> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MessageTypeId;
    use crate::invoker::{SyncInvoker, SyncMessageHandler};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

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

    struct OkHandler;
    impl SyncMessageHandler<Ping> for OkHandler {
        fn handle(&self, _message: &Ping, _context: &mut MessageContext) -> Result<(), String> {
            Ok(())
        }
    }

    struct FailingHandler;
    impl SyncMessageHandler<Ping> for FailingHandler {
        fn handle(&self, _message: &Ping, _context: &mut MessageContext) -> Result<(), String> {
            Err("boom".to_string())
        }
    }

    struct RecordingPipe {
        id: PipeId,
        log: Arc<Mutex<Vec<String>>>,
    }

    #[async_trait]
    impl Pipe for RecordingPipe {
        fn id(&self) -> PipeId {
            self.id
        }

        async fn before_invoke(
            &self,
            _context: &mut MessageContext,
        ) -> Option<Box<dyn Any + Send>> {
            self.log.lock().unwrap().push(format!("{}:before", self.id));
            Some(Box::new(42u32))
        }

        async fn after_invoke(
            &self,
            _context: &mut MessageContext,
            state: Option<Box<dyn Any + Send>>,
            error: Option<&DispatchError>,
        ) {
            let had_state = state.and_then(|s| s.downcast::<u32>().ok()).is_some();
            self.log.lock().unwrap().push(format!(
                "{}:after(state={had_state},error={})",
                self.id,
                error.is_some()
            ));
        }

        async fn on_error(
            &self,
            _context: &mut MessageContext,
            _state: Option<&(dyn Any + Send)>,
            _error: &DispatchError,
        ) {
            self.log.lock().unwrap().push(format!("{}:on_error", self.id));
        }
    }

    fn invoker(handler_ok: bool) -> Arc<dyn Invoker> {
        if handler_ok {
            Arc::new(SyncInvoker::new(
                Arc::new(OkHandler),
                MessageTypeId::new("test.Ping"),
                true,
                None,
            ))
        } else {
            Arc::new(SyncInvoker::new(
                Arc::new(FailingHandler),
                MessageTypeId::new("test.Ping"),
                true,
                None,
            ))
        }
    }

    #[compio::test]
    async fn hooks_run_before_then_handler_then_after_in_reverse() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipes: Vec<Arc<dyn Pipe>> = vec![
            Arc::new(RecordingPipe {
                id: "outer",
                log: log.clone(),
            }),
            Arc::new(RecordingPipe {
                id: "inner",
                log: log.clone(),
            }),
        ];
        let ctx = MessageContext::new("sender".into(), "msg-1");
        let invocation = PipeInvocation::new(invoker(true), Arc::new(Ping), ctx, pipes);
        invocation.run().await.unwrap();

        let entries = log.lock().unwrap().clone();
        assert_eq!(
            entries,
            vec![
                "outer:before",
                "inner:before",
                "inner:after(state=true,error=false)",
                "outer:after(state=true,error=false)",
            ]
        );
    }

    #[compio::test]
    async fn on_error_runs_before_after_hooks_and_after_still_runs() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let pipes: Vec<Arc<dyn Pipe>> = vec![Arc::new(RecordingPipe {
            id: "p",
            log: log.clone(),
        })];
        let ctx = MessageContext::new("sender".into(), "msg-1");
        let invocation = PipeInvocation::new(invoker(false), Arc::new(Ping), ctx, pipes);
        let result = invocation.run().await;

        assert!(result.is_err());
        let entries = log.lock().unwrap().clone();
        assert_eq!(
            entries,
            vec!["p:before", "p:on_error", "p:after(state=true,error=true)"]
        );
    }

    #[test]
    fn empty_pipe_manager_returns_no_pipes() {
        let count = AtomicUsize::new(0);
        let manager = EmptyPipeManager;
        let pipes = manager.pipes_for(&*invoker_sync());
        count.fetch_add(pipes.len(), Ordering::SeqCst);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    fn invoker_sync() -> Arc<dyn Invoker> {
        Arc::new(SyncInvoker::new(
            Arc::new(OkHandler),
            MessageTypeId::new("test.Ping"),
            true,
            None,
        ))
    }
}
