//! Invoker Loader — builds invokers from an explicit handler registry,
//! filtered by assembly/handler-type predicates.
//!
//! Design Notes (spec §9): the source scans assemblies by reflection;
//! here handlers register themselves at construction time instead, and
//! the filter predicates are kept as-is.

use std::any::Any;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::ids::MessageTypeId;
use crate::invoker::Invoker;

/// External collaborator that resolves handler instances, permitting
/// dependency injection (spec §6: `Container.GetInstance`).
pub trait Container: Send + Sync {
    /// Resolve a handler instance by its fully-qualified type name.
    fn get_instance(&self, handler_type_name: &str) -> Option<Arc<dyn Any + Send + Sync>>;
}

/// Predicate over a logical grouping name (the closest analogue to
/// "assembly" available without reflection); see [`InvokerLoader::configure_assembly_filter`].
pub type AssemblyFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Predicate over a handler's fully-qualified type name; see
/// [`InvokerLoader::configure_handler_filter`].
pub type HandlerFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// One handler type's registration: how to build its invoker(s) once
/// admitted by both filters.
struct Registration {
    handler_type_name: &'static str,
    assembly_name: &'static str,
    build: Arc<dyn Fn() -> Vec<Arc<dyn Invoker>> + Send + Sync>,
}

/// Scans the registered handler set and builds [`Invoker`]s, applying
/// include/exclude filters.
pub struct InvokerLoader {
    registrations: RwLock<Vec<Registration>>,
    assembly_filter: RwLock<Option<AssemblyFilter>>,
    handler_filter: RwLock<Option<HandlerFilter>>,
    invokers: RwLock<Vec<Arc<dyn Invoker>>>,
}

impl Default for InvokerLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl InvokerLoader {
    /// Create an empty loader with no registrations and no filters.
    #[must_use]
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            assembly_filter: RwLock::new(None),
            handler_filter: RwLock::new(None),
            invokers: RwLock::new(Vec::new()),
        }
    }

    /// Register a handler type's invoker-builder. `assembly_name` is an
    /// arbitrary logical grouping (e.g. crate or module name) consumed
    /// only by the assembly filter.
    pub fn register(
        &self,
        handler_type_name: &'static str,
        assembly_name: &'static str,
        build: impl Fn() -> Vec<Arc<dyn Invoker>> + Send + Sync + 'static,
    ) {
        self.registrations.write().push(Registration {
            handler_type_name,
            assembly_name,
            build: Arc::new(build),
        });
    }

    /// Set the predicate consumed on the next [`Self::load`].
    pub fn configure_assembly_filter(&self, filter: AssemblyFilter) {
        *self.assembly_filter.write() = Some(filter);
    }

    /// Set the predicate consumed on the next [`Self::load`].
    pub fn configure_handler_filter(&self, filter: HandlerFilter) {
        *self.handler_filter.write() = Some(filter);
    }

    /// Rebuild the invoker registry from current registrations and
    /// filters. Idempotent: calling twice with unchanged inputs yields
    /// the same invoker set.
    pub fn load(&self) {
        let assembly_filter = self.assembly_filter.read().clone();
        let handler_filter = self.handler_filter.read().clone();

        let mut built: Vec<Arc<dyn Invoker>> = Vec::new();
        let mut seen: std::collections::HashSet<(&'static str, MessageTypeId)> =
            std::collections::HashSet::new();

        for registration in self.registrations.read().iter() {
            if let Some(filter) = &assembly_filter {
                if !filter(registration.assembly_name) {
                    continue;
                }
            }
            if let Some(filter) = &handler_filter {
                if !filter(registration.handler_type_name) {
                    continue;
                }
            }
            for invoker in (registration.build)() {
                let key = (registration.handler_type_name, invoker.message_type_id().clone());
                if seen.insert(key) {
                    built.push(invoker);
                }
            }
        }

        *self.invokers.write() = built;
    }

    /// Read-only snapshot of the currently loaded invokers.
    #[must_use]
    pub fn invokers(&self) -> Vec<Arc<dyn Invoker>> {
        self.invokers.read().clone()
    }

    /// Invokers whose `message_type_id()` equals the given id.
    #[must_use]
    pub fn invokers_for(&self, message_type_id: &MessageTypeId) -> Vec<Arc<dyn Invoker>> {
        self.invokers
            .read()
            .iter()
            .filter(|invoker| invoker.message_type_id() == message_type_id)
            .cloned()
            .collect()
    }

    /// Every handled message type, each appearing at most once.
    #[must_use]
    pub fn handled_message_types(&self) -> Vec<MessageTypeId> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for invoker in self.invokers.read().iter() {
            if seen.insert(invoker.message_type_id().clone()) {
                out.push(invoker.message_type_id().clone());
            }
        }
        out
    }
}
