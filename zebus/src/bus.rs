//! Bus facade — wires the Message Dispatcher, Directory Client, and
//! Local Dispatch Guard into one peer-facing handle.

use std::sync::Arc;

use zebus_core::dispatcher::MessageDispatcher;
use zebus_core::ids::{MessageTypeId, PeerId};
use zebus_core::loader::InvokerLoader;
use zebus_core::message::{DispatchResultSnapshot, Message, MessageContext};
use zebus_core::pipe::PipeManager;
use zebus_directory::directory_client::{DirectoryClient, DirectorySender};
use zebus_directory::model::MessageBinding;

use crate::config::BusConfiguration;

/// A running peer: owns a [`MessageDispatcher`] for inbound handling and
/// a [`DirectoryClient`] replica for outbound peer resolution.
///
/// The wire transport is an external collaborator (spec §1's
/// "Out of scope"): this type resolves *which* peers should receive a
/// message and dispatches locally; actually moving bytes is left to
/// whatever `DirectorySender` and transport a deployment supplies.
pub struct Bus {
    self_id: PeerId,
    configuration: BusConfiguration,
    dispatcher: MessageDispatcher,
    directory: Arc<DirectoryClient>,
}

impl Bus {
    /// Build a bus around a fresh invoker loader and directory client
    /// for the given peer identity.
    #[must_use]
    pub fn new(self_id: PeerId, configuration: BusConfiguration) -> Self {
        Self::with_pipe_manager(self_id, configuration, Arc::new(zebus_core::pipe::EmptyPipeManager))
    }

    /// Build a bus with an explicit pipe manager wrapping every local
    /// invocation.
    #[must_use]
    pub fn with_pipe_manager(self_id: PeerId, configuration: BusConfiguration, pipe_manager: Arc<dyn PipeManager>) -> Self {
        let loader = Arc::new(InvokerLoader::new());
        let dispatcher = MessageDispatcher::with_pipe_manager_and_queue_name(
            loader,
            pipe_manager,
            configuration.default_dispatch_queue_name.clone(),
        );
        Self {
            directory: Arc::new(DirectoryClient::new(self_id.clone())),
            dispatcher,
            self_id,
            configuration,
        }
    }

    /// Identity of the local peer.
    #[must_use]
    pub fn self_id(&self) -> &PeerId {
        &self.self_id
    }

    /// The dispatcher routing inbound messages to local handlers.
    #[must_use]
    pub fn dispatcher(&self) -> &MessageDispatcher {
        &self.dispatcher
    }

    /// The directory client replica backing outbound peer resolution.
    #[must_use]
    pub fn directory(&self) -> &Arc<DirectoryClient> {
        &self.directory
    }

    /// Register the local peer with the configured directory endpoints.
    pub async fn start(&self, sender: &dyn DirectorySender, self_endpoint: zebus_core::ids::Endpoint) -> zebus_directory::error::Result<()> {
        self.dispatcher.load_message_handler_invokers();
        self.directory
            .register_async(
                sender,
                &self.configuration.directory_service_endpoints,
                self.configuration.is_directory_picked_randomly,
                self.configuration.registration_timeout,
                self_endpoint,
                Vec::new(),
                self.configuration.is_persistent,
            )
            .await
    }

    /// Unregister the local peer and stop its dispatch queues.
    pub async fn stop(&self, sender: &dyn DirectorySender) -> zebus_directory::error::Result<()> {
        let result = self.directory.unregister_async(sender, self.configuration.registration_timeout).await;
        self.dispatcher.stop();
        result
    }

    /// Peers that should receive `message`, per the directory's
    /// subscription trees for `binding`.
    #[must_use]
    pub fn peers_handling(&self, binding: &MessageBinding) -> Vec<PeerId> {
        self.directory.get_peers_handling_message(binding)
    }

    /// Dispatch a message to local handlers immediately, honoring the
    /// [`zebus_core::local_dispatch`] guard: when it is enabled and the
    /// local peer itself handles the message type, callers should
    /// prefer this over a transport round-trip (spec §4.I).
    pub fn dispatch_locally(
        &self,
        message: Arc<dyn Message>,
        context: MessageContext,
        on_complete: Box<dyn FnOnce(DispatchResultSnapshot) + Send>,
    ) {
        self.dispatcher.dispatch(message, context, on_complete);
    }

    /// Whether any local invoker handles `message_type_id`, i.e.
    /// whether `dispatch_locally` could short-circuit a send of that
    /// type.
    #[must_use]
    pub fn handles_locally(&self, message_type_id: &MessageTypeId) -> bool {
        self.dispatcher.get_handled_message_types().contains(message_type_id)
    }
}
