//! End-to-end smoke test: a `Bus` dispatching to a locally registered
//! handler, and the local dispatch guard suppressing the short-circuit
//! decision an application would otherwise make.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use zebus::prelude::*;
use zebus_core::invoker::SyncInvoker;
use zebus_directory::wire::{RegisterPeerCommand, RegisterPeerResponse, UnregisterPeerCommand, UpdatePeerSubscriptionsForTypesCommand};

#[derive(Debug)]
struct Greet {
    who: String,
}

impl Message for Greet {
    fn message_type_id(&self) -> MessageTypeId {
        MessageTypeId::new("smoke.Greet")
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct GreetHandler {
    greeted: Arc<AtomicBool>,
}

impl SyncMessageHandler<Greet> for GreetHandler {
    fn handle(&self, message: &Greet, _context: &mut MessageContext) -> Result<(), String> {
        assert_eq!(message.who, "world");
        self.greeted.store(true, Ordering::SeqCst);
        Ok(())
    }
}

struct AcceptingSender;

#[async_trait]
impl DirectorySender for AcceptingSender {
    async fn send_register(&self, _endpoint: &Endpoint, _command: RegisterPeerCommand) -> Result<RegisterPeerResponse, String> {
        Ok(RegisterPeerResponse {
            peer_descriptors: Some(Vec::new()),
            error: None,
        })
    }
    async fn send_update_subscriptions(&self, _endpoint: &Endpoint, _command: UpdatePeerSubscriptionsForTypesCommand) -> Result<(), String> {
        Ok(())
    }
    async fn send_unregister(&self, _endpoint: &Endpoint, _command: UnregisterPeerCommand) -> Result<(), String> {
        Ok(())
    }
}

#[compio::test]
async fn bus_registers_and_dispatches_locally() {
    let bus = Bus::new(PeerId::new("peer-a"), BusConfiguration::single("tcp://directory:1234"));

    let greeted = Arc::new(AtomicBool::new(false));
    {
        let greeted = greeted.clone();
        bus.dispatcher().register_handler("GreetHandler", "smoke-tests", move || {
            vec![Arc::new(SyncInvoker::new(
                Arc::new(GreetHandler { greeted: greeted.clone() }),
                MessageTypeId::new("smoke.Greet"),
                true,
                None,
            )) as Arc<dyn zebus_core::invoker::Invoker>]
        });
    }

    let sender = AcceptingSender;
    bus.start(&sender, Endpoint::new("tcp://127.0.0.1:6000")).await.unwrap();
    assert!(bus.directory().get_peer_descriptor(bus.self_id()).is_some());
    assert!(bus.handles_locally(&MessageTypeId::new("smoke.Greet")));

    let (tx, rx) = flume::bounded(1);
    bus.dispatch_locally(
        Arc::new(Greet { who: "world".to_string() }),
        MessageContext::new(bus.self_id().clone(), "msg-1"),
        Box::new(move |snapshot| {
            let _ = tx.send(snapshot);
        }),
    );
    let snapshot = rx.recv_async().await.unwrap();
    assert!(snapshot.was_handled);
    assert!(greeted.load(Ordering::SeqCst));

    bus.stop(&sender).await.unwrap();
}

#[test]
fn local_dispatch_guard_defaults_enabled_and_nests() {
    assert!(zebus_core::local_dispatch::is_enabled());
    let outer = disable_local_dispatch();
    assert!(!zebus_core::local_dispatch::is_enabled());
    drop(outer);
    assert!(zebus_core::local_dispatch::is_enabled());
}
