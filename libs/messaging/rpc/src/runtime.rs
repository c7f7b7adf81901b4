//! Messaging runtime
//!
//! Wires the scheduler, routing table, stub and serializer factories, router,
//! reply directory, manager and dispatcher from one [`MessagingConfig`].
//! Local participants are reached through an in-process address whose
//! receiver is the dispatcher.

use crate::{
    BufferPolicy, OneWayRecipient, ReplyCallerDirectory, ReplyToAddressCalculator, RequestCaller,
    RequestReplyDispatcher, RequestReplyManager, RuntimeError,
};
use codec::SerializerFactory;
use message_router::{
    InProcessReceiver, InProcessStubFactory, MessageRouter, MessagingStubFactory, RouterConfig,
    RoutingTable, Scheduler,
};
use messaging_config::MessagingConfig;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;
use types::{Address, AddressKind};

pub struct MessagingRuntime {
    config: MessagingConfig,
    local_address: Address,
    routing_table: Arc<RoutingTable>,
    stub_factory: Arc<MessagingStubFactory>,
    in_process: Arc<InProcessStubFactory>,
    serializers: Arc<SerializerFactory>,
    router: MessageRouter,
    manager: Arc<RequestReplyManager>,
    dispatcher: Arc<RequestReplyDispatcher>,
    maintenance: Mutex<Vec<JoinHandle<()>>>,
}

impl MessagingRuntime {
    /// Build and start a runtime
    ///
    /// Must be called from within a Tokio runtime; the reply reaper and the
    /// buffer purge start immediately.
    pub fn new(config: MessagingConfig) -> Result<Self, RuntimeError> {
        config
            .validate()
            .map_err(|e| RuntimeError::InvalidConfig(format!("{:#}", e)))?;

        let scheduler = Scheduler::new("messaging", config.router.scheduler_capacity);

        let routing_table = Arc::new(RoutingTable::new());
        for route in &config.routes {
            routing_table.put(route.participant_id.clone(), route.address.clone());
        }

        let in_process = Arc::new(InProcessStubFactory::new());
        let stub_factory = Arc::new(MessagingStubFactory::new());
        stub_factory.register(AddressKind::InProcess, in_process.clone());

        let serializers = Arc::new(SerializerFactory::new());
        let router = MessageRouter::new(
            Arc::clone(&routing_table),
            Arc::clone(&stub_factory),
            Arc::clone(&serializers),
            scheduler.clone(),
            RouterConfig::from(&config.router),
        );

        let reply_callers = Arc::new(ReplyCallerDirectory::new());
        let mut manager = RequestReplyManager::new(
            router.clone(),
            Arc::clone(&reply_callers),
            config.dispatcher.reply_wait_multiplier,
        );
        if let Some(reply_to) = &config.runtime.reply_to_address {
            manager = manager.with_reply_to(ReplyToAddressCalculator::new(reply_to)?);
        }
        let manager = Arc::new(manager);

        let dispatcher = Arc::new(RequestReplyDispatcher::new(
            Arc::clone(&manager),
            BufferPolicy::from(&config.dispatcher),
        ));
        let receiver: Arc<dyn InProcessReceiver> = dispatcher.clone();
        in_process.register_receiver(config.runtime.local_receiver_id.clone(), &receiver);

        let reaper_interval = config.dispatcher.reaper_interval();
        let reaper = reply_callers.start_reaper(&scheduler, reaper_interval);
        let purge = {
            let dispatcher = Arc::downgrade(&dispatcher);
            scheduler.spawn_periodic(reaper_interval, move || {
                if let Some(dispatcher) = dispatcher.upgrade() {
                    dispatcher.purge_expired_buffers();
                }
            })
        };

        info!(
            "Messaging runtime started: local receiver '{}', {} static routes, scheduler capacity {}",
            config.runtime.local_receiver_id,
            config.routes.len(),
            config.router.scheduler_capacity
        );

        Ok(Self {
            local_address: Address::in_process(config.runtime.local_receiver_id.clone()),
            config,
            routing_table,
            stub_factory,
            in_process,
            serializers,
            router,
            manager,
            dispatcher,
            maintenance: Mutex::new(vec![reaper, purge]),
        })
    }

    /// Address every locally registered participant is routed to
    pub fn local_address(&self) -> &Address {
        &self.local_address
    }

    /// Serve requests addressed to `participant_id` from this process
    pub fn register_provider(&self, participant_id: &str, caller: Arc<dyn RequestCaller>) {
        self.router
            .add_next_hop(participant_id, self.local_address.clone());
        self.dispatcher.add_caller(participant_id, caller);
    }

    /// Stop serving `participant_id`; later requests are buffered until a
    /// provider registers again
    pub fn unregister_provider(&self, participant_id: &str) -> bool {
        self.dispatcher.remove_caller(participant_id)
    }

    /// Route replies and one-way messages for `participant_id` to this process
    pub fn register_consumer(&self, participant_id: &str) {
        self.router
            .add_next_hop(participant_id, self.local_address.clone());
    }

    pub fn register_one_way_recipient(
        &self,
        participant_id: &str,
        recipient: Arc<dyn OneWayRecipient>,
    ) {
        self.router
            .add_next_hop(participant_id, self.local_address.clone());
        self.dispatcher
            .add_one_way_recipient(participant_id, recipient);
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    pub fn router(&self) -> &MessageRouter {
        &self.router
    }

    pub fn manager(&self) -> &Arc<RequestReplyManager> {
        &self.manager
    }

    pub fn dispatcher(&self) -> &Arc<RequestReplyDispatcher> {
        &self.dispatcher
    }

    pub fn routing_table(&self) -> &Arc<RoutingTable> {
        &self.routing_table
    }

    /// Register middleware factories for remote address kinds here
    pub fn stub_factory(&self) -> &Arc<MessagingStubFactory> {
        &self.stub_factory
    }

    pub fn in_process_factory(&self) -> &Arc<InProcessStubFactory> {
        &self.in_process
    }

    pub fn serializers(&self) -> &Arc<SerializerFactory> {
        &self.serializers
    }

    /// Stop maintenance tasks and drain the router
    ///
    /// Returns `false` when in-flight work outlived the grace period.
    pub async fn shutdown(&self) -> bool {
        for handle in self.maintenance.lock().drain(..) {
            handle.abort();
        }
        self.in_process
            .unregister_receiver(&self.config.runtime.local_receiver_id);
        let drained = self.router.shutdown().await;
        info!("Messaging runtime stopped (drained: {})", drained);
        drained
    }
}

impl std::fmt::Debug for MessagingRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagingRuntime")
            .field("local_address", &self.local_address)
            .field("router", &self.router)
            .finish()
    }
}
