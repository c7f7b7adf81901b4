//! Shared fixtures: loopback broker and runtime builders

use async_trait::async_trait;
use codec::{JsonSerializer, MessageSerializer};
use dashmap::DashMap;
use message_router::{
    DeliveryError, FailureAction, MessagingStub, MiddlewareStubFactory, StubError,
};
use messaging_config::MessagingConfig;
use rpc::{MessagingRuntime, RequestReplyDispatcher};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::debug;
use types::{Address, AddressKind};

pub const BROKER_URI: &str = "tcp://loopback:1883";

/// In-memory MQTT stand-in delivering serialized messages by topic
#[derive(Default)]
pub struct LoopbackBroker {
    subscribers: DashMap<String, Weak<RequestReplyDispatcher>>,
    delivered: Arc<AtomicUsize>,
}

impl LoopbackBroker {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Deliver messages published on `topic` to `dispatcher`
    pub fn subscribe(&self, topic: &str, dispatcher: &Arc<RequestReplyDispatcher>) {
        self.subscribers
            .insert(topic.to_string(), Arc::downgrade(dispatcher));
    }

    /// Messages handed to a subscriber so far
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Let `runtime` publish through this broker
    pub fn attach(self: &Arc<Self>, runtime: &MessagingRuntime) {
        runtime
            .stub_factory()
            .register(AddressKind::Mqtt, Arc::clone(self) as Arc<dyn MiddlewareStubFactory>);
    }
}

impl fmt::Debug for LoopbackBroker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackBroker")
            .field("topics", &self.subscribers.len())
            .field("delivered", &self.delivered())
            .finish()
    }
}

impl MiddlewareStubFactory for LoopbackBroker {
    fn can_create(&self, address: &Address) -> bool {
        matches!(address, Address::Mqtt(a) if a.broker_uri == BROKER_URI)
    }

    fn create(&self, address: &Address) -> Result<Arc<dyn MessagingStub>, StubError> {
        let Address::Mqtt(mqtt) = address else {
            return Err(StubError::cannot_create(address, "not an MQTT address"));
        };
        let subscriber = self
            .subscribers
            .get(&mqtt.topic)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| StubError::cannot_create(address, "no subscriber for topic"))?;

        Ok(Arc::new(LoopbackStub {
            topic: mqtt.topic.clone(),
            subscriber,
            delivered: Arc::clone(&self.delivered),
        }))
    }
}

struct LoopbackStub {
    topic: String,
    subscriber: Weak<RequestReplyDispatcher>,
    delivered: Arc<AtomicUsize>,
}

impl fmt::Debug for LoopbackStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoopbackStub")
            .field("topic", &self.topic)
            .finish()
    }
}

#[async_trait]
impl MessagingStub for LoopbackStub {
    async fn transmit_serialized(&self, serialized: Vec<u8>, on_failure: FailureAction) {
        let Some(dispatcher) = self.subscriber.upgrade() else {
            on_failure
                .execute(DeliveryError::transport(format!(
                    "subscriber for '{}' is gone",
                    self.topic
                )))
                .await;
            return;
        };

        let message = match JsonSerializer.deserialize(&serialized) {
            Ok(message) => message,
            Err(e) => {
                on_failure.execute(DeliveryError::fatal(e.to_string())).await;
                return;
            }
        };

        debug!("Loopback '{}' delivering {}", self.topic, message.short_id());
        self.delivered.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = dispatcher.message_arrived(message) {
            on_failure.execute(DeliveryError::from(e)).await;
        }
    }
}

/// Defaults with retry and maintenance intervals short enough for tests
pub fn fast_config() -> MessagingConfig {
    let mut config = MessagingConfig::default();
    config.router.send_msg_retry_interval_ms = 20;
    config.router.max_retry_delay_ms = 200;
    config.router.shutdown_grace_period_ms = 1_000;
    config.dispatcher.reaper_interval_ms = 20;
    config
}

pub fn mqtt(topic: &str) -> Address {
    Address::mqtt(BROKER_URI, topic)
}
