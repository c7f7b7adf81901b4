//! Message router
//!
//! [`MessageRouter::route`] validates the deadline and schedules a dispatch
//! attempt; it never waits for transport I/O. Each attempt resolves the next
//! hop, picks the stub and transmits. A failed attempt runs the failure
//! action built here, which schedules the next attempt with a delay taken
//! from the [`DeliveryError`] or computed from the [`RetryPolicy`]. Attempts
//! of one message are strictly sequential because each is scheduled from the
//! failure of the previous one.

use crate::{
    DeliveryError, FailureAction, MessagingStub, MessagingStubFactory, RetryPolicy, RoutingError,
    RoutingTable, Scheduler, SchedulerError, StubError,
};
use codec::SerializerFactory;
use messaging_config::RouterSettings;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use types::{now_millis, Address, Message};

/// Snapshot of router counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouterStats {
    pub messages_routed: u64,
    pub transmit_attempts: u64,
    pub retries_scheduled: u64,
    pub expired_drops: u64,
    pub no_route_drops: u64,
    pub shutdown_drops: u64,
    pub fatal_drops: u64,
    pub backpressure_waits: u64,
}

#[derive(Debug, Default)]
struct RouterMetrics {
    messages_routed: AtomicU64,
    transmit_attempts: AtomicU64,
    retries_scheduled: AtomicU64,
    expired_drops: AtomicU64,
    no_route_drops: AtomicU64,
    shutdown_drops: AtomicU64,
    fatal_drops: AtomicU64,
    backpressure_waits: AtomicU64,
}

impl RouterMetrics {
    fn snapshot(&self) -> RouterStats {
        RouterStats {
            messages_routed: self.messages_routed.load(Ordering::Relaxed),
            transmit_attempts: self.transmit_attempts.load(Ordering::Relaxed),
            retries_scheduled: self.retries_scheduled.load(Ordering::Relaxed),
            expired_drops: self.expired_drops.load(Ordering::Relaxed),
            no_route_drops: self.no_route_drops.load(Ordering::Relaxed),
            shutdown_drops: self.shutdown_drops.load(Ordering::Relaxed),
            fatal_drops: self.fatal_drops.load(Ordering::Relaxed),
            backpressure_waits: self.backpressure_waits.load(Ordering::Relaxed),
        }
    }
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

/// Router configuration
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub retry_policy: RetryPolicy,
    pub shutdown_grace_period: Duration,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from(&RouterSettings::default())
    }
}

impl From<&RouterSettings> for RouterConfig {
    fn from(settings: &RouterSettings) -> Self {
        Self {
            retry_policy: RetryPolicy::from(settings),
            shutdown_grace_period: settings.shutdown_grace_period(),
        }
    }
}

#[derive(Clone)]
pub struct MessageRouter {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    routing_table: Arc<RoutingTable>,
    stub_factory: Arc<MessagingStubFactory>,
    serializers: Arc<SerializerFactory>,
    scheduler: Scheduler,
    config: RouterConfig,
    metrics: RouterMetrics,
}

fn check_expiry(message: &Message) -> Result<(), RoutingError> {
    let now = now_millis();
    if message.expiry.is_expired_at(now) {
        return Err(RoutingError::expired(&message.id, message.expiry, now));
    }
    Ok(())
}

impl MessageRouter {
    pub fn new(
        routing_table: Arc<RoutingTable>,
        stub_factory: Arc<MessagingStubFactory>,
        serializers: Arc<SerializerFactory>,
        scheduler: Scheduler,
        config: RouterConfig,
    ) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                routing_table,
                stub_factory,
                serializers,
                scheduler,
                config,
                metrics: RouterMetrics::default(),
            }),
        }
    }

    /// Schedule delivery of `message` to its `to` participant
    ///
    /// Fails without scheduling anything if the message is already expired,
    /// the scheduler is saturated or the router is shutting down.
    pub fn route(&self, message: Message) -> Result<(), RoutingError> {
        if let Err(e) = check_expiry(&message) {
            bump(&self.inner.metrics.expired_drops);
            return Err(e);
        }
        bump(&self.inner.metrics.messages_routed);
        self.inner.schedule(message, Duration::ZERO, 0)
    }

    /// Install or replace the next hop for a participant
    pub fn add_next_hop(&self, participant_id: impl Into<String>, address: Address) {
        let participant_id = participant_id.into();
        debug!("Adding next hop {} -> {}", participant_id, address);
        self.inner.routing_table.put(participant_id, address);
    }

    /// Remove the next hop for a participant; removing an absent hop is a no-op
    pub fn remove_next_hop(&self, participant_id: &str) {
        if let Some(address) = self.inner.routing_table.remove(participant_id) {
            debug!("Removed next hop {} -> {}", participant_id, address);
        }
    }

    pub fn resolve_next_hop(&self, participant_id: &str) -> bool {
        self.inner.routing_table.contains(participant_id)
    }

    pub fn stats(&self) -> RouterStats {
        self.inner.metrics.snapshot()
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.inner.scheduler
    }

    /// Stop scheduling, cancel pending retries and drain in-flight attempts
    ///
    /// Returns `false` when the grace period ran out first.
    pub async fn shutdown(&self) -> bool {
        info!("Message router shutting down");
        self.inner
            .scheduler
            .shutdown(self.inner.config.shutdown_grace_period)
            .await
    }
}

impl std::fmt::Debug for MessageRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRouter")
            .field("routes", &self.inner.routing_table.len())
            .field("scheduler", &self.inner.scheduler)
            .finish()
    }
}

impl RouterInner {
    fn schedule(
        self: &Arc<Self>,
        message: Message,
        delay: Duration,
        retry_count: u32,
    ) -> Result<(), RoutingError> {
        let message_id = message.id.clone();
        let inner = Arc::clone(self);

        self.scheduler
            .submit(delay, async move { inner.dispatch(message, retry_count).await })
            .map_err(|e| match e {
                SchedulerError::Saturated { capacity } => {
                    RoutingError::send_buffer_full(message_id, capacity)
                }
                SchedulerError::ShutDown => RoutingError::shutdown(message_id),
            })
    }

    async fn dispatch(self: Arc<Self>, message: Message, retry_count: u32) {
        if let Err(e) = check_expiry(&message) {
            bump(&self.metrics.expired_drops);
            error!("Dropping message {}: {}", message.short_id(), e);
            return;
        }

        let (address, stub) = match self.resolve_stub(&message.to) {
            Ok(Some(resolved)) => resolved,
            Ok(None) => {
                bump(&self.metrics.no_route_drops);
                error!(
                    "Dropping message {}: {}",
                    message.short_id(),
                    RoutingError::no_route(&message.to)
                );
                return;
            }
            Err(e) => {
                self.on_delivery_failure(message, retry_count, DeliveryError::transport(e.to_string()))
                    .await;
                return;
            }
        };

        info!(
            ">>>>> SEND ID:{}:{:?} from: {} to: {} via: {} attempt: {}",
            message.short_id(),
            message.message_type,
            message.from,
            message.to,
            address.kind(),
            retry_count + 1
        );
        debug!(">>>>> body ID:{}: {}", message.short_id(), message.payload);

        bump(&self.metrics.transmit_attempts);
        let on_failure = self.failure_action(&message, retry_count);

        if address.is_in_process() {
            stub.transmit(message, on_failure).await;
            return;
        }

        let serializer = self.serializers.serializer_for(address.kind());
        match serializer.serialize(&message) {
            Ok(bytes) => stub.transmit_serialized(bytes, on_failure).await,
            Err(e) => {
                bump(&self.metrics.fatal_drops);
                error!("Dropping message {}: {}", message.short_id(), e);
            }
        }
    }

    /// Look up the address and its stub while removal of the hop is excluded
    fn resolve_stub(
        &self,
        participant_id: &str,
    ) -> Result<Option<(Address, Arc<dyn MessagingStub>)>, StubError> {
        self.routing_table
            .with_address(participant_id, |address| {
                self.stub_factory
                    .create(address)
                    .map(|stub| (address.clone(), stub))
            })
            .transpose()
    }

    fn failure_action(self: &Arc<Self>, message: &Message, retry_count: u32) -> FailureAction {
        let inner = Arc::clone(self);
        let failed = message.clone();
        FailureAction::new(message.id.clone(), move |error| async move {
            inner.on_delivery_failure(failed, retry_count, error).await
        })
    }

    async fn on_delivery_failure(
        self: Arc<Self>,
        message: Message,
        retry_count: u32,
        error: DeliveryError,
    ) {
        if error.is_shutdown() {
            bump(&self.metrics.shutdown_drops);
            warn!(
                "Dropping message {} during shutdown: {}",
                message.short_id(),
                error
            );
            return;
        }

        if !error.is_retryable() {
            bump(&self.metrics.fatal_drops);
            error!(
                "!!!! ERROR SENDING: dropping message {} to {}: {}",
                message.short_id(),
                message.to,
                error
            );
            return;
        }

        let delay = error
            .suggested_delay()
            .unwrap_or_else(|| self.config.retry_policy.delay_for(retry_count));

        error!(
            "!!!! ERROR SENDING: message {} to {}: {}",
            message.short_id(),
            message.to,
            error
        );

        loop {
            if message.is_expired() {
                bump(&self.metrics.expired_drops);
                error!(
                    "Dropping message {}: expired at {} before it could be retried",
                    message.short_id(),
                    message.expiry
                );
                return;
            }

            match self.schedule(message.clone(), delay, retry_count + 1) {
                Ok(()) => {
                    bump(&self.metrics.retries_scheduled);
                    info!(
                        "Rescheduling message {} with delay {:?}, expiry: {}",
                        message.short_id(),
                        delay,
                        message.expiry
                    );
                    return;
                }
                Err(RoutingError::SendBufferFull { capacity, .. }) => {
                    bump(&self.metrics.backpressure_waits);
                    let wait = delay.max(self.config.retry_policy.retry_interval);
                    warn!(
                        "Send buffer full ({} pending), retrying submission of message {} in {:?}",
                        capacity,
                        message.short_id(),
                        wait
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    bump(&self.metrics.shutdown_drops);
                    warn!("Dropping message {}: {}", message.short_id(), e);
                    return;
                }
            }
        }
    }
}
