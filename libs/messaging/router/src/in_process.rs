//! In-process delivery
//!
//! Messages for [`Address::InProcess`] are handed to an [`InProcessReceiver`]
//! registered under the address id, without serialization. Receivers are held
//! weakly so that a receiver which itself owns the router does not form a
//! reference cycle.

use crate::{DeliveryError, FailureAction, MessagingStub, MiddlewareStubFactory, StubError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::{Arc, Weak};
use types::{Address, Message};

/// Local endpoint that accepts structured messages
pub trait InProcessReceiver: Send + Sync {
    fn receive(&self, message: Message) -> Result<(), DeliveryError>;
}

pub struct InProcessStub {
    receiver_id: String,
    receiver: Weak<dyn InProcessReceiver>,
}

impl fmt::Debug for InProcessStub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessStub")
            .field("receiver_id", &self.receiver_id)
            .finish()
    }
}

#[async_trait]
impl MessagingStub for InProcessStub {
    async fn transmit(&self, message: Message, on_failure: FailureAction) {
        let Some(receiver) = self.receiver.upgrade() else {
            on_failure
                .execute(DeliveryError::fatal(format!(
                    "in-process receiver '{}' has been dropped",
                    self.receiver_id
                )))
                .await;
            return;
        };

        if let Err(e) = receiver.receive(message) {
            on_failure.execute(e).await;
        }
    }
}

#[derive(Default)]
pub struct InProcessStubFactory {
    receivers: DashMap<String, Weak<dyn InProcessReceiver>>,
}

impl InProcessStubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_receiver(&self, receiver_id: impl Into<String>, receiver: &Arc<dyn InProcessReceiver>) {
        self.receivers.insert(receiver_id.into(), Arc::downgrade(receiver));
    }

    pub fn unregister_receiver(&self, receiver_id: &str) -> bool {
        self.receivers.remove(receiver_id).is_some()
    }

    fn live_receiver(&self, receiver_id: &str) -> Option<Weak<dyn InProcessReceiver>> {
        self.receivers
            .get(receiver_id)
            .filter(|entry| entry.strong_count() > 0)
            .map(|entry| entry.value().clone())
    }
}

impl fmt::Debug for InProcessStubFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcessStubFactory")
            .field("receivers", &self.receivers.len())
            .finish()
    }
}

impl MiddlewareStubFactory for InProcessStubFactory {
    fn can_create(&self, address: &Address) -> bool {
        match address {
            Address::InProcess(a) => self.live_receiver(&a.id).is_some(),
            _ => false,
        }
    }

    fn create(&self, address: &Address) -> Result<Arc<dyn MessagingStub>, StubError> {
        let Address::InProcess(a) = address else {
            return Err(StubError::cannot_create(address, "not an in-process address"));
        };

        let receiver = self
            .live_receiver(&a.id)
            .ok_or_else(|| StubError::cannot_create(address, "no receiver registered"))?;

        Ok(Arc::new(InProcessStub {
            receiver_id: a.id.clone(),
            receiver,
        }))
    }
}
