//! Messaging stub abstraction
//!
//! A stub hands one message to one transport. It never retries by itself:
//! when transmission fails it executes the [`FailureAction`] it was given and
//! the router decides what happens next.

use crate::DeliveryError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use types::Message;

/// Type alias for boxed failure continuations
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

type FailureFn = Box<dyn FnOnce(DeliveryError) -> BoxFuture<'static, ()> + Send>;

/// Continuation run when a transmit attempt fails
///
/// Consumed on execution, so each attempt reports at most one failure.
pub struct FailureAction {
    message_id: String,
    action: FailureFn,
}

impl FailureAction {
    pub fn new<F, Fut>(message_id: impl Into<String>, action: F) -> Self
    where
        F: FnOnce(DeliveryError) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            message_id: message_id.into(),
            action: Box::new(move |error| Box::pin(action(error))),
        }
    }

    /// Action that only logs the failure
    pub fn log_only(message_id: impl Into<String>) -> Self {
        let message_id = message_id.into();
        let id = message_id.clone();
        Self::new(message_id, move |error| async move {
            tracing::warn!("Transmit of message {} failed: {}", id, error);
        })
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub async fn execute(self, error: DeliveryError) {
        (self.action)(error).await
    }
}

impl fmt::Debug for FailureAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureAction")
            .field("message_id", &self.message_id)
            .finish_non_exhaustive()
    }
}

/// Transport endpoint for one address
///
/// In-process stubs implement [`MessagingStub::transmit`]; stubs for remote
/// transports implement [`MessagingStub::transmit_serialized`]. The default
/// for the other method reports a non-retryable failure.
#[async_trait]
pub trait MessagingStub: Send + Sync + fmt::Debug {
    async fn transmit(&self, message: Message, on_failure: FailureAction) {
        on_failure
            .execute(DeliveryError::fatal(format!(
                "{:?} does not accept structured message {}",
                self, message.id
            )))
            .await;
    }

    async fn transmit_serialized(&self, serialized: Vec<u8>, on_failure: FailureAction) {
        on_failure
            .execute(DeliveryError::fatal(format!(
                "{:?} does not accept serialized messages ({} bytes)",
                self,
                serialized.len()
            )))
            .await;
    }
}
