//! Router errors
//!
//! [`RoutingError`] is returned synchronously from [`crate::MessageRouter::route`].
//! [`DeliveryError`] is what a stub hands to its failure action once dispatch
//! is already running; the router decides between retry and drop from it.

use std::time::Duration;
use types::{AddressKind, ExpiryDate};

#[derive(Debug, Clone, thiserror::Error)]
pub enum RoutingError {
    #[error("Message {message_id} expired: ttl must be in the future (now: {now}ms, expiry: {expiry})")]
    Expired {
        message_id: String,
        expiry: ExpiryDate,
        now: u64,
    },

    #[error("No route to participant '{participant_id}'")]
    NoRoute { participant_id: String },

    #[error("Send buffer full, message {message_id} not scheduled (capacity: {capacity})")]
    SendBufferFull { message_id: String, capacity: usize },

    #[error("Router shutting down, message {message_id} not scheduled")]
    Shutdown { message_id: String },
}

impl RoutingError {
    pub fn expired(message_id: impl Into<String>, expiry: ExpiryDate, now: u64) -> Self {
        RoutingError::Expired {
            message_id: message_id.into(),
            expiry,
            now,
        }
    }

    pub fn no_route(participant_id: impl Into<String>) -> Self {
        RoutingError::NoRoute {
            participant_id: participant_id.into(),
        }
    }

    pub fn send_buffer_full(message_id: impl Into<String>, capacity: usize) -> Self {
        RoutingError::SendBufferFull {
            message_id: message_id.into(),
            capacity,
        }
    }

    pub fn shutdown(message_id: impl Into<String>) -> Self {
        RoutingError::Shutdown {
            message_id: message_id.into(),
        }
    }
}

/// Failure reported by a messaging stub
#[derive(Debug, Clone, thiserror::Error)]
pub enum DeliveryError {
    /// Transport failed; retried with backoff
    #[error("Transport failure: {reason}")]
    Transport { reason: String },

    /// Transport asks for a retry after a specific delay
    #[error("Delivery delayed by {delay:?}: {reason}")]
    Delayed { reason: String, delay: Duration },

    /// Retrying cannot succeed; the message is dropped
    #[error("Delivery failed permanently: {reason}")]
    Fatal { reason: String },

    /// Transport is shutting down; the message is dropped
    #[error("Transport shutting down: {reason}")]
    Shutdown { reason: String },
}

impl DeliveryError {
    pub fn transport(reason: impl Into<String>) -> Self {
        DeliveryError::Transport {
            reason: reason.into(),
        }
    }

    pub fn delayed(reason: impl Into<String>, delay: Duration) -> Self {
        DeliveryError::Delayed {
            reason: reason.into(),
            delay,
        }
    }

    pub fn fatal(reason: impl Into<String>) -> Self {
        DeliveryError::Fatal {
            reason: reason.into(),
        }
    }

    pub fn shutdown(reason: impl Into<String>) -> Self {
        DeliveryError::Shutdown {
            reason: reason.into(),
        }
    }

    /// Delay requested by the transport, used verbatim when present
    pub fn suggested_delay(&self) -> Option<Duration> {
        match self {
            DeliveryError::Delayed { delay, .. } => Some(*delay),
            _ => None,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DeliveryError::Transport { .. } | DeliveryError::Delayed { .. }
        )
    }

    pub fn is_shutdown(&self) -> bool {
        matches!(self, DeliveryError::Shutdown { .. })
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StubError {
    #[error("No stub factory registered for {kind} addresses")]
    NoFactory { kind: AddressKind },

    #[error("Cannot create stub for {address}: {reason}")]
    CannotCreate { address: String, reason: String },
}

impl StubError {
    pub fn cannot_create(address: impl ToString, reason: impl Into<String>) -> Self {
        StubError::CannotCreate {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error("Scheduler saturated ({capacity} pending tasks)")]
    Saturated { capacity: usize },

    #[error("Scheduler shut down")]
    ShutDown,
}
