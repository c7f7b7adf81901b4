//! Request/reply errors

use codec::CodecError;
use message_router::{DeliveryError, RoutingError, SchedulerError};
use std::time::Duration;
use types::{MessageType, ReplyError};

/// Failure raised by a request handler, sent back to the requester as an
/// error reply
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HandlerFault {
    #[error("Method '{method}' not found")]
    MethodNotFound { method: String },

    #[error("Invalid arguments for '{method}': {reason}")]
    InvalidArguments { method: String, reason: String },

    #[error("Provider error: {message}")]
    Provider { message: String },
}

impl HandlerFault {
    pub fn method_not_found(method: impl Into<String>) -> Self {
        HandlerFault::MethodNotFound {
            method: method.into(),
        }
    }

    pub fn invalid_arguments(method: impl Into<String>, reason: impl Into<String>) -> Self {
        HandlerFault::InvalidArguments {
            method: method.into(),
            reason: reason.into(),
        }
    }

    pub fn provider(message: impl Into<String>) -> Self {
        HandlerFault::Provider {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            HandlerFault::MethodNotFound { .. } => "method_not_found",
            HandlerFault::InvalidArguments { .. } => "invalid_arguments",
            HandlerFault::Provider { .. } => "provider",
        }
    }
}

impl From<HandlerFault> for ReplyError {
    fn from(fault: HandlerFault) -> Self {
        ReplyError {
            kind: fault.kind().to_string(),
            message: fault.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DirectoryError {
    #[error("Reply caller already registered for request {request_reply_id}")]
    DuplicateCorrelationId { request_reply_id: String },

    #[error("Buffer for participant '{participant_id}' is full ({capacity} entries)")]
    BufferFull {
        participant_id: String,
        capacity: usize,
    },
}

impl DirectoryError {
    pub fn duplicate(request_reply_id: impl Into<String>) -> Self {
        DirectoryError::DuplicateCorrelationId {
            request_reply_id: request_reply_id.into(),
        }
    }

    pub fn buffer_full(participant_id: impl Into<String>, capacity: usize) -> Self {
        DirectoryError::BufferFull {
            participant_id: participant_id.into(),
            capacity,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum DispatchError {
    #[error("Message {message_id} expired before dispatch")]
    Expired { message_id: String },

    #[error("Unsupported message type {0:?}")]
    UnsupportedMessageType(MessageType),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Unable to schedule handler: {0}")]
    Scheduler(#[from] SchedulerError),
}

impl From<DispatchError> for DeliveryError {
    fn from(error: DispatchError) -> Self {
        match &error {
            DispatchError::Scheduler(SchedulerError::ShutDown) => {
                DeliveryError::shutdown(error.to_string())
            }
            DispatchError::Scheduler(SchedulerError::Saturated { .. })
            | DispatchError::Directory(DirectoryError::BufferFull { .. }) => {
                DeliveryError::transport(error.to_string())
            }
            _ => DeliveryError::fatal(error.to_string()),
        }
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum SendError {
    #[error(transparent)]
    Routing(#[from] RoutingError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("No reply for request {request_reply_id} within {waited:?}")]
    ReplyTimeout {
        request_reply_id: String,
        waited: Duration,
    },
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum RuntimeError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}
