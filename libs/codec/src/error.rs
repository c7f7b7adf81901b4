//! Codec errors

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum CodecError {
    /// Message envelope could not be encoded
    #[error("Failed to serialize message {message_id}: {reason}")]
    Serialize { message_id: String, reason: String },

    /// Bytes did not decode into a message envelope
    #[error("Failed to deserialize message ({size} bytes): {reason}")]
    Deserialize { size: usize, reason: String },

    /// Payload body did not match the type expected for the message
    #[error("Invalid {body} payload: {reason}")]
    Payload { body: &'static str, reason: String },
}

impl CodecError {
    pub fn serialize(message_id: impl Into<String>, reason: impl ToString) -> Self {
        CodecError::Serialize {
            message_id: message_id.into(),
            reason: reason.to_string(),
        }
    }

    pub fn deserialize(size: usize, reason: impl ToString) -> Self {
        CodecError::Deserialize {
            size,
            reason: reason.to_string(),
        }
    }

    pub fn payload(body: &'static str, reason: impl ToString) -> Self {
        CodecError::Payload {
            body,
            reason: reason.to_string(),
        }
    }
}
