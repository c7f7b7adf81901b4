//! Byte-level message serializers

use crate::CodecError;
use std::fmt::Debug;
use types::Message;

/// Converts a message envelope to and from the bytes a transport carries
pub trait MessageSerializer: Send + Sync + Debug {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, CodecError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<Message, CodecError>;

    /// Name used in logs
    fn name(&self) -> &'static str;
}

/// JSON envelope encoding
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonSerializer;

impl MessageSerializer for JsonSerializer {
    fn serialize(&self, message: &Message) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(message).map_err(|e| CodecError::serialize(&message.id, e))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<Message, CodecError> {
        serde_json::from_slice(bytes).map_err(|e| CodecError::deserialize(bytes.len(), e))
    }

    fn name(&self) -> &'static str {
        "json"
    }
}
