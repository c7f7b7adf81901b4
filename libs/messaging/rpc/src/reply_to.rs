//! Reply-to header for request-like messages

use codec::{encode_payload, CodecError};
use types::{headers, Address, Message};

/// Stamps the global reply-to address onto outgoing messages that expect an
/// answer
#[derive(Debug, Clone)]
pub struct ReplyToAddressCalculator {
    serialized_address: String,
}

impl ReplyToAddressCalculator {
    pub fn new(reply_to: &Address) -> Result<Self, CodecError> {
        Ok(Self {
            serialized_address: encode_payload(reply_to)?,
        })
    }

    /// Set the `replyTo` header unless the message already carries one or
    /// its type never gets answered
    pub fn set_reply_to(&self, message: &mut Message) {
        if !message.message_type.expects_reply() || message.header(headers::REPLY_TO).is_some() {
            return;
        }
        message
            .headers
            .insert(headers::REPLY_TO.to_string(), self.serialized_address.clone());
    }
}
