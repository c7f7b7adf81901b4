//! Routed message envelope

use crate::ExpiryDate;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Well-known header names and values
pub mod headers {
    pub const CONTENT_TYPE: &str = "contentType";
    pub const REPLY_TO: &str = "replyTo";

    pub const APPLICATION_JSON: &str = "application/json";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    Request,
    Reply,
    OneWay,
    SubscriptionRequest,
    BroadcastSubscriptionRequest,
    MulticastSubscriptionRequest,
    SubscriptionReply,
    Publication,
    Multicast,
    SubscriptionStop,
}

impl MessageType {
    /// Types whose receiver answers to the sender's reply-to address
    pub fn expects_reply(&self) -> bool {
        matches!(
            self,
            MessageType::Request
                | MessageType::SubscriptionRequest
                | MessageType::BroadcastSubscriptionRequest
                | MessageType::MulticastSubscriptionRequest
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub from: String,
    pub to: String,
    pub expiry: ExpiryDate,
    pub payload: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub headers: HashMap<String, String>,
}

impl Message {
    /// Create a message with a fresh unique id
    pub fn new(
        message_type: MessageType,
        from: impl Into<String>,
        to: impl Into<String>,
        expiry: ExpiryDate,
        payload: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            message_type,
            from: from.into(),
            to: to.into(),
            expiry,
            payload: payload.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    pub fn is_expired(&self) -> bool {
        self.expiry.is_expired()
    }

    /// Trailing segment of the id, enough to correlate log lines
    pub fn short_id(&self) -> &str {
        match self.id.rfind('-') {
            Some(pos) if pos + 1 < self.id.len() => &self.id[pos + 1..],
            _ => &self.id,
        }
    }
}
