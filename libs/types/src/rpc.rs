//! RPC bodies carried in [`crate::Message`] payloads

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub request_reply_id: String,
    pub method_name: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

impl Request {
    /// Create a request with a fresh correlation id
    pub fn new(method_name: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            request_reply_id: Uuid::new_v4().to_string(),
            method_name: method_name.into(),
            params,
        }
    }
}

/// Error carried back to the requester instead of a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyError {
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply {
    pub request_reply_id: String,
    #[serde(default)]
    pub response: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl Reply {
    pub fn success(request_reply_id: impl Into<String>, response: Vec<Value>) -> Self {
        Self {
            request_reply_id: request_reply_id.into(),
            response,
            error: None,
        }
    }

    pub fn failure(request_reply_id: impl Into<String>, error: ReplyError) -> Self {
        Self {
            request_reply_id: request_reply_id.into(),
            response: Vec::new(),
            error: Some(error),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneWay {
    pub payload: Value,
}

impl OneWay {
    pub fn new(payload: impl Into<Value>) -> Self {
        Self {
            payload: payload.into(),
        }
    }
}
