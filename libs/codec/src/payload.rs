//! Payload bodies
//!
//! Request, reply and one-way bodies travel as JSON text inside
//! [`types::Message::payload`].

use crate::CodecError;
use serde::{de::DeserializeOwned, Serialize};
use std::any::type_name;

fn short_type_name<T>() -> &'static str {
    let full = type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

pub fn encode_payload<T: Serialize>(body: &T) -> Result<String, CodecError> {
    serde_json::to_string(body).map_err(|e| CodecError::payload(short_type_name::<T>(), e))
}

pub fn decode_payload<T: DeserializeOwned>(payload: &str) -> Result<T, CodecError> {
    serde_json::from_str(payload).map_err(|e| CodecError::payload(short_type_name::<T>(), e))
}
