//! # Messaging Types
//!
//! Shared data model for the messaging core: routed [`Message`] envelopes,
//! participant [`Address`]es, absolute [`ExpiryDate`]s and the RPC bodies
//! ([`Request`], [`Reply`], [`OneWay`]) carried in message payloads.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::time::Duration;
//! use types::{ExpiryDate, Message, MessageType};
//!
//! let expiry = ExpiryDate::from_relative_ttl(Duration::from_secs(10));
//! let message = Message::new(MessageType::OneWay, "sender", "receiver", expiry, "{}");
//! assert!(!message.is_expired());
//! ```
//!
//! Everything here is plain data. Routing, retry and dispatch live in the
//! `message-router` and `rpc` crates.

pub mod address;
pub mod error;
pub mod expiry;
pub mod message;
pub mod rpc;

pub use address::{
    Address, AddressKind, BrowserAddress, ChannelAddress, CommonApiDbusAddress, InProcessAddress,
    MqttAddress, WebSocketAddress, WebSocketClientAddress, WebSocketProtocol,
};
pub use error::TypesError;
pub use expiry::{now_millis, ExpiryDate};
pub use message::{headers, Message, MessageType};
pub use rpc::{OneWay, Reply, ReplyError, Request};
