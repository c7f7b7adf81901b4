//! # Message Codec
//!
//! Turns routed [`types::Message`]s into bytes for every transport that is not
//! in-process, and encodes the RPC bodies carried in message payloads.
//!
//! ## Architecture Role
//!
//! ```text
//! libs/types → [codec] → message-router (remote stubs)
//!                   ↘ rpc (payload bodies)
//! ```
//!
//! Serializers are selected per [`types::AddressKind`] through the
//! [`SerializerFactory`]; kinds without an explicit registration fall back to
//! [`JsonSerializer`].

pub mod error;
pub mod factory;
pub mod payload;
pub mod serializer;

pub use error::CodecError;
pub use factory::SerializerFactory;
pub use payload::{decode_payload, encode_payload};
pub use serializer::{JsonSerializer, MessageSerializer};
