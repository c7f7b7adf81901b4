//! End-to-end scenarios for the messaging runtime
//!
//! Runtimes talk either in-process or through [`LoopbackBroker`], an MQTT
//! stand-in that serializes every message and hands it to the dispatcher
//! subscribed to the address topic.

pub mod fixtures;

pub use fixtures::*;
