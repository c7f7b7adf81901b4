//! # Message Router
//!
//! Resolves a participant id to a transport [`types::Address`] and hands the
//! message to the stub for that address kind, enforcing message deadlines and
//! retrying transport failures with jittered exponential backoff.
//!
//! ## Architecture Role
//!
//! ```text
//! RoutingTable → MessagingStubFactory → MessageRouter → MessagingStub → transport
//!                                              ↑
//!                                          Scheduler (shared, bounded)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use message_router::{MessageRouter, MessagingStubFactory, RouterConfig, RoutingTable, Scheduler};
//! use codec::SerializerFactory;
//! use std::sync::Arc;
//!
//! # async fn example() {
//! let router = MessageRouter::new(
//!     Arc::new(RoutingTable::new()),
//!     Arc::new(MessagingStubFactory::new()),
//!     Arc::new(SerializerFactory::new()),
//!     Scheduler::new("messaging", 1_000),
//!     RouterConfig::default(),
//! );
//! router.add_next_hop("provider", types::Address::mqtt("tcp://broker:1883", "provider"));
//! # }
//! ```

pub mod backoff;
pub mod error;
pub mod factory;
pub mod in_process;
pub mod router;
pub mod routing_table;
pub mod scheduler;
pub mod stub;
pub mod test_utils;

pub use backoff::{exponential_backoff, RetryPolicy};
pub use error::{DeliveryError, RoutingError, SchedulerError, StubError};
pub use factory::{MessagingStubFactory, MiddlewareStubFactory};
pub use in_process::{InProcessReceiver, InProcessStub, InProcessStubFactory};
pub use router::{MessageRouter, RouterConfig, RouterStats};
pub use routing_table::RoutingTable;
pub use scheduler::Scheduler;
pub use stub::{BoxFuture, FailureAction, MessagingStub};
