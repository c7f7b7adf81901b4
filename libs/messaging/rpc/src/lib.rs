//! # Request/Reply
//!
//! Correlates outgoing requests with their replies and delivers inbound
//! requests and one-way messages to locally registered handlers.
//!
//! ## Architecture Role
//!
//! ```text
//!  send_request ──► RequestReplyManager ──► MessageRouter ──► stub
//!                          │
//!                  ReplyCallerDirectory ◄── handle_reply
//!                                                ▲
//!  inbound Message ──► RequestReplyDispatcher ───┤
//!                          ├─► CallerDirectory<RequestCaller>   (buffers until registered)
//!                          └─► CallerDirectory<OneWayRecipient> (buffers until registered)
//! ```
//!
//! [`MessagingRuntime`] wires all of it, with the dispatcher registered as
//! the in-process receiver for local participants.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use messaging_config::MessagingConfig;
//! use rpc::{test_utils::RecordingRequestCaller, MessagingRuntime};
//! use std::{sync::Arc, time::Duration};
//! use types::Request;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let runtime = MessagingRuntime::new(MessagingConfig::default())?;
//! runtime.register_provider("provider", Arc::new(RecordingRequestCaller::new()));
//! runtime.register_consumer("consumer");
//!
//! let reply = runtime
//!     .manager()
//!     .send_sync_request("consumer", "provider", Request::new("echo", vec![]), Duration::from_secs(5))
//!     .await?;
//! println!("{:?}", reply.response);
//! runtime.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod caller_directory;
pub mod callers;
pub mod dispatcher;
pub mod error;
pub mod manager;
pub mod reply_directory;
pub mod reply_to;
pub mod runtime;
pub mod test_utils;

pub use caller_directory::{BufferPolicy, CallerDirectory, Routed};
pub use callers::{OneWayRecipient, ReplyCallback, ReplyCaller, RequestCaller};
pub use dispatcher::RequestReplyDispatcher;
pub use error::{DirectoryError, DispatchError, HandlerFault, RuntimeError, SendError};
pub use manager::RequestReplyManager;
pub use reply_directory::ReplyCallerDirectory;
pub use reply_to::ReplyToAddressCalculator;
pub use runtime::MessagingRuntime;
