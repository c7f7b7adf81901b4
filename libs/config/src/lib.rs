//! # Messaging Configuration
//!
//! Settings for the message router, the request/reply dispatcher and the
//! runtime that wires them, loaded from TOML with `MESSAGING_` environment
//! overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use messaging_config::MessagingConfig;
//! use std::path::Path;
//!
//! let config = MessagingConfig::load(Some(Path::new("config/messaging.toml")))?;
//! println!("retry interval: {:?}", config.router.retry_interval());
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! Nested keys are overridden with a double underscore, e.g.
//! `MESSAGING_ROUTER__SCHEDULER_CAPACITY=5000`.

pub mod defaults;
pub mod messaging_config;

pub use messaging_config::{
    DispatcherSettings, MessagingConfig, OverflowPolicy, RouterSettings, RuntimeSettings,
    StaticRoute,
};
