//! Default configuration values
//!
//! Shared by the serde defaults in [`crate::MessagingConfig`] and by code that
//! builds settings without a config file.

/// Message router defaults
pub mod router {
    /// Base delay before a failed transmit is retried (milliseconds)
    pub const SEND_MSG_RETRY_INTERVAL_MS: u64 = 3_000;

    /// Upper bound for a single computed retry delay (milliseconds)
    pub const MAX_RETRY_DELAY_MS: u64 = 60_000;

    /// Pending tasks the shared scheduler accepts before reporting saturation
    pub const SCHEDULER_CAPACITY: usize = 1_000;

    /// How long shutdown waits for in-flight work (milliseconds)
    pub const SHUTDOWN_GRACE_PERIOD_MS: u64 = 5_000;
}

/// Request/reply dispatcher defaults
pub mod dispatcher {
    /// Reply callers stay registered for `ttl * REPLY_WAIT_MULTIPLIER`
    pub const REPLY_WAIT_MULTIPLIER: f64 = 1.0;

    /// Buffered messages kept per unregistered participant
    pub const MAX_BUFFERED_PER_PARTICIPANT: usize = 1_000;

    /// Interval of the expired-entry reaper (milliseconds)
    pub const REAPER_INTERVAL_MS: u64 = 1_000;
}

/// Runtime defaults
pub mod runtime {
    /// Id of the in-process address the local dispatcher listens on
    pub const LOCAL_RECEIVER_ID: &str = "local";

    /// Prefix of environment variables overriding file values
    pub const ENV_PREFIX: &str = "MESSAGING";
}
