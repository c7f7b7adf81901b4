//! Messaging Configuration Module
//!
//! Loads [`MessagingConfig`] from an optional TOML file and `MESSAGING_`
//! prefixed environment variables. Every field has a default, so an empty
//! source yields a usable configuration.

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use types::Address;

/// Top-level configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct MessagingConfig {
    pub router: RouterSettings,
    pub dispatcher: DispatcherSettings,
    pub runtime: RuntimeSettings,
    /// Next hops installed into the routing table at startup
    pub routes: Vec<StaticRoute>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RouterSettings {
    pub send_msg_retry_interval_ms: u64,
    pub max_retry_delay_ms: u64,
    pub scheduler_capacity: usize,
    pub shutdown_grace_period_ms: u64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            send_msg_retry_interval_ms: defaults::router::SEND_MSG_RETRY_INTERVAL_MS,
            max_retry_delay_ms: defaults::router::MAX_RETRY_DELAY_MS,
            scheduler_capacity: defaults::router::SCHEDULER_CAPACITY,
            shutdown_grace_period_ms: defaults::router::SHUTDOWN_GRACE_PERIOD_MS,
        }
    }
}

impl RouterSettings {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.send_msg_retry_interval_ms)
    }

    pub fn max_retry_delay(&self) -> Duration {
        Duration::from_millis(self.max_retry_delay_ms)
    }

    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }
}

/// What happens when a participant's buffered queue is full
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Evict the oldest buffered entry to make room
    #[default]
    DropOldest,
    /// Refuse the incoming entry
    RejectNewest,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct DispatcherSettings {
    pub reply_wait_multiplier: f64,
    pub max_buffered_per_participant: usize,
    pub overflow_policy: OverflowPolicy,
    pub reaper_interval_ms: u64,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            reply_wait_multiplier: defaults::dispatcher::REPLY_WAIT_MULTIPLIER,
            max_buffered_per_participant: defaults::dispatcher::MAX_BUFFERED_PER_PARTICIPANT,
            overflow_policy: OverflowPolicy::default(),
            reaper_interval_ms: defaults::dispatcher::REAPER_INTERVAL_MS,
        }
    }
}

impl DispatcherSettings {
    pub fn reaper_interval(&self) -> Duration {
        Duration::from_millis(self.reaper_interval_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct RuntimeSettings {
    /// Id of the in-process address local providers are reached through
    pub local_receiver_id: String,
    /// Written into the `replyTo` header of outgoing request-like messages
    pub reply_to_address: Option<Address>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            local_receiver_id: defaults::runtime::LOCAL_RECEIVER_ID.to_string(),
            reply_to_address: None,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct StaticRoute {
    pub participant_id: String,
    pub address: Address,
}

impl MessagingConfig {
    /// Load configuration from an optional file with environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading messaging config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (MESSAGING_ prefix)
        builder = builder.add_source(
            Environment::with_prefix(defaults::runtime::ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder
            .build()
            .context("Failed to build messaging configuration")?;

        let mut config: MessagingConfig = config
            .try_deserialize()
            .context("Failed to deserialize messaging configuration")?;

        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text without consulting the environment
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: MessagingConfig =
            toml::from_str(content).context("Failed to parse messaging configuration")?;
        config.expand_env_vars()?;
        config.validate()?;
        Ok(config)
    }

    /// Expand environment variables in static route ids and addresses
    pub fn expand_env_vars(&mut self) -> Result<()> {
        for route in &mut self.routes {
            route.participant_id = shellexpand::env(&route.participant_id)
                .context("Failed to expand route participant id")?
                .to_string();

            route
                .address
                .map_strings(|value| {
                    shellexpand::env(value)
                        .map(|expanded| expanded.to_string())
                        .with_context(|| format!("Failed to expand address field '{}'", value))
                })?;
        }

        if let Some(address) = &mut self.runtime.reply_to_address {
            address.map_strings(|value| {
                shellexpand::env(value)
                    .map(|expanded| expanded.to_string())
                    .with_context(|| format!("Failed to expand reply-to field '{}'", value))
            })?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.router.scheduler_capacity == 0 {
            bail!("router.scheduler_capacity must be greater than zero");
        }
        if self.router.send_msg_retry_interval_ms == 0 {
            bail!("router.send_msg_retry_interval_ms must be greater than zero");
        }
        if self.router.max_retry_delay_ms < self.router.send_msg_retry_interval_ms {
            bail!(
                "router.max_retry_delay_ms ({}) is below the retry interval ({})",
                self.router.max_retry_delay_ms,
                self.router.send_msg_retry_interval_ms
            );
        }
        if self.dispatcher.max_buffered_per_participant == 0 {
            bail!("dispatcher.max_buffered_per_participant must be greater than zero");
        }
        let multiplier = self.dispatcher.reply_wait_multiplier;
        if multiplier.is_nan() || multiplier < 1.0 {
            bail!(
                "dispatcher.reply_wait_multiplier must be at least 1.0, got {}",
                multiplier
            );
        }
        if self.dispatcher.reaper_interval_ms == 0 {
            bail!("dispatcher.reaper_interval_ms must be greater than zero");
        }
        if self.runtime.local_receiver_id.is_empty() {
            bail!("runtime.local_receiver_id must not be empty");
        }

        let mut seen = HashSet::new();
        for route in &self.routes {
            if !seen.insert(route.participant_id.as_str()) {
                bail!("Duplicate static route for participant '{}'", route.participant_id);
            }
        }

        debug!("Messaging config valid ({} static routes)", self.routes.len());
        Ok(())
    }
}
