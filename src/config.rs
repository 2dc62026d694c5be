//! Command-line configuration
//!
//! Flags are parsed with clap and validated into a [`RelayConfig`] before
//! anything connects. Validation failures are fatal at startup.

use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::error::{RelayError, Result};

/// Discord bridge serving recent messages and events to stream overlays
#[derive(Parser, Debug, Clone)]
#[command(name = "discord-overlay")]
#[command(about = "Serve recent Discord channel messages and scheduled events as plain text")]
#[command(version)]
pub struct Args {
    /// Maximum number of messages to store
    #[arg(long, default_value_t = 5)]
    pub max_messages: usize,

    /// Maximum number of events to store
    #[arg(long, default_value_t = 10)]
    pub max_events: usize,

    /// HTTP server address
    #[arg(long, default_value = "localhost:8080")]
    pub server_addr: String,

    /// Discord bot token
    #[arg(long)]
    pub token: Option<String>,

    /// Discord channel ID
    #[arg(long)]
    pub channel: Option<String>,

    /// Discord guild/server ID (required if events enabled without channel)
    #[arg(long)]
    pub guild: Option<String>,

    /// Enable Discord events support
    #[arg(
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true"
    )]
    pub events: bool,

    /// Enable Discord channel messages support
    #[arg(
        long = "enablechannel",
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = true,
        default_missing_value = "true"
    )]
    pub enable_channel: bool,

    /// Event refresh interval in seconds (0 to disable auto-refresh)
    #[arg(long, default_value_t = 3600)]
    pub event_refresh: u64,
}

/// Validated relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Message store capacity, also the initial fetch limit
    pub max_messages: usize,
    /// Event store capacity
    pub max_events: usize,
    /// Address the HTTP query server binds to
    pub server_addr: String,
    pub token: String,
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub enable_events: bool,
    pub enable_channel: bool,
    /// Seconds between event refreshes, 0 disables
    pub event_refresh_secs: u64,
}

impl RelayConfig {
    /// Check the cross-flag requirements
    pub fn validate(&self) -> Result<()> {
        if self.token.is_empty() {
            return Err(RelayError::Config(
                "Discord token required. Use --token flag".into(),
            ));
        }

        if self.enable_channel && self.channel_id.is_none() {
            return Err(RelayError::Config(
                "Discord channel ID required. Use --channel flag".into(),
            ));
        }

        if self.enable_events
            && !self.enable_channel
            && self.guild_id.is_none()
            && self.channel_id.is_none()
        {
            return Err(RelayError::Config(
                "Discord guild ID required when events are enabled without channel. Use --guild flag"
                    .into(),
            ));
        }

        Ok(())
    }

    /// Interval of the periodic event refresh, `None` when disabled
    pub fn refresh_interval(&self) -> Option<Duration> {
        (self.event_refresh_secs > 0).then(|| Duration::from_secs(self.event_refresh_secs))
    }
}

impl TryFrom<Args> for RelayConfig {
    type Error = RelayError;

    fn try_from(args: Args) -> Result<Self> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let config = Self {
            max_messages: args.max_messages,
            max_events: args.max_events,
            server_addr: args.server_addr,
            token: non_empty(args.token).unwrap_or_default(),
            channel_id: non_empty(args.channel),
            guild_id: non_empty(args.guild),
            enable_events: args.events,
            enable_channel: args.enable_channel,
            event_refresh_secs: args.event_refresh,
        };
        config.validate()?;
        Ok(config)
    }
}
