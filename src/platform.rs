//! Chat platform seam
//!
//! The relay core only talks to the outside world through these traits.
//! [`crate::discord::DiscordPlatform`] is the production implementation;
//! tests plug in in-memory tables instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;

/// A message as delivered by the platform, before it enters a store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub channel_id: String,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

/// What hosts a scheduled event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// Somewhere outside the platform, described by free text
    External,
    Voice,
    StageInstance,
    /// A kind this build does not know about
    Other,
}

/// A scheduled event as listed by the platform
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub id: String,
    pub guild_id: String,
    pub name: String,
    pub description: Option<String>,
    pub entity_kind: EntityKind,
    /// Free-text location, only meaningful for [`EntityKind::External`]
    pub location: Option<String>,
    /// Hosting channel for voice and stage events
    pub channel_id: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    /// Cover image asset hash
    pub image: Option<String>,
}

/// Channel details needed by the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    pub name: Option<String>,
    pub guild_id: Option<String>,
}

/// Resolves user IDs to display names
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn display_name(&self, user_id: &str) -> Result<String>;
}

/// Resolves channel IDs to channel details
#[async_trait]
pub trait ChannelDirectory: Send + Sync {
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo>;
}

/// Everything the relay needs from a chat platform session
#[async_trait]
pub trait ChatPlatform: UserDirectory + ChannelDirectory {
    /// Most recent messages of a channel, newest first
    async fn fetch_recent_messages(&self, channel_id: &str, limit: usize)
        -> Result<Vec<RawMessage>>;

    /// Scheduled events of a guild, in the platform's order
    async fn fetch_scheduled_events(&self, guild_id: &str) -> Result<Vec<RawEvent>>;
}
