//! Discord implementation of the platform seam
//!
//! REST lookups go through `twilight-http`; new messages arrive over a
//! single `twilight-gateway` shard and are handed to the relay service.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use twilight_gateway::{Event, EventTypeFlags, Intents, Shard, ShardId, StreamExt as _};
use twilight_http::Client;
use twilight_model::channel::Message as DiscordMessage;
use twilight_model::guild::scheduled_event::{EntityType, GuildScheduledEvent};
use twilight_model::id::Id;
use twilight_model::util::Timestamp;

use crate::error::{RelayError, Result};
use crate::platform::{
    ChannelDirectory, ChannelInfo, ChatPlatform, EntityKind, RawEvent, RawMessage,
    UserDirectory,
};
use crate::service::RelayService;

/// Largest page the channel messages endpoint accepts
const MAX_MESSAGE_PAGE: usize = 100;

/// Discord REST client wrapped as a [`ChatPlatform`]
#[derive(Clone)]
pub struct DiscordPlatform {
    http: Arc<Client>,
}

impl DiscordPlatform {
    /// Create a client for a bot token (without the `Bot ` prefix)
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            http: Arc::new(Client::new(token.into())),
        }
    }

    /// ID of the bot user the token belongs to.
    ///
    /// Also serves as a token check at startup.
    pub async fn current_user_id(&self) -> Result<String> {
        let user = self.http.current_user().await?.model().await?;
        Ok(user.id.to_string())
    }
}

fn parse_id<T>(kind: &str, raw: &str) -> Result<Id<T>> {
    raw.parse::<u64>()
        .ok()
        .and_then(Id::new_checked)
        .ok_or_else(|| RelayError::Platform(format!("invalid {kind} ID: {raw}")))
}

fn to_utc(ts: Timestamp) -> DateTime<Utc> {
    micros_to_utc(ts.as_micros())
}

/// Out-of-range timestamps fall back to the Unix epoch
fn micros_to_utc(micros: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(micros).unwrap_or_else(|| {
        tracing::warn!("Timestamp {} micros out of range, using epoch", micros);
        DateTime::UNIX_EPOCH
    })
}

fn entity_kind(entity_type: EntityType) -> EntityKind {
    match entity_type {
        EntityType::External => EntityKind::External,
        EntityType::Voice => EntityKind::Voice,
        EntityType::StageInstance => EntityKind::StageInstance,
        _ => EntityKind::Other,
    }
}

/// Convert a gateway or REST message into the platform-neutral form
pub fn raw_message(msg: &DiscordMessage) -> RawMessage {
    RawMessage {
        channel_id: msg.channel_id.to_string(),
        author_id: msg.author.id.to_string(),
        author_name: msg.author.name.clone(),
        content: msg.content.clone(),
        timestamp: to_utc(msg.timestamp),
    }
}

fn raw_event(evt: GuildScheduledEvent) -> RawEvent {
    RawEvent {
        id: evt.id.to_string(),
        guild_id: evt.guild_id.to_string(),
        name: evt.name,
        description: evt.description,
        entity_kind: entity_kind(evt.entity_type),
        location: evt.entity_metadata.and_then(|meta| meta.location),
        channel_id: evt.channel_id.map(|id| id.to_string()),
        start_time: to_utc(evt.scheduled_start_time),
        end_time: evt.scheduled_end_time.map(to_utc),
        image: evt.image.map(|hash| hash.to_string()),
    }
}

#[async_trait]
impl UserDirectory for DiscordPlatform {
    async fn display_name(&self, user_id: &str) -> Result<String> {
        let id = parse_id("user", user_id)?;
        let user = self.http.user(id).await?.model().await?;
        Ok(user.name)
    }
}

#[async_trait]
impl ChannelDirectory for DiscordPlatform {
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo> {
        let id = parse_id("channel", channel_id)?;
        let channel = self.http.channel(id).await?.model().await?;
        Ok(ChannelInfo {
            name: channel.name,
            guild_id: channel.guild_id.map(|id| id.to_string()),
        })
    }
}

#[async_trait]
impl ChatPlatform for DiscordPlatform {
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let id = parse_id("channel", channel_id)?;
        let page = u16::try_from(limit.min(MAX_MESSAGE_PAGE))
            .map_err(|e| RelayError::Internal(e.to_string()))?;

        let messages = self
            .http
            .channel_messages(id)
            .limit(page)
            .await?
            .models()
            .await?;

        Ok(messages.iter().map(raw_message).collect())
    }

    async fn fetch_scheduled_events(&self, guild_id: &str) -> Result<Vec<RawEvent>> {
        let id = parse_id("guild", guild_id)?;
        let events = self
            .http
            .guild_scheduled_events(id)
            .await?
            .models()
            .await?;

        Ok(events.into_iter().map(raw_event).collect())
    }
}

/// Receive gateway events and push new messages into the service.
///
/// Runs until the shard hits a fatal error.
pub async fn run_gateway(token: String, service: Arc<RelayService>) {
    let intents = Intents::GUILD_MESSAGES | Intents::MESSAGE_CONTENT;
    let mut shard = Shard::new(ShardId::ONE, token, intents);
    let wanted = EventTypeFlags::READY | EventTypeFlags::MESSAGE_CREATE;

    tracing::info!(shard = ?shard.id(), "Connecting to Discord gateway");

    while let Some(item) = shard.next_event(wanted).await {
        let event = match item {
            Ok(event) => event,
            Err(source) => {
                tracing::warn!(?source, "error receiving gateway event");
                continue;
            }
        };

        match event {
            Event::Ready(ready) => {
                tracing::info!(user = %ready.user.name, "Gateway session ready");
            }
            Event::MessageCreate(msg) => {
                service.on_message_create(raw_message(&msg.0)).await;
            }
            _ => {}
        }
    }

    tracing::error!("Discord gateway closed, no further messages will be received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use twilight_model::id::marker::UserMarker;

    #[test]
    fn test_entity_kind_mapping() {
        assert_eq!(entity_kind(EntityType::External), EntityKind::External);
        assert_eq!(entity_kind(EntityType::Voice), EntityKind::Voice);
        assert_eq!(entity_kind(EntityType::StageInstance), EntityKind::StageInstance);
        assert_eq!(entity_kind(EntityType::Unknown(99)), EntityKind::Other);
    }

    #[test]
    fn test_timestamp_to_utc() {
        let ts = Timestamp::parse("2024-05-01T18:00:00.000000+00:00").unwrap();
        assert_eq!(to_utc(ts).to_rfc3339(), "2024-05-01T18:00:00+00:00");
    }

    #[test]
    fn test_out_of_range_timestamp_falls_back_to_epoch() {
        assert_eq!(micros_to_utc(i64::MAX), DateTime::UNIX_EPOCH);
        assert_eq!(micros_to_utc(i64::MIN), DateTime::UNIX_EPOCH);
        assert_eq!(micros_to_utc(1_000_000).timestamp(), 1);
    }

    #[test]
    fn test_parse_id() {
        let id: Id<UserMarker> = parse_id("user", "1234567890").unwrap();
        assert_eq!(id.get(), 1234567890);

        assert!(parse_id::<UserMarker>("user", "0").is_err());
        assert!(parse_id::<UserMarker>("user", "abc").is_err());
    }
}
