//! Scheduled event snapshots
//!
//! Turns the platform's event listing into [`Event`] records. Location
//! depends on what hosts the event: external events carry free text, voice
//! and stage events are named after their channel. Every field degrades to
//! a default on its own; an event is never dropped because one lookup failed.

use crate::model::Event;
use crate::platform::{ChannelDirectory, EntityKind, RawEvent};

/// Location shown when the hosting channel cannot be resolved
pub const UNKNOWN_LOCATION: &str = "Unknown";

const EVENT_IMAGE_CDN: &str = "https://cdn.discordapp.com/guild-events";

/// CDN URL of an event's cover image
pub fn event_image_url(event_id: &str, image: &str) -> String {
    format!("{EVENT_IMAGE_CDN}/{event_id}/{image}.png")
}

/// Build a complete replacement snapshot, indexed in input order
pub async fn build_events<D>(raw: Vec<RawEvent>, channels: &D) -> Vec<Event>
where
    D: ChannelDirectory + ?Sized,
{
    let mut events = Vec::with_capacity(raw.len());
    for (index, evt) in raw.into_iter().enumerate() {
        let location = resolve_location(&evt, channels).await;
        let image_url = evt
            .image
            .as_deref()
            .filter(|hash| !hash.is_empty())
            .map(|hash| event_image_url(&evt.id, hash));

        events.push(Event {
            index,
            id: evt.id,
            name: evt.name,
            description: evt.description.unwrap_or_default(),
            location,
            start_time: evt.start_time,
            end_time: evt.end_time,
            guild_id: evt.guild_id,
            image_url,
        });
    }
    events
}

async fn resolve_location<D>(evt: &RawEvent, channels: &D) -> String
where
    D: ChannelDirectory + ?Sized,
{
    match evt.entity_kind {
        EntityKind::External => evt.location.clone().unwrap_or_default(),
        EntityKind::Voice | EntityKind::StageInstance => {
            let Some(channel_id) = evt.channel_id.as_deref().filter(|id| !id.is_empty()) else {
                return UNKNOWN_LOCATION.to_string();
            };
            match channels.channel(channel_id).await {
                Ok(info) => info.name.unwrap_or_else(|| UNKNOWN_LOCATION.to_string()),
                Err(e) => {
                    tracing::warn!(event_id = %evt.id, "Error fetching channel {}: {}", channel_id, e);
                    UNKNOWN_LOCATION.to_string()
                }
            }
        }
        EntityKind::Other => UNKNOWN_LOCATION.to_string(),
    }
}
