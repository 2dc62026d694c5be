//! In-memory platform for tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use tokio::sync::Notify;

use crate::error::{RelayError, Result};
use crate::platform::{
    ChannelDirectory, ChannelInfo, ChatPlatform, EntityKind, RawEvent, RawMessage,
    UserDirectory,
};

/// Fixed timestamp `2024-05-01T18:00:00Z` plus `minutes`
pub fn at(minutes: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 18, minutes, 0).unwrap()
}

pub fn raw_message(channel_id: &str, author_id: &str, content: &str) -> RawMessage {
    RawMessage {
        channel_id: channel_id.to_string(),
        author_id: author_id.to_string(),
        author_name: format!("user{author_id}"),
        content: content.to_string(),
        timestamp: at(0),
    }
}

pub fn raw_event(id: &str, kind: EntityKind) -> RawEvent {
    RawEvent {
        id: id.to_string(),
        guild_id: "500".to_string(),
        name: format!("Event {id}"),
        description: Some(format!("About {id}")),
        entity_kind: kind,
        location: None,
        channel_id: None,
        start_time: at(0),
        end_time: None,
        image: None,
    }
}

/// Platform backed by plain tables, with switches to force failures
#[derive(Default)]
pub struct MockPlatform {
    users: HashMap<String, String>,
    channels: HashMap<String, ChannelInfo>,
    messages: Mutex<Vec<RawMessage>>,
    events: Mutex<Vec<RawEvent>>,
    fail_messages: AtomicBool,
    fail_events: AtomicBool,
    /// `(started, release)`: user lookups signal `started`, then wait for `release`
    lookup_gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(mut self, id: &str, name: &str) -> Self {
        self.users.insert(id.to_string(), name.to_string());
        self
    }

    pub fn with_channel(mut self, id: &str, name: Option<&str>, guild_id: Option<&str>) -> Self {
        self.channels.insert(
            id.to_string(),
            ChannelInfo {
                name: name.map(str::to_string),
                guild_id: guild_id.map(str::to_string),
            },
        );
        self
    }

    /// Messages in the order the platform would return them (newest first)
    pub fn with_messages(self, messages: Vec<RawMessage>) -> Self {
        *self.messages.lock().unwrap() = messages;
        self
    }

    /// Hold every user lookup until `release` is notified
    pub fn with_lookup_gate(mut self, started: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.lookup_gate = Some((started, release));
        self
    }

    pub fn set_events(&self, events: Vec<RawEvent>) {
        *self.events.lock().unwrap() = events;
    }

    pub fn fail_messages(&self, fail: bool) {
        self.fail_messages.store(fail, Ordering::SeqCst);
    }

    pub fn fail_events(&self, fail: bool) {
        self.fail_events.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl UserDirectory for MockPlatform {
    async fn display_name(&self, user_id: &str) -> Result<String> {
        if let Some((started, release)) = &self.lookup_gate {
            started.notify_one();
            release.notified().await;
        }
        self.users
            .get(user_id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("user {user_id}")))
    }
}

#[async_trait]
impl ChannelDirectory for MockPlatform {
    async fn channel(&self, channel_id: &str) -> Result<ChannelInfo> {
        self.channels
            .get(channel_id)
            .cloned()
            .ok_or_else(|| RelayError::NotFound(format!("channel {channel_id}")))
    }
}

#[async_trait]
impl ChatPlatform for MockPlatform {
    async fn fetch_recent_messages(
        &self,
        channel_id: &str,
        limit: usize,
    ) -> Result<Vec<RawMessage>> {
        if self.fail_messages.load(Ordering::SeqCst) {
            return Err(RelayError::Platform("messages unavailable".into()));
        }
        Ok(self
            .messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.channel_id == channel_id)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn fetch_scheduled_events(&self, guild_id: &str) -> Result<Vec<RawEvent>> {
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(RelayError::Platform("events unavailable".into()));
        }
        Ok(self
            .events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.guild_id == guild_id)
            .cloned()
            .collect())
    }
}
