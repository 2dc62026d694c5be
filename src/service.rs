//! Relay service owning the message and event stores
//!
//! Both stores sit behind their own lock and are never locked together.
//! Writers fetch everything from the platform first and only then take the
//! write lock, so a failed fetch leaves the previous contents untouched.
//! Readers copy what they need and drop the read lock before doing any
//! further work such as mention resolution.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::events::build_events;
use crate::mention::resolve_mentions;
use crate::model::{Event, Message};
use crate::platform::{ChatPlatform, RawMessage};
use crate::ring::RingStore;

/// Where the relay reads from and how much it keeps
#[derive(Debug, Clone, Default)]
pub struct ServiceConfig {
    pub channel_id: Option<String>,
    pub guild_id: Option<String>,
    pub max_messages: usize,
    pub max_events: usize,
}

impl From<&RelayConfig> for ServiceConfig {
    fn from(config: &RelayConfig) -> Self {
        Self {
            channel_id: config.channel_id.clone(),
            guild_id: config.guild_id.clone(),
            max_messages: config.max_messages,
            max_events: config.max_events,
        }
    }
}

/// Shared state behind the HTTP handlers and background tasks
pub struct RelayService {
    platform: Arc<dyn ChatPlatform>,
    config: ServiceConfig,
    /// Our own user, whose messages are never cached
    bot_user_id: Option<String>,
    messages: RwLock<RingStore<Message>>,
    events: RwLock<RingStore<Event>>,
}

impl RelayService {
    /// Create a service with empty stores
    pub fn new(platform: Arc<dyn ChatPlatform>, config: ServiceConfig) -> Self {
        let messages = RwLock::new(RingStore::new(config.max_messages));
        let events = RwLock::new(RingStore::new(config.max_events));
        Self {
            platform,
            config,
            bot_user_id: None,
            messages,
            events,
        }
    }

    /// Ignore pushes authored by this user
    pub fn with_bot_user(mut self, user_id: impl Into<String>) -> Self {
        self.bot_user_id = Some(user_id.into());
        self
    }

    // Producers

    /// Replace the message store with the channel's latest messages.
    ///
    /// The platform returns newest first, which is exactly store order.
    pub async fn load_initial_messages(&self) -> Result<usize> {
        let channel_id = self
            .config
            .channel_id
            .as_deref()
            .ok_or_else(|| RelayError::Config("no channel configured".into()))?;

        let raw = self
            .platform
            .fetch_recent_messages(channel_id, self.config.max_messages)
            .await?;

        let loaded: Vec<Message> = raw
            .into_iter()
            .take(self.config.max_messages)
            .map(into_message)
            .collect();
        let count = loaded.len();

        self.messages.write().await.load_all(loaded);

        tracing::info!("Loaded {} initial messages", count);
        Ok(count)
    }

    /// Handle a message pushed by the gateway.
    ///
    /// Returns `false` when the message was filtered out (other channel or
    /// our own message).
    pub async fn on_message_create(&self, raw: RawMessage) -> bool {
        if self.config.channel_id.as_deref() != Some(raw.channel_id.as_str()) {
            return false;
        }
        if self.bot_user_id.as_deref() == Some(raw.author_id.as_str()) {
            return false;
        }

        let message = into_message(raw);
        tracing::debug!(user = %message.user, "New message cached");
        self.messages.write().await.push_front(message);
        true
    }

    /// Guild whose events are served: `--guild`, else the channel's guild
    pub async fn event_guild(&self) -> Result<String> {
        if let Some(guild_id) = &self.config.guild_id {
            return Ok(guild_id.clone());
        }

        let channel_id = self.config.channel_id.as_deref().ok_or_else(|| {
            RelayError::Config("Cannot fetch events: no guild ID or channel ID provided".into())
        })?;

        self.platform
            .channel(channel_id)
            .await?
            .guild_id
            .ok_or_else(|| RelayError::NotFound(format!("channel {channel_id} has no guild")))
    }

    /// Replace the event store with a fresh snapshot.
    ///
    /// On any fetch error the previous snapshot stays in place.
    pub async fn refresh_events(&self) -> Result<usize> {
        let guild_id = self.event_guild().await?;
        let raw = self.platform.fetch_scheduled_events(&guild_id).await?;

        let raw: Vec<_> = raw.into_iter().take(self.config.max_events).collect();
        let snapshot = build_events(raw, &*self.platform).await;
        let count = snapshot.len();

        self.events.write().await.load_all(snapshot);

        tracing::info!(guild_id = %guild_id, "Loaded {} events", count);
        Ok(count)
    }

    /// Refresh events every `period` until the process exits.
    ///
    /// The first refresh happens one period from now; run
    /// [`refresh_events`](Self::refresh_events) first for an immediate load.
    pub fn spawn_event_refresh(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tracing::info!("Event refresh loop started with interval: {:?}", period);

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                tracing::info!("Refreshing Discord events...");
                if let Err(e) = self.refresh_events().await {
                    tracing::error!("Error fetching events: {}", e);
                }
            }
        })
    }

    // Readers

    pub async fn message_count(&self) -> usize {
        self.messages.read().await.len()
    }

    pub async fn message_user(&self, index: usize) -> Option<String> {
        self.messages.read().await.get(index).map(|m| m.user.clone())
    }

    /// Content of a message with mention tokens resolved.
    ///
    /// The content is copied out and the read lock released before any
    /// user lookup happens.
    pub async fn resolved_message(&self, index: usize) -> Option<String> {
        let content = {
            let messages = self.messages.read().await;
            messages.get(index)?.content.clone()
        };

        if content.is_empty() {
            return Some(content);
        }
        Some(resolve_mentions(&content, &*self.platform).await)
    }

    /// Copy of the cached messages, newest first
    pub async fn messages(&self) -> Vec<Message> {
        self.messages.read().await.iter().cloned().collect()
    }

    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    pub async fn event(&self, index: usize) -> Option<Event> {
        self.events.read().await.get(index).cloned()
    }

    /// Copy of the current event snapshot
    pub async fn events(&self) -> Vec<Event> {
        self.events.read().await.iter().cloned().collect()
    }
}

fn into_message(raw: RawMessage) -> Message {
    Message::new(raw.author_id, raw.author_name, raw.content, raw.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::EntityKind;
    use crate::testing::{raw_event, raw_message, MockPlatform};
    use tokio::sync::Notify;
    use tokio::time::timeout;

    const CHANNEL: &str = "100";

    fn config() -> ServiceConfig {
        ServiceConfig {
            channel_id: Some(CHANNEL.to_string()),
            guild_id: None,
            max_messages: 5,
            max_events: 10,
        }
    }

    fn service(platform: MockPlatform) -> (Arc<MockPlatform>, RelayService) {
        let platform = Arc::new(platform);
        let service = RelayService::new(platform.clone(), config());
        (platform, service)
    }

    fn contents(messages: &[Message]) -> Vec<&str> {
        messages.iter().map(|m| m.content.as_str()).collect()
    }

    #[tokio::test]
    async fn test_initial_load_keeps_newest_first_order() {
        let (_, service) = service(MockPlatform::new().with_messages(vec![
            raw_message(CHANNEL, "1", "C"),
            raw_message(CHANNEL, "2", "B"),
            raw_message(CHANNEL, "3", "A"),
        ]));

        assert_eq!(service.load_initial_messages().await.unwrap(), 3);

        let messages = service.messages().await;
        assert_eq!(contents(&messages), vec!["C", "B", "A"]);
        assert_eq!(messages[0].index, 0);
        assert_eq!(messages[2].index, 2);
        assert_eq!(messages[0].user, "user1");
    }

    #[tokio::test]
    async fn test_load_then_push_scenario() {
        let (_, service) = service(MockPlatform::new().with_messages(vec![
            raw_message(CHANNEL, "1", "C"),
            raw_message(CHANNEL, "2", "B"),
            raw_message(CHANNEL, "3", "A"),
        ]));
        service.load_initial_messages().await.unwrap();

        assert!(service.on_message_create(raw_message(CHANNEL, "4", "D")).await);

        let messages = service.messages().await;
        assert_eq!(contents(&messages), vec!["D", "C", "B", "A"]);
        assert_eq!(service.message_user(0).await.as_deref(), Some("user4"));
    }

    #[tokio::test]
    async fn test_push_evicts_beyond_capacity() {
        let (_, service) = service(MockPlatform::new());
        for n in 0..8 {
            service
                .on_message_create(raw_message(CHANNEL, "1", &n.to_string()))
                .await;
        }

        let messages = service.messages().await;
        assert_eq!(contents(&messages), vec!["7", "6", "5", "4", "3"]);
    }

    #[tokio::test]
    async fn test_push_filters_other_channel_and_self() {
        let platform = Arc::new(MockPlatform::new());
        let service = RelayService::new(platform, config()).with_bot_user("999");

        assert!(!service.on_message_create(raw_message("200", "1", "elsewhere")).await);
        assert!(!service.on_message_create(raw_message(CHANNEL, "999", "me")).await);
        assert_eq!(service.message_count().await, 0);
    }

    #[tokio::test]
    async fn test_failed_initial_load_keeps_store() {
        let (platform, service) = service(MockPlatform::new());
        service.on_message_create(raw_message(CHANNEL, "1", "kept")).await;

        platform.fail_messages(true);
        assert!(service.load_initial_messages().await.is_err());
        assert_eq!(contents(&service.messages().await), vec!["kept"]);
    }

    #[tokio::test]
    async fn test_resolved_message_and_out_of_range() {
        let (_, service) = service(MockPlatform::new().with_user("111", "alice"));
        service
            .on_message_create(raw_message(CHANNEL, "1", "ping <@111>"))
            .await;

        assert_eq!(service.resolved_message(0).await.as_deref(), Some("ping @alice"));
        assert!(service.resolved_message(1).await.is_none());
        assert!(service.message_user(1).await.is_none());
    }

    #[tokio::test]
    async fn test_pending_mention_lookup_does_not_hold_message_lock() {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let platform = MockPlatform::new()
            .with_user("111", "alice")
            .with_lookup_gate(started.clone(), release.clone());
        let (_, service) = service(platform);
        let service = Arc::new(service);
        service
            .on_message_create(raw_message(CHANNEL, "1", "hi <@111>"))
            .await;

        let reader = tokio::spawn({
            let service = service.clone();
            async move { service.resolved_message(0).await }
        });
        timeout(Duration::from_secs(5), started.notified())
            .await
            .expect("lookup should start");

        // Writers and readers proceed while the lookup is still pending
        let pushed = timeout(
            Duration::from_secs(5),
            service.on_message_create(raw_message(CHANNEL, "2", "next")),
        )
        .await
        .expect("push blocked by pending lookup");
        assert!(pushed);
        let count = timeout(Duration::from_secs(5), service.message_count())
            .await
            .expect("count blocked by pending lookup");
        assert_eq!(count, 2);
        assert!(!reader.is_finished());

        release.notify_one();
        let resolved = timeout(Duration::from_secs(5), reader)
            .await
            .expect("lookup released")
            .unwrap();
        assert_eq!(resolved.as_deref(), Some("hi @alice"));
    }

    #[tokio::test]
    async fn test_refresh_uses_channel_guild() {
        let (platform, service) =
            service(MockPlatform::new().with_channel(CHANNEL, Some("general"), Some("500")));
        platform.set_events(vec![
            raw_event("1", EntityKind::External),
            raw_event("2", EntityKind::External),
        ]);

        assert_eq!(service.refresh_events().await.unwrap(), 2);
        assert_eq!(service.event_count().await, 2);
        assert_eq!(service.event(1).await.map(|e| e.id), Some("2".to_string()));
    }

    #[tokio::test]
    async fn test_refresh_prefers_configured_guild() {
        let platform = Arc::new(MockPlatform::new());
        let mut config = config();
        config.channel_id = None;
        config.guild_id = Some("500".to_string());
        let service = RelayService::new(platform.clone(), config);

        platform.set_events(vec![raw_event("1", EntityKind::External)]);
        assert_eq!(service.refresh_events().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_refresh_truncates_to_max_events() {
        let platform = Arc::new(MockPlatform::new());
        let mut config = config();
        config.guild_id = Some("500".to_string());
        config.max_events = 2;
        let service = RelayService::new(platform.clone(), config);

        platform.set_events(
            (0..5)
                .map(|n| raw_event(&n.to_string(), EntityKind::External))
                .collect(),
        );
        assert_eq!(service.refresh_events().await.unwrap(), 2);
        assert_eq!(service.event_count().await, 2);
    }

    #[tokio::test]
    async fn test_refresh_replaces_snapshot_and_keeps_it_on_failure() {
        let (platform, service) =
            service(MockPlatform::new().with_channel(CHANNEL, None, Some("500")));

        platform.set_events(vec![
            raw_event("1", EntityKind::External),
            raw_event("2", EntityKind::External),
        ]);
        service.refresh_events().await.unwrap();

        platform.set_events(vec![raw_event("3", EntityKind::External)]);
        service.refresh_events().await.unwrap();
        let ids: Vec<_> = service.events().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["3"]);

        platform.fail_events(true);
        assert!(service.refresh_events().await.is_err());
        let ids: Vec<_> = service.events().await.into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["3"]);
    }

    #[tokio::test]
    async fn test_refresh_without_guild_source_fails() {
        let (_, service) = service(MockPlatform::new());
        let err = service.refresh_events().await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_loop_ticks_after_period() {
        let (platform, service) =
            service(MockPlatform::new().with_channel(CHANNEL, None, Some("500")));
        let service = Arc::new(service);
        platform.set_events(vec![raw_event("1", EntityKind::External)]);

        let handle = service.clone().spawn_event_refresh(Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.event_count().await, 0);

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(service.event_count().await, 1);

        handle.abort();
    }
}
