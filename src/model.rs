//! Cached message and event records
//!
//! Both record types carry their own position in the store they live in,
//! so the store renumbers them through the [`Indexed`] trait whenever it
//! changes shape.

use chrono::{DateTime, Utc};

/// Items that know their newest-first position inside a store
pub trait Indexed {
    /// Current position (0 is the newest)
    fn index(&self) -> usize;

    /// Overwrite the position after the store is reshaped
    fn set_index(&mut self, index: usize);
}

/// A channel message as served to overlays
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Position in the message store (0 is newest)
    pub index: usize,
    /// Author's user ID
    pub user_id: String,
    /// Author's display name
    pub user: String,
    /// Raw message content, mention tokens unresolved
    pub content: String,
    /// When the message was posted
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a message; the store assigns the index on insertion
    pub fn new(
        user_id: impl Into<String>,
        user: impl Into<String>,
        content: impl Into<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            index: 0,
            user_id: user_id.into(),
            user: user.into(),
            content: content.into(),
            timestamp,
        }
    }
}

impl Indexed for Message {
    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}

/// A guild scheduled event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Position in the event store, in the order the platform listed them
    pub index: usize,
    pub id: String,
    pub name: String,
    pub description: String,
    /// Free-text location or the hosting channel's name
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub guild_id: String,
    /// CDN URL of the cover image, if the event has one
    pub image_url: Option<String>,
}

impl Indexed for Event {
    fn index(&self) -> usize {
        self.index
    }

    fn set_index(&mut self, index: usize) {
        self.index = index;
    }
}
