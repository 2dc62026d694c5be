//! # Discord Overlay Bridge
//!
//! Connects to the Discord gateway, caches the most recent messages of one
//! channel and the guild's scheduled events, and serves them one value at a
//! time over plain-text HTTP for broadcast overlays.
//!
//! ## Features
//!
//! - **Bounded stores**: newest-first, fixed-capacity message and event caches
//! - **Live updates**: gateway pushes for messages, timed snapshot refresh for events
//! - **Mention resolution**: `<@id>` tokens rendered as `@name` at read time
//! - **Plain-text API**: one value per request, easy to bind to overlay text sources
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │ Discord         │    │  RelayService    │    │ HTTP Server     │
//! │                 │    │                  │    │                 │
//! │ • Gateway push  │───►│ • Message store  │◄───│ • /{i}/message  │
//! │ • REST lookups  │◄──►│ • Event store    │    │ • /event/{i}/…  │
//! │ • Events list   │    │ • Refresh timer  │    │ • counts        │
//! └─────────────────┘    └──────────────────┘    └─────────────────┘
//! ```

pub mod config;
pub mod discord;
pub mod error;
pub mod events;
pub mod mention;
pub mod model;
pub mod platform;
pub mod ring;
#[cfg(feature = "server")]
pub mod server;
pub mod service;

#[cfg(any(test, feature = "test-util"))]
pub mod testing;

pub use config::{Args, RelayConfig};
pub use error::{RelayError, Result};
pub use model::{Event, Indexed, Message};
pub use platform::ChatPlatform;
pub use ring::RingStore;
#[cfg(feature = "server")]
pub use server::{OverlayServer, RouteToggles};
pub use service::{RelayService, ServiceConfig};
