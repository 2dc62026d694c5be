//! discord-overlay
//!
//! Bridge between a Discord channel and stream overlay software.
//!
//! The process:
//! - connects to the Discord gateway and caches the latest channel messages
//! - optionally caches the guild's scheduled events and refreshes them on a timer
//! - serves both caches as plain text over HTTP
//!
//! # Usage
//!
//! Messages only:
//! ```bash
//! discord-overlay --token $BOT_TOKEN --channel 123456789012345678
//! ```
//!
//! Events only, refreshed every ten minutes:
//! ```bash
//! discord-overlay --token $BOT_TOKEN --enablechannel=false --events --guild 987654321 --event-refresh 600
//! ```

use std::sync::Arc;

use clap::Parser;

use discord_overlay::{
    config::{Args, RelayConfig},
    discord::{run_gateway, DiscordPlatform},
    server::{OverlayServer, RouteToggles},
    service::{RelayService, ServiceConfig},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = RelayConfig::try_from(Args::parse())?;

    let platform = DiscordPlatform::new(config.token.clone());
    let bot_user_id = platform.current_user_id().await?;

    let service = Arc::new(
        RelayService::new(Arc::new(platform), ServiceConfig::from(&config))
            .with_bot_user(bot_user_id),
    );

    if config.enable_channel {
        tokio::spawn(run_gateway(config.token.clone(), service.clone()));

        if let Err(e) = service.load_initial_messages().await {
            tracing::error!("Error fetching initial messages: {}", e);
        }
    }

    if config.enable_events {
        if let Err(e) = service.refresh_events().await {
            tracing::error!("Error fetching events: {}", e);
        }
        if let Some(period) = config.refresh_interval() {
            service.clone().spawn_event_refresh(period);
        }
    }

    if let Some(channel_id) = config.channel_id.as_deref().filter(|_| config.enable_channel) {
        tracing::info!("Monitoring Discord channel: {}", channel_id);
    }
    if config.enable_events {
        match config.guild_id.as_deref() {
            Some(guild_id) => {
                tracing::info!("Discord events monitoring enabled for guild: {}", guild_id)
            }
            None => tracing::info!("Discord events monitoring enabled (using guild from channel)"),
        }
    }

    let server = OverlayServer::new(
        config.server_addr.clone(),
        service,
        RouteToggles {
            messages: config.enable_channel,
            events: config.enable_events,
        },
    );
    server.run().await?;

    Ok(())
}
