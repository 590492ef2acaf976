use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::Mutex;
use tracing::info;

use crate::db::ChannelStore;
use crate::gateway::{ChannelKind, Gateway, GatewayChannel, LOBBY_CHANNEL};

/// Name of the category the lobby is created under.
pub const CATEGORY_NAME: &str = "Joinery";

/// Seeds the channel directory when a guild first becomes available
/// and creates the lobby when the guild has none.
pub struct GuildBootstrapper {
    channels: Arc<dyn ChannelStore>,
    bootstrapped: Mutex<HashSet<String>>,
}

impl GuildBootstrapper {
    pub fn new(channels: Arc<dyn ChannelStore>) -> Self {
        Self {
            channels,
            bootstrapped: Mutex::new(HashSet::new()),
        }
    }

    /// Upserts the guild's existing voice channels into the directory
    /// and, when none of them is the lobby, creates a category and a
    /// lobby voice channel inside it. Runs at most once per guild per
    /// process: the gateway re-delivers guild events on reconnect and
    /// must not trigger duplicate channel creation. A bootstrap that
    /// fails partway is not retried until restart.
    pub async fn handle_guild_available(
        &self,
        gateway: &dyn Gateway,
        guild_id: &str,
        existing: &[GatewayChannel],
    ) -> Result<()> {
        if !self.bootstrapped.lock().insert(guild_id.to_string()) {
            return Ok(());
        }

        let mut lobby_seen = false;
        for channel in existing.iter().filter(|c| c.kind == ChannelKind::Voice) {
            if channel.name == LOBBY_CHANNEL {
                lobby_seen = true;
            }
            self.channels
                .upsert_channel(&channel.id, &channel.name, guild_id)
                .await?;
        }

        if !lobby_seen {
            let category = gateway
                .create_channel(guild_id, CATEGORY_NAME, ChannelKind::Category)
                .await?;
            let lobby = gateway
                .create_channel(guild_id, LOBBY_CHANNEL, ChannelKind::Voice)
                .await?;
            gateway.set_channel_parent(&lobby.id, &category.id).await?;

            self.channels
                .upsert_channel(&lobby.id, LOBBY_CHANNEL, guild_id)
                .await?;

            info!(
                guild_id,
                category_id = %category.id,
                channel_id = %lobby.id,
                "created lobby for guild"
            );
        }

        Ok(())
    }
}
