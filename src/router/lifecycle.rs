use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::db::ChannelStore;
use crate::gateway::{ChannelEvent, ChannelKind, Gateway};

/// Keeps the channel directory consistent with voice channels created
/// and deleted outside our control.
#[derive(Clone)]
pub struct ChannelLifecycleSync {
    channels: Arc<dyn ChannelStore>,
}

impl ChannelLifecycleSync {
    pub fn new(channels: Arc<dyn ChannelStore>) -> Self {
        Self { channels }
    }

    pub async fn handle_channel_created(&self, event: &ChannelEvent) -> Result<()> {
        if event.kind != ChannelKind::Voice {
            return Ok(());
        }

        debug!(channel_id = %event.channel_id, name = %event.name, "voice channel created");
        self.channels
            .upsert_channel(&event.channel_id, &event.name, &event.guild_id)
            .await?;
        Ok(())
    }

    pub async fn handle_channel_deleted(&self, event: &ChannelEvent) -> Result<()> {
        if event.kind != ChannelKind::Voice {
            return Ok(());
        }

        debug!(channel_id = %event.channel_id, name = %event.name, "voice channel deleted");
        self.channels.delete_channel(&event.channel_id).await?;
        Ok(())
    }

    /// Re-enumerates the guild's voice channels through the gateway and
    /// upserts all of them. Catches channels created before the
    /// directory existed for this guild.
    pub async fn sync_guild_channels(&self, gateway: &dyn Gateway, guild_id: &str) -> Result<()> {
        let channels = gateway.guild_channels(guild_id).await?;
        for channel in channels.iter().filter(|c| c.kind == ChannelKind::Voice) {
            debug!(channel_id = %channel.id, name = %channel.name, "syncing voice channel");
            self.channels
                .upsert_channel(&channel.id, &channel.name, guild_id)
                .await?;
        }
        Ok(())
    }
}
