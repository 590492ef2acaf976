use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::db::{ChannelStore, WatchStore};
use crate::gateway::{ChannelKind, Gateway, LOBBY_CHANNEL, VoiceStateEvent};

pub struct VoiceStateReconciler {
    watches: Arc<dyn WatchStore>,
    channels: Arc<dyn ChannelStore>,
}

impl VoiceStateReconciler {
    pub fn new(watches: Arc<dyn WatchStore>, channels: Arc<dyn ChannelStore>) -> Self {
        Self { watches, channels }
    }

    /// Routes a watched user who just arrived at the lobby into the
    /// channel for their stored game, when one exists. Arrivals
    /// anywhere else never trigger a move, so switching out of a game
    /// channel by hand sticks.
    pub async fn handle(&self, gateway: &dyn Gateway, event: &VoiceStateEvent) -> Result<()> {
        let Some(channel_id) = event.channel_id.as_deref() else {
            // disconnect, nothing to route
            return Ok(());
        };

        let Some(channel) = gateway.fetch_channel(channel_id).await? else {
            return Ok(());
        };
        if channel.kind != ChannelKind::Voice {
            return Ok(());
        }

        let Some(watch) = self.watches.find_by_user_id(&event.user_id).await? else {
            return Ok(());
        };

        if channel.name != LOBBY_CHANNEL {
            return Ok(());
        }
        if watch.game.is_empty() {
            return Ok(());
        }

        let directory = self.channels.list_by_guild(&event.guild_id).await?;
        let game_channel = directory
            .iter()
            .find(|c| c.name == watch.game && c.channel_id != channel_id);

        if let Some(target) = game_channel {
            gateway
                .move_member(&event.guild_id, &event.user_id, &target.channel_id)
                .await?;
            debug!(
                user_id = %event.user_id,
                channel_id = %target.channel_id,
                game = %watch.game,
                "routed lobby arrival to game channel"
            );
        }

        Ok(())
    }
}
