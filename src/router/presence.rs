use std::sync::Arc;

use anyhow::Result;
use tracing::debug;

use crate::db::{ChannelStore, WatchStore};
use crate::gateway::{Activity, ActivityKind, ChannelKind, Gateway, LOBBY_CHANNEL, PresenceEvent};

/// Picks the game out of a user's reported activities: the first
/// "playing" entry with a non-empty name, or `""` when there is none.
pub(crate) fn current_game(activities: &[Activity]) -> &str {
    activities
        .iter()
        .find(|a| a.kind == ActivityKind::Playing && !a.name.is_empty())
        .map(|a| a.name.as_str())
        .unwrap_or("")
}

pub struct PresenceReconciler {
    watches: Arc<dyn WatchStore>,
    channels: Arc<dyn ChannelStore>,
}

impl PresenceReconciler {
    pub fn new(watches: Arc<dyn WatchStore>, channels: Arc<dyn ChannelStore>) -> Self {
        Self { watches, channels }
    }

    /// Records the watched user's current game, then moves them into
    /// the channel named after it (lobby as fallback) unless they are
    /// already connected to some voice channel in the guild. The
    /// placement check is deliberately coarse: being anywhere in voice
    /// suppresses the move, correct channel or not.
    pub async fn handle(&self, gateway: &dyn Gateway, event: &PresenceEvent) -> Result<()> {
        if self
            .watches
            .find_by_user_id(&event.user_id)
            .await?
            .is_none()
        {
            return Ok(());
        }

        let game = current_game(&event.activities);
        self.watches.set_game(&event.user_id, game).await?;
        debug!(user_id = %event.user_id, game, "updated watched game");

        let directory = self.channels.list_by_guild(&event.guild_id).await?;

        let mut game_channel = None;
        let mut lobby_channel = None;
        let mut already_placed = false;

        for entry in &directory {
            if !game.is_empty() && entry.name == game {
                game_channel = Some(entry.channel_id.clone());
            }
            if entry.name == LOBBY_CHANNEL {
                lobby_channel = Some(entry.channel_id.clone());
            }

            let Some(channel) = gateway.fetch_channel(&entry.channel_id).await? else {
                debug!(channel_id = %entry.channel_id, "stale directory entry, skipping");
                continue;
            };
            if channel.kind != ChannelKind::Voice {
                continue;
            }

            let members = gateway
                .voice_members(&event.guild_id, &entry.channel_id)
                .await?;
            if members.iter().any(|m| m == &event.user_id) {
                already_placed = true;
            }
        }

        if already_placed {
            return Ok(());
        }

        if let Some(target) = game_channel.or(lobby_channel) {
            gateway
                .move_member(&event.guild_id, &event.user_id, &target)
                .await?;
            debug!(user_id = %event.user_id, channel_id = %target, "moved user for presence change");
        }

        Ok(())
    }
}
