//! Event reconciliation core.
//!
//! The gateway client dispatches every inbound event on its own task,
//! so any two handlers here may run concurrently, including for the
//! same user. Store operations are individually atomic but
//! read-then-write sequences are not: two racing `set_game` calls
//! resolve by completion order, not event order. A stale game name is
//! corrected by the next presence event, so no per-user serialization
//! is imposed; the one exception is guild bootstrap, which runs at
//! most once per guild per process (see `bootstrap`).

use std::sync::Arc;

use anyhow::Result;

use crate::db::{ChannelStore, WatchStore};
use crate::gateway::{
    ChannelEvent, Gateway, GatewayChannel, InboundMessage, PresenceEvent, VoiceStateEvent,
};

pub mod bootstrap;
pub mod commands;
pub mod lifecycle;
pub mod presence;
pub mod voice;

#[cfg(test)]
pub(crate) mod testing;

use self::bootstrap::GuildBootstrapper;
use self::commands::CommandRouter;
use self::lifecycle::ChannelLifecycleSync;
use self::presence::PresenceReconciler;
use self::voice::VoiceStateReconciler;

/// Explicit composition of the reconcilers, built once at startup and
/// shared with the gateway event handler.
pub struct RouterCore {
    presence: PresenceReconciler,
    voice: VoiceStateReconciler,
    lifecycle: ChannelLifecycleSync,
    bootstrap: GuildBootstrapper,
    commands: CommandRouter,
}

impl RouterCore {
    pub fn new(watches: Arc<dyn WatchStore>, channels: Arc<dyn ChannelStore>) -> Self {
        let lifecycle = ChannelLifecycleSync::new(channels.clone());
        Self {
            presence: PresenceReconciler::new(watches.clone(), channels.clone()),
            voice: VoiceStateReconciler::new(watches.clone(), channels.clone()),
            bootstrap: GuildBootstrapper::new(channels.clone()),
            commands: CommandRouter::new(watches, channels, lifecycle.clone()),
            lifecycle,
        }
    }

    pub async fn handle_message(
        &self,
        gateway: &dyn Gateway,
        message: &InboundMessage,
    ) -> Result<()> {
        self.commands.handle_message(gateway, message).await
    }

    pub async fn handle_guild_available(
        &self,
        gateway: &dyn Gateway,
        guild_id: &str,
        existing: &[GatewayChannel],
    ) -> Result<()> {
        self.bootstrap
            .handle_guild_available(gateway, guild_id, existing)
            .await
    }

    pub async fn handle_presence_update(
        &self,
        gateway: &dyn Gateway,
        event: &PresenceEvent,
    ) -> Result<()> {
        self.presence.handle(gateway, event).await
    }

    pub async fn handle_voice_state_update(
        &self,
        gateway: &dyn Gateway,
        event: &VoiceStateEvent,
    ) -> Result<()> {
        self.voice.handle(gateway, event).await
    }

    pub async fn handle_channel_created(&self, event: &ChannelEvent) -> Result<()> {
        self.lifecycle.handle_channel_created(event).await
    }

    pub async fn handle_channel_deleted(&self, event: &ChannelEvent) -> Result<()> {
        self.lifecycle.handle_channel_deleted(event).await
    }
}
