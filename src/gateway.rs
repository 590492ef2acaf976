use anyhow::Result;
use async_trait::async_trait;

/// The reserved channel name used as the fallback destination for
/// watched users without a matching game channel.
pub const LOBBY_CHANNEL: &str = "Lobby";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    Voice,
    Category,
    Text,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayChannel {
    pub id: String,
    pub name: String,
    pub guild_id: String,
    pub kind: ChannelKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Playing,
    Streaming,
    Listening,
    Watching,
    Competing,
    Custom,
    Other,
}

#[derive(Debug, Clone)]
pub struct Activity {
    pub kind: ActivityKind,
    pub name: String,
}

/// A user's activity status changed.
#[derive(Debug, Clone)]
pub struct PresenceEvent {
    pub guild_id: String,
    pub user_id: String,
    pub activities: Vec<Activity>,
}

/// A user's voice-channel membership changed. `channel_id` is `None`
/// when the user disconnected from voice entirely.
#[derive(Debug, Clone)]
pub struct VoiceStateEvent {
    pub guild_id: String,
    pub user_id: String,
    pub channel_id: Option<String>,
}

/// A channel was created or deleted outside our control.
#[derive(Debug, Clone)]
pub struct ChannelEvent {
    pub channel_id: String,
    pub name: String,
    pub guild_id: String,
    pub kind: ChannelKind,
}

/// A text message arrived. `guild_id` is `None` for direct messages.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel_id: String,
    pub guild_id: Option<String>,
    pub author_id: String,
    pub author_name: String,
    pub content: String,
}

/// Outbound operations on the chat platform. The reconciliation core
/// only ever talks to this trait; the serenity-backed implementation
/// lives in `crate::discord`, and tests substitute a recording double.
#[async_trait]
pub trait Gateway: Send + Sync {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()>;

    async fn move_member(&self, guild_id: &str, user_id: &str, channel_id: &str) -> Result<()>;

    async fn create_channel(
        &self,
        guild_id: &str,
        name: &str,
        kind: ChannelKind,
    ) -> Result<GatewayChannel>;

    async fn set_channel_parent(&self, channel_id: &str, parent_id: &str) -> Result<()>;

    /// `Ok(None)` when the platform no longer knows the channel.
    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<GatewayChannel>>;

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GatewayChannel>>;

    /// Ids of the users currently connected to a voice channel.
    async fn voice_members(&self, guild_id: &str, channel_id: &str) -> Result<Vec<String>>;
}
