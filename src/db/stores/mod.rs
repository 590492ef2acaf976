use async_trait::async_trait;

use super::DatabaseError;
use super::models::{Channel, Watch};

/// Registry of users opted into automatic routing.
#[async_trait]
pub trait WatchStore: Send + Sync {
    /// Idempotent: watching an already-watched user leaves the record,
    /// including its stored game, untouched.
    async fn watch(&self, user_id: &str, username: &str) -> Result<(), DatabaseError>;

    /// No-op when the user is not watched.
    async fn unwatch(&self, user_id: &str) -> Result<(), DatabaseError>;

    /// Updates the stored game of a watched user. Never creates a
    /// record; unknown users are a no-op.
    async fn set_game(&self, user_id: &str, game: &str) -> Result<(), DatabaseError>;

    async fn find_by_user_id(&self, user_id: &str) -> Result<Option<Watch>, DatabaseError>;

    /// All watch records in insertion order.
    async fn list_watches(&self) -> Result<Vec<Watch>, DatabaseError>;
}

/// Per-guild directory of known voice channels.
#[async_trait]
pub trait ChannelStore: Send + Sync {
    /// Insert by `channel_id`, or overwrite `name` and `guild_id` when
    /// the channel is already known. Covers both creation and rename.
    async fn upsert_channel(
        &self,
        channel_id: &str,
        name: &str,
        guild_id: &str,
    ) -> Result<(), DatabaseError>;

    /// No-op when the channel is not in the directory.
    async fn delete_channel(&self, channel_id: &str) -> Result<(), DatabaseError>;

    async fn list_by_guild(&self, guild_id: &str) -> Result<Vec<Channel>, DatabaseError>;

    async fn find_by_channel_id(&self, channel_id: &str) -> Result<Option<Channel>, DatabaseError>;
}
