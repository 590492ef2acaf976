use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::config::DatabaseConfig;
use crate::db::{ChannelStore, DatabaseManager, WatchStore};
use crate::gateway::{ChannelKind, Gateway, GatewayChannel};

/// Stores backed by a throwaway SQLite file. The file handle must stay
/// alive for as long as the stores are used.
pub(crate) struct TempStores {
    _file: NamedTempFile,
    pub(crate) watches: Arc<dyn WatchStore>,
    pub(crate) channels: Arc<dyn ChannelStore>,
}

pub(crate) async fn temp_stores() -> TempStores {
    let file = NamedTempFile::new().expect("temp sqlite file");
    let config = DatabaseConfig {
        url: None,
        filename: Some(file.path().to_string_lossy().to_string()),
        max_connections: Some(1),
        min_connections: Some(1),
    };

    let manager = DatabaseManager::new(&config).await.expect("db manager");
    manager.migrate().await.expect("migrate");

    TempStores {
        _file: file,
        watches: manager.watch_store(),
        channels: manager.channel_store(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct MoveCommand {
    pub(crate) guild_id: String,
    pub(crate) user_id: String,
    pub(crate) channel_id: String,
}

/// Gateway double that serves channel state from memory and records
/// every outbound command.
#[derive(Default)]
pub(crate) struct RecordingGateway {
    channels: Mutex<HashMap<String, GatewayChannel>>,
    voice: Mutex<HashMap<String, Vec<String>>>,
    next_id: Mutex<u64>,
    moves: Mutex<Vec<MoveCommand>>,
    messages: Mutex<Vec<(String, String)>>,
    parents: Mutex<Vec<(String, String)>>,
}

impl RecordingGateway {
    pub(crate) fn add_channel(&self, id: &str, name: &str, guild_id: &str, kind: ChannelKind) {
        self.channels.lock().insert(
            id.to_string(),
            GatewayChannel {
                id: id.to_string(),
                name: name.to_string(),
                guild_id: guild_id.to_string(),
                kind,
            },
        );
    }

    pub(crate) fn place_user(&self, channel_id: &str, user_id: &str) {
        self.voice
            .lock()
            .entry(channel_id.to_string())
            .or_default()
            .push(user_id.to_string());
    }

    pub(crate) fn moves(&self) -> Vec<MoveCommand> {
        self.moves.lock().clone()
    }

    pub(crate) fn messages(&self) -> Vec<(String, String)> {
        self.messages.lock().clone()
    }

    pub(crate) fn parents(&self) -> Vec<(String, String)> {
        self.parents.lock().clone()
    }

    pub(crate) fn created_channels(&self) -> Vec<GatewayChannel> {
        self.channels
            .lock()
            .values()
            .filter(|c| c.id.starts_with("created-"))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl Gateway for RecordingGateway {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        self.messages
            .lock()
            .push((channel_id.to_string(), text.to_string()));
        Ok(())
    }

    async fn move_member(&self, guild_id: &str, user_id: &str, channel_id: &str) -> Result<()> {
        self.moves.lock().push(MoveCommand {
            guild_id: guild_id.to_string(),
            user_id: user_id.to_string(),
            channel_id: channel_id.to_string(),
        });
        Ok(())
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        name: &str,
        kind: ChannelKind,
    ) -> Result<GatewayChannel> {
        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            format!("created-{}", *next)
        };

        let channel = GatewayChannel {
            id: id.clone(),
            name: name.to_string(),
            guild_id: guild_id.to_string(),
            kind,
        };
        self.channels.lock().insert(id, channel.clone());
        Ok(channel)
    }

    async fn set_channel_parent(&self, channel_id: &str, parent_id: &str) -> Result<()> {
        self.parents
            .lock()
            .push((channel_id.to_string(), parent_id.to_string()));
        Ok(())
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<GatewayChannel>> {
        Ok(self.channels.lock().get(channel_id).cloned())
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GatewayChannel>> {
        Ok(self
            .channels
            .lock()
            .values()
            .filter(|c| c.guild_id == guild_id)
            .cloned()
            .collect())
    }

    async fn voice_members(&self, _guild_id: &str, channel_id: &str) -> Result<Vec<String>> {
        Ok(self
            .voice
            .lock()
            .get(channel_id)
            .cloned()
            .unwrap_or_default())
    }
}
