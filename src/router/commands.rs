use std::sync::Arc;

use anyhow::Result;
use tracing::error;

use crate::db::{Channel, ChannelStore, Watch, WatchStore};
use crate::gateway::{Gateway, InboundMessage};

use super::lifecycle::ChannelLifecycleSync;

pub(crate) const HELP_TEXT: &str = r#"Joinery is a bot that helps you to automatically join voice channels based on the game you're playing.

```
!joinery       - Show this message
!joinery help  - Show this message

!joinery me    - Watch me for games
!joinery watch - Watch me for games
!joinery stop  - Stop watching me

!joinery who   - Who is Joinery watching?

!joinery ping  - Pong!
```"#;

fn render_watch_list(watches: &[Watch]) -> String {
    let mut out = vec!["Joinery is watching the following users for games:".to_string()];
    for watch in watches {
        let game = if watch.game.is_empty() {
            "nothing"
        } else {
            watch.game.as_str()
        };
        out.push(format!("* `{}` playing: `{}`", watch.username, game));
    }
    out.join("\n")
}

fn render_channel_list(channels: &[Channel]) -> String {
    let mut out = vec!["Joinery is watching the following voice channels:".to_string()];
    for channel in channels {
        out.push(format!("* `{}`", channel.name));
    }
    out.join("\n")
}

/// Maps exact-match text commands to registry operations and renders
/// plain-text replies. Anything else is silently ignored.
pub struct CommandRouter {
    watches: Arc<dyn WatchStore>,
    channels: Arc<dyn ChannelStore>,
    lifecycle: ChannelLifecycleSync,
}

impl CommandRouter {
    pub fn new(
        watches: Arc<dyn WatchStore>,
        channels: Arc<dyn ChannelStore>,
        lifecycle: ChannelLifecycleSync,
    ) -> Self {
        Self {
            watches,
            channels,
            lifecycle,
        }
    }

    pub async fn handle_message(
        &self,
        gateway: &dyn Gateway,
        message: &InboundMessage,
    ) -> Result<()> {
        match message.content.as_str() {
            "!joinery ping" => gateway.send_message(&message.channel_id, "Pong!").await,
            "!joinery" | "!joinery help" => {
                gateway.send_message(&message.channel_id, HELP_TEXT).await
            }
            "!joinery watch" | "!joinery me" => self.watch(gateway, message).await,
            "!joinery unwatch" | "!joinery stop" => self.unwatch(gateway, message).await,
            "!joinery who" | "!joinery list" => self.list(gateway, message).await,
            "!joinery channels" => self.list_channels(gateway, message).await,
            _ => Ok(()),
        }
    }

    async fn watch(&self, gateway: &dyn Gateway, message: &InboundMessage) -> Result<()> {
        // watching only makes sense inside a guild
        let Some(guild_id) = message.guild_id.as_deref() else {
            return Ok(());
        };

        if let Err(err) = self
            .watches
            .watch(&message.author_id, &message.author_name)
            .await
        {
            error!("error watching user: {err}");
            gateway
                .send_message(&message.channel_id, "Error watching user.")
                .await?;
            return Ok(());
        }

        gateway
            .send_message(
                &message.channel_id,
                &format!("Joinery is now watching {} for games.", message.author_name),
            )
            .await?;

        // channels created before anyone here was watched are unknown
        // to the directory; pick them up now
        self.lifecycle.sync_guild_channels(gateway, guild_id).await
    }

    async fn unwatch(&self, gateway: &dyn Gateway, message: &InboundMessage) -> Result<()> {
        if let Err(err) = self.watches.unwatch(&message.author_id).await {
            error!("error unwatching user: {err}");
            gateway
                .send_message(&message.channel_id, "Error unwatching user.")
                .await?;
            return Ok(());
        }

        gateway
            .send_message(
                &message.channel_id,
                &format!(
                    "Joinery is no longer watching {} for games.",
                    message.author_name
                ),
            )
            .await
    }

    async fn list(&self, gateway: &dyn Gateway, message: &InboundMessage) -> Result<()> {
        let users = match self.watches.list_watches().await {
            Ok(users) => users,
            Err(err) => {
                error!("error listing users: {err}");
                return gateway
                    .send_message(&message.channel_id, "Error listing users.")
                    .await;
            }
        };

        if users.is_empty() {
            return gateway
                .send_message(
                    &message.channel_id,
                    "Joinery is not watching anyone for games.",
                )
                .await;
        }

        gateway
            .send_message(&message.channel_id, &render_watch_list(&users))
            .await
    }

    async fn list_channels(&self, gateway: &dyn Gateway, message: &InboundMessage) -> Result<()> {
        let Some(guild_id) = message.guild_id.as_deref() else {
            return Ok(());
        };

        let channels = match self.channels.list_by_guild(guild_id).await {
            Ok(channels) => channels,
            Err(err) => {
                error!("error listing channels: {err}");
                return gateway
                    .send_message(&message.channel_id, "Error listing channels.")
                    .await;
            }
        };

        if channels.is_empty() {
            return gateway
                .send_message(
                    &message.channel_id,
                    "Joinery is not watching any voice channels.",
                )
                .await;
        }

        gateway
            .send_message(&message.channel_id, &render_channel_list(&channels))
            .await
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::{CommandRouter, HELP_TEXT};
    use crate::gateway::{ChannelKind, InboundMessage};
    use crate::router::lifecycle::ChannelLifecycleSync;
    use crate::router::testing::{RecordingGateway, TempStores, temp_stores};

    fn router(stores: &TempStores) -> CommandRouter {
        CommandRouter::new(
            stores.watches.clone(),
            stores.channels.clone(),
            ChannelLifecycleSync::new(stores.channels.clone()),
        )
    }

    fn message(content: &str) -> InboundMessage {
        InboundMessage {
            channel_id: "text1".to_string(),
            guild_id: Some("g1".to_string()),
            author_id: "100".to_string(),
            author_name: "alice".to_string(),
            content: content.to_string(),
        }
    }

    #[test_case("!joinery ping", "Pong!"; "ping")]
    #[test_case("!joinery", HELP_TEXT; "bare command shows help")]
    #[test_case("!joinery help", HELP_TEXT; "help")]
    #[tokio::test]
    async fn replies_to_static_commands(content: &str, reply: &str) {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        router(&stores)
            .handle_message(&gateway, &message(content))
            .await
            .expect("handle");

        assert_eq!(
            gateway.messages(),
            vec![("text1".to_string(), reply.to_string())]
        );
    }

    #[test_case("!joinery pong"; "near miss")]
    #[test_case("!JOINERY PING"; "wrong case")]
    #[test_case("hello there"; "unrelated text")]
    #[tokio::test]
    async fn ignores_unrecognized_text(content: &str) {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        router(&stores)
            .handle_message(&gateway, &message(content))
            .await
            .expect("handle");

        assert!(gateway.messages().is_empty());
    }

    #[tokio::test]
    async fn watch_command_registers_user_and_syncs_channels() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();
        gateway.add_channel("c1", "Chess", "g1", ChannelKind::Voice);
        gateway.add_channel("t1", "general", "g1", ChannelKind::Text);

        router(&stores)
            .handle_message(&gateway, &message("!joinery watch"))
            .await
            .expect("handle");

        assert!(
            stores
                .watches
                .find_by_user_id("100")
                .await
                .expect("find")
                .is_some()
        );

        let directory = stores.channels.list_by_guild("g1").await.expect("list");
        assert_eq!(directory.len(), 1);
        assert_eq!(directory[0].name, "Chess");

        assert_eq!(
            gateway.messages(),
            vec![(
                "text1".to_string(),
                "Joinery is now watching alice for games.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn watch_command_is_ignored_outside_a_guild() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        let mut dm = message("!joinery me");
        dm.guild_id = None;

        router(&stores)
            .handle_message(&gateway, &dm)
            .await
            .expect("handle");

        assert!(gateway.messages().is_empty());
        assert!(
            stores
                .watches
                .find_by_user_id("100")
                .await
                .expect("find")
                .is_none()
        );
    }

    #[tokio::test]
    async fn unwatch_command_removes_user() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();
        stores.watches.watch("100", "alice").await.expect("watch");

        router(&stores)
            .handle_message(&gateway, &message("!joinery stop"))
            .await
            .expect("handle");

        assert!(
            stores
                .watches
                .find_by_user_id("100")
                .await
                .expect("find")
                .is_none()
        );
        assert_eq!(
            gateway.messages(),
            vec![(
                "text1".to_string(),
                "Joinery is no longer watching alice for games.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn who_reports_when_nobody_is_watched() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        router(&stores)
            .handle_message(&gateway, &message("!joinery who"))
            .await
            .expect("handle");

        assert_eq!(
            gateway.messages(),
            vec![(
                "text1".to_string(),
                "Joinery is not watching anyone for games.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn who_lists_watched_users_with_their_games() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        stores.watches.watch("100", "alice").await.expect("watch");
        stores
            .watches
            .set_game("100", "Chess")
            .await
            .expect("set_game");
        stores.watches.watch("200", "bob").await.expect("watch");

        router(&stores)
            .handle_message(&gateway, &message("!joinery list"))
            .await
            .expect("handle");

        let expected = "Joinery is watching the following users for games:\n\
                        * `alice` playing: `Chess`\n\
                        * `bob` playing: `nothing`";
        assert_eq!(
            gateway.messages(),
            vec![("text1".to_string(), expected.to_string())]
        );
    }

    #[tokio::test]
    async fn channels_reports_when_directory_is_empty() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        router(&stores)
            .handle_message(&gateway, &message("!joinery channels"))
            .await
            .expect("handle");

        assert_eq!(
            gateway.messages(),
            vec![(
                "text1".to_string(),
                "Joinery is not watching any voice channels.".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn channels_lists_directory_entries_for_the_guild() {
        let stores = temp_stores().await;
        let gateway = RecordingGateway::default();

        stores
            .channels
            .upsert_channel("c1", "Chess", "g1")
            .await
            .expect("upsert");
        stores
            .channels
            .upsert_channel("c2", "Lobby", "g1")
            .await
            .expect("upsert");
        stores
            .channels
            .upsert_channel("c9", "Go", "g2")
            .await
            .expect("upsert");

        router(&stores)
            .handle_message(&gateway, &message("!joinery channels"))
            .await
            .expect("handle");

        let expected = "Joinery is watching the following voice channels:\n\
                        * `Chess`\n\
                        * `Lobby`";
        assert_eq!(
            gateway.messages(),
            vec![("text1".to_string(), expected.to_string())]
        );
    }
}
