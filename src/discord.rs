use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serenity::all::{
    ActivityData, ActivityType, Cache, ChannelId, ChannelType, Client as SerenityClient,
    Context as SerenityContext, CreateChannel, EditChannel, EventHandler as SerenityEventHandler,
    GatewayIntents, Guild, GuildChannel, GuildId, Http, Message, Presence, Ready, UserId,
    VoiceState,
};
use serenity::http::{HttpError, StatusCode};
use tracing::{error, info};

use crate::config::Config;
use crate::gateway::{
    Activity, ActivityKind, ChannelEvent, ChannelKind, Gateway, GatewayChannel, InboundMessage,
    PresenceEvent, VoiceStateEvent,
};
use crate::router::RouterCore;

pub struct DiscordClient {
    config: Arc<Config>,
    router: Arc<RouterCore>,
}

impl DiscordClient {
    pub fn new(config: Arc<Config>, router: Arc<RouterCore>) -> Self {
        Self { config, router }
    }

    /// Connects to the gateway and blocks until the connection is torn
    /// down. Event dispatch happens on per-event tasks inside serenity.
    pub async fn start(&self) -> Result<()> {
        let intents = if self.config.bot.use_privileged_intents {
            GatewayIntents::all()
        } else {
            GatewayIntents::non_privileged()
        };

        let handler = JoineryHandler {
            router: self.router.clone(),
        };

        let mut client = SerenityClient::builder(&self.config.bot.token, intents)
            .event_handler(handler)
            .await
            .map_err(|err| anyhow!("failed to build discord gateway client: {err}"))?;

        client
            .start()
            .await
            .map_err(|err| anyhow!("discord gateway stopped: {err}"))
    }
}

/// Translates serenity callbacks into gateway-neutral events for the
/// reconciliation core. Reconciler failures are logged here and never
/// surfaced to users.
struct JoineryHandler {
    router: Arc<RouterCore>,
}

#[serenity::async_trait]
impl SerenityEventHandler for JoineryHandler {
    async fn ready(&self, ctx: SerenityContext, ready: Ready) {
        info!("gateway ready as {} ({})", ready.user.name, ready.user.id);
        ctx.set_activity(Some(ActivityData::playing("!joinery")));
    }

    async fn message(&self, ctx: SerenityContext, msg: Message) {
        if msg.author.bot {
            return;
        }

        let event = InboundMessage {
            channel_id: msg.channel_id.to_string(),
            guild_id: msg.guild_id.map(|id| id.to_string()),
            author_id: msg.author.id.to_string(),
            author_name: msg.author.name.clone(),
            content: msg.content.clone(),
        };

        let gateway = SerenityGateway::from_ctx(&ctx);
        if let Err(err) = self.router.handle_message(&gateway, &event).await {
            error!("failed to handle message in {}: {err}", event.channel_id);
        }
    }

    async fn guild_create(&self, ctx: SerenityContext, guild: Guild, _is_new: Option<bool>) {
        let existing: Vec<GatewayChannel> = guild.channels.values().map(to_gateway_channel).collect();

        let gateway = SerenityGateway::from_ctx(&ctx);
        if let Err(err) = self
            .router
            .handle_guild_available(&gateway, &guild.id.to_string(), &existing)
            .await
        {
            error!("failed to bootstrap guild {}: {err}", guild.id);
        }
    }

    async fn presence_update(&self, ctx: SerenityContext, new_data: Presence) {
        if new_data.user.bot.unwrap_or(false) {
            return;
        }
        let Some(guild_id) = new_data.guild_id else {
            return;
        };

        let activities = new_data
            .activities
            .iter()
            .map(|activity| Activity {
                kind: activity_kind(activity.kind),
                name: activity.name.clone(),
            })
            .collect();

        let event = PresenceEvent {
            guild_id: guild_id.to_string(),
            user_id: new_data.user.id.to_string(),
            activities,
        };

        let gateway = SerenityGateway::from_ctx(&ctx);
        if let Err(err) = self.router.handle_presence_update(&gateway, &event).await {
            error!("failed to reconcile presence for {}: {err}", event.user_id);
        }
    }

    async fn voice_state_update(&self, ctx: SerenityContext, _old: Option<VoiceState>, new: VoiceState) {
        let Some(guild_id) = new.guild_id else {
            return;
        };

        let event = VoiceStateEvent {
            guild_id: guild_id.to_string(),
            user_id: new.user_id.to_string(),
            channel_id: new.channel_id.map(|id| id.to_string()),
        };

        let gateway = SerenityGateway::from_ctx(&ctx);
        if let Err(err) = self.router.handle_voice_state_update(&gateway, &event).await {
            error!("failed to reconcile voice state for {}: {err}", event.user_id);
        }
    }

    async fn channel_create(&self, _ctx: SerenityContext, channel: GuildChannel) {
        if let Err(err) = self.router.handle_channel_created(&to_channel_event(&channel)).await {
            error!("failed to record created channel {}: {err}", channel.id);
        }
    }

    async fn channel_delete(
        &self,
        _ctx: SerenityContext,
        channel: GuildChannel,
        _messages: Option<Vec<Message>>,
    ) {
        if let Err(err) = self.router.handle_channel_deleted(&to_channel_event(&channel)).await {
            error!("failed to record deleted channel {}: {err}", channel.id);
        }
    }
}

/// Outbound gateway operations backed by serenity's HTTP client and
/// cache, built per event from the dispatch context.
struct SerenityGateway {
    http: Arc<Http>,
    cache: Arc<Cache>,
}

impl SerenityGateway {
    fn from_ctx(ctx: &SerenityContext) -> Self {
        Self {
            http: ctx.http.clone(),
            cache: ctx.cache.clone(),
        }
    }
}

fn parse_id(value: &str, what: &str) -> Result<u64> {
    value
        .parse()
        .map_err(|_| anyhow!("invalid {what} id: {value}"))
}

fn channel_kind(kind: ChannelType) -> ChannelKind {
    match kind {
        ChannelType::Voice => ChannelKind::Voice,
        ChannelType::Category => ChannelKind::Category,
        ChannelType::Text => ChannelKind::Text,
        _ => ChannelKind::Other,
    }
}

fn activity_kind(kind: ActivityType) -> ActivityKind {
    match kind {
        ActivityType::Playing => ActivityKind::Playing,
        ActivityType::Streaming => ActivityKind::Streaming,
        ActivityType::Listening => ActivityKind::Listening,
        ActivityType::Watching => ActivityKind::Watching,
        ActivityType::Competing => ActivityKind::Competing,
        ActivityType::Custom => ActivityKind::Custom,
        _ => ActivityKind::Other,
    }
}

fn to_gateway_channel(channel: &GuildChannel) -> GatewayChannel {
    GatewayChannel {
        id: channel.id.to_string(),
        name: channel.name.clone(),
        guild_id: channel.guild_id.to_string(),
        kind: channel_kind(channel.kind),
    }
}

fn to_channel_event(channel: &GuildChannel) -> ChannelEvent {
    ChannelEvent {
        channel_id: channel.id.to_string(),
        name: channel.name.clone(),
        guild_id: channel.guild_id.to_string(),
        kind: channel_kind(channel.kind),
    }
}

fn is_not_found(err: &HttpError) -> bool {
    matches!(
        err,
        HttpError::UnsuccessfulRequest(response) if response.status_code == StatusCode::NOT_FOUND
    )
}

#[async_trait]
impl Gateway for SerenityGateway {
    async fn send_message(&self, channel_id: &str, text: &str) -> Result<()> {
        let channel = ChannelId::new(parse_id(channel_id, "channel")?);
        channel
            .say(&self.http, text)
            .await
            .map_err(|e| anyhow!("failed to send message to {channel_id}: {e}"))?;
        Ok(())
    }

    async fn move_member(&self, guild_id: &str, user_id: &str, channel_id: &str) -> Result<()> {
        let guild = GuildId::new(parse_id(guild_id, "guild")?);
        guild
            .move_member(
                &self.http,
                UserId::new(parse_id(user_id, "user")?),
                ChannelId::new(parse_id(channel_id, "channel")?),
            )
            .await
            .map_err(|e| anyhow!("failed to move member {user_id} to {channel_id}: {e}"))?;
        Ok(())
    }

    async fn create_channel(
        &self,
        guild_id: &str,
        name: &str,
        kind: ChannelKind,
    ) -> Result<GatewayChannel> {
        let kind = match kind {
            ChannelKind::Voice => ChannelType::Voice,
            ChannelKind::Category => ChannelType::Category,
            ChannelKind::Text => ChannelType::Text,
            ChannelKind::Other => return Err(anyhow!("cannot create channel of unknown kind")),
        };

        let guild = GuildId::new(parse_id(guild_id, "guild")?);
        let channel = guild
            .create_channel(&self.http, CreateChannel::new(name).kind(kind))
            .await
            .map_err(|e| anyhow!("failed to create channel {name} in {guild_id}: {e}"))?;
        Ok(to_gateway_channel(&channel))
    }

    async fn set_channel_parent(&self, channel_id: &str, parent_id: &str) -> Result<()> {
        let channel = ChannelId::new(parse_id(channel_id, "channel")?);
        let parent = ChannelId::new(parse_id(parent_id, "channel")?);
        channel
            .edit(&self.http, EditChannel::new().category(Some(parent)))
            .await
            .map_err(|e| anyhow!("failed to move channel {channel_id} under {parent_id}: {e}"))?;
        Ok(())
    }

    async fn fetch_channel(&self, channel_id: &str) -> Result<Option<GatewayChannel>> {
        let channel = ChannelId::new(parse_id(channel_id, "channel")?);
        match channel.to_channel(&self.http).await {
            Ok(serenity::all::Channel::Guild(guild_channel)) => {
                Ok(Some(to_gateway_channel(&guild_channel)))
            }
            Ok(_) => Ok(None),
            Err(serenity::Error::Http(err)) if is_not_found(&err) => Ok(None),
            Err(e) => Err(anyhow!("failed to fetch channel {channel_id}: {e}")),
        }
    }

    async fn guild_channels(&self, guild_id: &str) -> Result<Vec<GatewayChannel>> {
        let guild = GuildId::new(parse_id(guild_id, "guild")?);
        let channels = guild
            .channels(&self.http)
            .await
            .map_err(|e| anyhow!("failed to fetch channels for guild {guild_id}: {e}"))?;
        Ok(channels.values().map(to_gateway_channel).collect())
    }

    async fn voice_members(&self, guild_id: &str, channel_id: &str) -> Result<Vec<String>> {
        let guild = GuildId::new(parse_id(guild_id, "guild")?);
        let channel = ChannelId::new(parse_id(channel_id, "channel")?);

        let guild_ref = self
            .cache
            .guild(guild)
            .ok_or_else(|| anyhow!("guild {guild_id} not in cache"))?;

        Ok(guild_ref
            .voice_states
            .values()
            .filter(|state| state.channel_id == Some(channel))
            .map(|state| state.user_id.to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::{activity_kind, channel_kind};
    use crate::gateway::{ActivityKind, ChannelKind};
    use serenity::all::{ActivityType, ChannelType};

    #[test]
    fn maps_playing_activity() {
        assert_eq!(activity_kind(ActivityType::Playing), ActivityKind::Playing);
        assert_eq!(activity_kind(ActivityType::Custom), ActivityKind::Custom);
    }

    #[test]
    fn maps_channel_types() {
        assert_eq!(channel_kind(ChannelType::Voice), ChannelKind::Voice);
        assert_eq!(channel_kind(ChannelType::Category), ChannelKind::Category);
        assert_eq!(channel_kind(ChannelType::Stage), ChannelKind::Other);
    }
}
