#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info};

mod config;
mod db;
mod discord;
mod gateway;
mod router;
mod utils;

use config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Arc::new(Config::load()?);
    utils::logging::init_tracing(&config.logging);
    info!("joinery starting up");

    let db_manager = Arc::new(db::DatabaseManager::new(&config.database).await?);
    db_manager.migrate().await?;

    let router = Arc::new(router::RouterCore::new(
        db_manager.watch_store(),
        db_manager.channel_store(),
    ));
    let discord_client = discord::DiscordClient::new(config.clone(), router);

    tokio::select! {
        result = discord_client.start() => {
            if let Err(e) = result {
                error!("discord client error: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    info!("joinery shutting down");
    Ok(())
}
