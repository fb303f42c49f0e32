use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;

use tracing::{info, warn};

use hls_relay::{
    AppConfig, ApplicationServer, Logger, RedisDatabase,
    server::services::{AppServices, catalog_services::Catalog},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let config = Arc::new(AppConfig::parse());

    // guards are kept alive to flush logs and keep sentry connected
    let _guards = Logger::init(config.cargo_env, config.sentry_dsn.clone());

    info!("logger and env prepped, loading channels...");

    let catalog = Catalog::load(&config.channels_file).context("channel catalog failed to load")?;

    // redis only gives tokens a warm start across restarts, so it's optional
    let redis_db = match &config.redis_url {
        Some(redis_url) => {
            info!("connecting to redis...");
            match RedisDatabase::connect(redis_url).await {
                Ok(redis_db) => Some(redis_db),
                Err(e) => {
                    warn!("redis unavailable, tokens will only live in memory: {:#}", e);
                    None
                }
            }
        }
        None => None,
    };

    let services =
        AppServices::new(config.clone(), catalog, redis_db).context("relay services failed to start")?;

    info!("starting relay server...");

    ApplicationServer::serve(config, services)
        .await
        .context("relay server failed to start")?;

    Ok(())
}
