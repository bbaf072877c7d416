mod bootstrap_helpers;
mod cli_args;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use gatecast_engine::{GatecastEngine, JsonFilePostStore};
use gatecast_telegram::{TelegramApiClient, TelegramBridge};

use crate::bootstrap_helpers::{
    build_api_config, build_bridge_config, build_engine_config, init_tracing,
    spawn_shutdown_listener,
};
use crate::cli_args::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal in production.
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let engine_config = Arc::new(build_engine_config(&cli)?);
    let api = TelegramApiClient::new(build_api_config(&cli)?)?;
    let store = Arc::new(JsonFilePostStore::new(cli.data_file.clone()));
    let engine = GatecastEngine::new(engine_config.clone(), Arc::new(api.clone()), store);

    let stats = engine.stats();
    tracing::info!(
        channels = engine_config.channels.len(),
        posts = stats.total_posts,
        likes = stats.total_likes,
        data_file = %cli.data_file.display(),
        "gatecast starting"
    );

    let mut bridge = TelegramBridge::new(build_bridge_config(&cli), api, engine);
    bridge.run(spawn_shutdown_listener()).await?;
    tracing::info!("gatecast stopped");
    Ok(())
}
