use std::time::Duration;

use anyhow::{bail, Result};
use gatecast_engine::{parse_channel_list, EngineConfig, UserId};
use gatecast_telegram::{TelegramApiConfig, TelegramBridgeConfig};
use tokio::sync::watch;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::cli_args::Cli;

pub(crate) fn init_tracing() {
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}

pub(crate) fn build_engine_config(cli: &Cli) -> Result<EngineConfig> {
    let channels = parse_channel_list(&cli.channels);
    let listed = cli
        .channels
        .split(',')
        .filter(|entry| !entry.trim().is_empty())
        .count();
    if channels.len() < listed {
        tracing::warn!(
            listed,
            accepted = channels.len(),
            "ignoring malformed channel entries"
        );
    }
    Ok(EngineConfig::new(channels, cli.subscribe_url.clone())?
        .with_channel_call_timeout(Duration::from_millis(cli.channel_call_timeout_ms)))
}

pub(crate) fn build_api_config(cli: &Cli) -> Result<TelegramApiConfig> {
    if cli.token.trim().is_empty() {
        bail!("bot token must not be empty");
    }
    Ok(TelegramApiConfig {
        api_base: cli.api_base.clone(),
        bot_token: cli.token.clone(),
        request_timeout_ms: cli.request_timeout_ms,
        retry_max_attempts: cli.retry_max_attempts,
        retry_base_delay_ms: cli.retry_base_delay_ms,
    })
}

pub(crate) fn build_bridge_config(cli: &Cli) -> TelegramBridgeConfig {
    let mut config = TelegramBridgeConfig::new(UserId(cli.admin_id));
    config.poll_timeout_secs = cli.poll_timeout_secs;
    config.recent_post_limit = cli.recent_post_limit;
    config.poll_error_backoff = Duration::from_millis(cli.poll_error_backoff_ms);
    config
}

/// Flips the returned receiver to `true` on SIGINT or SIGTERM.
pub(crate) fn spawn_shutdown_listener() -> watch::Receiver<bool> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });
    shutdown_rx
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = terminate.recv() => {}
            }
        }
        Err(error) => {
            tracing::warn!(%error, "failed to install SIGTERM handler");
            let _ = tokio::signal::ctrl_c().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
