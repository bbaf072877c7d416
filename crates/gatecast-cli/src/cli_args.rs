use std::path::PathBuf;

use clap::Parser;
use gatecast_engine::{DEFAULT_CHANNEL_CALL_TIMEOUT_MS, DEFAULT_SUBSCRIBE_URL};
use gatecast_telegram::{
    DEFAULT_POLL_ERROR_BACKOFF_MS, DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_RECENT_POST_LIMIT,
    DEFAULT_TELEGRAM_API_BASE,
};

fn parse_positive_u64(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_positive_usize(value: &str) -> Result<usize, String> {
    let parsed = value
        .parse::<usize>()
        .map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Parser)]
#[command(
    name = "gatecast",
    about = "Publishes media posts to Telegram channels with membership-gated likes",
    version
)]
pub(crate) struct Cli {
    #[arg(
        long = "token",
        env = "TOKEN",
        hide_env_values = true,
        help = "Telegram bot token"
    )]
    pub token: String,

    #[arg(
        long = "admin-id",
        env = "ADMIN_ID",
        help = "Telegram user id of the operator allowed to author and manage posts"
    )]
    pub admin_id: i64,

    #[arg(
        long = "channels",
        env = "CHANNELS",
        help = "Comma-separated channel list (@username or numeric chat id)"
    )]
    pub channels: String,

    #[arg(
        long = "subscribe-url",
        env = "SUBSCRIBE_URL",
        default_value = DEFAULT_SUBSCRIBE_URL,
        help = "Target of the subscribe button attached to every channel post"
    )]
    pub subscribe_url: String,

    #[arg(
        long = "data-file",
        env = "GATECAST_DATA_FILE",
        default_value = "posts.json",
        help = "Path of the JSON post snapshot"
    )]
    pub data_file: PathBuf,

    #[arg(
        long = "api-base",
        env = "GATECAST_TELEGRAM_API_BASE",
        default_value = DEFAULT_TELEGRAM_API_BASE,
        help = "Telegram Bot API base URL"
    )]
    pub api_base: String,

    #[arg(
        long = "request-timeout-ms",
        env = "GATECAST_REQUEST_TIMEOUT_MS",
        default_value_t = 15_000,
        value_parser = parse_positive_u64,
        help = "Timeout for a single Bot API request"
    )]
    pub request_timeout_ms: u64,

    #[arg(
        long = "channel-call-timeout-ms",
        env = "GATECAST_CHANNEL_CALL_TIMEOUT_MS",
        default_value_t = DEFAULT_CHANNEL_CALL_TIMEOUT_MS,
        value_parser = parse_positive_u64,
        help = "Upper bound for one channel operation including retries"
    )]
    pub channel_call_timeout_ms: u64,

    #[arg(
        long = "retry-max-attempts",
        env = "GATECAST_RETRY_MAX_ATTEMPTS",
        default_value_t = 3,
        value_parser = parse_positive_usize,
        help = "Attempts per Bot API request on rate limits and server errors"
    )]
    pub retry_max_attempts: usize,

    #[arg(
        long = "retry-base-delay-ms",
        env = "GATECAST_RETRY_BASE_DELAY_MS",
        default_value_t = 500,
        value_parser = parse_positive_u64,
        help = "Base delay for exponential retry backoff"
    )]
    pub retry_base_delay_ms: u64,

    #[arg(
        long = "poll-timeout-secs",
        env = "GATECAST_POLL_TIMEOUT_SECS",
        default_value_t = DEFAULT_POLL_TIMEOUT_SECS,
        help = "Long-poll timeout passed to getUpdates"
    )]
    pub poll_timeout_secs: u64,

    #[arg(
        long = "poll-error-backoff-ms",
        env = "GATECAST_POLL_ERROR_BACKOFF_MS",
        default_value_t = DEFAULT_POLL_ERROR_BACKOFF_MS,
        value_parser = parse_positive_u64,
        help = "Pause after a failed poll before retrying"
    )]
    pub poll_error_backoff_ms: u64,

    #[arg(
        long = "recent-post-limit",
        env = "GATECAST_RECENT_POST_LIMIT",
        default_value_t = DEFAULT_RECENT_POST_LIMIT,
        value_parser = parse_positive_usize,
        help = "Number of posts shown in the operator management view"
    )]
    pub recent_post_limit: usize,
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn unit_cli_applies_defaults() {
        let cli = Cli::try_parse_from([
            "gatecast",
            "--token",
            "123:abc",
            "--admin-id",
            "42",
            "--channels",
            "@a,@b",
        ])
        .expect("parse");
        assert_eq!(cli.admin_id, 42);
        assert_eq!(cli.subscribe_url, DEFAULT_SUBSCRIBE_URL);
        assert_eq!(cli.data_file, PathBuf::from("posts.json"));
        assert_eq!(cli.channel_call_timeout_ms, DEFAULT_CHANNEL_CALL_TIMEOUT_MS);
        assert_eq!(cli.recent_post_limit, DEFAULT_RECENT_POST_LIMIT);
    }

    #[test]
    fn regression_cli_rejects_zero_timeouts() {
        let error = Cli::try_parse_from([
            "gatecast",
            "--token",
            "t",
            "--admin-id",
            "1",
            "--channels",
            "@a",
            "--channel-call-timeout-ms",
            "0",
        ])
        .expect_err("zero timeout should fail");
        assert!(error.to_string().contains("greater than 0"));
    }

    #[test]
    fn regression_cli_rejects_non_numeric_admin_id() {
        assert!(Cli::try_parse_from([
            "gatecast",
            "--token",
            "t",
            "--admin-id",
            "operator",
            "--channels",
            "@a",
        ])
        .is_err());
    }
}
