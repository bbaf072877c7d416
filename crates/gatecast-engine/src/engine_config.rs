use std::time::Duration;

use anyhow::{bail, Result};

use crate::post_model::ChannelId;

pub const DEFAULT_SUBSCRIBE_URL: &str = "https://t.me/testyabaa";
pub const DEFAULT_CHANNEL_CALL_TIMEOUT_MS: u64 = 10_000;

#[derive(Debug, Clone)]
/// Process-wide engine settings, built once at startup and shared by `Arc`.
pub struct EngineConfig {
    /// Broadcast targets and membership-gate targets; order drives `Deny` ordering.
    pub channels: Vec<ChannelId>,
    pub subscribe_url: String,
    pub channel_call_timeout: Duration,
}

impl EngineConfig {
    pub fn new(channels: Vec<ChannelId>, subscribe_url: impl Into<String>) -> Result<Self> {
        let mut deduped: Vec<ChannelId> = Vec::with_capacity(channels.len());
        for channel in channels {
            if !deduped.contains(&channel) {
                deduped.push(channel);
            }
        }
        if deduped.is_empty() {
            bail!("at least one channel must be configured");
        }
        let subscribe_url = subscribe_url.into().trim().to_string();
        if subscribe_url.is_empty() {
            bail!("subscribe url cannot be empty");
        }
        Ok(Self {
            channels: deduped,
            subscribe_url,
            channel_call_timeout: Duration::from_millis(DEFAULT_CHANNEL_CALL_TIMEOUT_MS),
        })
    }

    pub fn with_channel_call_timeout(mut self, timeout: Duration) -> Self {
        self.channel_call_timeout = timeout.max(Duration::from_millis(1));
        self
    }
}

/// Parses a comma separated channel list, keeping `@username` and numeric
/// chat ids and dropping everything else.
pub fn parse_channel_list(raw: &str) -> Vec<ChannelId> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| is_channel_username(entry) || is_channel_chat_id(entry))
        .map(ChannelId::new)
        .collect()
}

fn is_channel_username(value: &str) -> bool {
    value.len() > 1
        && value.starts_with('@')
        && value[1..]
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_')
}

fn is_channel_chat_id(value: &str) -> bool {
    let digits = value.strip_prefix('-').unwrap_or(value);
    !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_parse_channel_list_keeps_usernames_and_chat_ids() {
        let channels = parse_channel_list(" @alpha, -1001234567890 ,beta,, @, 42");
        assert_eq!(
            channels,
            vec![
                ChannelId::new("@alpha"),
                ChannelId::new("-1001234567890"),
                ChannelId::new("42"),
            ]
        );
    }

    #[test]
    fn unit_engine_config_rejects_empty_channel_set() {
        let error = EngineConfig::new(Vec::new(), DEFAULT_SUBSCRIBE_URL).expect_err("empty");
        assert!(error.to_string().contains("at least one channel"));
    }

    #[test]
    fn unit_engine_config_dedupes_channels_preserving_order() {
        let config = EngineConfig::new(
            vec![
                ChannelId::new("@b"),
                ChannelId::new("@a"),
                ChannelId::new("@b"),
            ],
            DEFAULT_SUBSCRIBE_URL,
        )
        .expect("config");
        assert_eq!(config.channels, vec![ChannelId::new("@b"), ChannelId::new("@a")]);
        assert_eq!(
            config.channel_call_timeout,
            Duration::from_millis(DEFAULT_CHANNEL_CALL_TIMEOUT_MS)
        );
    }
}
