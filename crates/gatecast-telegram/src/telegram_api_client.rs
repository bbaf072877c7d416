//! Telegram Bot API client used for channel fan-out and operator/user replies.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use gatecast_engine::{
    ChannelId, EditOutcome, MediaKind, MediaRef, MembershipStatus, MessageHandle,
    MessagingPlatform, PlatformError, ReactionControl, UserId,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::telegram_helpers::{
    is_not_modified_description, is_retryable_telegram_status, is_retryable_transport_error,
    parse_retry_after, retry_delay, truncate_for_error,
};
use crate::telegram_render_helpers::{reaction_control_keyboard, InlineKeyboardMarkup};
use crate::telegram_updates::{ChatMember, SentMessage, Update};

pub const DEFAULT_TELEGRAM_API_BASE: &str = "https://api.telegram.org";
const CAPTION_PARSE_MODE: &str = "Markdown";

#[derive(Debug, Clone)]
pub struct TelegramApiConfig {
    pub api_base: String,
    pub bot_token: String,
    pub request_timeout_ms: u64,
    pub retry_max_attempts: usize,
    pub retry_base_delay_ms: u64,
}

impl Default for TelegramApiConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_TELEGRAM_API_BASE.to_string(),
            bot_token: String::new(),
            request_timeout_ms: 15_000,
            retry_max_attempts: 3,
            retry_base_delay_ms: 500,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TelegramEnvelope<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    error_code: Option<u16>,
    #[serde(default)]
    parameters: Option<TelegramResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct TelegramResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// How far a failed request may be repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RetryMode {
    /// Transport errors, rate limits and server errors are retried.
    Idempotent,
    /// Message-creating calls: only an explicit 429 is retried, since any
    /// other failure may already have delivered the message.
    RateLimitOnly,
}

impl RetryMode {
    fn retries_transport(self) -> bool {
        self == Self::Idempotent
    }

    fn retries_status(self, status: u16) -> bool {
        match self {
            Self::Idempotent => is_retryable_telegram_status(status),
            Self::RateLimitOnly => status == 429,
        }
    }
}

#[derive(Clone)]
pub struct TelegramApiClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    request_timeout_ms: u64,
    retry_max_attempts: usize,
    retry_base_delay_ms: u64,
}

impl TelegramApiClient {
    pub fn new(config: TelegramApiConfig) -> Result<Self> {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::USER_AGENT,
            reqwest::header::HeaderValue::from_static("gatecast-telegram"),
        );
        headers.insert(
            reqwest::header::ACCEPT,
            reqwest::header::HeaderValue::from_static("application/json"),
        );
        let request_timeout_ms = config.request_timeout_ms.max(1);
        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_millis(request_timeout_ms))
            .build()
            .context("failed to create telegram api client")?;

        Ok(Self {
            http,
            api_base: config.api_base.trim().trim_end_matches('/').to_string(),
            bot_token: config.bot_token.trim().to_string(),
            request_timeout_ms,
            retry_max_attempts: config.retry_max_attempts.max(1),
            retry_base_delay_ms: config.retry_base_delay_ms.max(1),
        })
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        markdown: bool,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<MessageHandle, PlatformError> {
        let mut payload = json!({
            "chat_id": chat_id,
            "text": text,
        });
        if markdown {
            payload["parse_mode"] = Value::String(CAPTION_PARSE_MODE.to_string());
        }
        if let Some(keyboard) = keyboard {
            payload["reply_markup"] = encode_keyboard(keyboard)?;
        }
        let sent: SentMessage = self
            .call("sendMessage", &payload, RetryMode::RateLimitOnly, None)
            .await?;
        Ok(MessageHandle(sent.message_id))
    }

    /// Sends a photo or video with a Markdown caption and inline keyboard.
    pub async fn send_media_message(
        &self,
        chat_id: &str,
        media: &MediaRef,
        caption: Option<&str>,
        keyboard: &InlineKeyboardMarkup,
    ) -> Result<MessageHandle, PlatformError> {
        let (method, field) = match media.kind {
            MediaKind::Photo => ("sendPhoto", "photo"),
            MediaKind::Video => ("sendVideo", "video"),
        };
        let mut payload = json!({
            "chat_id": chat_id,
            "reply_markup": encode_keyboard(keyboard)?,
        });
        payload[field] = Value::String(media.file_id.clone());
        if let Some(caption) = caption {
            payload["caption"] = Value::String(caption.to_string());
            payload["parse_mode"] = Value::String(CAPTION_PARSE_MODE.to_string());
        }
        let sent: SentMessage = self
            .call(method, &payload, RetryMode::RateLimitOnly, None)
            .await?;
        Ok(MessageHandle(sent.message_id))
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
        text: Option<&str>,
        show_alert: bool,
    ) -> Result<(), PlatformError> {
        let mut payload = json!({ "callback_query_id": callback_query_id });
        if let Some(text) = text {
            payload["text"] = Value::String(text.to_string());
            payload["show_alert"] = Value::Bool(show_alert);
        }
        let _: Value = self
            .call("answerCallbackQuery", &payload, RetryMode::Idempotent, None)
            .await?;
        Ok(())
    }

    /// Long-polls for updates at or after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        poll_timeout_secs: u64,
    ) -> Result<Vec<Update>, PlatformError> {
        let payload = json!({
            "offset": offset,
            "timeout": poll_timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        let request_timeout = Duration::from_millis(self.request_timeout_ms)
            .saturating_add(Duration::from_secs(poll_timeout_secs));
        self.call(
            "getUpdates",
            &payload,
            RetryMode::Idempotent,
            Some(request_timeout),
        )
        .await
    }

    async fn call<T>(
        &self,
        method: &str,
        payload: &Value,
        retry: RetryMode,
        timeout_override: Option<Duration>,
    ) -> Result<T, PlatformError>
    where
        T: DeserializeOwned,
    {
        let url = format!("{}/bot{}/{method}", self.api_base, self.bot_token);
        let mut attempt = 0_usize;
        loop {
            attempt = attempt.saturating_add(1);
            let mut request = self
                .http
                .post(url.as_str())
                .header("x-gatecast-retry-attempt", attempt.saturating_sub(1).to_string())
                .json(payload);
            if let Some(timeout) = timeout_override {
                request = request.timeout(timeout);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(error) => {
                    if attempt < self.retry_max_attempts
                        && retry.retries_transport()
                        && is_retryable_transport_error(&error)
                    {
                        tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, None))
                            .await;
                        continue;
                    }
                    return Err(self.map_transport_error(method, &error));
                }
            };

            let status = response.status().as_u16();
            let header_retry_after = parse_retry_after(response.headers());
            let body = response
                .text()
                .await
                .map_err(|error| self.map_transport_error(method, &error))?;

            let envelope = match serde_json::from_str::<TelegramEnvelope<T>>(&body) {
                Ok(envelope) => envelope,
                Err(error) => {
                    if attempt < self.retry_max_attempts && retry.retries_status(status) {
                        tokio::time::sleep(retry_delay(
                            self.retry_base_delay_ms,
                            attempt,
                            header_retry_after,
                        ))
                        .await;
                        continue;
                    }
                    if (200..300).contains(&status) {
                        return Err(PlatformError::InvalidResponse(format!(
                            "telegram {method} response could not be decoded: {error}"
                        )));
                    }
                    return Err(PlatformError::api(status, truncate_for_error(&body, 320)));
                }
            };

            if envelope.ok {
                return envelope.result.ok_or_else(|| {
                    PlatformError::InvalidResponse(format!("telegram {method} response missing result"))
                });
            }

            let code = envelope.error_code.unwrap_or(status);
            let retry_after = envelope
                .parameters
                .and_then(|parameters| parameters.retry_after)
                .map(Duration::from_secs)
                .or(header_retry_after);
            if attempt < self.retry_max_attempts && retry.retries_status(code) {
                tracing::debug!(method, code, attempt, "retrying telegram request");
                tokio::time::sleep(retry_delay(self.retry_base_delay_ms, attempt, retry_after))
                    .await;
                continue;
            }
            return Err(PlatformError::api(
                code,
                envelope
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
    }

    fn map_transport_error(&self, method: &str, error: &reqwest::Error) -> PlatformError {
        if error.is_timeout() {
            return PlatformError::Timeout {
                timeout_ms: self.request_timeout_ms,
            };
        }
        PlatformError::Transport(format!("telegram {method} request failed: {error}"))
    }
}

fn encode_keyboard(keyboard: &InlineKeyboardMarkup) -> Result<Value, PlatformError> {
    serde_json::to_value(keyboard).map_err(|error| {
        PlatformError::InvalidResponse(format!("failed to encode inline keyboard: {error}"))
    })
}

#[async_trait]
impl MessagingPlatform for TelegramApiClient {
    async fn send_media(
        &self,
        channel: &ChannelId,
        media: &MediaRef,
        caption: Option<&str>,
        control: &ReactionControl,
    ) -> Result<MessageHandle, PlatformError> {
        self.send_media_message(
            channel.as_str(),
            media,
            caption,
            &reaction_control_keyboard(control),
        )
        .await
    }

    async fn edit_control(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
        control: &ReactionControl,
    ) -> Result<EditOutcome, PlatformError> {
        let payload = json!({
            "chat_id": channel.as_str(),
            "message_id": handle.0,
            "reply_markup": encode_keyboard(&reaction_control_keyboard(control))?,
        });
        match self
            .call::<Value>(
                "editMessageReplyMarkup",
                &payload,
                RetryMode::Idempotent,
                None,
            )
            .await
        {
            Ok(_) => Ok(EditOutcome::Updated),
            Err(PlatformError::Api { description, .. })
                if is_not_modified_description(&description) =>
            {
                Ok(EditOutcome::AlreadyIdentical)
            }
            Err(error) => Err(error),
        }
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
    ) -> Result<(), PlatformError> {
        let payload = json!({
            "chat_id": channel.as_str(),
            "message_id": handle.0,
        });
        let _: Value = self
            .call("deleteMessage", &payload, RetryMode::Idempotent, None)
            .await?;
        Ok(())
    }

    async fn membership_status(
        &self,
        channel: &ChannelId,
        user: UserId,
    ) -> Result<MembershipStatus, PlatformError> {
        let payload = json!({
            "chat_id": channel.as_str(),
            "user_id": user.0,
        });
        let member: ChatMember = self
            .call("getChatMember", &payload, RetryMode::Idempotent, None)
            .await?;
        Ok(MembershipStatus::parse(&member.status))
    }
}
