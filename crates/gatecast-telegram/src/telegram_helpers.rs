//! Retry and truncation helpers shared by Telegram API calls.

use std::time::Duration;

pub(crate) const NOT_MODIFIED_MARKER: &str = "message is not modified";

pub(crate) fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<Duration> {
    let raw = headers.get("retry-after")?.to_str().ok()?;
    let seconds = raw.trim().parse::<u64>().ok()?;
    Some(Duration::from_secs(seconds))
}

pub(crate) fn retry_delay(base_delay_ms: u64, attempt: usize, retry_after: Option<Duration>) -> Duration {
    if let Some(delay) = retry_after {
        return delay.max(Duration::from_millis(base_delay_ms));
    }
    let exponent = attempt.saturating_sub(1).min(10) as u32;
    let scaled = base_delay_ms.saturating_mul(2_u64.saturating_pow(exponent));
    Duration::from_millis(scaled.min(30_000))
}

pub(crate) fn is_retryable_transport_error(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect() || error.is_request()
}

pub(crate) fn is_retryable_telegram_status(status: u16) -> bool {
    status == 429 || status >= 500
}

pub(crate) fn is_not_modified_description(description: &str) -> bool {
    description.to_ascii_lowercase().contains(NOT_MODIFIED_MARKER)
}

pub(crate) fn truncate_for_error(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated = text.chars().take(max_chars).collect::<String>();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_retry_delay_prefers_retry_after_and_caps_backoff() {
        assert_eq!(
            retry_delay(10, 1, Some(Duration::from_secs(2))),
            Duration::from_secs(2)
        );
        assert_eq!(retry_delay(10, 1, None), Duration::from_millis(10));
        assert_eq!(retry_delay(10, 3, None), Duration::from_millis(40));
        assert_eq!(retry_delay(10_000, 9, None), Duration::from_millis(30_000));
    }

    #[test]
    fn unit_not_modified_detection_is_case_insensitive() {
        assert!(is_not_modified_description(
            "Bad Request: message is not modified: specified new message content and reply markup are exactly the same"
        ));
        assert!(is_not_modified_description("Bad Request: MESSAGE IS NOT MODIFIED"));
        assert!(!is_not_modified_description("Bad Request: message to edit not found"));
    }

    #[test]
    fn unit_truncate_for_error_appends_ellipsis() {
        assert_eq!(truncate_for_error("abcdef", 3), "abc...");
        assert_eq!(truncate_for_error("abc", 3), "abc");
    }

    #[test]
    fn unit_retryable_status_covers_rate_limit_and_server_errors() {
        assert!(is_retryable_telegram_status(429));
        assert!(is_retryable_telegram_status(502));
        assert!(!is_retryable_telegram_status(400));
        assert!(!is_retryable_telegram_status(403));
    }
}
