//! Structured per-channel fan-out.
//!
//! Every channel call runs concurrently under its own timeout and settles into
//! a [`ChannelOutcome`]; no branch can cancel a sibling and the caller resumes
//! only once all of them have settled.

use std::future::Future;
use std::time::Duration;

use futures_util::future::join_all;

use crate::error::PlatformError;
use crate::post_model::ChannelId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelOutcome<T> {
    pub channel: ChannelId,
    pub result: Result<T, PlatformError>,
}

impl<T> ChannelOutcome<T> {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Outcomes come back in the order of `channels`.
pub(crate) async fn fan_out<T, F, Fut>(
    channels: impl IntoIterator<Item = ChannelId>,
    timeout: Duration,
    call: F,
) -> Vec<ChannelOutcome<T>>
where
    F: Fn(ChannelId) -> Fut,
    Fut: Future<Output = Result<T, PlatformError>>,
{
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let calls = channels.into_iter().map(|channel| {
        let pending = call(channel.clone());
        async move {
            let result = match tokio::time::timeout(timeout, pending).await {
                Ok(result) => result,
                Err(_) => Err(PlatformError::Timeout { timeout_ms }),
            };
            ChannelOutcome { channel, result }
        }
    });
    join_all(calls).await
}

pub(crate) fn failed_channels<T>(outcomes: &[ChannelOutcome<T>]) -> Vec<ChannelId> {
    outcomes
        .iter()
        .filter(|outcome| !outcome.is_ok())
        .map(|outcome| outcome.channel.clone())
        .collect()
}

pub(crate) fn join_channels(channels: &[ChannelId]) -> String {
    channels
        .iter()
        .map(ChannelId::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    #[tokio::test]
    async fn functional_fan_out_isolates_failures_and_timeouts() {
        let channels = vec![
            ChannelId::new("@ok"),
            ChannelId::new("@err"),
            ChannelId::new("@slow"),
        ];
        let outcomes = fan_out(channels, Duration::from_millis(50), |channel| async move {
            match channel.as_str() {
                "@err" => Err(PlatformError::Transport("boom".into())),
                "@slow" => {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(3)
                }
                _ => Ok(1),
            }
        })
        .await;

        assert_eq!(outcomes.len(), 3);
        assert_eq!(outcomes[0].result, Ok(1));
        assert_eq!(
            outcomes[1].result,
            Err(PlatformError::Transport("boom".into()))
        );
        assert_eq!(
            outcomes[2].result,
            Err(PlatformError::Timeout { timeout_ms: 50 })
        );
        assert_eq!(
            failed_channels(&outcomes),
            vec![ChannelId::new("@err"), ChannelId::new("@slow")]
        );
    }

    #[tokio::test]
    async fn functional_fan_out_runs_channels_concurrently() {
        let channels = (0..4).map(|index| ChannelId::new(format!("@c{index}")));
        let started = Instant::now();
        let outcomes = fan_out(channels, Duration::from_secs(5), |_| async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok::<_, PlatformError>(())
        })
        .await;
        assert!(outcomes.iter().all(ChannelOutcome::is_ok));
        assert!(started.elapsed() < Duration::from_millis(350));
    }
}
