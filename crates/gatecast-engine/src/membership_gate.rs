//! Fail-closed membership gate.
//!
//! Each like attempt queries every configured channel afresh. A channel whose
//! query errors or times out counts as "not a member"; the gate itself never
//! fails.

use std::sync::Arc;
use std::time::Duration;

use crate::fanout::{fan_out, join_channels, ChannelOutcome};
use crate::platform::{MembershipStatus, MessagingPlatform};
use crate::post_model::{ChannelId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdmissionDecision {
    Admit,
    /// Channels where membership was not established, in configured order.
    Deny { missing: Vec<ChannelId> },
}

impl AdmissionDecision {
    pub fn is_admit(&self) -> bool {
        matches!(self, Self::Admit)
    }
}

#[derive(Clone)]
pub struct MembershipGate {
    platform: Arc<dyn MessagingPlatform>,
    call_timeout: Duration,
}

impl MembershipGate {
    pub fn new(platform: Arc<dyn MessagingPlatform>, call_timeout: Duration) -> Self {
        Self {
            platform,
            call_timeout,
        }
    }

    pub async fn check_admission(&self, user: UserId, channels: &[ChannelId]) -> AdmissionDecision {
        let platform = &self.platform;
        let outcomes = fan_out(
            channels.iter().cloned(),
            self.call_timeout,
            move |channel| async move { platform.membership_status(&channel, user).await },
        )
        .await;

        let missing = outcomes
            .iter()
            .filter(|outcome| !is_member(user, outcome))
            .map(|outcome| outcome.channel.clone())
            .collect::<Vec<_>>();

        if missing.is_empty() {
            tracing::debug!(user = %user, channels = channels.len(), "membership gate admitted");
            AdmissionDecision::Admit
        } else {
            tracing::info!(
                user = %user,
                missing = %join_channels(&missing),
                "membership gate denied"
            );
            AdmissionDecision::Deny { missing }
        }
    }
}

fn is_member(user: UserId, outcome: &ChannelOutcome<MembershipStatus>) -> bool {
    match &outcome.result {
        Ok(status) if status.is_recognized_member() => true,
        Ok(status) => {
            tracing::debug!(
                user = %user,
                channel = %outcome.channel,
                status = status.as_str(),
                "not a member"
            );
            false
        }
        Err(error) => {
            tracing::warn!(
                user = %user,
                channel = %outcome.channel,
                error = %error,
                "membership query failed; treating as non-member"
            );
            false
        }
    }
}
