//! Best-effort removal of a post from every channel, followed by an
//! unconditional removal from the registry.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RegistryError;
use crate::fanout::{failed_channels, fan_out, ChannelOutcome};
use crate::platform::MessagingPlatform;
use crate::post_model::{ChannelId, PostId};
use crate::post_registry::PostRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionReport {
    pub post_id: PostId,
    pub outcomes: Vec<ChannelOutcome<()>>,
    /// False when the post was already gone, e.g. a concurrent delete won.
    pub removed: bool,
}

impl DeletionReport {
    pub fn failed_channels(&self) -> Vec<ChannelId> {
        failed_channels(&self.outcomes)
    }
}

#[derive(Clone)]
pub struct DeletionCoordinator {
    platform: Arc<dyn MessagingPlatform>,
    registry: Arc<PostRegistry>,
    call_timeout: Duration,
}

impl DeletionCoordinator {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        registry: Arc<PostRegistry>,
        call_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            registry,
            call_timeout,
        }
    }

    pub async fn delete(&self, post_id: PostId) -> DeletionReport {
        let post = match self.registry.get(post_id) {
            Ok(post) => post,
            Err(RegistryError::NotFound(_)) => {
                tracing::info!(post_id = %post_id, "delete requested for unknown post");
                return DeletionReport {
                    post_id,
                    outcomes: Vec::new(),
                    removed: false,
                };
            }
        };

        let platform = &self.platform;
        let handles = &post.channel_handles;
        let outcomes = fan_out(
            handles.keys().cloned(),
            self.call_timeout,
            move |channel| async move {
                let handle = handles[&channel];
                platform.delete_message(&channel, handle).await
            },
        )
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(()) => tracing::debug!(
                    post_id = %post_id,
                    channel = %outcome.channel,
                    "channel message deleted"
                ),
                Err(error) => tracing::warn!(
                    post_id = %post_id,
                    channel = %outcome.channel,
                    error = %error,
                    "channel message delete failed"
                ),
            }
        }

        let removed = self.registry.remove(post_id).is_ok();
        tracing::info!(
            post_id = %post_id,
            removed,
            failed_channels = outcomes.iter().filter(|outcome| !outcome.is_ok()).count(),
            "post deletion finished"
        );
        DeletionReport {
            post_id,
            outcomes,
            removed,
        }
    }
}
