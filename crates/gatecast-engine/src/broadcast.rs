//! Fan-out of a freshly created post to every configured channel.

use std::sync::Arc;
use std::time::Duration;

use crate::error::RegistryError;
use crate::fanout::{fan_out, ChannelOutcome};
use crate::platform::{MessagingPlatform, ReactionControl};
use crate::post_model::{ChannelId, MessageHandle, Post, PostId};
use crate::post_registry::PostRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastReport {
    pub post_id: PostId,
    /// One outcome per configured channel, in configured order.
    pub outcomes: Vec<ChannelOutcome<MessageHandle>>,
}

impl BroadcastReport {
    pub fn delivered_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    pub fn channel_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn failures(&self) -> impl Iterator<Item = &ChannelOutcome<MessageHandle>> {
        self.outcomes.iter().filter(|outcome| !outcome.is_ok())
    }
}

#[derive(Clone)]
pub struct BroadcastManager {
    platform: Arc<dyn MessagingPlatform>,
    registry: Arc<PostRegistry>,
    subscribe_url: String,
    call_timeout: Duration,
}

impl BroadcastManager {
    pub fn new(
        platform: Arc<dyn MessagingPlatform>,
        registry: Arc<PostRegistry>,
        subscribe_url: String,
        call_timeout: Duration,
    ) -> Self {
        Self {
            platform,
            registry,
            subscribe_url,
            call_timeout,
        }
    }

    /// Sends `post` to every channel with a zero-count reaction control and
    /// attaches each returned handle. Failed channels are reported and left
    /// out of `channel_handles`; the post is kept even if every channel fails.
    pub async fn publish(&self, post: &Post, channels: &[ChannelId]) -> BroadcastReport {
        let control = ReactionControl {
            post_id: post.id,
            like_count: 0,
            subscribe_url: self.subscribe_url.clone(),
        };
        let platform = &self.platform;
        let control = &control;
        let media = &post.media;
        let caption = post.caption.as_deref();
        let outcomes = fan_out(
            channels.iter().cloned(),
            self.call_timeout,
            move |channel| async move {
                platform
                    .send_media(&channel, media, caption, control)
                    .await
            },
        )
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(handle) => self.attach(post.id, &outcome.channel, *handle).await,
                Err(error) => tracing::warn!(
                    post_id = %post.id,
                    channel = %outcome.channel,
                    error = %error,
                    "broadcast to channel failed"
                ),
            }
        }

        let report = BroadcastReport {
            post_id: post.id,
            outcomes,
        };
        tracing::info!(
            post_id = %post.id,
            delivered = report.delivered_count(),
            channels = report.channel_count(),
            "post broadcast finished"
        );
        report
    }

    async fn attach(&self, post_id: PostId, channel: &ChannelId, handle: MessageHandle) {
        tracing::debug!(post_id = %post_id, channel = %channel, handle = %handle, "broadcast delivered");
        match self
            .registry
            .attach_channel_handle(post_id, channel.clone(), handle)
        {
            Ok(()) => {}
            Err(RegistryError::NotFound(_)) => {
                tracing::warn!(
                    post_id = %post_id,
                    channel = %channel,
                    "post deleted during broadcast; removing orphaned channel message"
                );
                let cleanup = tokio::time::timeout(
                    self.call_timeout,
                    self.platform.delete_message(channel, handle),
                )
                .await;
                if !matches!(cleanup, Ok(Ok(()))) {
                    tracing::warn!(
                        post_id = %post_id,
                        channel = %channel,
                        handle = %handle,
                        "orphaned channel message cleanup failed"
                    );
                }
            }
        }
    }
}
