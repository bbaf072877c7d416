//! Re-renders the reaction control on every recorded channel copy of a post.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Mutex as AsyncMutex;

use crate::fanout::{fan_out, ChannelOutcome};
use crate::platform::{EditOutcome, MessagingPlatform, ReactionControl};
use crate::post_model::PostId;
use crate::post_registry::PostRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub post_id: PostId,
    /// Count rendered on the channel copies by this sync.
    pub like_count: u64,
    pub outcomes: Vec<ChannelOutcome<EditOutcome>>,
}

impl SyncReport {
    /// Channels now showing the current count, `AlreadyIdentical` included.
    pub fn synced_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.is_ok()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.len() - self.synced_count()
    }
}

type PostLocks = Mutex<HashMap<PostId, Arc<AsyncMutex<()>>>>;

/// Syncs of one post run one at a time and always render the count stored
/// when the sync starts, so the last edit to land carries the latest count.
#[derive(Clone)]
pub struct ControlPropagator {
    platform: Arc<dyn MessagingPlatform>,
    registry: Arc<PostRegistry>,
    subscribe_url: String,
    call_timeout: Duration,
    post_locks: Arc<PostLocks>,
}

impl ControlPropagator {
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
            post_locks: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Failures are logged and reported, never retried. A post that no
    /// longer exists syncs nothing.
    pub async fn sync(&self, post_id: PostId) -> SyncReport {
        let post_lock = self.post_lock(post_id);
        let report = {
            let _serialized = post_lock.lock().await;
            self.sync_current(post_id).await
        };
        self.release_post_lock(post_id, post_lock);
        report
    }

    async fn sync_current(&self, post_id: PostId) -> SyncReport {
        let Ok(post) = self.registry.get(post_id) else {
            tracing::debug!(post_id = %post_id, "post removed before control sync");
            return SyncReport {
                post_id,
                like_count: 0,
                outcomes: Vec::new(),
            };
        };
        let control = ReactionControl {
            post_id: post.id,
            like_count: post.like_count,
            subscribe_url: self.subscribe_url.clone(),
        };
        let platform = &self.platform;
        let control = &control;
        let handles = &post.channel_handles;
        let outcomes = fan_out(
            handles.keys().cloned(),
            self.call_timeout,
            move |channel| async move {
                let handle = handles[&channel];
                platform.edit_control(&channel, handle, control).await
            },
        )
        .await;

        for outcome in &outcomes {
            match &outcome.result {
                Ok(EditOutcome::Updated) => {}
                Ok(EditOutcome::AlreadyIdentical) => tracing::debug!(
                    post_id = %post.id,
                    channel = %outcome.channel,
                    "reaction control already up to date"
                ),
                Err(error) => tracing::warn!(
                    post_id = %post.id,
                    channel = %outcome.channel,
                    like_count = post.like_count,
                    error = %error,
                    "reaction control update failed"
                ),
            }
        }

        SyncReport {
            post_id: post.id,
            like_count: post.like_count,
            outcomes,
        }
    }

    fn post_lock(&self, post_id: PostId) -> Arc<AsyncMutex<()>> {
        let mut locks = self
            .post_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(post_id).or_default().clone()
    }

    fn release_post_lock(&self, post_id: PostId, post_lock: Arc<AsyncMutex<()>>) {
        let mut locks = self
            .post_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        // Map entry plus ours: nobody else is waiting on this post.
        if Arc::strong_count(&post_lock) == 2 {
            locks.remove(&post_id);
        }
    }
}
