use std::sync::Arc;

use crate::broadcast::{BroadcastManager, BroadcastReport};
use crate::control_propagator::ControlPropagator;
use crate::deletion::{DeletionCoordinator, DeletionReport};
use crate::engagement_ledger::{EngagementLedger, LikeOutcome};
use crate::engine_config::EngineConfig;
use crate::error::RegistryError;
use crate::membership_gate::MembershipGate;
use crate::platform::MessagingPlatform;
use crate::post_model::{MediaRef, Post, PostId, UserId};
use crate::post_registry::{PostRegistry, RecentPosts, RegistryStats};
use crate::post_store::PostStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// The post as stored after broadcast, with every successful handle attached.
    pub post: Post,
    pub broadcast: BroadcastReport,
}

/// Entry point wiring registry, gate, broadcast, ledger, propagation and
/// deletion around one platform and one snapshot store.
#[derive(Clone)]
pub struct GatecastEngine {
    config: Arc<EngineConfig>,
    registry: Arc<PostRegistry>,
    broadcaster: BroadcastManager,
    propagator: ControlPropagator,
    ledger: EngagementLedger,
    deletion: DeletionCoordinator,
}

impl GatecastEngine {
    pub fn new(
        config: Arc<EngineConfig>,
        platform: Arc<dyn MessagingPlatform>,
        store: Arc<dyn PostStore>,
    ) -> Self {
        let registry = Arc::new(PostRegistry::open(store));
        let timeout = config.channel_call_timeout;
        let broadcaster = BroadcastManager::new(
            platform.clone(),
            registry.clone(),
            config.subscribe_url.clone(),
            timeout,
        );
        let propagator = ControlPropagator::new(
            platform.clone(),
            registry.clone(),
            config.subscribe_url.clone(),
            timeout,
        );
        let ledger = EngagementLedger::new(
            registry.clone(),
            MembershipGate::new(platform.clone(), timeout),
            propagator.clone(),
            Arc::from(config.channels.clone()),
        );
        let deletion = DeletionCoordinator::new(platform, registry.clone(), timeout);
        Self {
            config,
            registry,
            broadcaster,
            propagator,
            ledger,
            deletion,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates the post, then broadcasts it to every configured channel.
    /// A blank caption is stored as no caption. Likes accepted while the
    /// broadcast was still attaching handles are synced onto every copy.
    pub async fn publish(&self, media: MediaRef, caption: Option<String>) -> PublishReport {
        let caption = caption
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let created = self.registry.create(media, caption);
        let broadcast = self.broadcaster.publish(&created, &self.config.channels).await;
        let mut post = self.registry.get(created.id).unwrap_or(created);
        if post.like_count > 0 {
            self.propagator.sync(post.id).await;
            post = self.registry.get(post.id).unwrap_or(post);
        }
        PublishReport { post, broadcast }
    }

    pub async fn like(&self, post_id: PostId, user: UserId) -> LikeOutcome {
        self.ledger.like(post_id, user).await
    }

    pub async fn delete(&self, post_id: PostId) -> DeletionReport {
        self.deletion.delete(post_id).await
    }

    pub fn get(&self, post_id: PostId) -> Result<Post, RegistryError> {
        self.registry.get(post_id)
    }

    pub fn list_recent(&self, limit: usize) -> RecentPosts {
        self.registry.list_recent(limit)
    }

    pub fn stats(&self) -> RegistryStats {
        self.registry.stats()
    }
}
