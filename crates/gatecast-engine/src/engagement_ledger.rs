//! Like accounting for a single `(post, user)` attempt.
//!
//! Received -> Gating -> (Denied | Gated-Pass) -> (AlreadyLiked | Accepted)
//! -> Propagating -> Done. Accounting is final once the registry accepts the
//! like; propagation only syncs the visible count and cannot undo it.

use std::sync::Arc;

use crate::control_propagator::{ControlPropagator, SyncReport};
use crate::error::RegistryError;
use crate::membership_gate::{AdmissionDecision, MembershipGate};
use crate::post_model::{ChannelId, PostId, UserId};
use crate::post_registry::{LikeRecord, PostRegistry};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeOutcome {
    PostNotFound,
    /// Nothing was mutated; `missing` drives the user's call-to-action.
    Denied { missing: Vec<ChannelId> },
    AlreadyLiked { like_count: u64 },
    Accepted { like_count: u64, sync: SyncReport },
}

#[derive(Clone)]
pub struct EngagementLedger {
    registry: Arc<PostRegistry>,
    gate: MembershipGate,
    propagator: ControlPropagator,
    channels: Arc<[ChannelId]>,
}

impl EngagementLedger {
    pub fn new(
        registry: Arc<PostRegistry>,
        gate: MembershipGate,
        propagator: ControlPropagator,
        channels: Arc<[ChannelId]>,
    ) -> Self {
        Self {
            registry,
            gate,
            propagator,
            channels,
        }
    }

    pub async fn like(&self, post_id: PostId, user: UserId) -> LikeOutcome {
        if self.registry.get(post_id).is_err() {
            tracing::info!(post_id = %post_id, user = %user, "like for unknown post");
            return LikeOutcome::PostNotFound;
        }

        if let AdmissionDecision::Deny { missing } =
            self.gate.check_admission(user, &self.channels).await
        {
            return LikeOutcome::Denied { missing };
        }

        let post = match self.registry.record_like(post_id, user) {
            Ok(LikeRecord::Accepted(post)) => post,
            Ok(LikeRecord::AlreadyLiked { like_count }) => {
                tracing::info!(post_id = %post_id, user = %user, like_count, "like already recorded");
                return LikeOutcome::AlreadyLiked { like_count };
            }
            Err(RegistryError::NotFound(_)) => {
                tracing::info!(post_id = %post_id, user = %user, "post removed while gating like");
                return LikeOutcome::PostNotFound;
            }
        };
        tracing::info!(
            post_id = %post_id,
            user = %user,
            like_count = post.like_count,
            "like accepted"
        );

        let sync = self.propagator.sync(post_id).await;
        LikeOutcome::Accepted {
            like_count: post.like_count,
            sync,
        }
    }
}
