//! Gated-engagement publication engine.
//!
//! A post is published once and fanned out to a fixed channel set. Users may
//! like it only while they are members of every configured channel; the like
//! count is kept consistent across all channel copies and survives restarts
//! through a whole-snapshot store.
//!
//! ```rust
//! use gatecast_engine::{parse_channel_list, EngineConfig};
//!
//! let channels = parse_channel_list("@news, -1001234567890, not-a-channel");
//! let config = EngineConfig::new(channels, "https://t.me/news").expect("config");
//! assert_eq!(config.channels.len(), 2);
//! ```

pub mod broadcast;
pub mod control_propagator;
pub mod deletion;
pub mod engagement_ledger;
pub mod engine;
pub mod engine_config;
pub mod error;
pub mod fanout;
pub mod membership_gate;
pub mod platform;
pub mod post_model;
pub mod post_registry;
pub mod post_store;

#[cfg(test)]
mod test_support;

pub use broadcast::{BroadcastManager, BroadcastReport};
pub use control_propagator::{ControlPropagator, SyncReport};
pub use deletion::{DeletionCoordinator, DeletionReport};
pub use engagement_ledger::{EngagementLedger, LikeOutcome};
pub use engine::{GatecastEngine, PublishReport};
pub use engine_config::{
    parse_channel_list, EngineConfig, DEFAULT_CHANNEL_CALL_TIMEOUT_MS, DEFAULT_SUBSCRIBE_URL,
};
pub use error::{PlatformError, RegistryError};
pub use fanout::ChannelOutcome;
pub use membership_gate::{AdmissionDecision, MembershipGate};
pub use platform::{EditOutcome, MembershipStatus, MessagingPlatform, ReactionControl};
pub use post_model::{
    current_unix_timestamp_ms, ChannelId, MediaKind, MediaRef, MessageHandle, Post, PostId,
    UserId,
};
pub use post_registry::{LikeRecord, PostRegistry, RecentPosts, RegistryStats};
pub use post_store::{
    write_text_atomic, JsonFilePostStore, MemoryPostStore, PostStore,
    POST_SNAPSHOT_SCHEMA_VERSION,
};
