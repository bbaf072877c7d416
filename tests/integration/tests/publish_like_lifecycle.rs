use std::{
    collections::{HashMap, HashSet},
    path::Path,
    sync::{
        atomic::{AtomicI64, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use futures_util::future::join_all;
use gatecast_engine::{
    ChannelId, EditOutcome, EngineConfig, GatecastEngine, JsonFilePostStore, LikeOutcome,
    MediaRef, MembershipStatus, MessageHandle, MessagingPlatform, PlatformError,
    ReactionControl, UserId,
};
use serde_json::Value;
use tempfile::tempdir;

const CHANNELS: [&str; 3] = ["@alpha", "@beta", "-1001234567890"];

#[derive(Default)]
struct ScriptedPlatform {
    next_handle: AtomicI64,
    unreachable: Mutex<HashSet<String>>,
    members: Mutex<HashMap<(String, i64), MembershipStatus>>,
    sends: Mutex<Vec<(String, MessageHandle)>>,
    edits: Mutex<Vec<(String, MessageHandle, u64)>>,
    deletes: Mutex<Vec<(String, MessageHandle)>>,
}

impl ScriptedPlatform {
    fn new() -> Self {
        Self {
            next_handle: AtomicI64::new(1),
            ..Self::default()
        }
    }

    fn set_unreachable(&self, channel: &str, unreachable: bool) {
        let mut guard = self.unreachable.lock().expect("lock");
        if unreachable {
            guard.insert(channel.to_string());
        } else {
            guard.remove(channel);
        }
    }

    fn join(&self, user: UserId, channels: &[&str]) {
        let mut guard = self.members.lock().expect("lock");
        for channel in channels {
            guard.insert((channel.to_string(), user.0), MembershipStatus::Member);
        }
    }

    fn check_reachable(&self, channel: &ChannelId) -> Result<(), PlatformError> {
        if self.unreachable.lock().expect("lock").contains(channel.as_str()) {
            return Err(PlatformError::Transport("channel unreachable".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl MessagingPlatform for ScriptedPlatform {
    async fn send_media(
        &self,
        channel: &ChannelId,
        _media: &MediaRef,
        _caption: Option<&str>,
        _control: &ReactionControl,
    ) -> Result<MessageHandle, PlatformError> {
        self.check_reachable(channel)?;
        let handle = MessageHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.sends
            .lock()
            .expect("lock")
            .push((channel.as_str().to_string(), handle));
        Ok(handle)
    }

    async fn edit_control(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
        control: &ReactionControl,
    ) -> Result<EditOutcome, PlatformError> {
        self.check_reachable(channel)?;
        self.edits.lock().expect("lock").push((
            channel.as_str().to_string(),
            handle,
            control.like_count,
        ));
        Ok(EditOutcome::Updated)
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
    ) -> Result<(), PlatformError> {
        self.check_reachable(channel)?;
        self.deletes
            .lock()
            .expect("lock")
            .push((channel.as_str().to_string(), handle));
        Ok(())
    }

    async fn membership_status(
        &self,
        channel: &ChannelId,
        user: UserId,
    ) -> Result<MembershipStatus, PlatformError> {
        self.check_reachable(channel)?;
        Ok(self
            .members
            .lock()
            .expect("lock")
            .get(&(channel.as_str().to_string(), user.0))
            .cloned()
            .unwrap_or(MembershipStatus::Left))
    }
}

fn engine(platform: Arc<ScriptedPlatform>, data_file: &Path) -> GatecastEngine {
    let channels = CHANNELS.iter().map(|raw| ChannelId::new(*raw)).collect();
    let config = EngineConfig::new(channels, "https://t.me/example").expect("config");
    GatecastEngine::new(
        Arc::new(config),
        platform,
        Arc::new(JsonFilePostStore::new(data_file)),
    )
}

fn read_snapshot(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).expect("read snapshot"))
        .expect("parse snapshot")
}

#[tokio::test]
async fn integration_partial_broadcast_like_restart_and_delete() {
    let workspace = tempdir().expect("tempdir");
    let data_file = workspace.path().join("posts.json");
    let platform = Arc::new(ScriptedPlatform::new());
    platform.set_unreachable("@beta", true);

    let first = engine(platform.clone(), &data_file);
    let published = first
        .publish(MediaRef::photo("photo-1"), Some("launch".into()))
        .await;
    assert_eq!(published.broadcast.delivered_count(), 2);
    assert_eq!(published.broadcast.channel_count(), 3);
    assert!(!published
        .post
        .channel_handles
        .contains_key(&ChannelId::new("@beta")));
    let post_id = published.post.id;

    let user = UserId(77);
    platform.set_unreachable("@beta", false);
    platform.join(user, &["@alpha", "-1001234567890"]);
    assert_eq!(
        first.like(post_id, user).await,
        LikeOutcome::Denied {
            missing: vec![ChannelId::new("@beta")]
        }
    );

    platform.join(user, &["@beta"]);
    match first.like(post_id, user).await {
        LikeOutcome::Accepted { like_count, sync } => {
            assert_eq!(like_count, 1);
            assert_eq!(sync.synced_count(), 2);
        }
        other => panic!("expected accepted like, got {other:?}"),
    }
    let edited_channels = platform
        .edits
        .lock()
        .expect("lock")
        .iter()
        .map(|(channel, _, count)| (channel.clone(), *count))
        .collect::<Vec<_>>();
    assert_eq!(edited_channels.len(), 2);
    assert!(edited_channels.iter().all(|(channel, count)| channel != "@beta" && *count == 1));

    let snapshot = read_snapshot(&data_file);
    assert_eq!(snapshot["schema_version"], 1);
    assert_eq!(snapshot["posts"][0]["like_count"], 1);

    drop(first);
    let restarted = engine(platform.clone(), &data_file);
    assert_eq!(
        restarted.like(post_id, user).await,
        LikeOutcome::AlreadyLiked { like_count: 1 }
    );
    assert_eq!(restarted.stats().total_likes, 1);

    let deletion = restarted.delete(post_id).await;
    assert!(deletion.removed);
    assert!(deletion.failed_channels().is_empty());
    assert_eq!(platform.deletes.lock().expect("lock").len(), 2);
    assert_eq!(
        restarted.like(post_id, user).await,
        LikeOutcome::PostNotFound
    );
    assert_eq!(read_snapshot(&data_file)["posts"], Value::Array(Vec::new()));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn integration_concurrent_likes_from_distinct_users_are_all_counted() {
    let workspace = tempdir().expect("tempdir");
    let data_file = workspace.path().join("posts.json");
    let platform = Arc::new(ScriptedPlatform::new());
    let engine = engine(platform.clone(), &data_file);
    let post_id = engine.publish(MediaRef::video("clip"), None).await.post.id;

    let users = (1..=25).map(UserId).collect::<Vec<_>>();
    for user in &users {
        platform.join(*user, &CHANNELS);
    }
    let outcomes = join_all(users.iter().map(|user| {
        let engine = engine.clone();
        let user = *user;
        async move { engine.like(post_id, user).await }
    }))
    .await;

    assert!(outcomes
        .iter()
        .all(|outcome| matches!(outcome, LikeOutcome::Accepted { .. })));
    let post = engine.get(post_id).expect("post");
    assert_eq!(post.like_count, 25);
    assert_eq!(post.liked_by.len(), 25);
    assert_eq!(read_snapshot(&data_file)["posts"][0]["like_count"], 25);

    // The last edit to land on every copy carries the final count.
    let edits = platform.edits.lock().expect("lock").clone();
    for channel in CHANNELS {
        let last_shown = edits
            .iter()
            .filter(|(edited, _, _)| edited == channel)
            .map(|(_, _, count)| *count)
            .last();
        assert_eq!(last_shown, Some(25), "channel {channel}");
    }
}

#[tokio::test]
async fn integration_unreachable_channel_denies_like_without_mutation() {
    let workspace = tempdir().expect("tempdir");
    let data_file = workspace.path().join("posts.json");
    let platform = Arc::new(ScriptedPlatform::new());
    let engine = engine(platform.clone(), &data_file);
    let post_id = engine.publish(MediaRef::photo("p"), None).await.post.id;

    let user = UserId(5);
    platform.join(user, &CHANNELS);
    platform.set_unreachable("@alpha", true);
    assert_eq!(
        engine.like(post_id, user).await,
        LikeOutcome::Denied {
            missing: vec![ChannelId::new("@alpha")]
        }
    );
    assert_eq!(engine.get(post_id).expect("post").like_count, 0);
    assert!(platform.edits.lock().expect("lock").is_empty());
}
