//! In-memory system of record for posts.
//!
//! Every mutation happens under one exclusive section and persists the full
//! snapshot before the section is released, so two like attempts for the same
//! `(post, user)` can never both observe "not yet liked" and the on-disk
//! snapshot is never reordered relative to memory. A failed save is logged and
//! leaves the in-memory mutation in place.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::RegistryError;
use crate::post_model::{
    current_unix_timestamp_ms, ChannelId, MediaRef, MessageHandle, Post, PostId, UserId,
};
use crate::post_store::PostStore;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Result of an admitted like reaching the registry.
pub enum LikeRecord {
    /// The user was added; carries the post as it is after the increment.
    Accepted(Post),
    AlreadyLiked { like_count: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    pub total_posts: usize,
    pub total_likes: u64,
}

/// Bounded, most-recent-first view over the registry. Iterating it again
/// restarts from the newest post.
#[derive(Debug, Clone, Default)]
pub struct RecentPosts {
    posts: Vec<Post>,
}

impl RecentPosts {
    pub fn iter(&self) -> std::slice::Iter<'_, Post> {
        self.posts.iter()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}

impl<'a> IntoIterator for &'a RecentPosts {
    type Item = &'a Post;
    type IntoIter = std::slice::Iter<'a, Post>;

    fn into_iter(self) -> Self::IntoIter {
        self.posts.iter()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    posts: BTreeMap<PostId, Post>,
    last_id: u64,
}

impl RegistryState {
    fn allocate_id(&mut self, now_unix_ms: u64) -> PostId {
        let next = now_unix_ms.max(self.last_id.saturating_add(1));
        self.last_id = next;
        PostId(next)
    }
}

pub struct PostRegistry {
    store: Arc<dyn PostStore>,
    state: Mutex<RegistryState>,
}

impl PostRegistry {
    /// Loads the persisted snapshot. A failed load is logged, the unreadable
    /// snapshot is moved aside, and the registry starts empty.
    pub fn open(store: Arc<dyn PostStore>) -> Self {
        let loaded = match store.load() {
            Ok(posts) => posts,
            Err(error) => {
                tracing::error!(error = %format!("{error:#}"), "post snapshot load failed; starting empty");
                match store.quarantine_unreadable() {
                    Ok(Some(moved)) => tracing::warn!(
                        moved_to = %moved.display(),
                        "unreadable post snapshot kept for recovery"
                    ),
                    Ok(None) => {}
                    Err(error) => tracing::error!(
                        error = %format!("{error:#}"),
                        "failed to move unreadable post snapshot aside"
                    ),
                }
                Vec::new()
            }
        };

        let mut state = RegistryState::default();
        for mut post in loaded {
            if post.reconcile_like_count() {
                tracing::warn!(
                    post_id = %post.id,
                    like_count = post.like_count,
                    "like count disagreed with liked_by; recomputed"
                );
            }
            state.last_id = state.last_id.max(post.id.0);
            if state.posts.insert(post.id, post).is_some() {
                tracing::warn!("duplicate post id in snapshot; keeping the later entry");
            }
        }
        tracing::info!(posts = state.posts.len(), "post registry loaded");

        Self {
            store,
            state: Mutex::new(state),
        }
    }

    pub fn create(&self, media: MediaRef, caption: Option<String>) -> Post {
        let mut state = self.lock_state();
        let now_unix_ms = current_unix_timestamp_ms();
        let id = state.allocate_id(now_unix_ms);
        let post = Post::new(id, media, caption, now_unix_ms);
        state.posts.insert(id, post.clone());
        self.persist(&state, "create");
        post
    }

    /// Records the message handle a channel returned for `post_id`.
    /// Re-attaching the same channel overwrites the handle.
    pub fn attach_channel_handle(
        &self,
        post_id: PostId,
        channel: ChannelId,
        handle: MessageHandle,
    ) -> Result<(), RegistryError> {
        let mut state = self.lock_state();
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or(RegistryError::NotFound(post_id))?;
        if post.channel_handles.get(&channel) == Some(&handle) {
            return Ok(());
        }
        post.channel_handles.insert(channel, handle);
        self.persist(&state, "attach_channel_handle");
        Ok(())
    }

    pub fn get(&self, post_id: PostId) -> Result<Post, RegistryError> {
        self.lock_state()
            .posts
            .get(&post_id)
            .cloned()
            .ok_or(RegistryError::NotFound(post_id))
    }

    pub fn list_recent(&self, limit: usize) -> RecentPosts {
        let state = self.lock_state();
        RecentPosts {
            posts: state.posts.values().rev().take(limit).cloned().collect(),
        }
    }

    /// Atomic check-and-increment of `liked_by` / `like_count`.
    pub fn record_like(&self, post_id: PostId, user: UserId) -> Result<LikeRecord, RegistryError> {
        let mut state = self.lock_state();
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or(RegistryError::NotFound(post_id))?;
        if !post.liked_by.insert(user) {
            return Ok(LikeRecord::AlreadyLiked {
                like_count: post.like_count,
            });
        }
        post.like_count = post.like_count.saturating_add(1);
        let updated = post.clone();
        self.persist(&state, "record_like");
        Ok(LikeRecord::Accepted(updated))
    }

    pub fn remove(&self, post_id: PostId) -> Result<Post, RegistryError> {
        let mut state = self.lock_state();
        let removed = state
            .posts
            .remove(&post_id)
            .ok_or(RegistryError::NotFound(post_id))?;
        self.persist(&state, "remove");
        Ok(removed)
    }

    pub fn stats(&self) -> RegistryStats {
        let state = self.lock_state();
        RegistryStats {
            total_posts: state.posts.len(),
            total_likes: state.posts.values().map(|post| post.like_count).sum(),
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, RegistryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Called with the state lock held so snapshots land in mutation order.
    /// The write is synchronous and blocks the calling worker for its duration.
    fn persist(&self, state: &RegistryState, operation: &str) {
        let snapshot = state.posts.values().cloned().collect::<Vec<_>>();
        match self.store.save(&snapshot) {
            Ok(()) => tracing::debug!(operation, posts = snapshot.len(), "post snapshot saved"),
            Err(error) => tracing::error!(
                operation,
                error = %format!("{error:#}"),
                "post snapshot save failed; in-memory state remains authoritative"
            ),
        }
    }
}
