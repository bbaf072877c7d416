//! Durable snapshot storage for the post collection.
//!
//! Stores only ever see whole snapshots: one load at startup and one save
//! after every registry mutation. There is no business logic here.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::post_model::{current_unix_timestamp_ms, Post};

pub const POST_SNAPSHOT_SCHEMA_VERSION: u32 = 1;

/// Whole-snapshot persistence contract used by the post registry.
pub trait PostStore: Send + Sync {
    /// Returns every persisted post, or an empty list when nothing was saved yet.
    fn load(&self) -> Result<Vec<Post>>;

    fn save(&self, posts: &[Post]) -> Result<()>;

    /// Moves a snapshot that failed to load out of the way so the next save
    /// cannot overwrite it. Returns where it went, if anywhere.
    fn quarantine_unreadable(&self) -> Result<Option<PathBuf>> {
        Ok(None)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct PostSnapshotFile {
    schema_version: u32,
    #[serde(default)]
    posts: Vec<Post>,
}

/// JSON file store written with a temp file + rename.
#[derive(Debug, Clone)]
pub struct JsonFilePostStore {
    path: PathBuf,
}

impl JsonFilePostStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PostStore for JsonFilePostStore {
    fn load(&self) -> Result<Vec<Post>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read post snapshot {}", self.path.display()))?;
        if raw.trim().is_empty() {
            return Ok(Vec::new());
        }
        let snapshot = serde_json::from_str::<PostSnapshotFile>(&raw).with_context(|| {
            format!("failed to parse post snapshot {}", self.path.display())
        })?;
        if snapshot.schema_version != POST_SNAPSHOT_SCHEMA_VERSION {
            bail!(
                "unsupported post snapshot schema: expected {}, found {}",
                POST_SNAPSHOT_SCHEMA_VERSION,
                snapshot.schema_version
            );
        }
        Ok(snapshot.posts)
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        let snapshot = PostSnapshotFile {
            schema_version: POST_SNAPSHOT_SCHEMA_VERSION,
            posts: posts.to_vec(),
        };
        let mut payload =
            serde_json::to_string_pretty(&snapshot).context("failed to serialize post snapshot")?;
        payload.push('\n');
        write_text_atomic(&self.path, &payload)
            .with_context(|| format!("failed to write post snapshot {}", self.path.display()))
    }

    fn quarantine_unreadable(&self) -> Result<Option<PathBuf>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| anyhow!("post snapshot path has no file name"))?
            .to_string_lossy();
        let target = self.path.with_file_name(format!(
            "{file_name}.unreadable-{}",
            current_unix_timestamp_ms()
        ));
        std::fs::rename(&self.path, &target).with_context(|| {
            format!(
                "failed to move unreadable post snapshot {} to {}",
                self.path.display(),
                target.display()
            )
        })?;
        Ok(Some(target))
    }
}

/// Writes text using a temp file + rename so readers never observe partial data.
pub fn write_text_atomic(path: &Path, content: &str) -> Result<()> {
    if path.as_os_str().is_empty() {
        bail!("destination path cannot be empty");
    }
    if path.is_dir() {
        bail!("destination path '{}' is a directory", path.display());
    }

    let parent_dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent_dir)
        .with_context(|| format!("failed to create {}", parent_dir.display()))?;

    let temp_name = format!(
        ".{}.tmp-{}-{}",
        path.file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("posts"),
        std::process::id(),
        current_unix_timestamp_ms()
    );
    let temp_path = parent_dir.join(temp_name);
    std::fs::write(&temp_path, content)
        .with_context(|| format!("failed to write temporary file {}", temp_path.display()))?;
    std::fs::rename(&temp_path, path).with_context(|| {
        format!(
            "failed to rename temporary snapshot {} to {}",
            temp_path.display(),
            path.display()
        )
    })?;
    Ok(())
}

/// In-process store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryPostStore {
    posts: Mutex<Vec<Post>>,
    fail_saves: Mutex<bool>,
    save_count: Mutex<usize>,
}

impl MemoryPostStore {
    pub fn with_posts(posts: Vec<Post>) -> Self {
        Self {
            posts: Mutex::new(posts),
            ..Self::default()
        }
    }

    /// Makes every subsequent `save` fail until reset.
    pub fn set_fail_saves(&self, fail: bool) {
        if let Ok(mut guard) = self.fail_saves.lock() {
            *guard = fail;
        }
    }

    pub fn saved_posts(&self) -> Vec<Post> {
        self.posts
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn save_count(&self) -> usize {
        self.save_count.lock().map(|guard| *guard).unwrap_or(0)
    }
}

impl PostStore for MemoryPostStore {
    fn load(&self) -> Result<Vec<Post>> {
        self.posts
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| anyhow!("memory post store mutex is poisoned"))
    }

    fn save(&self, posts: &[Post]) -> Result<()> {
        let fail = self
            .fail_saves
            .lock()
            .map_err(|_| anyhow!("memory post store mutex is poisoned"))?;
        if *fail {
            bail!("memory post store configured to fail saves");
        }
        *self
            .posts
            .lock()
            .map_err(|_| anyhow!("memory post store mutex is poisoned"))? = posts.to_vec();
        *self
            .save_count
            .lock()
            .map_err(|_| anyhow!("memory post store mutex is poisoned"))? += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::post_model::{ChannelId, MediaRef, MessageHandle, PostId, UserId};
    use tempfile::tempdir;

    fn sample_post(id: u64) -> Post {
        let mut post = Post::new(PostId(id), MediaRef::photo("file-1"), Some("x".into()), id);
        post.channel_handles
            .insert(ChannelId::new("@alpha"), MessageHandle(101));
        post.liked_by.insert(UserId(5));
        post.like_count = 1;
        post
    }

    #[test]
    fn unit_load_missing_file_returns_empty() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFilePostStore::new(temp.path().join("posts.json"));
        assert!(store.load().expect("load").is_empty());
    }

    #[test]
    fn functional_save_then_load_restores_posts() {
        let temp = tempdir().expect("tempdir");
        let store = JsonFilePostStore::new(temp.path().join("state").join("posts.json"));
        store
            .save(&[sample_post(1), sample_post(2)])
            .expect("save");
        let loaded = store.load().expect("load");
        assert_eq!(loaded, vec![sample_post(1), sample_post(2)]);

        let raw = std::fs::read_to_string(store.path()).expect("read");
        assert!(raw.contains("\"schema_version\": 1"));
        assert!(raw.ends_with('\n'));
    }

    #[test]
    fn regression_load_rejects_unknown_schema_version() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("posts.json");
        std::fs::write(&path, r#"{"schema_version":9,"posts":[]}"#).expect("write");
        let error = JsonFilePostStore::new(path).load().expect_err("schema mismatch");
        assert!(error.to_string().contains("unsupported post snapshot schema"));
    }

    #[test]
    fn regression_load_reports_corrupt_file() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("posts.json");
        std::fs::write(&path, "{not json").expect("write");
        let error = JsonFilePostStore::new(path).load().expect_err("corrupt");
        assert!(error.to_string().contains("failed to parse post snapshot"));
    }

    #[test]
    fn regression_unreadable_snapshot_is_moved_aside_intact() {
        let temp = tempdir().expect("tempdir");
        let path = temp.path().join("posts.json");
        std::fs::write(&path, "{not json").expect("write");
        let store = JsonFilePostStore::new(&path);

        let moved = store
            .quarantine_unreadable()
            .expect("quarantine")
            .expect("moved");
        assert!(!path.exists());
        assert!(moved
            .file_name()
            .and_then(|name| name.to_str())
            .is_some_and(|name| name.starts_with("posts.json.unreadable-")));
        assert_eq!(std::fs::read_to_string(&moved).expect("read"), "{not json");
        assert_eq!(store.quarantine_unreadable().expect("second"), None);
    }

    #[test]
    fn unit_write_text_atomic_rejects_directory_target() {
        let temp = tempdir().expect("tempdir");
        let error = write_text_atomic(temp.path(), "x").expect_err("directory");
        assert!(error.to_string().contains("is a directory"));
    }

    #[test]
    fn unit_memory_store_can_fail_saves() {
        let store = MemoryPostStore::default();
        store.set_fail_saves(true);
        assert!(store.save(&[sample_post(1)]).is_err());
        store.set_fail_saves(false);
        store.save(&[sample_post(1)]).expect("save");
        assert_eq!(store.save_count(), 1);
        assert_eq!(store.saved_posts().len(), 1);
    }
}
