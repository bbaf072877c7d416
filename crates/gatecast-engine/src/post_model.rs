//! Post entity and the identifier newtypes shared by every engine component.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Strictly increasing post identifier, never reused within a process.
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PostId {
    type Err = std::num::ParseIntError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim().parse::<u64>().map(PostId)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Configured destination channel: `@username` or a numeric chat id.
pub struct ChannelId(pub String);

impl ChannelId {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
/// Platform message id of one channel's copy of a post.
pub struct MessageHandle(pub i64);

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Photo,
    Video,
}

impl MediaKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Photo => "photo",
            Self::Video => "video",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Reference to media already uploaded to the messaging platform.
pub struct MediaRef {
    pub kind: MediaKind,
    pub file_id: String,
}

impl MediaRef {
    pub fn photo(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Photo,
            file_id: file_id.into(),
        }
    }

    pub fn video(file_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            file_id: file_id.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// The unit of publication. Also the on-disk snapshot shape of a post.
pub struct Post {
    pub id: PostId,
    pub media: MediaRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default)]
    pub created_unix_ms: u64,
    #[serde(default)]
    pub like_count: u64,
    #[serde(default)]
    pub liked_by: BTreeSet<UserId>,
    #[serde(default)]
    pub channel_handles: BTreeMap<ChannelId, MessageHandle>,
}

impl Post {
    pub(crate) fn new(
        id: PostId,
        media: MediaRef,
        caption: Option<String>,
        created_unix_ms: u64,
    ) -> Self {
        Self {
            id,
            media,
            caption,
            created_unix_ms,
            like_count: 0,
            liked_by: BTreeSet::new(),
            channel_handles: BTreeMap::new(),
        }
    }

    pub fn has_liked(&self, user: UserId) -> bool {
        self.liked_by.contains(&user)
    }

    /// Restores `like_count == |liked_by|`. Returns true when the count changed.
    pub(crate) fn reconcile_like_count(&mut self) -> bool {
        let expected = self.liked_by.len() as u64;
        if self.like_count == expected {
            return false;
        }
        self.like_count = expected;
        true
    }
}

/// Returns the current Unix timestamp in milliseconds.
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis()
        .try_into()
        .unwrap_or(u64::MAX)
}
