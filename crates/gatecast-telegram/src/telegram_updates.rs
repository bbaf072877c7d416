//! Subset of the Telegram Bot API update model the bridge consumes.

use gatecast_engine::{MediaRef, UserId};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    #[serde(default)]
    pub from: Option<User>,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    pub video: Option<Video>,
}

impl Message {
    pub fn sender(&self) -> Option<UserId> {
        self.from.as_ref().map(User::user_id)
    }

    /// Largest photo size, or the video.
    pub fn media_ref(&self) -> Option<MediaRef> {
        if let Some(largest) = self.photo.as_ref().and_then(|sizes| sizes.last()) {
            return Some(MediaRef::photo(largest.file_id.clone()));
        }
        self.video
            .as_ref()
            .map(|video| MediaRef::video(video.file_id.clone()))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

impl User {
    pub fn user_id(&self) -> UserId {
        UserId(self.id)
    }

    pub fn display_name(&self) -> String {
        match (&self.username, &self.first_name) {
            (Some(username), _) => format!("@{username}"),
            (None, Some(first_name)) => first_name.clone(),
            (None, None) => "unknown".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    pub file_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    #[serde(default)]
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SentMessage {
    pub message_id: i64,
}
