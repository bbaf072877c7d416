//! Inline-button callback data codec.

use gatecast_engine::PostId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackAction {
    Like(PostId),
    NewPost,
    Cancel,
    Stats,
    ManagePosts,
    BackToMenu,
    ViewPost(PostId),
    DeletePost(PostId),
}

impl CallbackAction {
    /// Returns `None` for unknown or malformed data.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let action = match raw {
            "new_post" => Self::NewPost,
            "cancel" => Self::Cancel,
            "stats" => Self::Stats,
            "manage_posts" => Self::ManagePosts,
            "back_to_menu" => Self::BackToMenu,
            _ => {
                if let Some(id) = raw.strip_prefix("view_post_") {
                    Self::ViewPost(id.parse().ok()?)
                } else if let Some(id) = raw.strip_prefix("delete_post_") {
                    Self::DeletePost(id.parse().ok()?)
                } else if let Some(id) = raw.strip_prefix("like_") {
                    Self::Like(id.parse().ok()?)
                } else {
                    return None;
                }
            }
        };
        Some(action)
    }

    pub fn encode(&self) -> String {
        match self {
            Self::Like(id) => format!("like_{id}"),
            Self::NewPost => "new_post".to_string(),
            Self::Cancel => "cancel".to_string(),
            Self::Stats => "stats".to_string(),
            Self::ManagePosts => "manage_posts".to_string(),
            Self::BackToMenu => "back_to_menu".to_string(),
            Self::ViewPost(id) => format!("view_post_{id}"),
            Self::DeletePost(id) => format!("delete_post_{id}"),
        }
    }
}
