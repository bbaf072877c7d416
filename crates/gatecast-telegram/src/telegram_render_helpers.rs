//! Inline keyboards and operator/user-facing texts.

use chrono::{DateTime, Utc};
use gatecast_engine::{
    BroadcastReport, ChannelId, DeletionReport, Post, ReactionControl, RecentPosts,
    RegistryStats,
};
use serde::Serialize;

use crate::telegram_callback::CallbackAction;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, action: CallbackAction) -> Self {
        Self {
            text: text.into(),
            callback_data: Some(action.encode()),
            url: None,
        }
    }

    pub fn link(text: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: None,
            url: Some(url.into()),
        }
    }
}

fn single_button(button: InlineKeyboardButton) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![button]],
    }
}

pub fn reaction_control_keyboard(control: &ReactionControl) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![
            InlineKeyboardButton::callback(
                format!("❤️ Like ({})", control.like_count),
                CallbackAction::Like(control.post_id),
            ),
            InlineKeyboardButton::link("🔔 Subscribe", control.subscribe_url.as_str()),
        ]],
    }
}

pub fn main_menu_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![
                InlineKeyboardButton::callback("📸 New post", CallbackAction::NewPost),
                InlineKeyboardButton::callback("📋 Manage posts", CallbackAction::ManagePosts),
            ],
            vec![InlineKeyboardButton::callback(
                "📊 Statistics",
                CallbackAction::Stats,
            )],
        ],
    }
}

pub fn cancel_keyboard() -> InlineKeyboardMarkup {
    single_button(InlineKeyboardButton::callback("❌ Cancel", CallbackAction::Cancel))
}

pub fn new_post_again_keyboard() -> InlineKeyboardMarkup {
    single_button(InlineKeyboardButton::callback(
        "📸 Add another post",
        CallbackAction::NewPost,
    ))
}

pub fn back_to_manage_keyboard() -> InlineKeyboardMarkup {
    single_button(InlineKeyboardButton::callback("◀️ Back", CallbackAction::ManagePosts))
}

pub fn post_detail_keyboard(post: &Post) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            vec![InlineKeyboardButton::callback(
                "🗑 Delete",
                CallbackAction::DeletePost(post.id),
            )],
            vec![InlineKeyboardButton::callback(
                "◀️ Back",
                CallbackAction::ManagePosts,
            )],
        ],
    }
}

/// Numbered newest-first; `total_posts` gives the number of the newest entry.
pub fn post_list_keyboard(recent: &RecentPosts, total_posts: usize) -> InlineKeyboardMarkup {
    let mut rows = recent
        .iter()
        .enumerate()
        .map(|(index, post)| {
            vec![InlineKeyboardButton::callback(
                format!(
                    "{}. ❤️ {} • {}",
                    total_posts.saturating_sub(index),
                    post.like_count,
                    render_date(post.created_unix_ms)
                ),
                CallbackAction::ViewPost(post.id),
            )]
        })
        .collect::<Vec<_>>();
    rows.push(vec![InlineKeyboardButton::callback(
        "◀️ Back",
        CallbackAction::BackToMenu,
    )]);
    InlineKeyboardMarkup {
        inline_keyboard: rows,
    }
}

/// One join button per channel the user is missing.
pub fn join_channels_keyboard(missing: &[ChannelId]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: missing
            .iter()
            .map(|channel| {
                vec![InlineKeyboardButton::link(
                    format!("Subscribe {channel}"),
                    channel_join_url(channel),
                )]
            })
            .collect(),
    }
}

/// `@name` links to `t.me/name`; numeric ids link to `t.me/c/<id>` with the
/// `-100` supergroup prefix stripped.
pub fn channel_join_url(channel: &ChannelId) -> String {
    let raw = channel.as_str();
    match raw.strip_prefix('@') {
        Some(username) => format!("https://t.me/{username}"),
        None => format!(
            "https://t.me/c/{}",
            raw.strip_prefix("-100").unwrap_or(raw)
        ),
    }
}

pub fn render_main_menu_text() -> &'static str {
    "👨‍💼 *Admin Panel*\n\nChoose a section:"
}

pub fn render_stats_text(stats: &RegistryStats) -> String {
    format!(
        "*📊 Statistics*\n\n📸 Total posts: {}\n❤️ Total likes: {}",
        stats.total_posts, stats.total_likes
    )
}

pub fn render_post_detail_caption(post: &Post) -> String {
    let caption = post
        .caption
        .as_deref()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or("_No caption_");
    format!(
        "*📸 Post details*\n\n📅 Sent: {}\n❤️ Likes: {}\n📢 Channels: {}\n\n{}",
        render_datetime(post.created_unix_ms),
        post.like_count,
        post.channel_handles.len(),
        caption
    )
}

pub fn render_broadcast_failure(channel: &ChannelId, detail: &str) -> String {
    format!("❌ Post was not delivered to {channel}:\n{detail}")
}

pub fn render_broadcast_summary(report: &BroadcastReport) -> String {
    format!(
        "✅ Post delivered to {}/{} channels!",
        report.delivered_count(),
        report.channel_count()
    )
}

pub fn render_deletion_summary(report: &DeletionReport) -> String {
    if !report.removed {
        return "❌ Post not found.".to_string();
    }
    let failed = report.failed_channels();
    if failed.is_empty() {
        return "🗑 Post deleted from all channels!".to_string();
    }
    format!(
        "🗑 Post deleted. Could not remove the copies in: {}",
        failed
            .iter()
            .map(ChannelId::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    )
}

fn unix_ms_to_datetime(unix_ms: u64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(i64::try_from(unix_ms).ok()?)
}

fn render_date(unix_ms: u64) -> String {
    unix_ms_to_datetime(unix_ms)
        .map(|value| value.format("%d.%m.%Y").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn render_datetime(unix_ms: u64) -> String {
    unix_ms_to_datetime(unix_ms)
        .map(|value| value.format("%d.%m.%Y %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}
