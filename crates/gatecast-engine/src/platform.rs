//! Messaging-platform contract consumed by the engine.
//!
//! The engine never sees transport details: a platform adapter turns these
//! four calls into wire requests and maps responses back to the types below.

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::post_model::{ChannelId, MediaRef, MessageHandle, PostId, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
/// Reaction control attached to every channel copy of a post: the like button
/// with the current count plus a fixed external call-to-action link.
pub struct ReactionControl {
    pub post_id: PostId,
    pub like_count: u64,
    pub subscribe_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    Updated,
    /// The platform reported the rendered control is already displayed.
    AlreadyIdentical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MembershipStatus {
    Creator,
    Administrator,
    Member,
    Restricted,
    Left,
    Kicked,
    Other(String),
}

impl MembershipStatus {
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "creator" | "owner" => Self::Creator,
            "administrator" => Self::Administrator,
            "member" => Self::Member,
            "restricted" => Self::Restricted,
            "left" => Self::Left,
            "kicked" | "banned" => Self::Kicked,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Creator => "creator",
            Self::Administrator => "administrator",
            Self::Member => "member",
            Self::Restricted => "restricted",
            Self::Left => "left",
            Self::Kicked => "kicked",
            Self::Other(raw) => raw.as_str(),
        }
    }

    /// Only member, administrator and owner roles count as membership.
    pub fn is_recognized_member(&self) -> bool {
        matches!(self, Self::Creator | Self::Administrator | Self::Member)
    }
}

#[async_trait]
/// Trait contract for the messaging platform hosting the configured channels.
pub trait MessagingPlatform: Send + Sync {
    async fn send_media(
        &self,
        channel: &ChannelId,
        media: &MediaRef,
        caption: Option<&str>,
        control: &ReactionControl,
    ) -> Result<MessageHandle, PlatformError>;

    async fn edit_control(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
        control: &ReactionControl,
    ) -> Result<EditOutcome, PlatformError>;

    async fn delete_message(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
    ) -> Result<(), PlatformError>;

    async fn membership_status(
        &self,
        channel: &ChannelId,
        user: UserId,
    ) -> Result<MembershipStatus, PlatformError>;
}
