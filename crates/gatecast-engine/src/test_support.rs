//! Scriptable in-memory platform used by engine unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::platform::{EditOutcome, MembershipStatus, MessagingPlatform, ReactionControl};
use crate::post_model::{ChannelId, MediaRef, MessageHandle, UserId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentMedia {
    pub channel: ChannelId,
    pub handle: MessageHandle,
    pub caption: Option<String>,
    pub like_count: u64,
}

#[derive(Default)]
pub(crate) struct FakePlatform {
    next_handle: AtomicI64,
    failing_sends: Mutex<HashSet<ChannelId>>,
    failing_edits: Mutex<HashSet<ChannelId>>,
    identical_edits: Mutex<HashSet<ChannelId>>,
    edit_delays: Mutex<HashMap<u64, Duration>>,
    send_delays: Mutex<HashMap<ChannelId, Duration>>,
    failing_deletes: Mutex<HashSet<ChannelId>>,
    failing_membership: Mutex<HashSet<ChannelId>>,
    memberships: Mutex<HashMap<(ChannelId, UserId), MembershipStatus>>,
    pub sent: Mutex<Vec<SentMedia>>,
    pub edits: Mutex<Vec<(ChannelId, MessageHandle, u64)>>,
    pub deletes: Mutex<Vec<(ChannelId, MessageHandle)>>,
    pub membership_queries: Mutex<Vec<(ChannelId, UserId)>>,
}

pub(crate) fn channel(raw: &str) -> ChannelId {
    ChannelId::new(raw)
}

impl FakePlatform {
    pub fn new() -> Self {
        Self {
            next_handle: AtomicI64::new(100),
            ..Self::default()
        }
    }

    pub fn fail_send(&self, raw: &str) {
        self.failing_sends.lock().expect("lock").insert(channel(raw));
    }

    pub fn fail_edit(&self, raw: &str) {
        self.failing_edits.lock().expect("lock").insert(channel(raw));
    }

    pub fn identical_edit(&self, raw: &str) {
        self.identical_edits.lock().expect("lock").insert(channel(raw));
    }

    pub fn delay_send(&self, raw: &str, delay: Duration) {
        self.send_delays
            .lock()
            .expect("lock")
            .insert(channel(raw), delay);
    }

    /// Holds every edit rendering `like_count` for `delay` before it lands.
    pub fn delay_edit_for_count(&self, like_count: u64, delay: Duration) {
        self.edit_delays
            .lock()
            .expect("lock")
            .insert(like_count, delay);
    }

    pub fn fail_delete(&self, raw: &str) {
        self.failing_deletes.lock().expect("lock").insert(channel(raw));
    }

    pub fn fail_membership(&self, raw: &str) {
        self.failing_membership
            .lock()
            .expect("lock")
            .insert(channel(raw));
    }

    pub fn set_membership(&self, raw: &str, user: UserId, status: MembershipStatus) {
        self.memberships
            .lock()
            .expect("lock")
            .insert((channel(raw), user), status);
    }

    pub fn join_all(&self, channels: &[&str], user: UserId) {
        for raw in channels {
            self.set_membership(raw, user, MembershipStatus::Member);
        }
    }

    pub fn edit_count(&self) -> usize {
        self.edits.lock().expect("lock").len()
    }
}

#[async_trait]
impl MessagingPlatform for FakePlatform {
    async fn send_media(
        &self,
        channel: &ChannelId,
        _media: &MediaRef,
        caption: Option<&str>,
        control: &ReactionControl,
    ) -> Result<MessageHandle, PlatformError> {
        if self.failing_sends.lock().expect("lock").contains(channel) {
            return Err(PlatformError::api(400, "Bad Request: chat not found"));
        }
        let delay = self.send_delays.lock().expect("lock").get(channel).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let handle = MessageHandle(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.sent.lock().expect("lock").push(SentMedia {
            channel: channel.clone(),
            handle,
            caption: caption.map(str::to_string),
            like_count: control.like_count,
        });
        Ok(handle)
    }

    async fn edit_control(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
        control: &ReactionControl,
    ) -> Result<EditOutcome, PlatformError> {
        if self.failing_edits.lock().expect("lock").contains(channel) {
            return Err(PlatformError::Transport("connection reset".into()));
        }
        let delay = self
            .edit_delays
            .lock()
            .expect("lock")
            .get(&control.like_count)
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.edits
            .lock()
            .expect("lock")
            .push((channel.clone(), handle, control.like_count));
        if self.identical_edits.lock().expect("lock").contains(channel) {
            return Ok(EditOutcome::AlreadyIdentical);
        }
        Ok(EditOutcome::Updated)
    }

    async fn delete_message(
        &self,
        channel: &ChannelId,
        handle: MessageHandle,
    ) -> Result<(), PlatformError> {
        if self.failing_deletes.lock().expect("lock").contains(channel) {
            return Err(PlatformError::api(400, "Bad Request: message can't be deleted"));
        }
        self.deletes
            .lock()
            .expect("lock")
            .push((channel.clone(), handle));
        Ok(())
    }

    async fn membership_status(
        &self,
        channel: &ChannelId,
        user: UserId,
    ) -> Result<MembershipStatus, PlatformError> {
        self.membership_queries
            .lock()
            .expect("lock")
            .push((channel.clone(), user));
        if self.failing_membership.lock().expect("lock").contains(channel) {
            return Err(PlatformError::api(400, "Bad Request: member list is inaccessible"));
        }
        Ok(self
            .memberships
            .lock()
            .expect("lock")
            .get(&(channel.clone(), user))
            .cloned()
            .unwrap_or(MembershipStatus::Left))
    }
}
