//! Telegram long-poll bridge: operator console plus gated like handling.

use std::time::Duration;

use anyhow::Result;
use gatecast_engine::{GatecastEngine, LikeOutcome, MediaRef, PlatformError, PostId, UserId};
use tokio::sync::watch;
use tokio::task::JoinSet;

use crate::operator_workflow::{AuthoringState, OperatorWorkflow, WorkflowStep};
use crate::telegram_api_client::TelegramApiClient;
use crate::telegram_callback::CallbackAction;
use crate::telegram_render_helpers::{
    back_to_manage_keyboard, cancel_keyboard, join_channels_keyboard, main_menu_keyboard,
    new_post_again_keyboard, post_detail_keyboard, post_list_keyboard, render_broadcast_failure,
    render_broadcast_summary, render_deletion_summary, render_main_menu_text,
    render_post_detail_caption, render_stats_text, InlineKeyboardMarkup,
};
use crate::telegram_updates::{CallbackQuery, Message, Update};

pub const DEFAULT_POLL_TIMEOUT_SECS: u64 = 25;
pub const DEFAULT_RECENT_POST_LIMIT: usize = 10;
pub const DEFAULT_POLL_ERROR_BACKOFF_MS: u64 = 3_000;

pub(crate) const LIKE_ACCEPTED_TEXT: &str = "❤️ Your like was counted!";
pub(crate) const LIKE_ALREADY_TEXT: &str = "❗ You have already liked this post!";
pub(crate) const LIKE_DENIED_TEXT: &str = "❌ Subscribe first!";
pub(crate) const POST_NOT_FOUND_TEXT: &str = "❌ Post not found.";
const IDLE_MEDIA_PROMPT_TEXT: &str = "❌ Press \"📸 New post\" first.";
const JOIN_PROMPT_TEXT: &str = "To like posts, subscribe to all of our channels:";

#[derive(Debug, Clone)]
pub struct TelegramBridgeConfig {
    /// The only account allowed to author and manage posts.
    pub operator_id: UserId,
    pub poll_timeout_secs: u64,
    pub recent_post_limit: usize,
    pub poll_error_backoff: Duration,
}

impl TelegramBridgeConfig {
    pub fn new(operator_id: UserId) -> Self {
        Self {
            operator_id,
            poll_timeout_secs: DEFAULT_POLL_TIMEOUT_SECS,
            recent_post_limit: DEFAULT_RECENT_POST_LIMIT,
            poll_error_backoff: Duration::from_millis(DEFAULT_POLL_ERROR_BACKOFF_MS),
        }
    }
}

pub struct TelegramBridge {
    config: TelegramBridgeConfig,
    api: TelegramApiClient,
    engine: GatecastEngine,
    workflow: OperatorWorkflow,
    next_offset: i64,
    like_tasks: JoinSet<()>,
}

impl TelegramBridge {
    pub fn new(config: TelegramBridgeConfig, api: TelegramApiClient, engine: GatecastEngine) -> Self {
        Self {
            config,
            api,
            engine,
            workflow: OperatorWorkflow::default(),
            next_offset: 0,
            like_tasks: JoinSet::new(),
        }
    }

    /// Polls until `shutdown` flips to true, then waits for in-flight likes.
    /// Shutdown only interrupts the long poll; a fetched batch is always
    /// dispatched in full.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        tracing::info!(
            operator = self.config.operator_id.0,
            channels = self.engine.config().channels.len(),
            "telegram bridge started"
        );
        loop {
            if *shutdown.borrow() {
                break;
            }
            let fetched = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                fetched = self.fetch_updates() => fetched,
            };
            match fetched {
                Ok(updates) => {
                    self.dispatch_updates(updates).await;
                }
                Err(error) => {
                    tracing::warn!(%error, "telegram poll failed");
                    tokio::select! {
                        _ = shutdown.changed() => {}
                        _ = tokio::time::sleep(self.config.poll_error_backoff) => {}
                    }
                }
            }
        }
        tracing::info!("telegram bridge shutdown requested");
        self.drain().await;
        Ok(())
    }

    /// Fetches one batch of updates and dispatches each one.
    pub async fn poll_once(&mut self) -> Result<usize, PlatformError> {
        let updates = self.fetch_updates().await?;
        Ok(self.dispatch_updates(updates).await)
    }

    async fn fetch_updates(&self) -> Result<Vec<Update>, PlatformError> {
        self.api
            .get_updates(self.next_offset, self.config.poll_timeout_secs)
            .await
    }

    async fn dispatch_updates(&mut self, updates: Vec<Update>) -> usize {
        self.reap_like_tasks();
        let count = updates.len();
        for update in updates {
            self.next_offset = self.next_offset.max(update.update_id.saturating_add(1));
            self.handle_update(update).await;
        }
        count
    }

    /// Waits for every spawned like handler to finish.
    pub async fn drain(&mut self) {
        while let Some(joined) = self.like_tasks.join_next().await {
            if let Err(error) = joined {
                tracing::warn!(%error, "like handler task failed");
            }
        }
    }

    fn reap_like_tasks(&mut self) {
        while let Some(joined) = self.like_tasks.try_join_next() {
            if let Err(error) = joined {
                tracing::warn!(%error, "like handler task failed");
            }
        }
    }

    pub(crate) async fn handle_update(&mut self, update: Update) {
        if let Some(query) = update.callback_query {
            self.handle_callback(query).await;
        } else if let Some(message) = update.message {
            self.handle_message(message).await;
        }
    }

    async fn handle_callback(&mut self, query: CallbackQuery) {
        let action = query.data.as_deref().and_then(CallbackAction::parse);
        match action {
            Some(CallbackAction::Like(post_id)) => {
                // Likes run off the poll loop so one slow membership check
                // does not stall other users.
                let api = self.api.clone();
                let engine = self.engine.clone();
                self.like_tasks.spawn(async move {
                    respond_to_like(&api, &engine, &query, post_id).await;
                });
            }
            Some(action) if query.from.user_id() == self.config.operator_id => {
                self.acknowledge(&query.id).await;
                self.handle_operator_action(action).await;
            }
            Some(_) => {
                tracing::debug!(
                    user = %query.from.display_name(),
                    "ignoring operator action from non-operator"
                );
                self.acknowledge(&query.id).await;
            }
            None => {
                tracing::debug!(data = ?query.data, "ignoring unknown callback data");
                self.acknowledge(&query.id).await;
            }
        }
    }

    async fn handle_operator_action(&mut self, action: CallbackAction) {
        match action {
            CallbackAction::NewPost => {
                self.workflow.begin_post();
                self.reply(
                    "📸 Send a photo or video for the new post:",
                    false,
                    Some(&cancel_keyboard()),
                )
                .await;
            }
            CallbackAction::Cancel => {
                self.workflow.reset();
                self.reply(
                    "❌ Post creation cancelled.",
                    false,
                    Some(&main_menu_keyboard()),
                )
                .await;
            }
            CallbackAction::Stats => {
                let text = render_stats_text(&self.engine.stats());
                self.reply(&text, true, Some(&main_menu_keyboard())).await;
            }
            CallbackAction::ManagePosts => self.show_recent_posts().await,
            CallbackAction::BackToMenu => self.show_main_menu().await,
            CallbackAction::ViewPost(post_id) => self.show_post(post_id).await,
            CallbackAction::DeletePost(post_id) => {
                let report = self.engine.delete(post_id).await;
                self.reply(
                    &render_deletion_summary(&report),
                    false,
                    Some(&back_to_manage_keyboard()),
                )
                .await;
            }
            CallbackAction::Like(_) => {}
        }
    }

    async fn handle_message(&mut self, message: Message) {
        if message.sender() != Some(self.config.operator_id) {
            tracing::debug!(chat = message.chat.id, "ignoring message from non-operator");
            return;
        }
        let text = message.text.as_deref().map(str::trim);
        if text == Some("/start") {
            self.workflow.reset();
            self.show_main_menu().await;
            return;
        }

        let state = self.workflow.state().clone();
        match state {
            AuthoringState::Idle => {
                if message.media_ref().is_some() {
                    self.reply(
                        IDLE_MEDIA_PROMPT_TEXT,
                        false,
                        Some(&main_menu_keyboard()),
                    )
                    .await;
                }
            }
            AuthoringState::AwaitingMedia => match self.workflow.accept_media(message.media_ref()) {
                WorkflowStep::CaptionRequested => {
                    self.reply(
                        "✍️ Now send the caption (or \"-\" for no caption):",
                        false,
                        Some(&cancel_keyboard()),
                    )
                    .await;
                }
                _ => {
                    self.reply(
                        "❌ Please send a photo or video.",
                        false,
                        Some(&cancel_keyboard()),
                    )
                    .await;
                }
            },
            AuthoringState::AwaitingCaption { .. } => {
                let Some(text) = text else {
                    self.reply(
                        "❌ Please send the caption as text.",
                        false,
                        Some(&cancel_keyboard()),
                    )
                    .await;
                    return;
                };
                if let WorkflowStep::ReadyToPublish { media, caption } =
                    self.workflow.accept_caption(text)
                {
                    self.publish_draft(media, caption).await;
                }
            }
        }
    }

    async fn publish_draft(&self, media: MediaRef, caption: Option<String>) {
        let report = self.engine.publish(media, caption).await;
        tracing::info!(
            post_id = %report.post.id,
            delivered = report.broadcast.delivered_count(),
            channels = report.broadcast.channel_count(),
            "post published"
        );
        for failure in report.broadcast.failures() {
            if let Err(error) = &failure.result {
                self.reply(
                    &render_broadcast_failure(&failure.channel, &error.to_string()),
                    false,
                    None,
                )
                .await;
            }
        }
        self.reply(
            &render_broadcast_summary(&report.broadcast),
            false,
            Some(&new_post_again_keyboard()),
        )
        .await;
    }

    async fn show_main_menu(&self) {
        self.reply(render_main_menu_text(), true, Some(&main_menu_keyboard()))
            .await;
    }

    async fn show_recent_posts(&self) {
        let recent = self.engine.list_recent(self.config.recent_post_limit);
        if recent.is_empty() {
            self.reply("📭 No posts yet.", false, Some(&main_menu_keyboard()))
                .await;
            return;
        }
        let total_posts = self.engine.stats().total_posts;
        self.reply(
            "📋 *Recent posts*",
            true,
            Some(&post_list_keyboard(&recent, total_posts)),
        )
        .await;
    }

    async fn show_post(&self, post_id: PostId) {
        let post = match self.engine.get(post_id) {
            Ok(post) => post,
            Err(_) => {
                self.reply(POST_NOT_FOUND_TEXT, false, Some(&back_to_manage_keyboard()))
                    .await;
                return;
            }
        };
        let sent = self
            .api
            .send_media_message(
                &self.operator_chat(),
                &post.media,
                Some(&render_post_detail_caption(&post)),
                &post_detail_keyboard(&post),
            )
            .await;
        if let Err(error) = sent {
            tracing::warn!(%error, post_id = %post_id, "failed to show post to operator");
        }
    }

    async fn reply(&self, text: &str, markdown: bool, keyboard: Option<&InlineKeyboardMarkup>) {
        if let Err(error) = self
            .api
            .send_message(&self.operator_chat(), text, markdown, keyboard)
            .await
        {
            tracing::warn!(%error, "failed to reply to operator");
        }
    }

    async fn acknowledge(&self, query_id: &str) {
        if let Err(error) = self.api.answer_callback_query(query_id, None, false).await {
            tracing::debug!(%error, "failed to answer callback query");
        }
    }

    fn operator_chat(&self) -> String {
        self.config.operator_id.0.to_string()
    }
}

/// Runs one like through the engine and answers the pressing user.
pub(crate) async fn respond_to_like(
    api: &TelegramApiClient,
    engine: &GatecastEngine,
    query: &CallbackQuery,
    post_id: PostId,
) -> LikeOutcome {
    let user = query.from.user_id();
    let outcome = engine.like(post_id, user).await;
    let (text, show_alert) = match &outcome {
        LikeOutcome::PostNotFound => (POST_NOT_FOUND_TEXT, false),
        LikeOutcome::Denied { missing } => {
            if let Err(error) = api
                .send_message(
                    &user.0.to_string(),
                    JOIN_PROMPT_TEXT,
                    false,
                    Some(&join_channels_keyboard(missing)),
                )
                .await
            {
                tracing::debug!(%error, user = user.0, "failed to send join prompt");
            }
            (LIKE_DENIED_TEXT, true)
        }
        LikeOutcome::AlreadyLiked { .. } => (LIKE_ALREADY_TEXT, true),
        LikeOutcome::Accepted { sync, .. } => {
            if sync.failed_count() > 0 {
                tracing::warn!(
                    post_id = %post_id,
                    failed = sync.failed_count(),
                    "like count not refreshed in every channel"
                );
            }
            (LIKE_ACCEPTED_TEXT, false)
        }
    };
    if let Err(error) = api
        .answer_callback_query(&query.id, Some(text), show_alert)
        .await
    {
        tracing::debug!(%error, "failed to answer like callback");
    }
    outcome
}
