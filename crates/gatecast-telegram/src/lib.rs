//! Telegram transport for the gatecast engine.
//!
//! Provides the Bot API client that implements the engine's messaging
//! platform seam, and a long-poll bridge that serves the operator console
//! and routes like presses into the engine.

pub mod operator_workflow;
pub mod telegram_api_client;
pub mod telegram_bridge;
pub mod telegram_callback;
mod telegram_helpers;
pub mod telegram_render_helpers;
pub mod telegram_updates;

pub use operator_workflow::{AuthoringState, OperatorWorkflow, WorkflowStep, NO_CAPTION_MARKER};
pub use telegram_api_client::{TelegramApiClient, TelegramApiConfig, DEFAULT_TELEGRAM_API_BASE};
pub use telegram_bridge::{
    TelegramBridge, TelegramBridgeConfig, DEFAULT_POLL_ERROR_BACKOFF_MS,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_RECENT_POST_LIMIT,
};
pub use telegram_callback::CallbackAction;
pub use telegram_render_helpers::{channel_join_url, InlineKeyboardButton, InlineKeyboardMarkup};
pub use telegram_updates::Update;
