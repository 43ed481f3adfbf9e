//! User-facing notifications and non-fatal error reporting.

pub mod broadcast;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, warn};
use uuid::Uuid;

use crate::error::BotError;
use crate::models::BotState;

pub use broadcast::{BotEvent, BroadcastNotifier};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Failure,
    Info,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(level: NotificationLevel, title: &str, message: impl Into<String>) -> Self {
        Self {
            level,
            title: title.to_string(),
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn success(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Success, title, message)
    }

    pub fn failure(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Failure, title, message)
    }

    pub fn info(title: &str, message: impl Into<String>) -> Self {
        Self::new(NotificationLevel::Info, title, message)
    }
}

/// Fire-and-forget delivery of messages to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);

    fn status_changed(&self, _state: BotState, _session_id: Option<Uuid>) {}
}

/// Sink for non-fatal diagnostics.
pub trait ErrorReporter: Send + Sync {
    fn report(&self, error: &BotError, context: &str);
}

#[derive(Debug, Clone, Default)]
pub struct TracingErrorReporter;

impl ErrorReporter for TracingErrorReporter {
    fn report(&self, error: &BotError, context: &str) {
        match error {
            BotError::Fetch(_) | BotError::Config(_) => warn!("[{}] {}: {}", error.kind(), context, error),
            _ => error!("[{}] {}: {}", error.kind(), context, error),
        }
    }
}
