use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub const NOTIFICATION_TITLE: &str = "DealCheck";
pub const DEFAULT_BODY: &str = "Nuovo deal disponibile!";
pub const ICON: &str = "/icon-192x192.png";
pub const BADGE: &str = "/icon-72x72.png";
pub const VIEW_ICON: &str = "/icon-96x96.png";
pub const VIBRATION_PATTERN: [u32; 3] = [200, 100, 200];

/// A notification as handed to the platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    /// Vibrate/pause/vibrate in milliseconds
    pub vibrate: Vec<u32>,
    pub data: NotificationData,
    pub actions: Vec<NotificationAction>,
}

/// Payload carried along for the click handler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationData {
    pub url: String,
}

/// Button shown on the notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

/// Which action a click resolved to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickAction {
    View,
    Dismiss,
    /// Click on the notification body, or an action we don't know
    Other,
}

impl ClickAction {
    pub fn parse(action: Option<&str>) -> Self {
        match action {
            Some("view") => ClickAction::View,
            Some("dismiss") => ClickAction::Dismiss,
            _ => ClickAction::Other,
        }
    }
}

impl std::fmt::Display for ClickAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClickAction::View => write!(f, "view"),
            ClickAction::Dismiss => write!(f, "dismiss"),
            ClickAction::Other => write!(f, "other"),
        }
    }
}

impl Notification {
    /// Deal notification for a push payload; empty or missing text gets the default body
    pub fn for_push(text: Option<&str>, url: &str) -> Self {
        let body = match text {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => DEFAULT_BODY.to_string(),
        };

        Self {
            title: NOTIFICATION_TITLE.to_string(),
            body,
            icon: ICON.to_string(),
            badge: BADGE.to_string(),
            vibrate: VIBRATION_PATTERN.to_vec(),
            data: NotificationData {
                url: url.to_string(),
            },
            actions: vec![
                NotificationAction {
                    action: "view".to_string(),
                    title: "Visualizza".to_string(),
                    icon: Some(VIEW_ICON.to_string()),
                },
                NotificationAction {
                    action: "dismiss".to_string(),
                    title: "Ignora".to_string(),
                    icon: None,
                },
            ],
        }
    }

    /// Where "view" should take the user
    pub fn target_url(&self) -> &str {
        if self.data.url.is_empty() {
            "/"
        } else {
            &self.data.url
        }
    }
}

/// Platform side of notifications: showing them, closing them, opening windows
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn show(&self, notification: &Notification) -> Result<()>;
    async fn close(&self, notification: &Notification) -> Result<()>;
    /// Open a window at `url`, or focus one already there
    async fn open_window(&self, url: &str) -> Result<()>;
}
