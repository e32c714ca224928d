//! Notification port
//!
//! The loop never talks to a notification system directly. It sends
//! [`Notification`] values on an unbounded channel and moves on; whatever
//! sits on the other end decides how to show them.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Outbound notification requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notification {
    /// Ongoing "you'll be snitched on" warning
    ShowWarning,
    /// Withdraw the ongoing warning
    CancelWarning,
    /// The report went out
    ShowSnitched,
}

impl Notification {
    /// Text shown to the user, if the notification has any
    pub fn text(&self, grace_secs: u64) -> Option<String> {
        match self {
            Notification::ShowWarning => Some(format!("You'll be snitched on in {} seconds!", grace_secs)),
            Notification::CancelWarning => None,
            Notification::ShowSnitched => Some("You've been snitched on!".to_string()),
        }
    }
}

pub type NotificationSender = mpsc::UnboundedSender<Notification>;
pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

pub fn notification_channel() -> (NotificationSender, NotificationReceiver) {
    mpsc::unbounded_channel()
}

/// Tracks what a notification shade would currently display
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationShade {
    pub warning_visible: bool,
    pub snitched_count: u32,
}

impl NotificationShade {
    pub fn apply(&mut self, notification: Notification) {
        match notification {
            Notification::ShowWarning => self.warning_visible = true,
            Notification::CancelWarning => self.warning_visible = false,
            Notification::ShowSnitched => self.snitched_count += 1,
        }
    }
}

/// Consume notifications and log them until every sender is dropped
pub async fn log_notifications(mut rx: NotificationReceiver, grace_secs: u64) -> NotificationShade {
    let mut shade = NotificationShade::default();
    while let Some(notification) = rx.recv().await {
        shade.apply(notification);
        match notification.text(grace_secs) {
            Some(text) => log::info!("Notification {:?}: {}", notification, text),
            None => log::info!("Notification {:?}", notification),
        }
    }
    shade
}
