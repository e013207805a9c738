//! Notifications posted to the user

use crate::host::Notifier;
use serde::{Deserialize, Serialize};
use tracing::info;

/// A (title, subtitle, body) notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, subtitle: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            subtitle: subtitle.into(),
            body: body.into(),
        }
    }
}

/// Posts notifications as structured log events
#[derive(Debug, Clone, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn post(&self, notification: Notification) {
        info!(
            title = %notification.title,
            subtitle = %notification.subtitle,
            body = %notification.body,
            "Notification"
        );
    }
}
