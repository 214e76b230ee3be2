//! Notification requests and the transport boundary.

mod desktop;
mod platform;

pub use desktop::DesktopNotifier;
pub use platform::Platform;

use crate::config::{NotificationDefaults, ToolSettings};
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, warn};

/// Prefix for notifications the tool sends about its own problems
const ADVISORY_PREFIX: &str = "[ai-notify]";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    Low,
    #[default]
    Normal,
    Critical,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Normal => "normal",
            Urgency::Critical => "critical",
        }
    }
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a caller asks for. Unset fields take the configured defaults.
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    pub title: String,
    pub message: String,
    pub urgency: Option<Urgency>,
    /// Seconds
    pub timeout: Option<u64>,
    pub sound: Option<bool>,
    pub icon: Option<PathBuf>,
    /// AI tool the notification is about, selects a per-tool icon
    pub tool_name: Option<String>,
    pub project_name: Option<String>,
}

impl NotificationOptions {
    /// Fill in defaults. The icon is the explicit one, else the tool's, else
    /// the default, and is dropped when the file does not exist.
    pub fn resolve(
        self,
        defaults: &NotificationDefaults,
        tools: &HashMap<String, ToolSettings>,
    ) -> NotificationRequest {
        let icon = self
            .icon
            .or_else(|| {
                self.tool_name
                    .as_ref()
                    .and_then(|tool| tools.get(tool))
                    .and_then(|settings| settings.icon.clone())
            })
            .or_else(|| defaults.default_icon.clone())
            .filter(|icon| {
                let exists = icon.exists();
                if !exists {
                    debug!(icon = %icon.display(), "icon not found, sending without one");
                }
                exists
            });

        NotificationRequest {
            title: self.title,
            message: self.message,
            urgency: self.urgency.unwrap_or(defaults.default_urgency),
            timeout_secs: self.timeout.unwrap_or(defaults.default_timeout),
            sound: self.sound.unwrap_or(defaults.default_sound),
            icon,
            tool_name: self.tool_name,
            project_name: self.project_name,
        }
    }
}

/// Fully resolved, platform-neutral notification
#[derive(Debug, Clone, PartialEq)]
pub struct NotificationRequest {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
    pub timeout_secs: u64,
    pub sound: bool,
    pub icon: Option<PathBuf>,
    pub tool_name: Option<String>,
    pub project_name: Option<String>,
}

impl NotificationRequest {
    fn advisory(reason: &str, detail: &str) -> Self {
        let defaults = NotificationDefaults::default();
        Self {
            title: format!("{} {}", ADVISORY_PREFIX, reason),
            message: detail.to_string(),
            urgency: Urgency::Normal,
            timeout_secs: defaults.default_timeout,
            sound: true,
            icon: None,
            tool_name: None,
            project_name: None,
        }
    }
}

/// Hands notifications to whatever displays them
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, request: &NotificationRequest) -> Result<()>;
}

/// Tell the user about an internal problem. Never fails the caller.
pub async fn advise(notifier: &dyn Notifier, reason: &str, detail: &str) {
    let request = NotificationRequest::advisory(reason, detail);
    if let Err(e) = notifier.send(&request).await {
        warn!(reason, error = %format!("{e:#}"), "advisory notification failed");
    }
}
