use crate::notify::NotificationRequest;
use std::collections::BTreeMap;

pub const NOTIFY_TITLE: &str = "NOTIFY_TITLE";
pub const NOTIFY_MESSAGE: &str = "NOTIFY_MESSAGE";
pub const NOTIFY_URGENCY: &str = "NOTIFY_URGENCY";
pub const NOTIFY_TIMEOUT: &str = "NOTIFY_TIMEOUT";
pub const NOTIFY_SOUND: &str = "NOTIFY_SOUND";
pub const NOTIFY_PROJECT_NAME: &str = "NOTIFY_PROJECT_NAME";
pub const NOTIFY_TOOL_NAME: &str = "NOTIFY_TOOL_NAME";
pub const NOTIFY_TIMESTAMP: &str = "NOTIFY_TIMESTAMP";

pub const NOTIFY_EVENT_TYPE: &str = "NOTIFY_EVENT_TYPE";
pub const NOTIFY_EVENT_TOOL: &str = "NOTIFY_EVENT_TOOL";
pub const NOTIFY_PROJECT_PATH: &str = "NOTIFY_PROJECT_PATH";
pub const NOTIFY_SESSION_ID: &str = "NOTIFY_SESSION_ID";

/// Variables handed to a script, layered over the inherited environment
/// when the process is spawned. Each execution gets its own copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptEnvironment {
    vars: BTreeMap<String, String>,
}

impl ScriptEnvironment {
    /// Seed with the fixed `NOTIFY_*` keys describing a notification
    pub fn for_notification(request: &NotificationRequest) -> Self {
        let mut vars = BTreeMap::new();
        vars.insert(NOTIFY_TITLE.to_string(), request.title.clone());
        vars.insert(NOTIFY_MESSAGE.to_string(), request.message.clone());
        vars.insert(NOTIFY_URGENCY.to_string(), request.urgency.to_string());
        vars.insert(NOTIFY_TIMEOUT.to_string(), request.timeout_secs.to_string());
        vars.insert(NOTIFY_SOUND.to_string(), request.sound.to_string());
        vars.insert(
            NOTIFY_PROJECT_NAME.to_string(),
            request.project_name.clone().unwrap_or_default(),
        );
        vars.insert(
            NOTIFY_TOOL_NAME.to_string(),
            request.tool_name.clone().unwrap_or_default(),
        );
        vars.insert(
            NOTIFY_TIMESTAMP.to_string(),
            chrono::Local::now().to_rfc3339(),
        );
        Self { vars }
    }

    /// Copy with one more variable
    pub fn with(&self, key: &str, value: impl Into<String>) -> Self {
        let mut vars = self.vars.clone();
        vars.insert(key.to_string(), value.into());
        Self { vars }
    }

    #[cfg(test)]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
