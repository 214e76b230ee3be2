use crate::input::HookPayload;
use std::fmt;

/// Lifecycle event reported by the AI tool
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EventKind {
    PreToolUse,
    PostToolUse,
    Notification,
    Stop,
    SubagentStop,
    /// Anything else, kept verbatim
    Unknown(String),
}

impl EventKind {
    /// Exact-name parse; unrecognized names pass through as `Unknown`.
    pub fn parse(name: &str) -> Self {
        match name {
            "PreToolUse" => EventKind::PreToolUse,
            "PostToolUse" => EventKind::PostToolUse,
            "Notification" => EventKind::Notification,
            "Stop" => EventKind::Stop,
            "SubagentStop" => EventKind::SubagentStop,
            other => EventKind::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            EventKind::PreToolUse => "PreToolUse",
            EventKind::PostToolUse => "PostToolUse",
            EventKind::Notification => "Notification",
            EventKind::Stop => "Stop",
            EventKind::SubagentStop => "SubagentStop",
            EventKind::Unknown(raw) => raw,
        }
    }

    pub fn is_tool_event(&self) -> bool {
        matches!(self, EventKind::PreToolUse | EventKind::PostToolUse)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a payload by structure. Rules apply in order, first hit wins:
/// explicit kind, tool name (with or without a response), notification
/// fields, session id. `None` means the payload is undetermined.
pub fn classify(payload: &HookPayload) -> Option<EventKind> {
    if let Some(kind) = payload.explicit_kind() {
        return Some(EventKind::parse(kind));
    }

    if payload.has_tool_name() {
        return Some(if payload.has_tool_response() {
            EventKind::PostToolUse
        } else {
            EventKind::PreToolUse
        });
    }

    if payload.has_notification_type() || payload.has_title_and_message() {
        return Some(EventKind::Notification);
    }

    // tool_name is known absent here
    if payload.has_session_id() {
        return Some(EventKind::Stop);
    }

    None
}
