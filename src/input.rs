use serde::Deserialize;
use serde_json::{Map, Value};

/// Event payload as sent by the AI tool's hook system.
///
/// Nothing is required. Every accessor treats a field as carried only when it
/// holds a meaningful value, so `null`, `false`, `""` and `0` read as absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookPayload {
    event_type: Option<Value>,
    /// Claude Code names the event here
    hook_event_name: Option<Value>,
    tool_name: Option<Value>,
    tool_input: Option<Value>,
    tool_response: Option<Value>,
    transcript_path: Option<Value>,
    session_id: Option<Value>,
    title: Option<Value>,
    message: Option<Value>,
    notification_type: Option<Value>,
    project_name: Option<Value>,
    project_path: Option<Value>,
    cwd: Option<Value>,
    /// Anything else the producer sent
    #[serde(flatten)]
    #[allow(dead_code)]
    extra: Map<String, Value>,
}

/// JavaScript-style truthiness, which is what hook producers assume.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn carried(field: &Option<Value>) -> Option<&Value> {
    field.as_ref().filter(|v| is_truthy(v))
}

fn text(field: &Option<Value>) -> Option<&str> {
    match carried(field) {
        Some(Value::String(s)) => Some(s.as_str()),
        _ => None,
    }
}

impl HookPayload {
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    /// Explicit kind string, `event_type` taking precedence over `hook_event_name`
    pub fn explicit_kind(&self) -> Option<&str> {
        text(&self.event_type).or_else(|| text(&self.hook_event_name))
    }

    pub fn tool_name(&self) -> Option<&str> {
        text(&self.tool_name)
    }

    pub fn has_tool_name(&self) -> bool {
        carried(&self.tool_name).is_some()
    }

    pub fn tool_input(&self) -> Option<&Value> {
        carried(&self.tool_input)
    }

    pub fn has_tool_response(&self) -> bool {
        carried(&self.tool_response).is_some()
    }

    pub fn transcript_path(&self) -> Option<&str> {
        text(&self.transcript_path)
    }

    pub fn session_id(&self) -> Option<&str> {
        text(&self.session_id)
    }

    pub fn has_session_id(&self) -> bool {
        carried(&self.session_id).is_some()
    }

    pub fn message(&self) -> Option<&str> {
        text(&self.message)
    }

    pub fn has_title_and_message(&self) -> bool {
        carried(&self.title).is_some() && carried(&self.message).is_some()
    }

    pub fn has_notification_type(&self) -> bool {
        carried(&self.notification_type).is_some()
    }

    /// Project identity supplied directly by the producer, only when both halves are present
    pub fn project(&self) -> Option<(&str, &str)> {
        Some((text(&self.project_name)?, text(&self.project_path)?))
    }

    pub fn cwd(&self) -> Option<&str> {
        text(&self.cwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_parses() {
        let payload = HookPayload::from_json("{}").unwrap();
        assert!(payload.explicit_kind().is_none());
        assert!(!payload.has_tool_name());
    }

    #[test]
    fn test_falsy_values_are_absent() {
        let payload = HookPayload::from_json(
            r#"{"tool_name":"","tool_response":null,"session_id":0,"title":false,"message":"m"}"#,
        )
        .unwrap();
        assert!(!payload.has_tool_name());
        assert!(!payload.has_tool_response());
        assert!(!payload.has_session_id());
        assert!(!payload.has_title_and_message());
        assert_eq!(payload.message(), Some("m"));
    }

    #[test]
    fn test_event_type_wins_over_hook_event_name() {
        let payload =
            HookPayload::from_json(r#"{"event_type":"Stop","hook_event_name":"PreToolUse"}"#)
                .unwrap();
        assert_eq!(payload.explicit_kind(), Some("Stop"));

        let payload = HookPayload::from_json(r#"{"hook_event_name":"PreToolUse"}"#).unwrap();
        assert_eq!(payload.explicit_kind(), Some("PreToolUse"));
    }

    #[test]
    fn test_unknown_fields_are_kept() {
        let payload = HookPayload::from_json(r#"{"stop_hook_active":true}"#).unwrap();
        assert!(payload.extra.contains_key("stop_hook_active"));
    }

    #[test]
    fn test_project_requires_both_fields() {
        let payload = HookPayload::from_json(r#"{"project_name":"p"}"#).unwrap();
        assert!(payload.project().is_none());

        let payload =
            HookPayload::from_json(r#"{"project_name":"p","project_path":"/src/p"}"#).unwrap();
        assert_eq!(payload.project(), Some(("p", "/src/p")));
    }
}
