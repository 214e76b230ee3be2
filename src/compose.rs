use crate::event::EventKind;
use crate::input::HookPayload;
use crate::notify::Urgency;
use crate::project::ProjectContext;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Tools that run commands or change files
const CRITICAL_TOOLS: &[&str] = &["Bash", "Write", "Edit", "MultiEdit"];

const FILE_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit"];

const PREVIEW_LIMIT: usize = 50;

const UNKNOWN_TOOL: &str = "Unknown Tool";

struct Template {
    title: &'static str,
    message: &'static str,
    urgency: Urgency,
}

static TEMPLATES: LazyLock<HashMap<&'static str, Template>> = LazyLock::new(|| {
    let mut m = HashMap::new();

    m.insert(
        "PreToolUse",
        Template {
            title: "Claude Tool Request",
            message: "Claude wants to use {tool_name}",
            urgency: Urgency::Normal,
        },
    );
    m.insert(
        "PostToolUse",
        Template {
            title: "Claude Tool Complete",
            message: "{tool_name} execution completed",
            urgency: Urgency::Low,
        },
    );
    m.insert(
        "Notification",
        Template {
            title: "Claude Notification",
            message: "Claude has sent a notification",
            urgency: Urgency::Normal,
        },
    );
    m.insert(
        "Stop",
        Template {
            title: "Claude Response Complete",
            message: "Claude has finished responding",
            urgency: Urgency::Normal,
        },
    );
    m.insert(
        "SubagentStop",
        Template {
            title: "Claude Task Complete",
            message: "Claude subagent has finished",
            urgency: Urgency::Low,
        },
    );

    m
});

static GENERIC: Template = Template {
    title: "Claude Event",
    message: "Unknown event: {event_type}",
    urgency: Urgency::Normal,
};

/// Title, message and urgency for one event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Composed {
    pub title: String,
    pub message: String,
    pub urgency: Urgency,
}

/// Fill the event's template from the payload and project.
pub fn compose(
    kind: &EventKind,
    payload: &HookPayload,
    project: Option<&ProjectContext>,
) -> Composed {
    let template = TEMPLATES.get(kind.as_str()).unwrap_or(&GENERIC);

    let mut title = template.title.to_string();
    let mut urgency = template.urgency;
    let mut message;

    if let Some(project) = project {
        title = format!("{} - {}", title, project.name);
    }

    if kind.is_tool_event() {
        let tool = payload.tool_name().unwrap_or(UNKNOWN_TOOL);
        message = template.message.replace("{tool_name}", tool);

        if *kind == EventKind::PreToolUse {
            if CRITICAL_TOOLS.contains(&tool) {
                urgency = Urgency::Critical;
                title = format!("⚠️ {}", title);
                message = format!("Claude wants to use {} - Review required!", tool);
            }
            if let Some(preview) = payload.tool_input().and_then(|input| preview(tool, input)) {
                message = format!("{}\n{}", message, preview);
            }
        }
    } else {
        message = template.message.replace("{event_type}", kind.as_str());
    }

    if let Some(project) = project {
        message = format!(
            "{}\nProject: {} ({})",
            message,
            project.name,
            project.path.display()
        );
    }

    Composed {
        title,
        message,
        urgency,
    }
}

/// One-line summary of what the tool is about to do
fn preview(tool: &str, input: &Value) -> Option<String> {
    let field = |name: &str| {
        input
            .get(name)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    };

    if tool == "Bash" {
        field("command").map(|command| format!("Command: {}", truncate(command)))
    } else if FILE_TOOLS.contains(&tool) {
        field("file_path").map(|path| format!("File: {}", path))
    } else if tool == "Read" {
        field("file_path").map(|path| format!("Reading: {}", path))
    } else {
        None
    }
}

fn truncate(s: &str) -> String {
    if s.chars().count() > PREVIEW_LIMIT {
        let head: String = s.chars().take(PREVIEW_LIMIT - 3).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(json: &str) -> HookPayload {
        HookPayload::from_json(json).unwrap()
    }

    fn project() -> ProjectContext {
        ProjectContext::new("webapp", "/work/webapp")
    }

    #[test]
    fn test_critical_bash_request() {
        let composed = compose(
            &EventKind::PreToolUse,
            &payload(r#"{"tool_name": "Bash", "tool_input": {"command": "rm -rf /tmp/x"}}"#),
            Some(&project()),
        );

        assert_eq!(composed.urgency, Urgency::Critical);
        assert_eq!(composed.title, "⚠️ Claude Tool Request - webapp");
        assert_eq!(
            composed.message,
            "Claude wants to use Bash - Review required!\n\
             Command: rm -rf /tmp/x\n\
             Project: webapp (/work/webapp)"
        );
    }

    #[test]
    fn test_long_command_is_truncated() {
        let command = "x".repeat(60);
        let composed = compose(
            &EventKind::PreToolUse,
            &payload(&format!(
                r#"{{"tool_name": "Bash", "tool_input": {{"command": "{}"}}}}"#,
                command
            )),
            None,
        );

        let preview = composed.message.lines().nth(1).unwrap();
        assert_eq!(preview, format!("Command: {}...", "x".repeat(47)));
    }

    #[test]
    fn test_fifty_char_command_is_kept() {
        let command = "y".repeat(50);
        assert_eq!(truncate(&command), command);
        // counts characters, not bytes
        assert_eq!(truncate(&"é".repeat(50)), "é".repeat(50));
    }

    #[test]
    fn test_post_tool_use_is_not_escalated() {
        let composed = compose(
            &EventKind::PostToolUse,
            &payload(
                r#"{"tool_name": "Bash", "tool_response": {"ok": true},
                    "tool_input": {"command": "ls"}}"#,
            ),
            None,
        );

        assert_eq!(composed.urgency, Urgency::Low);
        assert_eq!(composed.title, "Claude Tool Complete");
        assert_eq!(composed.message, "Bash execution completed");
    }

    #[test]
    fn test_file_previews() {
        let composed = compose(
            &EventKind::PreToolUse,
            &payload(r#"{"tool_name": "Edit", "tool_input": {"file_path": "/src/lib.rs"}}"#),
            None,
        );
        assert!(composed.message.ends_with("\nFile: /src/lib.rs"));

        let composed = compose(
            &EventKind::PreToolUse,
            &payload(r#"{"tool_name": "Read", "tool_input": {"file_path": "/src/lib.rs"}}"#),
            None,
        );
        assert_eq!(composed.urgency, Urgency::Normal);
        assert_eq!(composed.message, "Claude wants to use Read\nReading: /src/lib.rs");
    }

    #[test]
    fn test_missing_tool_name_falls_back() {
        let composed = compose(&EventKind::PreToolUse, &payload("{}"), None);
        assert_eq!(composed.message, "Claude wants to use Unknown Tool");
    }

    #[test]
    fn test_unknown_kind_uses_generic_template() {
        let composed = compose(
            &EventKind::Unknown("SessionStart".to_string()),
            &payload("{}"),
            Some(&project()),
        );

        assert_eq!(composed.title, "Claude Event - webapp");
        assert_eq!(
            composed.message,
            "Unknown event: SessionStart\nProject: webapp (/work/webapp)"
        );
        assert_eq!(composed.urgency, Urgency::Normal);
    }

    #[test]
    fn test_stop_and_subagent_stop() {
        let stop = compose(&EventKind::Stop, &payload("{}"), None);
        assert_eq!(stop.title, "Claude Response Complete");
        assert_eq!(stop.message, "Claude has finished responding");

        let sub = compose(&EventKind::SubagentStop, &payload("{}"), None);
        assert_eq!(sub.urgency, Urgency::Low);
    }
}
