use crate::event::EventKind;
use crate::input::HookPayload;
use crate::project::ProjectContext;
use crate::scripts::env::{
    NOTIFY_EVENT_TOOL, NOTIFY_EVENT_TYPE, NOTIFY_PROJECT_PATH, NOTIFY_SESSION_ID,
};
use crate::scripts::{Interpreter, ScriptDescriptor, ScriptEnvironment, ScriptRunner};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Matcher that skips regex evaluation and always matches
const MATCH_ALL: &str = ".*";

fn match_all() -> String {
    MATCH_ALL.to_string()
}

/// Actions to run when an event matches
#[derive(Debug, Clone, Deserialize)]
pub struct HookRule {
    #[serde(default = "match_all")]
    pub matcher: String,
    #[serde(default, alias = "hooks")]
    pub actions: Vec<HookAction>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum HookAction {
    Script {
        path: PathBuf,
        #[serde(default)]
        interpreter: Option<Interpreter>,
        #[serde(default = "crate::config::enabled_by_default")]
        enabled: bool,
    },
    Command {
        command: String,
        #[serde(default = "crate::config::enabled_by_default")]
        enabled: bool,
    },
}

impl HookAction {
    fn enabled(&self) -> bool {
        match self {
            HookAction::Script { enabled, .. } | HookAction::Command { enabled, .. } => *enabled,
        }
    }
}

impl HookRule {
    /// `.*` always matches. Anything else is a regex tried against the
    /// message and the tool name; either one matching is enough. A matcher
    /// that does not compile never matches.
    pub fn matches(&self, payload: &HookPayload) -> bool {
        if self.matcher == MATCH_ALL {
            return true;
        }

        let regex = match Regex::new(&self.matcher) {
            Ok(regex) => regex,
            Err(e) => {
                warn!(matcher = %self.matcher, error = %e, "invalid hook matcher");
                return false;
            }
        };

        payload.message().is_some_and(|m| regex.is_match(m))
            || payload.tool_name().is_some_and(|t| regex.is_match(t))
    }
}

/// Event-specific variables layered over the notification environment
pub fn event_environment(
    base: &ScriptEnvironment,
    kind: &EventKind,
    payload: &HookPayload,
    project: &ProjectContext,
) -> ScriptEnvironment {
    let mut env = base
        .with(NOTIFY_EVENT_TYPE, kind.as_str())
        .with(NOTIFY_PROJECT_PATH, project.path.display().to_string());
    if let Some(session) = payload.session_id() {
        env = env.with(NOTIFY_SESSION_ID, session);
    }
    if let Some(tool) = payload.tool_name() {
        env = env.with(NOTIFY_EVENT_TOOL, tool);
    }
    env
}

/// Counts from one [`HookDispatcher::run_hooks`] call
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HookSummary {
    pub matched_rules: usize,
    pub ran: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Runs the configured hook actions for an event, one after another.
/// Failures are logged and counted, never returned.
pub struct HookDispatcher<'a> {
    rules: &'a HashMap<String, Vec<HookRule>>,
    runner: &'a ScriptRunner,
    timeout_ms: u64,
}

impl<'a> HookDispatcher<'a> {
    pub fn new(
        rules: &'a HashMap<String, Vec<HookRule>>,
        runner: &'a ScriptRunner,
        timeout_ms: u64,
    ) -> Self {
        Self {
            rules,
            runner,
            timeout_ms,
        }
    }

    pub async fn run_hooks(
        &self,
        kind: &EventKind,
        payload: &HookPayload,
        project: &ProjectContext,
        base_env: &ScriptEnvironment,
    ) -> HookSummary {
        let mut summary = HookSummary::default();

        let Some(rules) = self.rules.get(kind.as_str()) else {
            debug!(event = %kind, "no hooks configured");
            return summary;
        };

        let env = event_environment(base_env, kind, payload, project);

        for rule in rules.iter().filter(|rule| rule.matches(payload)) {
            summary.matched_rules += 1;
            debug!(event = %kind, matcher = %rule.matcher, "hook rule matched");

            for action in &rule.actions {
                if !action.enabled() {
                    summary.skipped += 1;
                    continue;
                }

                let result = match action {
                    HookAction::Script {
                        path, interpreter, ..
                    } => {
                        let script = ScriptDescriptor::new(path, *interpreter, true);
                        self.runner.execute(&script, &env, self.timeout_ms).await
                    }
                    HookAction::Command { command, .. } => {
                        let cwd = Some(project.path.as_path());
                        self.runner
                            .run_command(command, cwd, &env, self.timeout_ms)
                            .await
                    }
                };

                summary.ran += 1;
                if !result.success {
                    summary.failed += 1;
                }
            }
        }

        info!(
            event = %kind,
            matched = summary.matched_rules,
            ran = summary.ran,
            skipped = summary.skipped,
            failed = summary.failed,
            "hooks finished"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::testing::RecordingNotifier;
    use crate::notify::{NotificationRequest, Urgency};
    use crate::scripts::ScriptPathValidator;
    use std::sync::Arc;

    fn payload(json: &str) -> HookPayload {
        HookPayload::from_json(json).unwrap()
    }

    fn rule(matcher: &str) -> HookRule {
        HookRule {
            matcher: matcher.to_string(),
            actions: vec![HookAction::Command {
                command: "true".to_string(),
                enabled: true,
            }],
        }
    }

    fn base_env() -> ScriptEnvironment {
        ScriptEnvironment::for_notification(&NotificationRequest {
            title: "Claude Tool Request".to_string(),
            message: "Claude wants to use Bash".to_string(),
            urgency: Urgency::Normal,
            timeout_secs: 10,
            sound: true,
            icon: None,
            tool_name: Some("claude-code".to_string()),
            project_name: Some("demo".to_string()),
        })
    }

    fn runner() -> ScriptRunner {
        ScriptRunner::new(
            ScriptPathValidator::from_environment(),
            Arc::new(RecordingNotifier::new()),
        )
    }

    #[test]
    fn test_wildcard_always_matches() {
        assert!(rule(".*").matches(&payload("{}")));
    }

    #[test]
    fn test_matcher_checks_message_or_tool() {
        let bash = payload(r#"{"tool_name": "Bash"}"#);
        let msg = payload(r#"{"message": "waiting for input"}"#);

        assert!(rule("Bash|Write").matches(&bash));
        assert!(!rule("Bash|Write").matches(&msg));
        assert!(rule("^waiting").matches(&msg));
        assert!(!rule("^waiting").matches(&bash));
    }

    #[test]
    fn test_invalid_matcher_never_matches() {
        assert!(!rule("(unclosed").matches(&payload(r#"{"tool_name": "(unclosed"}"#)));
    }

    #[test]
    fn test_action_deserialization() {
        let rule: HookRule = serde_yaml::from_str(
            "hooks:\n  - type: script\n    path: /tmp/a.js\n  - type: command\n    command: ls\n",
        )
        .unwrap();
        assert_eq!(rule.matcher, ".*");
        assert!(matches!(
            &rule.actions[0],
            HookAction::Script { interpreter: None, enabled: true, .. }
        ));
        assert!(matches!(&rule.actions[1], HookAction::Command { enabled: true, .. }));
    }

    #[test]
    fn test_event_environment() {
        let project = ProjectContext::new("demo", "/work/demo");
        let env = event_environment(
            &base_env(),
            &EventKind::PreToolUse,
            &payload(r#"{"tool_name": "Bash", "session_id": "abc"}"#),
            &project,
        );
        assert_eq!(env.get(NOTIFY_EVENT_TYPE), Some("PreToolUse"));
        assert_eq!(env.get(NOTIFY_PROJECT_PATH), Some("/work/demo"));
        assert_eq!(env.get(NOTIFY_SESSION_ID), Some("abc"));
        assert_eq!(env.get(NOTIFY_EVENT_TOOL), Some("Bash"));

        let env = event_environment(&base_env(), &EventKind::Stop, &payload("{}"), &project);
        assert_eq!(env.get(NOTIFY_SESSION_ID), None);
        assert_eq!(env.get(NOTIFY_EVENT_TOOL), None);
    }

    #[tokio::test]
    async fn test_no_rules_for_event() {
        let rules = HashMap::from([("Stop".to_string(), vec![rule(".*")])]);
        let runner = runner();
        let dispatcher = HookDispatcher::new(&rules, &runner, 1000);

        let summary = dispatcher
            .run_hooks(
                &EventKind::Notification,
                &payload("{}"),
                &ProjectContext::new("demo", "/"),
                &base_env(),
            )
            .await;
        assert_eq!(summary, HookSummary::default());
    }

    #[cfg(unix)]
    mod spawning {
        use super::*;
        use std::fs;
        use tempfile::TempDir;

        fn logging_action(log: &std::path::Path, enabled: bool) -> HookAction {
            HookAction::Command {
                command: format!("echo \"$NOTIFY_EVENT_TYPE\" >> {}", log.display()),
                enabled,
            }
        }

        async fn run(
            rules: &HashMap<String, Vec<HookRule>>,
            project: &std::path::Path,
        ) -> HookSummary {
            let runner = runner();
            HookDispatcher::new(rules, &runner, 5000)
                .run_hooks(
                    &EventKind::PreToolUse,
                    &payload(r#"{"tool_name": "Bash"}"#),
                    &ProjectContext::new("demo", project),
                    &base_env(),
                )
                .await
        }

        #[tokio::test]
        async fn test_disabled_action_spawns_nothing() {
            let temp = TempDir::new().unwrap();
            let log = temp.path().join("spawns.log");
            let rules = HashMap::from([(
                "PreToolUse".to_string(),
                vec![HookRule {
                    matcher: ".*".to_string(),
                    actions: vec![logging_action(&log, false)],
                }],
            )]);

            let summary = run(&rules, temp.path()).await;

            assert_eq!(summary.matched_rules, 1);
            assert_eq!(summary.ran, 0);
            assert_eq!(summary.skipped, 1);
            assert!(!log.exists());
        }

        #[tokio::test]
        async fn test_enabled_action_spawns_once_with_event_type() {
            let temp = TempDir::new().unwrap();
            let log = temp.path().join("spawns.log");
            let rules = HashMap::from([(
                "PreToolUse".to_string(),
                vec![HookRule {
                    matcher: ".*".to_string(),
                    actions: vec![logging_action(&log, true)],
                }],
            )]);

            let summary = run(&rules, temp.path()).await;

            assert_eq!(summary.ran, 1);
            assert_eq!(summary.failed, 0);
            assert_eq!(fs::read_to_string(&log).unwrap(), "PreToolUse\n");
        }

        #[tokio::test]
        async fn test_actions_run_in_order_and_failures_continue() {
            let temp = TempDir::new().unwrap();
            let log = temp.path().join("order.log");
            let step = |n: u32| HookAction::Command {
                command: format!("echo {} >> {}", n, log.display()),
                enabled: true,
            };
            let rules = HashMap::from([(
                "PreToolUse".to_string(),
                vec![
                    HookRule {
                        matcher: "Bash".to_string(),
                        actions: vec![
                            step(1),
                            HookAction::Command {
                                command: "exit 1".to_string(),
                                enabled: true,
                            },
                            step(2),
                        ],
                    },
                    HookRule {
                        matcher: "Write".to_string(),
                        actions: vec![step(99)],
                    },
                    HookRule {
                        matcher: ".*".to_string(),
                        actions: vec![step(3)],
                    },
                ],
            )]);

            let summary = run(&rules, temp.path()).await;

            assert_eq!(summary.matched_rules, 2);
            assert_eq!(summary.ran, 4);
            assert_eq!(summary.failed, 1);
            assert_eq!(fs::read_to_string(&log).unwrap(), "1\n2\n3\n");
        }

        #[tokio::test]
        async fn test_script_action_goes_through_runner() {
            let temp = TempDir::new().unwrap();
            let out = temp.path().join("tool.txt");
            let script = temp.path().join("guard.sh");
            fs::write(
                &script,
                format!("#!/bin/bash\necho \"$NOTIFY_EVENT_TOOL\" > {}\n", out.display()),
            )
            .unwrap();
            let rules = HashMap::from([(
                "PreToolUse".to_string(),
                vec![HookRule {
                    matcher: ".*".to_string(),
                    actions: vec![HookAction::Script {
                        path: script,
                        interpreter: None,
                        enabled: true,
                    }],
                }],
            )]);

            let summary = run(&rules, temp.path()).await;

            assert_eq!(summary.failed, 0);
            assert_eq!(fs::read_to_string(&out).unwrap().trim(), "Bash");
        }
    }
}
