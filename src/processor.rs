use crate::compose::compose;
use crate::config::Config;
use crate::event::{classify, EventKind};
use crate::hooks::{event_environment, HookDispatcher};
use crate::input::HookPayload;
use crate::notify::{NotificationOptions, NotificationRequest, Notifier, Urgency};
use crate::project::{ProjectContext, ProjectResolver};
use crate::scripts::{ScriptEnvironment, ScriptPathValidator, ScriptRunner};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Source tool reported for hook events when none is given
pub const DEFAULT_HOOK_TOOL: &str = "claude-code";

/// The payload matched no classification rule
#[derive(Debug, Error)]
#[error("could not determine the event type from the payload")]
pub struct Undetermined;

/// Caller overrides for [`Processor::classify_and_process`]
#[derive(Debug, Clone, Default)]
pub struct ProcessOptions {
    pub kind_override: Option<String>,
    /// Seconds the notification stays up
    pub timeout_secs: Option<u64>,
    /// AI tool that produced the event
    pub source_tool: Option<String>,
}

/// Entry points shared by every front-end: classify, run hooks, compose,
/// dispatch, then the always-run notify scripts.
pub struct Processor {
    config: Config,
    notifier: Arc<dyn Notifier>,
    resolver: ProjectResolver,
    runner: ScriptRunner,
}

impl Processor {
    pub fn new(
        config: Config,
        notifier: Arc<dyn Notifier>,
        resolver: ProjectResolver,
        validator: ScriptPathValidator,
    ) -> Self {
        let runner = ScriptRunner::new(validator, notifier.clone());
        Self {
            config,
            notifier,
            resolver,
            runner,
        }
    }

    /// Returns whether the primary notification was delivered. Hook and
    /// script failures never change the result.
    pub async fn classify_and_process(
        &self,
        payload: &HookPayload,
        options: ProcessOptions,
    ) -> Result<bool, Undetermined> {
        let kind = match options.kind_override.as_deref() {
            Some(kind) => EventKind::parse(kind),
            None => classify(payload).ok_or(Undetermined)?,
        };
        let project = self.project_for(payload);
        info!(event = %kind, project = %project.name, "processing event");

        let composed = compose(&kind, payload, Some(&project));
        let sound = match composed.urgency {
            Urgency::Normal | Urgency::Critical => self.config.notifications.default_sound,
            Urgency::Low => false,
        };
        let request = NotificationOptions {
            title: composed.title,
            message: composed.message,
            urgency: Some(composed.urgency),
            timeout: options.timeout_secs,
            sound: Some(sound),
            icon: None,
            tool_name: Some(
                options
                    .source_tool
                    .unwrap_or_else(|| DEFAULT_HOOK_TOOL.to_string()),
            ),
            project_name: Some(project.name.clone()),
        }
        .resolve(&self.config.notifications, &self.config.tools);

        let base_env = ScriptEnvironment::for_notification(&request);

        // Hooks complete (or time out) before the notification goes out
        HookDispatcher::new(&self.config.hooks, &self.runner, self.config.scripts.timeout)
            .run_hooks(&kind, payload, &project, &base_env)
            .await;

        let delivered = self.deliver(&request).await;

        let env = event_environment(&base_env, &kind, payload, &project);
        self.run_notify_scripts(&env).await;

        Ok(delivered)
    }

    /// Send a caller-built notification without classification or hooks
    pub async fn send_direct(&self, options: NotificationOptions) -> bool {
        if options.title.trim().is_empty() || options.message.trim().is_empty() {
            warn!("refusing to send a notification without a title and message");
            return false;
        }

        let request = options.resolve(&self.config.notifications, &self.config.tools);
        let delivered = self.deliver(&request).await;

        self.run_notify_scripts(&ScriptEnvironment::for_notification(&request))
            .await;

        delivered
    }

    /// Transcript path, then the payload's own project, then its cwd, then ours
    fn project_for(&self, payload: &HookPayload) -> ProjectContext {
        if let Some(transcript) = payload.transcript_path() {
            return self.resolver.resolve(Path::new(transcript));
        }
        if let Some((name, path)) = payload.project() {
            return ProjectContext::new(name, path);
        }
        if let Some(cwd) = payload.cwd() {
            return self.resolver.resolve_dir(Path::new(cwd));
        }
        self.resolver.resolve_working_dir()
    }

    async fn deliver(&self, request: &NotificationRequest) -> bool {
        match self.notifier.send(request).await {
            Ok(()) => {
                debug!(title = %request.title, "notification sent");
                true
            }
            Err(e) => {
                warn!(
                    title = %request.title,
                    error = %format!("{e:#}"),
                    "failed to send notification"
                );
                false
            }
        }
    }

    async fn run_notify_scripts(&self, env: &ScriptEnvironment) {
        for script in &self.config.scripts.notify {
            let result = self
                .runner
                .execute(&script.descriptor(), env, self.config.scripts.timeout)
                .await;
            if !result.success {
                debug!(
                    path = %script.path.display(),
                    error = ?result.error_reason(),
                    "notify script failed"
                );
            }
        }
    }
}
