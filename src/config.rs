use crate::hooks::HookRule;
use crate::notify::Urgency;
use crate::scripts::{Interpreter, ScriptDescriptor};
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_yaml::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const APP_DIR: &str = "ai-notify";
const GLOBAL_CONFIG_FILENAME: &str = "config.yaml";
const PROJECT_CONFIG_FILENAME: &str = ".ai-notify.yaml";

/// Defaults applied to every notification
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationDefaults {
    /// Seconds
    pub default_timeout: u64,
    pub default_sound: bool,
    pub default_urgency: Urgency,
    pub default_icon: Option<PathBuf>,
}

impl Default for NotificationDefaults {
    fn default() -> Self {
        Self {
            default_timeout: 10,
            default_sound: true,
            default_urgency: Urgency::Normal,
            default_icon: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WindowsSettings {
    pub sound_enabled: bool,
}

impl Default for WindowsSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MacosSettings {
    pub sound_enabled: bool,
    /// System sound played with the notification
    pub sound_name: String,
}

impl Default for MacosSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            sound_name: "Glass".to_string(),
        }
    }
}

/// Urgency names as the Linux notification daemon expects them
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UrgencyMapping {
    pub low: String,
    pub normal: String,
    pub critical: String,
}

impl Default for UrgencyMapping {
    fn default() -> Self {
        Self {
            low: "low".to_string(),
            normal: "normal".to_string(),
            critical: "critical".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LinuxSettings {
    pub sound_enabled: bool,
    pub urgency_mapping: UrgencyMapping,
}

impl Default for LinuxSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            urgency_mapping: UrgencyMapping::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub windows: WindowsSettings,
    pub macos: MacosSettings,
    pub linux: LinuxSettings,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ToolSettings {
    pub icon: Option<PathBuf>,
}

/// A script that runs after every notification
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyScript {
    #[serde(rename = "type")]
    pub interpreter: Option<Interpreter>,
    #[serde(default)]
    pub path: PathBuf,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl NotifyScript {
    pub fn descriptor(&self) -> ScriptDescriptor {
        ScriptDescriptor::new(&self.path, self.interpreter, self.enabled)
    }
}

pub(crate) fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScriptSettings {
    /// Milliseconds, shared by notify scripts and hook actions
    pub timeout: u64,
    pub notify: Vec<NotifyScript>,
}

impl Default for ScriptSettings {
    fn default() -> Self {
        Self {
            timeout: 30_000,
            notify: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// tracing filter directive, overridden by `AI_NOTIFY_LOG`
    pub level: String,
    /// Append here instead of stderr
    pub file: Option<PathBuf>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
        }
    }
}

/// Resolved configuration snapshot. Read-only once loaded.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub notifications: NotificationDefaults,
    pub platforms: PlatformSettings,
    pub tools: HashMap<String, ToolSettings>,
    pub scripts: ScriptSettings,
    /// Event kind name -> rules
    pub hooks: HashMap<String, Vec<HookRule>>,
    pub logging: LoggingSettings,
}

/// Get the global config path, honouring XDG_CONFIG_HOME
pub fn global_config_path() -> PathBuf {
    let xdg_config = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config")
        });

    xdg_config.join(APP_DIR).join(GLOBAL_CONFIG_FILENAME)
}

/// Project config lives in the working directory
pub fn project_config_path(cwd: &Path) -> PathBuf {
    cwd.join(PROJECT_CONFIG_FILENAME)
}

/// Config layers in precedence order, lowest first
pub fn layer_paths(explicit: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = vec![global_config_path()];
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(project_config_path(&cwd));
    }
    if let Some(path) = explicit {
        paths.push(path.to_path_buf());
    }
    paths
}

/// Load and merge config layers over the built-in defaults.
/// Missing files are skipped silently, invalid ones with a warning.
pub fn load_layers(paths: &[PathBuf]) -> Config {
    let mut merged = Value::Mapping(Default::default());
    let mut config = Config::default();

    for path in paths {
        if !path.exists() {
            continue;
        }

        let layer = match load_layer(path) {
            Ok(layer) => layer,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "skipping config layer");
                continue;
            }
        };

        let mut candidate = merged.clone();
        merge_values(&mut candidate, layer);

        match resolve(&candidate, path) {
            Ok(resolved) => {
                debug!(path = %path.display(), "applied config layer");
                merged = candidate;
                config = resolved;
            }
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "skipping config layer");
            }
        }
    }

    config
}

fn load_layer(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {}", path.display()))?;

    let value: Value = serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config: {}", path.display()))?;

    match value {
        // An empty file parses as null
        Value::Null => Ok(Value::Mapping(Default::default())),
        Value::Mapping(_) => Ok(value),
        _ => bail!("Invalid config at {}: expected a mapping", path.display()),
    }
}

fn resolve(value: &Value, path: &Path) -> Result<Config> {
    let config: Config = serde_yaml::from_value(value.clone())
        .with_context(|| format!("Invalid config at {}", path.display()))?;
    validate(&config, path)?;
    Ok(config)
}

/// Recursively merge `overlay` into `base`. Mappings merge key by key,
/// everything else is replaced.
fn merge_values(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Mapping(base), Value::Mapping(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_values(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

fn validate(config: &Config, path: &Path) -> Result<()> {
    if config.scripts.timeout == 0 {
        bail!(
            "Invalid config at {}: 'scripts.timeout' must be greater than 0",
            path.display()
        );
    }
    for (i, script) in config.scripts.notify.iter().enumerate() {
        if script.path.as_os_str().is_empty() {
            bail!(
                "Invalid config at {}: 'scripts.notify[{}].path' cannot be empty",
                path.display(),
                i
            );
        }
    }
    for (event, rules) in &config.hooks {
        for (i, rule) in rules.iter().enumerate() {
            if rule.actions.is_empty() {
                bail!(
                    "Invalid config at {}: hook rule {} for '{}' has no actions",
                    path.display(),
                    i,
                    event
                );
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::HookAction;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_without_files() {
        let config = load_layers(&[PathBuf::from("/nonexistent/config.yaml")]);
        assert_eq!(config.notifications.default_timeout, 10);
        assert!(config.notifications.default_sound);
        assert_eq!(config.notifications.default_urgency, Urgency::Normal);
        assert_eq!(config.scripts.timeout, 30_000);
        assert_eq!(config.platforms.macos.sound_name, "Glass");
        assert!(config.hooks.is_empty());
    }

    #[test]
    fn test_load_hooks() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "config.yaml",
            r#"
hooks:
  PreToolUse:
    - matcher: "Bash|Write"
      actions:
        - type: script
          path: /tmp/guard.sh
        - type: command
          command: echo hi
          enabled: false
"#,
        );

        let config = load_layers(&[path]);
        let rules = &config.hooks["PreToolUse"];
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].matcher, "Bash|Write");
        assert_eq!(rules[0].actions.len(), 2);
        assert!(matches!(
            &rules[0].actions[0],
            HookAction::Script { enabled: true, .. }
        ));
        assert!(matches!(
            &rules[0].actions[1],
            HookAction::Command { enabled: false, .. }
        ));
    }

    #[test]
    fn test_claude_style_hooks_key() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "config.yaml",
            r#"
hooks:
  Stop:
    - hooks:
        - type: command
          command: say done
"#,
        );

        let config = load_layers(&[path]);
        let rules = &config.hooks["Stop"];
        assert_eq!(rules[0].matcher, ".*");
        assert_eq!(rules[0].actions.len(), 1);
    }

    #[test]
    fn test_later_layer_overrides_nested_keys() {
        let temp = TempDir::new().unwrap();
        let global = write(
            &temp,
            "global.yaml",
            r#"
notifications:
  defaultTimeout: 5
  defaultSound: false
platforms:
  linux:
    urgencyMapping:
      critical: urgent
"#,
        );
        let project = write(
            &temp,
            "project.yaml",
            r#"
notifications:
  defaultTimeout: 20
platforms:
  linux:
    urgencyMapping:
      low: quiet
"#,
        );

        let config = load_layers(&[global, project]);
        assert_eq!(config.notifications.default_timeout, 20);
        assert!(!config.notifications.default_sound);
        let mapping = &config.platforms.linux.urgency_mapping;
        assert_eq!(mapping.low, "quiet");
        assert_eq!(mapping.normal, "normal");
        assert_eq!(mapping.critical, "urgent");
    }

    #[test]
    fn test_json_config_is_accepted() {
        let temp = TempDir::new().unwrap();
        let path = write(
            &temp,
            "config.json",
            r#"{"notifications": {"defaultUrgency": "critical"},
                "tools": {"cursor": {"icon": "/i.png"}}}"#,
        );

        let config = load_layers(&[path]);
        assert_eq!(config.notifications.default_urgency, Urgency::Critical);
        assert_eq!(config.tools["cursor"].icon, Some(PathBuf::from("/i.png")));
    }

    #[test]
    fn test_invalid_layer_is_skipped() {
        let temp = TempDir::new().unwrap();
        let good = write(&temp, "good.yaml", "scripts:\n  timeout: 500\n");
        let zero_timeout = write(&temp, "bad.yaml", "scripts:\n  timeout: 0\n");
        let garbage = write(&temp, "garbage.yaml", "notifications: [1, 2\n");

        let config = load_layers(&[good, zero_timeout, garbage]);
        assert_eq!(config.scripts.timeout, 500);
    }

    #[test]
    fn test_notify_script_requires_path() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let value: Value =
            serde_yaml::from_str("scripts:\n  notify:\n    - type: shell\n").unwrap();

        assert!(resolve(&value, &path).is_err());
    }

    #[test]
    fn test_hook_rule_requires_actions() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.yaml");
        let value: Value =
            serde_yaml::from_str("hooks:\n  Stop:\n    - matcher: '.*'\n      actions: []\n")
                .unwrap();

        assert!(resolve(&value, &path).is_err());
    }

    #[test]
    fn test_global_config_path_uses_xdg() {
        let path = global_config_path();
        assert!(path.ends_with("ai-notify/config.yaml"));
    }
}
