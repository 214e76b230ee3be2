use super::platform::{Expiry, Platform, PlatformNotification, Sound};
use super::{NotificationRequest, Notifier};
use crate::config::PlatformSettings;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::debug;

/// PowerShell's own AppUserModelID, so toasts show without registering one
const POWERSHELL_APP_ID: &str =
    r"{1AC14E77-02E7-4E5D-B744-2EB1AE5198B7}\WindowsPowerShell\v1.0\powershell.exe";

/// Freedesktop sound theme name used when sound is on
const LINUX_SOUND: &str = "message-new-instant";

/// Shows notifications through the OS's own tool: `notify-send`,
/// `osascript`, or PowerShell toasts.
pub struct DesktopNotifier {
    platform: Platform,
    settings: PlatformSettings,
}

impl DesktopNotifier {
    pub fn new(platform: Platform, settings: PlatformSettings) -> Self {
        Self { platform, settings }
    }

    fn command(&self, shaped: &PlatformNotification) -> Result<Command> {
        let (binary, args) = match self.platform {
            Platform::Linux => (find_binary("notify-send")?, notify_send_args(shaped)),
            Platform::MacOs => (
                find_binary("osascript")?,
                vec!["-e".to_string(), applescript(shaped)],
            ),
            Platform::Windows => (
                find_binary("powershell")?,
                vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    powershell_script(shaped),
                ],
            ),
        };

        let mut command = Command::new(binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        Ok(command)
    }
}

#[async_trait]
impl Notifier for DesktopNotifier {
    async fn send(&self, request: &NotificationRequest) -> Result<()> {
        let shaped = self.platform.shape(request, &self.settings);
        let mut command = self.command(&shaped)?;

        debug!(platform = ?self.platform, title = %shaped.title, "sending notification");

        let output = command
            .output()
            .await
            .context("Failed to run notification command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "notification command failed ({}): {}",
                output.status,
                stderr.trim()
            );
        }
        Ok(())
    }
}

/// Find a notification binary on PATH
fn find_binary(name: &str) -> Result<PathBuf> {
    which::which(name).with_context(|| format!("{} not found on PATH", name))
}

fn notify_send_args(n: &PlatformNotification) -> Vec<String> {
    let mut args = vec!["--app-name=ai-notify".to_string()];

    if let Some(urgency) = &n.urgency {
        args.push(format!("--urgency={}", urgency));
    }

    let millis = match n.expiry {
        Expiry::Millis(ms) => ms,
        Expiry::Seconds(s) => s.saturating_mul(1000),
        Expiry::Never => 0,
    };
    args.push(format!("--expire-time={}", millis));

    if let Some(icon) = &n.icon {
        args.push(format!("--icon={}", icon.display()));
    }
    if n.sound != Sound::Off {
        args.push(format!("--hint=string:sound-name:{}", LINUX_SOUND));
    }

    args.push("--".to_string());
    args.push(n.title.clone());
    args.push(n.message.clone());
    args
}

fn applescript_quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}

/// `display notification` has no timeout or icon, those are left to the system
fn applescript(n: &PlatformNotification) -> String {
    let mut script = format!(
        "display notification {} with title {}",
        applescript_quote(&n.message),
        applescript_quote(&n.title)
    );
    if let Sound::Named(name) = &n.sound {
        script.push_str(&format!(" sound name {}", applescript_quote(name)));
    }
    script
}

fn powershell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn powershell_script(n: &PlatformNotification) -> String {
    let mut lines = vec![
        "[Windows.UI.Notifications.ToastNotificationManager, Windows.UI.Notifications, \
         ContentType = WindowsRuntime] > $null"
            .to_string(),
        "$xml = [Windows.UI.Notifications.ToastNotificationManager]::GetTemplateContent(\
         [Windows.UI.Notifications.ToastTemplateType]::ToastText02)"
            .to_string(),
        "$text = $xml.GetElementsByTagName('text')".to_string(),
        format!(
            "$text.Item(0).AppendChild($xml.CreateTextNode({})) > $null",
            powershell_quote(&n.title)
        ),
        format!(
            "$text.Item(1).AppendChild($xml.CreateTextNode({})) > $null",
            powershell_quote(&n.message)
        ),
    ];

    if n.sound == Sound::Off {
        lines.push("$audio = $xml.CreateElement('audio')".to_string());
        lines.push("$audio.SetAttribute('silent', 'true')".to_string());
        lines.push("$xml.DocumentElement.AppendChild($audio) > $null".to_string());
    }

    lines.push("$toast = [Windows.UI.Notifications.ToastNotification]::new($xml)".to_string());
    if let Expiry::Millis(ms) = n.expiry {
        if ms > 0 {
            lines.push(format!(
                "$toast.ExpirationTime = [DateTimeOffset]::Now.AddMilliseconds({})",
                ms
            ));
        }
    }
    lines.push(format!(
        "[Windows.UI.Notifications.ToastNotificationManager]::CreateToastNotifier({}).Show($toast)",
        powershell_quote(POWERSHELL_APP_ID)
    ));

    lines.join("; ")
}
