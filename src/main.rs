use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use tracing::warn;
use tracing_subscriber::EnvFilter;

mod compose;
mod config;
mod event;
mod hooks;
mod input;
mod notify;
mod processor;
mod project;
mod scripts;

use config::LoggingSettings;
use input::HookPayload;
use notify::{DesktopNotifier, NotificationOptions, Platform, Urgency};
use processor::{ProcessOptions, Processor};
use project::ProjectResolver;
use scripts::ScriptPathValidator;

/// Overrides `logging.level` when set
const LOG_ENV: &str = "AI_NOTIFY_LOG";

#[derive(Parser)]
#[command(name = "ai-notify", version, about = "Desktop notifications for AI coding tools")]
struct Cli {
    /// Extra config file, applied over the global and project ones
    #[arg(long, global = true, env = "AI_NOTIFY_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle a hook event read as JSON from stdin
    Hook {
        /// Use this event type instead of inferring one
        #[arg(short, long)]
        event_type: Option<String>,
        /// Seconds the notification stays up
        #[arg(short, long)]
        timeout: Option<u64>,
        /// AI tool that sent the event
        #[arg(long)]
        tool: Option<String>,
    },
    /// Send a notification directly
    Send {
        #[arg(short, long)]
        title: String,
        #[arg(short, long)]
        message: String,
        #[arg(short, long, value_enum)]
        urgency: Option<Urgency>,
        /// Seconds, 0 keeps it up where the platform allows
        #[arg(long)]
        timeout: Option<u64>,
        #[arg(long, conflicts_with = "no_sound")]
        sound: bool,
        #[arg(long)]
        no_sound: bool,
        #[arg(long)]
        icon: Option<PathBuf>,
        #[arg(long)]
        tool: Option<String>,
        #[arg(long)]
        project: Option<String>,
    },
    /// Send a test notification
    Test {
        #[arg(long)]
        tool: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Config warnings go to stderr before the configured subscriber exists
    let bootstrap = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&LoggingSettings::default().level))
        .with_writer(io::stderr)
        .finish();
    let config = tracing::subscriber::with_default(bootstrap, || {
        config::load_layers(&config::layer_paths(cli.config.as_deref()))
    });

    init_logging(&config.logging);

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            report(&format!("Error: failed to start runtime: {}", e));
            return ExitCode::FAILURE;
        }
    };

    let notifier = Arc::new(DesktopNotifier::new(
        Platform::detect(),
        config.platforms.clone(),
    ));
    let processor = Processor::new(
        config,
        notifier,
        ProjectResolver::from_environment(),
        ScriptPathValidator::from_environment(),
    );

    match runtime.block_on(run(cli.command, &processor)) {
        Ok(code) => code,
        Err(e) => {
            report(&format!("Error: {:#}", e));
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, processor: &Processor) -> Result<ExitCode> {
    match command {
        Commands::Hook {
            event_type,
            timeout,
            tool,
        } => {
            let payload = read_payload()?;
            let options = ProcessOptions {
                kind_override: event_type,
                timeout_secs: timeout,
                source_tool: tool,
            };

            match processor.classify_and_process(&payload, options).await {
                Ok(true) => Ok(ExitCode::SUCCESS),
                Ok(false) => {
                    // Never block the tool that fired the hook
                    report("Warning: Failed to send notification");
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    report(&format!("Error: {}", e));
                    report("Use --event-type to specify the event type explicitly");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Send {
            title,
            message,
            urgency,
            timeout,
            sound,
            no_sound,
            icon,
            tool,
            project,
        } => {
            let sound = match (sound, no_sound) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let options = NotificationOptions {
                title,
                message,
                urgency,
                timeout,
                sound,
                icon,
                tool_name: tool,
                project_name: project,
            };

            if processor.send_direct(options).await {
                Ok(ExitCode::SUCCESS)
            } else {
                report("Error: Failed to send notification");
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Test { tool } => {
            let options = NotificationOptions {
                title: "AI Notify Test".to_string(),
                message: "If you can see this, notifications are working.".to_string(),
                tool_name: tool,
                ..Default::default()
            };

            if processor.send_direct(options).await {
                #[allow(clippy::print_stdout)]
                {
                    println!("Test notification sent");
                }
                Ok(ExitCode::SUCCESS)
            } else {
                report("Error: Failed to send test notification");
                Ok(ExitCode::FAILURE)
            }
        }
    }
}

fn read_payload() -> Result<HookPayload> {
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read stdin")?;
    if buffer.trim().is_empty() {
        bail!("No JSON data received from stdin");
    }
    HookPayload::from_json(&buffer).context("Failed to parse JSON from stdin")
}

fn env_filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level))
}

/// Install the global subscriber: stderr, or appended to `logging.file`
fn init_logging(settings: &LoggingSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(&settings.level))
        .with_target(false);

    let Some(path) = &settings.file else {
        let _ = builder.with_writer(io::stderr).try_init();
        return;
    };

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => {
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        Err(e) => {
            let _ = builder.with_writer(io::stderr).try_init();
            warn!(path = %path.display(), error = %e, "cannot open log file, logging to stderr");
        }
    }
}

fn report(line: &str) {
    #[allow(clippy::print_stderr)]
    {
        eprintln!("{}", line);
    }
}
