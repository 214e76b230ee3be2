use super::env::ScriptEnvironment;
use super::validator::{PathRejection, ScriptPathValidator};
use super::{Interpreter, ScriptDescriptor};
use crate::notify::{advise, Notifier};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Why a script or command did not succeed
#[derive(Debug, Error)]
pub enum RunFailure {
    #[error(transparent)]
    Rejected(#[from] PathRejection),
    #[error("script file not found: {0}")]
    NotFound(PathBuf),
    #[error("script is not executable: {0}")]
    NotExecutable(PathBuf),
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed waiting for process: {0}")]
    Wait(#[source] std::io::Error),
    #[error("process {0}")]
    Exited(ExitStatus),
    #[error("timed out after {0} ms")]
    TimedOut(u64),
}

/// Outcome of one script or command execution
#[derive(Debug)]
pub struct ExecutionResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub failure: Option<RunFailure>,
}

impl ExecutionResult {
    fn succeeded(exit_code: Option<i32>) -> Self {
        Self {
            success: true,
            exit_code,
            timed_out: false,
            failure: None,
        }
    }

    fn failed(failure: RunFailure) -> Self {
        let exit_code = match &failure {
            RunFailure::Exited(status) => status.code(),
            _ => None,
        };
        Self {
            success: false,
            exit_code,
            timed_out: matches!(failure, RunFailure::TimedOut(_)),
            failure: Some(failure),
        }
    }

    pub fn error_reason(&self) -> Option<String> {
        self.failure.as_ref().map(|f| f.to_string())
    }
}

/// Runs user scripts in their own process with a timeout. Every failure is
/// also reported to the user through an advisory notification.
pub struct ScriptRunner {
    validator: ScriptPathValidator,
    notifier: Arc<dyn Notifier>,
}

impl ScriptRunner {
    pub fn new(validator: ScriptPathValidator, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            validator,
            notifier,
        }
    }

    /// Run one script. A timeout of 0 waits forever.
    pub async fn execute(
        &self,
        script: &ScriptDescriptor,
        env: &ScriptEnvironment,
        timeout_ms: u64,
    ) -> ExecutionResult {
        let path = &script.path;

        if !script.enabled {
            info!(path = %path.display(), "script is disabled, skipping");
            return ExecutionResult::succeeded(None);
        }

        info!(path = %path.display(), interpreter = ?script.interpreter, "executing script");

        if let Err(rejection) = self.validator.validate_resolved(path) {
            let detail = format!("The script path is invalid or not allowed: {}", rejection);
            return self
                .fail("Script path validation failed", &detail, rejection.into())
                .await;
        }

        if !is_file(path).await {
            let detail = format!("The script file was not found: {}", path.display());
            return self
                .fail(
                    "Script file not found",
                    &detail,
                    RunFailure::NotFound(path.clone()),
                )
                .await;
        }

        if let Err(failure) = ensure_executable(path).await {
            let detail = format!(
                "Please add execute permission to the script: chmod +x {}",
                path.display()
            );
            return self
                .fail("Script execution permission denied", &detail, failure)
                .await;
        }

        let (program, args) = interpreter_command(script.interpreter, path);
        let mut command = Command::new(&program);
        command.args(args).envs(env.iter());
        if let Some(dir) = path.parent() {
            command.current_dir(dir);
        }

        let result = run_process(command, &program, timeout_ms).await;
        if let Some(failure) = &result.failure {
            let detail = format!("Error executing script {}: {}", path.display(), failure);
            advise(self.notifier.as_ref(), "Script execution error", &detail).await;
            warn!(
                path = %path.display(),
                exit_code = ?result.exit_code,
                timed_out = result.timed_out,
                error = %failure,
                "script failed"
            );
        } else {
            info!(path = %path.display(), "script executed successfully");
        }
        result
    }

    /// Run a command line through the platform shell. Failures are only logged.
    pub async fn run_command(
        &self,
        command_line: &str,
        cwd: Option<&Path>,
        env: &ScriptEnvironment,
        timeout_ms: u64,
    ) -> ExecutionResult {
        let (program, flag) = if cfg!(windows) {
            ("cmd", "/C")
        } else {
            ("sh", "-c")
        };

        let mut command = Command::new(program);
        command.arg(flag).arg(command_line).envs(env.iter());
        if let Some(dir) = cwd.filter(|d| d.is_dir()) {
            command.current_dir(dir);
        }

        debug!(command = command_line, "running hook command");
        let result = run_process(command, program, timeout_ms).await;
        if let Some(failure) = &result.failure {
            warn!(
                command = command_line,
                exit_code = ?result.exit_code,
                error = %failure,
                "hook command failed"
            );
        }
        result
    }

    async fn fail(&self, reason: &str, detail: &str, failure: RunFailure) -> ExecutionResult {
        warn!(reason, error = %failure, "script not run");
        advise(self.notifier.as_ref(), reason, detail).await;
        ExecutionResult::failed(failure)
    }
}

fn interpreter_command(interpreter: Interpreter, path: &Path) -> (String, Vec<OsString>) {
    match interpreter {
        Interpreter::Shell if cfg!(windows) => (
            "cmd".to_string(),
            vec![OsString::from("/C"), path.as_os_str().to_owned()],
        ),
        Interpreter::Shell => ("bash".to_string(), vec![path.as_os_str().to_owned()]),
        Interpreter::Node => ("node".to_string(), vec![path.as_os_str().to_owned()]),
    }
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.is_file())
}

/// Owner, group or other execute bit
#[cfg(unix)]
async fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|meta| meta.permissions().mode() & 0o111 != 0)
}

#[cfg(not(unix))]
async fn is_executable(_path: &Path) -> bool {
    true
}

/// Check the execute bit, adding the owner's once if it is missing
async fn ensure_executable(path: &Path) -> Result<(), RunFailure> {
    if is_executable(path).await {
        return Ok(());
    }

    warn!(path = %path.display(), "script is not executable, adding owner execute bit");
    let granted = match grant_owner_execute(path).await {
        Ok(()) => is_executable(path).await,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to add execute permission");
            false
        }
    };
    if !granted {
        return Err(RunFailure::NotExecutable(path.to_path_buf()));
    }

    info!(path = %path.display(), "added execute permission");
    Ok(())
}

#[cfg(unix)]
async fn grant_owner_execute(path: &Path) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut permissions = tokio::fs::metadata(path).await?.permissions();
    permissions.set_mode(permissions.mode() | 0o100);
    tokio::fs::set_permissions(path, permissions).await
}

#[cfg(not(unix))]
async fn grant_owner_execute(_path: &Path) -> std::io::Result<()> {
    Ok(())
}

/// How long to keep reading output after the process is gone. Background
/// children can hold the pipes open indefinitely.
const OUTPUT_GRACE: Duration = Duration::from_millis(100);

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf).await;
    }
    String::from_utf8_lossy(&buf).trim().to_string()
}

/// Log whatever output arrives within [`OUTPUT_GRACE`], then stop reading
async fn drain_output(program: &str, stream: &str, mut reader: JoinHandle<String>) {
    match tokio::time::timeout(OUTPUT_GRACE, &mut reader).await {
        Ok(Ok(output)) if !output.is_empty() => {
            debug!(program, stream, output = %output, "process output");
        }
        Ok(_) => {}
        Err(_) => {
            reader.abort();
            debug!(program, stream, "output still open after exit, not waiting for it");
        }
    }
}

/// Kill the child and everything it started, then reap it
async fn terminate(child: &mut Child, program: &str) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        kill_process_group(pid, program);
    }
    if let Err(e) = child.kill().await {
        warn!(program, error = %e, "failed to kill timed out process");
    }
}

/// The child leads its own process group, so its pid is the group id
#[cfg(unix)]
fn kill_process_group(pid: u32, program: &str) {
    let Ok(pgid) = libc::pid_t::try_from(pid) else {
        return;
    };
    // SAFETY: killpg only sends a signal; the group was created for this child
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let e = std::io::Error::last_os_error();
        warn!(program, pgid, error = %e, "failed to kill process group");
    }
}

/// Spawn and wait, killing the process group if it outlives `timeout_ms`
/// (0 = no limit). The result depends only on how the process itself exits.
async fn run_process(mut command: Command, program: &str, timeout_ms: u64) -> ExecutionResult {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    #[cfg(unix)]
    command.process_group(0);

    let mut child = match command.spawn() {
        Ok(child) => child,
        Err(source) => {
            return ExecutionResult::failed(RunFailure::Spawn {
                program: program.to_string(),
                source,
            })
        }
    };

    let stdout = tokio::spawn(read_pipe(child.stdout.take()));
    let stderr = tokio::spawn(read_pipe(child.stderr.take()));

    let status = if timeout_ms > 0 {
        match tokio::time::timeout(Duration::from_millis(timeout_ms), child.wait()).await {
            Ok(status) => Some(status),
            Err(_) => {
                terminate(&mut child, program).await;
                None
            }
        }
    } else {
        Some(child.wait().await)
    };

    drain_output(program, "stdout", stdout).await;
    drain_output(program, "stderr", stderr).await;

    match status {
        None => ExecutionResult::failed(RunFailure::TimedOut(timeout_ms)),
        Some(Ok(status)) if status.success() => ExecutionResult::succeeded(status.code()),
        Some(Ok(status)) => ExecutionResult::failed(RunFailure::Exited(status)),
        Some(Err(e)) => ExecutionResult::failed(RunFailure::Wait(e)),
    }
}
